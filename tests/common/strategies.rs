//! Proptest strategies for poll scripts and detection sets

use proptest::prelude::*;
use robot_task_states::collaborators::DetectedObject;
use robot_task_states::test_helpers::detection;

/// One observation of the base during an approach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseObservation {
    Moving,
    Still,
}

pub fn base_observations_strategy(max_len: usize) -> impl Strategy<Value = Vec<BaseObservation>> {
    prop::collection::vec(
        prop_oneof![Just(BaseObservation::Moving), Just(BaseObservation::Still)],
        0..max_len,
    )
}

/// Longest run of consecutive `Still` observations
pub fn longest_still_run(observations: &[BaseObservation]) -> usize {
    observations
        .split(|o| *o == BaseObservation::Moving)
        .map(<[BaseObservation]>::len)
        .max()
        .unwrap_or(0)
}

pub fn detections_strategy(label: &'static str) -> impl Strategy<Value = Vec<DetectedObject>> {
    prop::collection::vec((-3.0f64..3.0, -3.0f64..3.0, 0.0f64..1.5), 0..8).prop_map(
        move |points| {
            points
                .into_iter()
                .map(|(x, y, z)| detection(label, x, y, z))
                .collect()
        },
    )
}

pub fn retry_budget_strategy() -> impl Strategy<Value = u32> {
    0u32..6
}

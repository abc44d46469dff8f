//! # Task States
//!
//! One module per robot behaviour. Every state is constructed once per mission
//! graph node from the [`Collaborators`](crate::collaborators::Collaborators)
//! bundle and a [`MissionConfig`](crate::config::MissionConfig), and implements
//! [`TaskState`](crate::state_machine::TaskState).
//!
//! | State | Outcomes | Reads | Writes |
//! |-------|----------|-------|--------|
//! | [`ApproachPose`] | succeeded, failed | base_pose | |
//! | [`SelectGrasp`] | top, side, failed | object | |
//! | [`Grasp`] (side / top) | succeeded, retry, no_more_retries, failed | object | |
//! | [`OpenDoor`] | succeeded, retry, no_more_retries, failed | object | |
//! | [`PutObjectOnTray`] (side / top) | succeeded, failed | | |
//! | [`DetectObject`] | succeeded, retry, no_more_retries, failed | object_name | object |
//! | [`DeliverObject`] | succeeded, retry, failed | | |
//! | [`MoveHead`] | succeeded, failed | torso_pose | |

pub mod approach_pose;
pub mod deliver_object;
pub mod detect_object;
pub mod grasp;
pub mod move_head;
pub mod open_door;
pub mod put_object_on_tray;
pub mod select_grasp;

pub use approach_pose::{ApproachPhase, ApproachPose, ApproachTracker};
pub use deliver_object::DeliverObject;
pub use detect_object::{select_nearest, DetectObject};
pub use grasp::{Grasp, GraspKind, GraspProfile};
pub use move_head::MoveHead;
pub use open_door::OpenDoor;
pub use put_object_on_tray::PutObjectOnTray;
pub use select_grasp::SelectGrasp;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::collaborators::{IkErrorCode, IkRequest, IkSolver};
use crate::constants::{services, IK_LINK_NAME};
use crate::error::ServiceError;
use crate::execution::ActionInvoker;
use crate::geometry::PoseStamped;

/// Why a staged IK pipeline stopped
#[derive(Debug, Clone, PartialEq)]
pub enum IkFailure {
    /// The solver answered but found no configuration for this stage
    Unsolved {
        stage: &'static str,
        code: IkErrorCode,
    },
    /// The solver could not be reached
    Service(ServiceError),
}

/// Solve `stages` in order, seeding every stage with the previous stage's
/// configuration. Stops at the first stage without a solution.
pub(crate) async fn solve_ik_pipeline(
    invoker: &ActionInvoker,
    ik: &Arc<dyn IkSolver>,
    wait: Duration,
    seed: &[f64],
    stages: &[(&'static str, PoseStamped)],
) -> Result<Vec<Vec<f64>>, IkFailure> {
    let mut configurations: Vec<Vec<f64>> = Vec::with_capacity(stages.len());

    for (stage, target) in stages {
        let request = IkRequest {
            link_name: IK_LINK_NAME.to_string(),
            seed: configurations.last().map_or_else(|| seed.to_vec(), Clone::clone),
            target: target.clone(),
        };

        let solution = invoker
            .call_service(services::IK_SOLVER, wait, || ik.solve(&request))
            .await
            .map_err(IkFailure::Service)?;

        if !solution.code.is_success() {
            error!(stage = %stage, code = ?solution.code, "IK failed");
            return Err(IkFailure::Unsolved {
                stage: *stage,
                code: solution.code,
            });
        }

        debug!(stage = %stage, "IK solved");
        configurations.push(solution.configuration);
    }

    Ok(configurations)
}

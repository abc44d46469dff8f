//! # Scripted Collaborators
//!
//! In-memory stand-ins for every collaborator interface. Each fake records the
//! calls it receives and answers from a script; once a script runs dry the fake
//! falls back to a fixed default answer.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::collaborators::{
    ActionHandle, ArmCompliance, BaseController, DetectedObject, DoorOpeningAction,
    DoorOpeningGoal, FrameTransform, GoalStatus, IkErrorCode, IkRequest, IkSolution, IkSolver,
    MotionCommand, MotionModeController, MotionTarget, ObjectDetector, OccupancyCheck,
    OperatorPrompt, ServiceDirectory, Speech,
};
use crate::constants::services;
use crate::error::{Result, ServiceError};
use crate::geometry::PoseStamped;

/// Action handle replaying a list of observed states
pub struct ScriptedHandle {
    states: Mutex<VecDeque<Result<GoalStatus>>>,
    last: Mutex<GoalStatus>,
    final_status: GoalStatus,
}

impl ScriptedHandle {
    /// Handle whose `state` calls return `states` in order, then stick to the last one.
    /// `wait` reports the last scripted status.
    pub fn with_states(states: Vec<GoalStatus>) -> Self {
        let final_status = states.last().copied().unwrap_or(GoalStatus::Succeeded);
        Self {
            states: Mutex::new(states.into_iter().map(Ok).collect()),
            last: Mutex::new(GoalStatus::Active),
            final_status,
        }
    }

    pub fn finishing(status: GoalStatus) -> Self {
        Self::with_states(vec![status])
    }

    pub fn succeeded() -> Self {
        Self::finishing(GoalStatus::Succeeded)
    }

    /// Handle whose first `state` call fails, then follows `states`
    pub fn with_state_error(states: Vec<GoalStatus>) -> Self {
        let handle = Self::with_states(states);
        handle
            .states
            .lock()
            .push_front(Err(ServiceError::call_failed("action_state", "connection lost")));
        handle
    }
}

#[async_trait]
impl ActionHandle for ScriptedHandle {
    async fn state(&self) -> Result<GoalStatus> {
        match self.states.lock().pop_front() {
            Some(Ok(status)) => {
                *self.last.lock() = status;
                Ok(status)
            }
            Some(Err(e)) => Err(e),
            None => Ok(*self.last.lock()),
        }
    }

    async fn wait(&self, _timeout: Option<Duration>) -> Result<GoalStatus> {
        Ok(self.final_status)
    }
}

/// One dispatched motion command
#[derive(Debug, Clone, PartialEq)]
pub struct MotionRecord {
    pub group: String,
    pub target: MotionTarget,
    pub mode: Option<String>,
}

/// Motion dispatcher: every command succeeds unless a handle was queued for its group
#[derive(Default)]
pub struct FakeMotion {
    records: Mutex<Vec<MotionRecord>>,
    queued: Mutex<HashMap<String, VecDeque<ScriptedHandle>>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeMotion {
    pub fn queue_handle(&self, group: &str, handle: ScriptedHandle) {
        self.queued
            .lock()
            .entry(group.to_string())
            .or_default()
            .push_back(handle);
    }

    /// Reject every dispatch to `group`
    pub fn fail_group(&self, group: &str) {
        self.failing.lock().insert(group.to_string());
    }

    pub fn records(&self) -> Vec<MotionRecord> {
        self.records.lock().clone()
    }

    pub fn targets_for(&self, group: &str) -> Vec<MotionTarget> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.group == group)
            .map(|record| record.target.clone())
            .collect()
    }

    pub fn dispatch_count(&self, group: &str) -> usize {
        self.records.lock().iter().filter(|record| record.group == group).count()
    }
}

#[async_trait]
impl MotionCommand for FakeMotion {
    async fn dispatch(
        &self,
        group: &str,
        target: &MotionTarget,
        mode: Option<&str>,
    ) -> Result<Box<dyn ActionHandle>> {
        self.records.lock().push(MotionRecord {
            group: group.to_string(),
            target: target.clone(),
            mode: mode.map(str::to_string),
        });

        if self.failing.lock().contains(group) {
            return Err(ServiceError::call_failed(group, "dispatcher rejected command"));
        }

        let queued = self
            .queued
            .lock()
            .get_mut(group)
            .and_then(VecDeque::pop_front);
        Ok(Box::new(queued.unwrap_or_else(ScriptedHandle::succeeded)))
    }
}

/// Base controller reporting a scripted motion flag; reports standing still once the script is spent
#[derive(Default)]
pub struct FakeBase {
    moving: Mutex<VecDeque<Result<bool>>>,
    moving_queries: AtomicUsize,
    stops: AtomicUsize,
}

impl FakeBase {
    pub fn script_moving(&self, flags: impl IntoIterator<Item = bool>) {
        self.moving.lock().extend(flags.into_iter().map(Ok));
    }

    pub fn moving_queries(&self) -> usize {
        self.moving_queries.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseController for FakeBase {
    async fn is_moving(&self) -> Result<bool> {
        self.moving_queries.fetch_add(1, Ordering::SeqCst);
        self.moving.lock().pop_front().unwrap_or(Ok(false))
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Service directory in which every service is up unless marked unavailable
#[derive(Default)]
pub struct FakeServices {
    unavailable: Mutex<HashSet<String>>,
    waits: Mutex<Vec<(String, Duration)>>,
}

impl FakeServices {
    pub fn make_unavailable(&self, service: &str) {
        self.unavailable.lock().insert(service.to_string());
    }

    pub fn waits(&self) -> Vec<(String, Duration)> {
        self.waits.lock().clone()
    }

    pub fn waited_for(&self, service: &str) -> bool {
        self.waits.lock().iter().any(|(name, _)| name == service)
    }
}

#[async_trait]
impl ServiceDirectory for FakeServices {
    async fn wait_for_service(&self, service: &str, timeout: Duration) -> Result<()> {
        self.waits.lock().push((service.to_string(), timeout));
        if self.unavailable.lock().contains(service) {
            return Err(ServiceError::unavailable(service, timeout));
        }
        Ok(())
    }
}

/// Transform tree in which every frame coincides with every other
#[derive(Default)]
pub struct FakeTransforms {
    failing: AtomicBool,
}

impl FakeTransforms {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FrameTransform for FakeTransforms {
    async fn transform(&self, pose: &PoseStamped, target_frame: &str) -> Result<PoseStamped> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::TransformFailed {
                from_frame: pose.frame_id.clone(),
                to_frame: target_frame.to_string(),
                reason: "no transform available".to_string(),
            });
        }
        let mut transformed = pose.clone();
        transformed.frame_id = target_frame.to_string();
        Ok(transformed)
    }
}

/// IK solver answering with scripted codes; solution `n` is seven joints of value `n`
#[derive(Default)]
pub struct FakeIk {
    codes: Mutex<VecDeque<IkErrorCode>>,
    requests: Mutex<Vec<IkRequest>>,
}

impl FakeIk {
    pub fn script_codes(&self, codes: impl IntoIterator<Item = IkErrorCode>) {
        self.codes.lock().extend(codes);
    }

    pub fn requests(&self) -> Vec<IkRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn solution(index: usize) -> Vec<f64> {
        vec![index as f64; 7]
    }
}

#[async_trait]
impl IkSolver for FakeIk {
    async fn solve(&self, request: &IkRequest) -> Result<IkSolution> {
        let index = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };
        let code = self.codes.lock().pop_front().unwrap_or(IkErrorCode::Success);
        let configuration = if code.is_success() {
            Self::solution(index)
        } else {
            Vec::new()
        };
        Ok(IkSolution {
            configuration,
            code,
        })
    }
}

/// Detector replaying scripted detection rounds; empty once the script is spent
#[derive(Default)]
pub struct FakeDetector {
    rounds: Mutex<VecDeque<Result<Vec<DetectedObject>>>>,
    queries: Mutex<Vec<String>>,
}

impl FakeDetector {
    pub fn script_round(&self, detections: Vec<DetectedObject>) {
        self.rounds.lock().push_back(Ok(detections));
    }

    pub fn script_failure(&self) {
        self.rounds.lock().push_back(Err(ServiceError::call_failed(
            services::OBJECT_DETECTION,
            "detector crashed",
        )));
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl ObjectDetector for FakeDetector {
    async fn detect(&self, object_name: &str) -> Result<Vec<DetectedObject>> {
        self.queries.lock().push(object_name.to_string());
        self.rounds.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Tray sensor replaying scripted readings, then repeating `fallback`
pub struct FakeOccupancy {
    readings: Mutex<VecDeque<Result<bool>>>,
    fallback: AtomicBool,
    polls: AtomicUsize,
}

impl Default for FakeOccupancy {
    fn default() -> Self {
        Self {
            readings: Mutex::new(VecDeque::new()),
            fallback: AtomicBool::new(true),
            polls: AtomicUsize::new(0),
        }
    }
}

impl FakeOccupancy {
    pub fn script_readings(&self, readings: impl IntoIterator<Item = bool>) {
        self.readings.lock().extend(readings.into_iter().map(Ok));
    }

    pub fn script_failure(&self) {
        self.readings.lock().push_back(Err(ServiceError::call_failed(
            services::TRAY_CHECK_OCCUPIED,
            "sensor offline",
        )));
    }

    pub fn set_fallback(&self, occupied: bool) {
        self.fallback.store(occupied, Ordering::SeqCst);
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OccupancyCheck for FakeOccupancy {
    async fn is_occupied(&self) -> Result<bool> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.readings
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.load(Ordering::SeqCst)))
    }
}

#[derive(Default)]
pub struct FakeCompliance {
    settings: Mutex<Vec<Vec<f64>>>,
    failing: AtomicBool,
}

impl FakeCompliance {
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn settings(&self) -> Vec<Vec<f64>> {
        self.settings.lock().clone()
    }
}

#[async_trait]
impl ArmCompliance for FakeCompliance {
    async fn set_joint_stiffness(&self, stiffness: &[f64]) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::call_failed(services::JOINT_STIFFNESS, "controller busy"));
        }
        self.settings.lock().push(stiffness.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeMotionMode {
    starts: AtomicUsize,
    stops: AtomicUsize,
    fail_start: AtomicBool,
    fail_stop: AtomicBool,
}

impl FakeMotionMode {
    pub fn fail_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn fail_stop(&self) {
        self.fail_stop.store(true, Ordering::SeqCst);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MotionModeController for FakeMotionMode {
    async fn start(&self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(ServiceError::call_failed(services::MOTION_MODE_START, "mode rejected"));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(ServiceError::call_failed(services::MOTION_MODE_STOP, "mode rejected"));
        }
        Ok(())
    }
}

/// Door-opening server: up by default, goals end with `goal_status`
pub struct FakeDoorAction {
    server_down: AtomicBool,
    goal_status: Mutex<GoalStatus>,
    goals: Mutex<Vec<DoorOpeningGoal>>,
}

impl Default for FakeDoorAction {
    fn default() -> Self {
        Self {
            server_down: AtomicBool::new(false),
            goal_status: Mutex::new(GoalStatus::Succeeded),
            goals: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDoorAction {
    pub fn take_down(&self) {
        self.server_down.store(true, Ordering::SeqCst);
    }

    pub fn set_goal_status(&self, status: GoalStatus) {
        *self.goal_status.lock() = status;
    }

    pub fn goals(&self) -> usize {
        self.goals.lock().len()
    }
}

#[async_trait]
impl DoorOpeningAction for FakeDoorAction {
    async fn wait_for_server(&self, _timeout: Duration) -> bool {
        !self.server_down.load(Ordering::SeqCst)
    }

    async fn send_goal(&self, goal: &DoorOpeningGoal) -> Result<Box<dyn ActionHandle>> {
        self.goals.lock().push(goal.clone());
        let status = *self.goal_status.lock();
        Ok(Box::new(ScriptedHandle::finishing(status)))
    }
}

#[derive(Default)]
pub struct RecordingSpeech {
    phrases: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    pub fn phrases(&self) -> Vec<String> {
        self.phrases.lock().clone()
    }
}

impl Speech for RecordingSpeech {
    fn say(&self, text: &str) {
        self.phrases.lock().push(text.to_string());
    }
}

/// Operator giving a fixed answer
#[derive(Default)]
pub struct ScriptedOperator {
    confirms: AtomicBool,
    questions: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    pub fn answer(&self, confirms: bool) {
        self.confirms.store(confirms, Ordering::SeqCst);
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

#[async_trait]
impl OperatorPrompt for ScriptedOperator {
    async fn confirm(&self, question: &str) -> bool {
        self.questions.lock().push(question.to_string());
        self.confirms.load(Ordering::SeqCst)
    }
}

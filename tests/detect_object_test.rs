mod common;

use common::detection;
use robot_task_states::collaborators::{GoalStatus, MotionTarget};
use robot_task_states::constants::{groups, poses, services};
use robot_task_states::state_machine::{ExecutionContext, RetryOutcome, TaskState};
use robot_task_states::states::DetectObject;
use robot_task_states::test_helpers::ScriptedHandle;

fn milk_context() -> ExecutionContext {
    let mut ctx = ExecutionContext::new();
    ctx.set_object_name("milk");
    ctx
}

#[tokio::test]
async fn test_nearest_candidate_is_selected() {
    let robot = common::robot();
    robot
        .detector
        .script_round(vec![detection("milk", 1.0, 0.0, 0.7), detection("milk", 0.3, 0.0, 0.7)]);
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());
    let mut ctx = milk_context();

    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::Succeeded);

    let object = ctx.object().unwrap();
    assert_eq!(object.label, "milk");
    assert!((object.pose.planar_distance() - 0.3).abs() < 1e-9);
    assert_eq!(state.retry_policy().retries(), 0);
    assert_eq!(robot.detector.queries(), vec!["milk".to_string()]);
}

#[tokio::test]
async fn test_hand_motion_is_not_awaited() {
    let robot = common::robot();
    robot
        .motion
        .queue_handle(groups::HAND, ScriptedHandle::finishing(GoalStatus::Error));
    robot.detector.script_round(vec![detection("milk", 0.5, 0.0, 0.7)]);
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());
    let mut ctx = milk_context();

    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::Succeeded);
    assert_eq!(ctx.object().unwrap().label, "milk");
}

#[tokio::test]
async fn test_first_attempt_announces_search_and_takes_inspection_posture() {
    let robot = common::robot();
    robot.detector.script_round(vec![detection("milk", 0.5, 0.0, 0.7)]);
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());

    state.execute(&mut milk_context()).await;

    assert_eq!(
        robot.speech.phrases(),
        vec!["I will now search for the milk.".to_string()]
    );
    assert_eq!(
        robot.motion.targets_for(groups::TORSO),
        vec![
            MotionTarget::named(poses::SHAKE),
            MotionTarget::named("back_right_extreme")
        ]
    );
    assert_eq!(
        robot.motion.targets_for(groups::ARM),
        vec![MotionTarget::named(poses::LOOK_AT_TABLE)]
    );
    assert_eq!(
        robot.motion.targets_for(groups::HEAD),
        vec![MotionTarget::named(poses::BACK)]
    );
    // camera settles before detection
    assert_eq!(robot.ticker.sleep_count(), 1);
}

#[tokio::test]
async fn test_empty_detection_retries_then_exhausts_budget() {
    let robot = common::robot();
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());
    let mut ctx = milk_context();

    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::Retry);
    assert_eq!(state.retry_policy().retries(), 1);

    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::Retry);
    assert_eq!(state.retry_policy().retries(), 2);

    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::NoMoreRetries);
    assert_eq!(state.retry_policy().retries(), 0);
    assert_eq!(robot.detector.queries().len(), 2);

    // viewpoints follow the retry count, the search is announced once
    assert_eq!(
        robot.motion.targets_for(groups::TORSO),
        vec![
            MotionTarget::named(poses::SHAKE),
            MotionTarget::named("back_right_extreme"),
            MotionTarget::named("back_extreme"),
        ]
    );
    assert_eq!(robot.speech.phrases().len(), 1);
}

#[tokio::test]
async fn test_out_of_range_detection_retries() {
    let robot = common::robot();
    robot
        .detector
        .script_round(vec![detection("milk", 2.0, 0.0, 0.7), detection("milk", 1.5, 1.5, 0.7)]);
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());
    let mut ctx = milk_context();

    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::Retry);
    assert!(ctx.object().is_err());
}

#[tokio::test]
async fn test_label_mismatch_retries() {
    let robot = common::robot();
    robot.detector.script_round(vec![detection("salt", 0.4, 0.0, 0.7)]);
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());

    assert_eq!(state.execute(&mut milk_context()).await, RetryOutcome::Retry);
    assert_eq!(state.retry_policy().retries(), 1);
}

#[tokio::test]
async fn test_missing_object_name_fails_without_motion() {
    let robot = common::robot();
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());

    assert_eq!(state.execute(&mut ExecutionContext::new()).await, RetryOutcome::Failed);
    assert!(robot.motion.records().is_empty());
    assert!(robot.detector.queries().is_empty());
}

#[tokio::test]
async fn test_constructor_name_overrides_context() {
    let robot = common::robot();
    robot.detector.script_round(vec![detection("salt", 0.4, 0.0, 0.7)]);
    let mut state =
        DetectObject::new(&robot.collaborators(), &common::config()).with_object_name("salt");

    assert_eq!(state.execute(&mut milk_context()).await, RetryOutcome::Succeeded);
    assert_eq!(robot.detector.queries(), vec!["salt".to_string()]);
}

#[tokio::test]
async fn test_unavailable_detector_fails_and_resets() {
    let robot = common::robot();
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());
    let mut ctx = milk_context();

    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::Retry);

    robot.services.make_unavailable(services::OBJECT_DETECTION);
    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::Failed);
    assert_eq!(state.retry_policy().retries(), 0);
}

#[tokio::test]
async fn test_detector_error_fails() {
    let robot = common::robot();
    robot.detector.script_failure();
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());

    assert_eq!(state.execute(&mut milk_context()).await, RetryOutcome::Failed);
}

#[tokio::test]
async fn test_stale_object_is_cleared_on_entry() {
    let robot = common::robot();
    let mut state = DetectObject::new(&robot.collaborators(), &common::config());
    let mut ctx = common::context_with_object(detection("milk", 0.3, 0.0, 0.7));

    assert_eq!(state.execute(&mut ctx).await, RetryOutcome::Retry);
    assert!(ctx.object().is_err());
}

#[tokio::test]
async fn test_declares_context_keys() {
    let robot = common::robot();
    let state = DetectObject::new(&robot.collaborators(), &common::config());

    assert_eq!(
        TaskState::input_keys(&state),
        &[robot_task_states::state_machine::ContextKey::ObjectName]
    );
    assert_eq!(
        TaskState::output_keys(&state),
        &[robot_task_states::state_machine::ContextKey::Object]
    );
}

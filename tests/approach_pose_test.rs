mod common;

use robot_task_states::collaborators::{GoalStatus, MotionTarget};
use robot_task_states::constants::{groups, speech};
use robot_task_states::state_machine::{
    BaseTarget, ExecutionContext, SimpleOutcome, StateMachineAdapter, TaskState,
};
use robot_task_states::states::ApproachPose;
use robot_task_states::test_helpers::ScriptedHandle;
use serde_json::json;
use std::time::Duration;

fn kitchen_context() -> ExecutionContext {
    let mut ctx = ExecutionContext::new();
    ctx.set_base_pose(BaseTarget::named("kitchen"));
    ctx
}

#[tokio::test]
async fn test_second_arrival_completes_approach() {
    let robot = common::robot();
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());

    let outcome = state.execute(&mut kitchen_context()).await;

    assert_eq!(outcome, SimpleOutcome::Succeeded);
    let records = robot.motion.records();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.group, groups::BASE);
        assert_eq!(record.target, MotionTarget::Base(BaseTarget::named("kitchen")));
        assert_eq!(record.mode.as_deref(), Some("linear"));
    }
    assert_eq!(robot.base.stops(), 0);
}

#[tokio::test]
async fn test_handle_error_fails_approach() {
    let robot = common::robot();
    robot
        .motion
        .queue_handle(groups::BASE, ScriptedHandle::finishing(GoalStatus::Error));
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());

    let outcome = state.execute(&mut kitchen_context()).await;

    assert_eq!(outcome, SimpleOutcome::Failed);
    assert_eq!(robot.motion.dispatch_count(groups::BASE), 1);
}

#[tokio::test]
async fn test_paused_second_move_fails_approach() {
    let robot = common::robot();
    robot.motion.queue_handle(groups::BASE, ScriptedHandle::succeeded());
    robot
        .motion
        .queue_handle(groups::BASE, ScriptedHandle::finishing(GoalStatus::Paused));
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());

    assert_eq!(state.execute(&mut kitchen_context()).await, SimpleOutcome::Failed);
    assert_eq!(robot.motion.dispatch_count(groups::BASE), 2);
}

#[tokio::test]
async fn test_standstill_stops_base_and_announces_abort() {
    let robot = common::robot();
    robot
        .motion
        .queue_handle(groups::BASE, ScriptedHandle::with_states(vec![GoalStatus::Active]));
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());

    let outcome = state.execute(&mut kitchen_context()).await;

    assert_eq!(outcome, SimpleOutcome::Failed);
    assert_eq!(robot.base.moving_queries(), 11);
    assert_eq!(robot.ticker.sleep_count(), 10);
    assert_eq!(robot.base.stops(), 1);
    assert_eq!(robot.speech.phrases(), vec![speech::PATH_BLOCKED.to_string()]);
}

#[tokio::test]
async fn test_motion_resets_idle_budget() {
    let robot = common::robot();
    robot
        .motion
        .queue_handle(groups::BASE, ScriptedHandle::with_states(vec![GoalStatus::Active]));
    robot.base.script_moving([true; 5]);
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());

    assert_eq!(state.execute(&mut kitchen_context()).await, SimpleOutcome::Failed);
    // five moving ticks, then eleven standing still
    assert_eq!(robot.base.moving_queries(), 16);
}

#[tokio::test]
async fn test_unreadable_handle_backs_off_and_continues() {
    let robot = common::robot();
    robot.motion.queue_handle(
        groups::BASE,
        ScriptedHandle::with_state_error(vec![GoalStatus::Succeeded]),
    );
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());

    assert_eq!(state.execute(&mut kitchen_context()).await, SimpleOutcome::Succeeded);
    assert_eq!(robot.ticker.sleeps()[0], Duration::from_millis(500));
    assert_eq!(robot.motion.dispatch_count(groups::BASE), 2);
}

#[tokio::test]
async fn test_constructor_pose_overrides_context() {
    let robot = common::robot();
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config())
        .with_pose(BaseTarget::Coordinates(1.0, -0.5, 1.57))
        .with_mode("omni");

    assert_eq!(state.execute(&mut kitchen_context()).await, SimpleOutcome::Succeeded);
    let records = robot.motion.records();
    let first = &records[0];
    assert_eq!(first.target, MotionTarget::Base(BaseTarget::Coordinates(1.0, -0.5, 1.57)));
    assert_eq!(first.mode.as_deref(), Some("omni"));
}

#[tokio::test]
async fn test_coordinate_pose_from_untyped_context() {
    let robot = common::robot();
    let mut ctx = ExecutionContext::new();
    ctx.set_base_pose_value(&json!([2.0, 1.5, 0.0])).unwrap();
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());

    assert_eq!(state.execute(&mut ctx).await, SimpleOutcome::Succeeded);
    assert_eq!(
        robot.motion.targets_for(groups::BASE)[0],
        MotionTarget::Base(BaseTarget::Coordinates(2.0, 1.5, 0.0))
    );
}

#[tokio::test]
async fn test_missing_target_fails_without_motion() {
    let robot = common::robot();
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());

    assert_eq!(state.execute(&mut ExecutionContext::new()).await, SimpleOutcome::Failed);
    assert!(robot.motion.records().is_empty());
}

#[tokio::test]
async fn test_preempted_approach_fails_and_clears_request() {
    let robot = common::robot();
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());
    assert!(state.request_preempt());

    assert_eq!(state.execute(&mut kitchen_context()).await, SimpleOutcome::Failed);
    assert_eq!(robot.base.moving_queries(), 0);

    let preempt = TaskState::preempt_signal(&state).unwrap();
    assert!(!preempt.is_requested());
}

#[tokio::test]
async fn test_preemption_is_cleared_when_target_is_missing() {
    let robot = common::robot();
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());
    assert!(state.request_preempt());

    assert_eq!(state.execute(&mut ExecutionContext::new()).await, SimpleOutcome::Failed);
    assert!(!TaskState::preempt_signal(&state).unwrap().is_requested());

    // the next visit is not aborted by the earlier request
    assert_eq!(state.execute(&mut kitchen_context()).await, SimpleOutcome::Succeeded);
}

#[tokio::test]
async fn test_preemption_is_cleared_when_dispatch_is_rejected() {
    let robot = common::robot();
    robot.motion.fail_group(groups::BASE);
    let mut state = ApproachPose::new(&robot.collaborators(), &common::config());
    assert!(state.request_preempt());

    assert_eq!(state.execute(&mut kitchen_context()).await, SimpleOutcome::Failed);
    assert!(!TaskState::preempt_signal(&state).unwrap().is_requested());
}

//! # Action Invoker
//!
//! Uniform wrapper around motion commands and service calls. Blocking commands
//! resolve to a terminal status before returning; non-blocking commands hand back
//! the in-flight [`ActionHandle`] and leave waiting or polling to the caller.
//!
//! The invoker never retries. Every failure is logged with the endpoint and the
//! underlying error text and returned to the calling state, which decides the outcome.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::collaborators::{
    ActionHandle, Collaborators, GoalStatus, MotionCommand, MotionTarget, ServiceDirectory,
};
use crate::error::{InvocationError, ServiceError};
use crate::logging::{log_motion_command, log_service_error};

/// Result of one motion command
pub enum Invocation {
    /// The command was blocking and finished with this status
    Completed(GoalStatus),
    /// The command was dispatched and is still running
    InFlight(Box<dyn ActionHandle>),
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed(status) => f.debug_tuple("Completed").field(status).finish(),
            Self::InFlight(_) => f.write_str("InFlight(..)"),
        }
    }
}

#[derive(Clone)]
pub struct ActionInvoker {
    motion: Arc<dyn MotionCommand>,
    services: Arc<dyn ServiceDirectory>,
}

impl ActionInvoker {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            motion: collaborators.motion.clone(),
            services: collaborators.services.clone(),
        }
    }

    /// Send `target` to `group` in the dispatcher's default mode
    pub async fn invoke(
        &self,
        group: &str,
        target: impl Into<MotionTarget>,
        blocking: bool,
    ) -> Result<Invocation, InvocationError> {
        self.invoke_with_mode(group, target.into(), blocking, None)
            .await
    }

    pub async fn invoke_with_mode(
        &self,
        group: &str,
        target: MotionTarget,
        blocking: bool,
        mode: Option<&str>,
    ) -> Result<Invocation, InvocationError> {
        let handle = self.send(group, &target, blocking, mode).await?;
        if !blocking {
            return Ok(Invocation::InFlight(handle));
        }
        let status = self.finish(group, &target, handle.as_ref(), None).await?;
        Ok(Invocation::Completed(status))
    }

    /// Blocking move that must end in `succeeded`
    pub async fn execute(
        &self,
        group: &str,
        target: impl Into<MotionTarget>,
    ) -> Result<GoalStatus, InvocationError> {
        let target = target.into();
        let handle = self.send(group, &target, true, None).await?;
        self.finish(group, &target, handle.as_ref(), None).await
    }

    /// Non-blocking move; the returned handle is owned by the caller for the rest of its execute call
    pub async fn dispatch(
        &self,
        group: &str,
        target: impl Into<MotionTarget>,
    ) -> Result<Box<dyn ActionHandle>, InvocationError> {
        self.dispatch_with_mode(group, target.into(), None).await
    }

    pub async fn dispatch_with_mode(
        &self,
        group: &str,
        target: MotionTarget,
        mode: Option<&str>,
    ) -> Result<Box<dyn ActionHandle>, InvocationError> {
        self.send(group, &target, false, mode).await
    }

    /// Wait for a previously dispatched action and require success
    pub async fn await_handle(
        &self,
        group: &str,
        handle: &dyn ActionHandle,
        timeout: Option<Duration>,
    ) -> Result<GoalStatus, InvocationError> {
        let target = MotionTarget::named("<dispatched>");
        self.finish(group, &target, handle, timeout).await
    }

    /// Wait for `service` to come up within `wait`, then issue `call`.
    ///
    /// Both the availability wait and the call itself fail fast; failures are
    /// logged with the service name before being returned.
    pub async fn call_service<T, F, Fut>(
        &self,
        service: &str,
        wait: Duration,
        call: F,
    ) -> crate::error::Result<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = crate::error::Result<T>> + Send,
        T: Send,
    {
        self.wait_for_service(service, wait).await?;

        debug!(service = %service, "calling service");
        call().await.map_err(|e| {
            log_service_error(service, "call", &e);
            e
        })
    }

    /// Availability check alone, for services probed before a polling phase
    pub async fn wait_for_service(&self, service: &str, wait: Duration) -> crate::error::Result<()> {
        self.services
            .wait_for_service(service, wait)
            .await
            .map_err(|e| {
                log_service_error(service, "wait_for_service", &e);
                e
            })
    }

    async fn send(
        &self,
        group: &str,
        target: &MotionTarget,
        blocking: bool,
        mode: Option<&str>,
    ) -> Result<Box<dyn ActionHandle>, InvocationError> {
        log_motion_command(group, target, blocking);
        self.motion
            .dispatch(group, target, mode)
            .await
            .map_err(|source| Self::failure(group, target, source))
    }

    async fn finish(
        &self,
        group: &str,
        target: &MotionTarget,
        handle: &dyn ActionHandle,
        timeout: Option<Duration>,
    ) -> Result<GoalStatus, InvocationError> {
        let status = handle
            .wait(timeout)
            .await
            .map_err(|source| Self::failure(group, target, source))?;
        Self::check_status(group, target, status)?;
        Ok(status)
    }

    fn check_status(
        group: &str,
        target: &MotionTarget,
        status: GoalStatus,
    ) -> Result<(), InvocationError> {
        if status == GoalStatus::Succeeded {
            return Ok(());
        }
        Err(Self::failure(
            group,
            target,
            ServiceError::ActionFailed {
                group: group.to_string(),
                status,
            },
        ))
    }

    fn failure(group: &str, target: &MotionTarget, source: ServiceError) -> InvocationError {
        error!(
            group = %group,
            target = %target,
            service = %source.service(),
            error = %source,
            "motion command failed"
        );
        InvocationError {
            group: group.to_string(),
            target: target.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeRobot, ScriptedHandle};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_blocking_command_returns_terminal_status() {
        let robot = FakeRobot::new();
        let invoker = ActionInvoker::new(&robot.collaborators());
        let result = invoker.invoke("torso", "home", true).await.unwrap();

        assert!(matches!(result, Invocation::Completed(GoalStatus::Succeeded)));
        assert_eq!(robot.motion.targets_for("torso"), vec![MotionTarget::named("home")]);
    }

    #[tokio::test]
    async fn test_non_blocking_command_returns_handle() {
        let robot = FakeRobot::new();
        robot
            .motion
            .queue_handle("arm", ScriptedHandle::with_states(vec![GoalStatus::Active]));
        let invoker = ActionInvoker::new(&robot.collaborators());

        let handle = invoker.dispatch("arm", "hold").await.unwrap();
        assert_eq!(handle.state().await.unwrap(), GoalStatus::Active);
    }

    #[tokio::test]
    async fn test_blocking_failure_status_is_an_error() {
        let robot = FakeRobot::new();
        robot
            .motion
            .queue_handle("sdh", ScriptedHandle::finishing(GoalStatus::Error));
        let invoker = ActionInvoker::new(&robot.collaborators());

        let err = invoker.execute("sdh", "cylopen").await.unwrap_err();
        assert_eq!(err.group, "sdh");
        assert_eq!(
            err.source,
            ServiceError::ActionFailed {
                group: "sdh".to_string(),
                status: GoalStatus::Error
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_command_fails_once_without_retry() {
        let robot = FakeRobot::new();
        robot.motion.fail_group("base");
        let invoker = ActionInvoker::new(&robot.collaborators());

        let err = invoker.invoke("base", "kitchen", true).await.unwrap_err();
        assert!(matches!(err.source, ServiceError::CallFailed { .. }));
        assert_eq!(robot.motion.dispatch_count("base"), 1);
    }

    #[tokio::test]
    async fn test_mode_is_forwarded_to_dispatcher() {
        let robot = FakeRobot::new();
        let invoker = ActionInvoker::new(&robot.collaborators());

        invoker
            .dispatch_with_mode("base", MotionTarget::named("kitchen"), Some("linear"))
            .await
            .unwrap();
        assert_eq!(robot.motion.records()[0].mode.as_deref(), Some("linear"));
    }

    #[tokio::test]
    async fn test_service_call_waits_for_availability() {
        let robot = FakeRobot::new();
        robot.services.make_unavailable("/tray/check_occupied");
        let invoker = ActionInvoker::new(&robot.collaborators());
        let called = AtomicBool::new(false);

        let result = invoker
            .call_service("/tray/check_occupied", Duration::from_secs(10), || async {
                called.store(true, Ordering::SeqCst);
                Ok(true)
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Unavailable { .. })));
        assert!(!called.load(Ordering::SeqCst));
        assert_eq!(
            robot.services.waits(),
            vec![("/tray/check_occupied".to_string(), Duration::from_secs(10))]
        );
    }

    #[tokio::test]
    async fn test_service_call_preserves_underlying_error() {
        let robot = FakeRobot::new();
        let invoker = ActionInvoker::new(&robot.collaborators());

        let result: crate::error::Result<()> = invoker
            .call_service("/mm/start", Duration::from_secs(3), || async {
                Err(ServiceError::call_failed("/mm/start", "controller busy"))
            })
            .await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "calling <</mm/start>> failed: controller busy"
        );
    }
}

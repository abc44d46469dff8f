//! # Deliver Object
//!
//! Hands the tray contents over to a person. The tray sensor is polled until the
//! tray is emptied or the delivery deadline passes. Without a tray sensor the
//! operator can confirm the hand-over manually.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::collaborators::{Collaborators, OccupancyCheck, OperatorPrompt};
use crate::config::MissionConfig;
use crate::constants::{groups, poses, services, speech};
use crate::error::{InvocationError, Result};
use crate::execution::{
    ActionInvoker, PollBudget, PollLoop, PollOutcome, PollSignal, PollTarget, PreemptSignal, Ticker,
};
use crate::logging::log_state_outcome;
use crate::state_machine::{DeliverOutcome, ExecutionContext, Outcome, TaskState};

/// Poll target resolving once the tray reports empty
struct TrayTarget {
    occupancy: Arc<dyn OccupancyCheck>,
}

#[async_trait]
impl PollTarget for TrayTarget {
    async fn poll(&mut self) -> Result<PollSignal> {
        let occupied = self.occupancy.is_occupied().await?;
        Ok(if occupied {
            PollSignal::Idle
        } else {
            PollSignal::Succeeded
        })
    }
}

pub struct DeliverObject {
    invoker: ActionInvoker,
    occupancy: Arc<dyn OccupancyCheck>,
    operator: Arc<dyn OperatorPrompt>,
    ticker: Arc<dyn Ticker>,
    preempt: PreemptSignal,
    budget: PollBudget,
    occupancy_wait: Duration,
    manual_fallback: bool,
}

impl DeliverObject {
    pub fn new(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self {
            invoker: ActionInvoker::new(collaborators),
            occupancy: collaborators.occupancy.clone(),
            operator: collaborators.operator.clone(),
            ticker: collaborators.ticker.clone(),
            preempt: PreemptSignal::new(),
            budget: config.delivery_budget(),
            occupancy_wait: config.timeouts.occupancy_service_wait(),
            manual_fallback: config.delivery.manual_confirmation_fallback,
        }
    }

    pub fn with_manual_fallback(mut self, enabled: bool) -> Self {
        self.manual_fallback = enabled;
        self
    }

    fn finish(&self, outcome: DeliverOutcome, details: &str) -> DeliverOutcome {
        log_state_outcome("deliver_object", outcome.label(), None, Some(details));
        outcome
    }

    /// Lower the tray and nod once the hand-over is done
    async fn conclude(&self) -> std::result::Result<(), InvocationError> {
        self.invoker.execute(groups::TRAY, poses::DOWN).await?;
        self.invoker.dispatch(groups::TORSO, poses::NOD).await?;
        Ok(())
    }

    async fn confirm_manually(&self) -> DeliverOutcome {
        if !self.operator.confirm(speech::MANUAL_CONFIRMATION).await {
            return self.finish(DeliverOutcome::Failed, "operator did not confirm");
        }
        match self.conclude().await {
            Ok(()) => self.finish(DeliverOutcome::Succeeded, "confirmed by operator"),
            Err(_) => self.finish(DeliverOutcome::Failed, "tray not lowered"),
        }
    }

    async fn visit(&self) -> DeliverOutcome {
        if self.invoker.dispatch(groups::TORSO, poses::NOD).await.is_err() {
            return self.finish(DeliverOutcome::Failed, "torso not moving");
        }

        let sensor_available = self
            .invoker
            .wait_for_service(services::TRAY_CHECK_OCCUPIED, self.occupancy_wait)
            .await
            .is_ok();

        if !sensor_available {
            if self.manual_fallback {
                warn!("tray sensor unavailable, asking the operator");
                return self.confirm_manually().await;
            }
            return self.finish(DeliverOutcome::Failed, "tray sensor unavailable");
        }

        info!("waiting for the tray to be emptied");
        let mut target = TrayTarget {
            occupancy: self.occupancy.clone(),
        };
        let mut poll = PollLoop::new(self.budget, self.ticker.clone(), self.preempt.clone());
        match poll.run(&mut target).await {
            PollOutcome::Succeeded => match self.conclude().await {
                Ok(()) => self.finish(DeliverOutcome::Succeeded, "tray emptied"),
                Err(_) => self.finish(DeliverOutcome::Failed, "tray not lowered"),
            },
            PollOutcome::TimedOut => self.finish(DeliverOutcome::Retry, "tray still occupied"),
            PollOutcome::Failed => self.finish(DeliverOutcome::Failed, "tray sensor failed"),
        }
    }
}

#[async_trait]
impl TaskState for DeliverObject {
    type Outcome = DeliverOutcome;

    fn name(&self) -> &str {
        "deliver_object"
    }

    fn preempt_signal(&self) -> Option<&PreemptSignal> {
        Some(&self.preempt)
    }

    async fn execute(&mut self, _ctx: &mut ExecutionContext) -> DeliverOutcome {
        let outcome = self.visit().await;
        // a request left over from any exit path must not abort the next visit
        if self.preempt.clear() {
            warn!("delivery preempted");
        }
        outcome
    }
}

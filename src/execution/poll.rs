//! # Poll Loop
//!
//! Cooperative polling primitive. Each tick checks the preemption flag, checks the
//! absolute deadline, evaluates the target once and, unless the target resolved,
//! sleeps one cadence on the injected [`Ticker`].
//!
//! Idle bookkeeping: a tick reporting [`PollSignal::Idle`] increments the idle
//! counter, a tick reporting [`PollSignal::Progress`] zeroes it. The loop times out
//! on the tick where the counter first exceeds `max_idle_ticks`, so a target that
//! never makes progress is evaluated exactly `max_idle_ticks + 1` times.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{PreemptSignal, Ticker};
use crate::error::Result;

/// What a single evaluation of the polled condition observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollSignal {
    /// Still in progress, nothing changed
    Idle,
    /// Still in progress, and the underlying action visibly moved
    Progress,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Condition evaluated by the poll loop
#[async_trait]
pub trait PollTarget: Send {
    /// Evaluate once. An error means the collaborator behind the condition is
    /// unavailable and ends the loop with [`PollOutcome::Failed`].
    async fn poll(&mut self) -> Result<PollSignal>;

    /// Best-effort stop of the underlying action after a timeout
    async fn cancel(&mut self) {}
}

/// Cadence and limits of one poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollBudget {
    pub cadence: Duration,
    /// Consecutive idle ticks tolerated before timing out
    pub max_idle_ticks: Option<u32>,
    /// Absolute limit measured from the start of the loop
    pub deadline: Option<Duration>,
}

impl PollBudget {
    pub fn idle_ticks(cadence: Duration, max_idle_ticks: u32) -> Self {
        Self {
            cadence,
            max_idle_ticks: Some(max_idle_ticks),
            deadline: None,
        }
    }

    pub fn deadline(cadence: Duration, deadline: Duration) -> Self {
        Self {
            cadence,
            max_idle_ticks: None,
            deadline: Some(deadline),
        }
    }
}

pub struct PollLoop {
    budget: PollBudget,
    ticker: Arc<dyn Ticker>,
    preempt: PreemptSignal,
    idle_ticks: u32,
    ticks: u32,
}

impl PollLoop {
    pub fn new(budget: PollBudget, ticker: Arc<dyn Ticker>, preempt: PreemptSignal) -> Self {
        Self {
            budget,
            ticker,
            preempt,
            idle_ticks: 0,
            ticks: 0,
        }
    }

    /// Consecutive idle ticks observed so far in the current or last run
    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    /// Evaluations performed in the current or last run
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn budget(&self) -> PollBudget {
        self.budget
    }

    pub async fn run<T>(&mut self, target: &mut T) -> PollOutcome
    where
        T: PollTarget + ?Sized,
    {
        self.idle_ticks = 0;
        self.ticks = 0;
        let started = self.ticker.elapsed();

        loop {
            if self.preempt.is_requested() {
                warn!(ticks = self.ticks, "poll loop preempted");
                return PollOutcome::Failed;
            }

            if let Some(deadline) = self.budget.deadline {
                let waited = self.ticker.elapsed().saturating_sub(started);
                if waited > deadline {
                    warn!(
                        waited_ms = waited.as_millis() as u64,
                        deadline_ms = deadline.as_millis() as u64,
                        "poll loop deadline expired"
                    );
                    target.cancel().await;
                    return PollOutcome::TimedOut;
                }
            }

            self.ticks += 1;
            match target.poll().await {
                Err(e) => {
                    error!(service = %e.service(), error = %e, "poll condition unavailable");
                    return PollOutcome::Failed;
                }
                Ok(PollSignal::Succeeded) => return PollOutcome::Succeeded,
                Ok(PollSignal::Failed) => return PollOutcome::Failed,
                Ok(PollSignal::Progress) => self.idle_ticks = 0,
                Ok(PollSignal::Idle) => {
                    self.idle_ticks += 1;
                    if let Some(max_idle) = self.budget.max_idle_ticks {
                        if self.idle_ticks > max_idle {
                            warn!(
                                idle_ticks = self.idle_ticks,
                                max_idle_ticks = max_idle,
                                "no progress observed, cancelling"
                            );
                            target.cancel().await;
                            return PollOutcome::TimedOut;
                        }
                    }
                }
            }

            debug!(
                tick = self.ticks,
                idle_ticks = self.idle_ticks,
                "poll tick complete"
            );
            self.ticker.sleep(self.budget.cadence).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::execution::VirtualTicker;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    /// Replays a fixed script, then repeats `fallback` forever
    struct Scripted {
        script: VecDeque<Result<PollSignal>>,
        fallback: PollSignal,
        polls: u32,
        cancelled: bool,
    }

    impl Scripted {
        fn new(script: Vec<Result<PollSignal>>, fallback: PollSignal) -> Self {
            Self {
                script: script.into(),
                fallback,
                polls: 0,
                cancelled: false,
            }
        }

        fn forever(signal: PollSignal) -> Self {
            Self::new(Vec::new(), signal)
        }
    }

    #[async_trait]
    impl PollTarget for Scripted {
        async fn poll(&mut self) -> Result<PollSignal> {
            self.polls += 1;
            self.script.pop_front().unwrap_or(Ok(self.fallback))
        }

        async fn cancel(&mut self) {
            self.cancelled = true;
        }
    }

    fn idle_loop(max_idle: u32) -> (PollLoop, Arc<VirtualTicker>, PreemptSignal) {
        let ticker = Arc::new(VirtualTicker::new());
        let preempt = PreemptSignal::new();
        let poll = PollLoop::new(
            PollBudget::idle_ticks(Duration::from_secs(1), max_idle),
            ticker.clone(),
            preempt.clone(),
        );
        (poll, ticker, preempt)
    }

    #[tokio::test]
    async fn test_perpetual_idle_times_out_after_max_plus_one_ticks() {
        let (mut poll, ticker, _) = idle_loop(10);
        let mut target = Scripted::forever(PollSignal::Idle);

        assert_eq!(poll.run(&mut target).await, PollOutcome::TimedOut);
        assert_eq!(target.polls, 11);
        assert_eq!(poll.ticks(), 11);
        assert_eq!(ticker.sleep_count(), 10);
        assert!(target.cancelled);
    }

    #[tokio::test]
    async fn test_progress_resets_idle_counter() {
        let (mut poll, _, _) = idle_loop(10);
        let mut script: Vec<Result<PollSignal>> = (0..10).map(|_| Ok(PollSignal::Idle)).collect();
        script.push(Ok(PollSignal::Progress));
        let mut target = Scripted::new(script, PollSignal::Idle);

        assert_eq!(poll.run(&mut target).await, PollOutcome::TimedOut);
        // 10 idle, 1 progress, then a fresh run of 11 idle ticks
        assert_eq!(target.polls, 22);
    }

    #[tokio::test]
    async fn test_condition_error_fails_without_counting_idle() {
        let (mut poll, _, _) = idle_loop(10);
        let mut target = Scripted::new(
            vec![
                Ok(PollSignal::Idle),
                Err(ServiceError::call_failed("/base_controller/is_moving", "boom")),
            ],
            PollSignal::Idle,
        );

        assert_eq!(poll.run(&mut target).await, PollOutcome::Failed);
        assert_eq!(poll.idle_ticks(), 1);
        assert!(!target.cancelled);
    }

    #[tokio::test]
    async fn test_resolution_signals_end_the_loop() {
        let (mut poll, ticker, _) = idle_loop(3);
        let mut target = Scripted::new(
            vec![Ok(PollSignal::Progress), Ok(PollSignal::Succeeded)],
            PollSignal::Idle,
        );
        assert_eq!(poll.run(&mut target).await, PollOutcome::Succeeded);
        assert_eq!(ticker.sleep_count(), 1);

        let mut target = Scripted::forever(PollSignal::Failed);
        assert_eq!(poll.run(&mut target).await, PollOutcome::Failed);
        assert_eq!(poll.ticks(), 1);
    }

    #[tokio::test]
    async fn test_preemption_is_observed_before_evaluating() {
        let (mut poll, _, preempt) = idle_loop(10);
        preempt.request();
        let mut target = Scripted::forever(PollSignal::Progress);

        assert_eq!(poll.run(&mut target).await, PollOutcome::Failed);
        assert_eq!(target.polls, 0);
    }

    #[tokio::test]
    async fn test_deadline_expires_on_virtual_time() {
        let ticker = Arc::new(VirtualTicker::new());
        let mut poll = PollLoop::new(
            PollBudget::deadline(Duration::from_secs(2), Duration::from_secs(20)),
            ticker.clone(),
            PreemptSignal::new(),
        );
        let mut target = Scripted::forever(PollSignal::Idle);

        assert_eq!(poll.run(&mut target).await, PollOutcome::TimedOut);
        // evaluated at t = 0, 2, ..., 20; expired when checked at t = 22
        assert_eq!(target.polls, 11);
        assert_eq!(ticker.elapsed(), Duration::from_secs(22));
    }

    proptest! {
        /// Property: the timeout tick is exactly max_idle_ticks + 1 after the last progress
        #[test]
        fn prop_idle_timeout_tick(max_idle in 0u32..15, leading_idle in 0u32..15) {
            let leading = leading_idle.min(max_idle);
            let mut script: Vec<Result<PollSignal>> =
                (0..leading).map(|_| Ok(PollSignal::Idle)).collect();
            script.push(Ok(PollSignal::Progress));

            let (mut poll, _, _) = idle_loop(max_idle);
            let mut target = Scripted::new(script, PollSignal::Idle);
            let outcome = tokio_test::block_on(poll.run(&mut target));

            prop_assert_eq!(outcome, PollOutcome::TimedOut);
            prop_assert_eq!(target.polls, leading + 1 + max_idle + 1);
        }
    }
}

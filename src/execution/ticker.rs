//! Tick sources for polling and settle delays.
//!
//! Production code sleeps on the tokio timer; tests inject [`VirtualTicker`],
//! which advances a virtual clock instead of waiting.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[async_trait]
pub trait Ticker: Send + Sync {
    async fn sleep(&self, duration: Duration);

    /// Time elapsed since the ticker was created
    fn elapsed(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct TokioTicker {
    origin: Instant,
}

impl TokioTicker {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioTicker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ticker for TokioTicker {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic ticker: `sleep` returns immediately after advancing the clock
#[derive(Debug, Default)]
pub struct VirtualTicker {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl VirtualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().len()
    }
}

#[async_trait]
impl Ticker for VirtualTicker {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        *self.now.lock() += duration;
        tokio::task::yield_now().await;
    }

    fn elapsed(&self) -> Duration {
        *self.now.lock()
    }
}

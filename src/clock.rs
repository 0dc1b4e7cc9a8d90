//! Injected time source
//!
//! Period-start math and reward expiry both depend on "now"; taking it from
//! a trait keeps the engine deterministic under test.

use chrono::{DateTime, Utc};

/// Time source injected into the engine.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time. The default for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

//! Source of the current instant.
//!
//! The store stamps `createdAt`/`updatedAt` and the ticker evaluates
//! countdowns through a [`Clock`] so both can be driven deterministically.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

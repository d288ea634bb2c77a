//! Engine clock — the single source of "now" for sync windows and
//! scheduling hints, so tests can pin time.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum SyncClock {
    System,
    Fixed(DateTime<Utc>),
}

impl SyncClock {
    pub fn system() -> Self {
        SyncClock::System
    }

    /// A clock frozen at `instant`. Test harnesses use this to make
    /// window bounds and scheduling hints deterministic.
    pub fn fixed(instant: DateTime<Utc>) -> Self {
        SyncClock::Fixed(instant)
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            SyncClock::System => Utc::now(),
            SyncClock::Fixed(instant) => *instant,
        }
    }
}

impl Default for SyncClock {
    fn default() -> Self {
        SyncClock::System
    }
}

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, NaiveDate};

/// Source of "now" for quota decisions.
///
/// Every enforcement operation takes a single reading and derives both the
/// attempt timestamp and the calendar-day quota key from it, so a midnight
/// rollover cannot split one attempt across two days.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Local>;

    /// Calendar day in local time, the key quota buckets are kept under.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock pinned to one instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Clock tests can move after handing it to an enforcer. Clones share the
/// same instant.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Local>>>);

impl ManualClock {
    pub fn new(instant: DateTime<Local>) -> Self {
        Self(Arc::new(Mutex::new(instant)))
    }

    pub fn set(&self, instant: DateTime<Local>) {
        *self.0.lock().unwrap() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}

//! Calendar-time collaborator.

use chrono::{Local, NaiveDateTime};

/// Source of local calendar time
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Host/RTC local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

//! Attendance and payroll rules. Everything here is storage-agnostic and
//! takes "now" as an argument; handlers pass local wall-clock time.

pub mod attendance;
pub mod payroll;

use chrono::{Local, NaiveDateTime};

/// Local wall-clock time, the clock attendance days are keyed on.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

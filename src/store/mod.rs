//! Storage seams for the attendance and payroll rules.
//!
//! The rules in `crate::service` only talk to these traits. `MySqlStore` is the
//! production implementation; the uniqueness of (employee, day) and
//! (employee, month, year) lives in the schema, and the conditional writes
//! below report a lost race as `false` / `None` instead of an error.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::HrmResult;
use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::employee::EmployeeSnapshot;
use crate::model::payroll::{PayrollDraft, PayrollRecord};

mod mysql;

#[cfg(test)]
pub mod memory;

pub use mysql::MySqlStore;

pub trait EmployeeDirectory {
    async fn find_employee(&self, employee_id: u64) -> HrmResult<Option<EmployeeSnapshot>>;

    async fn active_employee_ids(&self) -> HrmResult<Vec<u64>>;
}

pub trait AttendanceStore {
    async fn find_for_day(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> HrmResult<Option<AttendanceRecord>>;

    /// Writes `record.check_in` onto the (employee, day) row, creating it if
    /// missing. Returns `false` when the row already carried a check-in.
    async fn claim_check_in(&self, record: &AttendanceRecord) -> HrmResult<bool>;

    /// Writes `check_out` and `hours_worked` only onto a checked-in, not yet
    /// checked-out row. Returns `false` when no such row matched.
    async fn claim_check_out(&self, record: &AttendanceRecord) -> HrmResult<bool>;

    /// Insert or overwrite the row keyed by (employee_id, date).
    async fn upsert_entry(&self, entry: &AttendanceEntry) -> HrmResult<()>;

    /// Rows with `from <= date <= to`, oldest first.
    async fn find_in_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        status: Option<AttendanceStatus>,
    ) -> HrmResult<Vec<AttendanceRecord>>;
}

pub trait PayrollStore {
    async fn find_payroll(&self, payroll_id: u64) -> HrmResult<Option<PayrollRecord>>;

    async fn find_for_period(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> HrmResult<Option<PayrollRecord>>;

    /// Returns the new id, or `None` if a payroll for the same
    /// (employee, month, year) already exists.
    async fn insert_payroll(&self, draft: &PayrollDraft) -> HrmResult<Option<u64>>;

    /// Moves a pending payroll to paid. Returns `false` if the record is
    /// missing or not pending.
    async fn settle_payroll(&self, payroll_id: u64, paid_at: NaiveDateTime) -> HrmResult<bool>;
}

//! In-process store used by the service tests. It mirrors the schema's UNIQUE
//! keys so the conflict paths behave like MySQL.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use super::{AttendanceStore, EmployeeDirectory, PayrollStore};
use crate::error::{HrmError, HrmResult};
use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::employee::{EmployeeSnapshot, EmploymentStatus};
use crate::model::payroll::{PayrollDraft, PayrollRecord, PayrollStatus};

#[derive(Default)]
pub struct MemoryStore {
    employees: Mutex<BTreeMap<u64, EmployeeSnapshot>>,
    attendance: Mutex<BTreeMap<(u64, NaiveDate), AttendanceRecord>>,
    payroll: Mutex<BTreeMap<u64, PayrollRecord>>,
    /// Makes `find_for_period` miss, to exercise the insert-time conflict.
    hide_payrolls: AtomicBool,
    /// Lets another check-in land between the read and the claim, once.
    lose_check_in_race: AtomicBool,
    /// Employees whose payroll insert fails with a storage error.
    failing_payrolls: Mutex<BTreeSet<u64>>,
}

impl MemoryStore {
    pub fn with_employee(id: u64, first: &str, last: &str, salary: Decimal) -> Self {
        let store = Self::default();
        store.add_employee(id, first, last, salary);
        store
    }

    pub fn add_employee(&self, id: u64, first: &str, last: &str, salary: Decimal) {
        self.employees.lock().unwrap().insert(
            id,
            EmployeeSnapshot {
                id,
                first_name: first.to_string(),
                last_name: last.to_string(),
                salary,
                department_id: None,
                status: EmploymentStatus::Active,
            },
        );
    }

    pub fn hide_payrolls_from_lookup(&self) {
        self.hide_payrolls.store(true, Ordering::SeqCst);
    }

    pub fn lose_next_check_in_race(&self) {
        self.lose_check_in_race.store(true, Ordering::SeqCst);
    }

    pub fn fail_payroll_insert_for(&self, employee_id: u64) {
        self.failing_payrolls.lock().unwrap().insert(employee_id);
    }

    pub fn attendance_rows(&self) -> usize {
        self.attendance.lock().unwrap().len()
    }

    pub fn payroll_rows(&self) -> usize {
        self.payroll.lock().unwrap().len()
    }

    fn next_attendance_id(rows: &BTreeMap<(u64, NaiveDate), AttendanceRecord>) -> u64 {
        rows.values().map(|r| r.id).max().unwrap_or(0) + 1
    }
}

impl EmployeeDirectory for MemoryStore {
    async fn find_employee(&self, employee_id: u64) -> HrmResult<Option<EmployeeSnapshot>> {
        Ok(self.employees.lock().unwrap().get(&employee_id).cloned())
    }

    async fn active_employee_ids(&self) -> HrmResult<Vec<u64>> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.status == EmploymentStatus::Active)
            .map(|e| e.id)
            .collect())
    }
}

impl AttendanceStore for MemoryStore {
    async fn find_for_day(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> HrmResult<Option<AttendanceRecord>> {
        Ok(self
            .attendance
            .lock()
            .unwrap()
            .get(&(employee_id, day))
            .cloned())
    }

    async fn claim_check_in(&self, record: &AttendanceRecord) -> HrmResult<bool> {
        let mut rows = self.attendance.lock().unwrap();
        let key = (record.employee_id, record.date);
        if self.lose_check_in_race.swap(false, Ordering::SeqCst) {
            let id = Self::next_attendance_id(&rows);
            rows.insert(key, AttendanceRecord { id, ..record.clone() });
            return Ok(false);
        }
        match rows.get_mut(&key) {
            Some(existing) if existing.check_in.is_some() => Ok(false),
            Some(existing) => {
                existing.check_in = record.check_in;
                existing.check_out = None;
                existing.hours_worked = None;
                existing.status = record.status;
                Ok(true)
            }
            None => {
                let id = Self::next_attendance_id(&rows);
                rows.insert(key, AttendanceRecord { id, ..record.clone() });
                Ok(true)
            }
        }
    }

    async fn claim_check_out(&self, record: &AttendanceRecord) -> HrmResult<bool> {
        let mut rows = self.attendance.lock().unwrap();
        match rows.get_mut(&(record.employee_id, record.date)) {
            Some(existing) if existing.check_in.is_some() && existing.check_out.is_none() => {
                existing.check_out = record.check_out;
                existing.hours_worked = record.hours_worked;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_entry(&self, entry: &AttendanceEntry) -> HrmResult<()> {
        let mut rows = self.attendance.lock().unwrap();
        let key = (entry.employee_id, entry.date);
        let id = match rows.get(&key) {
            Some(existing) => existing.id,
            None => Self::next_attendance_id(&rows),
        };
        rows.insert(
            key,
            AttendanceRecord {
                id,
                employee_id: entry.employee_id,
                date: entry.date,
                check_in: entry.check_in,
                check_out: entry.check_out,
                hours_worked: entry.hours_worked,
                status: entry.status,
                notes: entry.notes.clone(),
            },
        );
        Ok(())
    }

    async fn find_in_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        status: Option<AttendanceStatus>,
    ) -> HrmResult<Vec<AttendanceRecord>> {
        Ok(self
            .attendance
            .lock()
            .unwrap()
            .range((employee_id, from)..=(employee_id, to))
            .map(|(_, r)| r)
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect())
    }
}

impl PayrollStore for MemoryStore {
    async fn find_payroll(&self, payroll_id: u64) -> HrmResult<Option<PayrollRecord>> {
        Ok(self.payroll.lock().unwrap().get(&payroll_id).cloned())
    }

    async fn find_for_period(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> HrmResult<Option<PayrollRecord>> {
        if self.hide_payrolls.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .payroll
            .lock()
            .unwrap()
            .values()
            .find(|p| p.employee_id == employee_id && p.month == month && p.year == year)
            .cloned())
    }

    async fn insert_payroll(&self, draft: &PayrollDraft) -> HrmResult<Option<u64>> {
        if self.failing_payrolls.lock().unwrap().contains(&draft.employee_id) {
            return Err(HrmError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut rows = self.payroll.lock().unwrap();
        let taken = rows.values().any(|p| {
            p.employee_id == draft.employee_id && p.month == draft.month && p.year == draft.year
        });
        if taken {
            return Ok(None);
        }
        let id = rows.keys().max().copied().unwrap_or(0) + 1;
        rows.insert(id, draft.clone().into_record(id));
        Ok(Some(id))
    }

    async fn settle_payroll(&self, payroll_id: u64, paid_at: NaiveDateTime) -> HrmResult<bool> {
        let mut rows = self.payroll.lock().unwrap();
        match rows.get_mut(&payroll_id) {
            Some(p) if p.status == PayrollStatus::Pending => {
                p.status = PayrollStatus::Paid;
                p.paid_date = Some(paid_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

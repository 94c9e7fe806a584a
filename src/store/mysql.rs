use chrono::{NaiveDate, NaiveDateTime};
use sqlx::MySqlPool;
use tracing::debug;

use super::{AttendanceStore, EmployeeDirectory, PayrollStore};
use crate::error::{HrmResult, is_duplicate_key};
use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use crate::model::employee::EmployeeSnapshot;
use crate::model::payroll::{PayrollDraft, PayrollRecord, PayrollStatus};
use crate::utils::employee_cache::EmployeeCache;

const ATTENDANCE_COLUMNS: &str =
    "id, employee_id, date, check_in, check_out, hours_worked, status, notes";

const PAYROLL_COLUMNS: &str = "id, employee_id, month, year, basic_salary, allowances, \
     deductions, net_salary, working_days, status, paid_date";

#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
    employees: EmployeeCache,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, employees: EmployeeCache) -> Self {
        Self { pool, employees }
    }
}

impl EmployeeDirectory for MySqlStore {
    async fn find_employee(&self, employee_id: u64) -> HrmResult<Option<EmployeeSnapshot>> {
        if let Some(hit) = self.employees.get(employee_id).await {
            return Ok(Some(hit));
        }

        let found = sqlx::query_as::<_, EmployeeSnapshot>(
            r#"
            SELECT id, first_name, last_name, salary, department_id, status
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(snapshot) = &found {
            debug!(employee_id, "Employee cache miss, filled from database");
            self.employees.insert(snapshot.clone()).await;
        }

        Ok(found)
    }

    async fn active_employee_ids(&self) -> HrmResult<Vec<u64>> {
        let ids = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM employees WHERE status = 'active' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

impl AttendanceStore for MySqlStore {
    async fn find_for_day(
        &self,
        employee_id: u64,
        day: NaiveDate,
    ) -> HrmResult<Option<AttendanceRecord>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE employee_id = ? AND date = ?"
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(employee_id)
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn claim_check_in(&self, record: &AttendanceRecord) -> HrmResult<bool> {
        // A row may exist without a check-in (absence entered by HR). Any
        // check-out on it is cleared so the day reopens.
        let updated = sqlx::query(
            r#"
            UPDATE attendance
            SET check_in = ?, check_out = NULL, hours_worked = NULL, status = ?
            WHERE employee_id = ? AND date = ? AND check_in IS NULL
            "#,
        )
        .bind(record.check_in)
        .bind(record.status.as_str())
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(true);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, check_in, status)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.check_in)
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn claim_check_out(&self, record: &AttendanceRecord) -> HrmResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, hours_worked = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in IS NOT NULL
            AND check_out IS NULL
            "#,
        )
        .bind(record.check_out)
        .bind(record.hours_worked)
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn upsert_entry(&self, entry: &AttendanceEntry) -> HrmResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance
                (employee_id, date, check_in, check_out, hours_worked, status, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                check_in = VALUES(check_in),
                check_out = VALUES(check_out),
                hours_worked = VALUES(hours_worked),
                status = VALUES(status),
                notes = VALUES(notes)
            "#,
        )
        .bind(entry.employee_id)
        .bind(entry.date)
        .bind(entry.check_in)
        .bind(entry.check_out)
        .bind(entry.hours_worked)
        .bind(entry.status.as_str())
        .bind(entry.notes.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_in_range(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        status: Option<AttendanceStatus>,
    ) -> HrmResult<Vec<AttendanceRecord>> {
        let status_clause = if status.is_some() { " AND status = ?" } else { "" };
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance \
             WHERE employee_id = ? AND date BETWEEN ? AND ?{status_clause} \
             ORDER BY date"
        );

        let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(to);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }

        Ok(query.fetch_all(&self.pool).await?)
    }
}

impl PayrollStore for MySqlStore {
    async fn find_payroll(&self, payroll_id: u64) -> HrmResult<Option<PayrollRecord>> {
        let sql = format!("SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = ?");
        let record = sqlx::query_as::<_, PayrollRecord>(&sql)
            .bind(payroll_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn find_for_period(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> HrmResult<Option<PayrollRecord>> {
        let sql = format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll WHERE employee_id = ? AND month = ? AND year = ?"
        );
        let record = sqlx::query_as::<_, PayrollRecord>(&sql)
            .bind(employee_id)
            .bind(month)
            .bind(year)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn insert_payroll(&self, draft: &PayrollDraft) -> HrmResult<Option<u64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO payroll
                (employee_id, month, year, basic_salary, allowances, deductions,
                 net_salary, working_days, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(draft.employee_id)
        .bind(draft.month)
        .bind(draft.year)
        .bind(draft.basic_salary)
        .bind(draft.allowances)
        .bind(draft.deductions)
        .bind(draft.net_salary)
        .bind(draft.working_days)
        .bind(PayrollStatus::Pending.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_id())),
            Err(e) if is_duplicate_key(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn settle_payroll(&self, payroll_id: u64, paid_at: NaiveDateTime) -> HrmResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payroll
            SET status = ?, paid_date = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(PayrollStatus::Paid.as_str())
        .bind(paid_at)
        .bind(payroll_id)
        .bind(PayrollStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

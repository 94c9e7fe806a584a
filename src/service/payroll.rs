use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::{HrmError, HrmResult};
use crate::model::attendance::AttendanceStatus;
use crate::model::employee::EmployeeSnapshot;
use crate::model::payroll::{PayrollDraft, PayrollRecord};
use crate::store::{AttendanceStore, EmployeeDirectory, PayrollStore};

pub const MIN_PAYROLL_YEAR: i32 = 2000;
pub const MAX_PAYROLL_YEAR: i32 = 9999;

/// Inclusive calendar span of one month: from 00:00:00.000 on the first day
/// to 23:59:59.999 on the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub month: u32,
    pub year: i32,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

impl MonthWindow {
    pub fn new(month: u32, year: i32) -> HrmResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(HrmError::Validation(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        if !(MIN_PAYROLL_YEAR..=MAX_PAYROLL_YEAR).contains(&year) {
            return Err(HrmError::Validation(format!(
                "year must be between {MIN_PAYROLL_YEAR} and {MAX_PAYROLL_YEAR}, got {year}"
            )));
        }

        let invalid = || HrmError::Validation(format!("invalid month {month}/{year}"));
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let last_day = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(invalid)?;

        Ok(Self {
            month,
            year,
            first_day,
            last_day,
        })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.first_day.and_time(NaiveTime::MIN)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.last_day.and_time(NaiveTime::MIN) + Duration::milliseconds(86_399_999)
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start() <= at && at <= self.end()
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.contains(day.and_time(NaiveTime::MIN))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayBreakdown {
    pub basic_salary: Decimal,
    pub allowances: Decimal,
    pub deductions: Decimal,
    pub net_salary: Decimal,
}

fn money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Allowances are 10% and deductions 5% of the basic salary.
pub fn pay_breakdown(basic_salary: Decimal) -> PayBreakdown {
    let allowances = money(basic_salary * Decimal::new(10, 2));
    let deductions = money(basic_salary * Decimal::new(5, 2));

    PayBreakdown {
        basic_salary,
        allowances,
        deductions,
        net_salary: basic_salary + allowances - deductions,
    }
}

pub fn draft_payroll(
    employee: &EmployeeSnapshot,
    window: &MonthWindow,
    working_days: u32,
) -> PayrollDraft {
    let pay = pay_breakdown(employee.salary);
    PayrollDraft {
        employee_id: employee.id,
        month: window.month,
        year: window.year,
        basic_salary: pay.basic_salary,
        allowances: pay.allowances,
        deductions: pay.deductions,
        net_salary: pay.net_salary,
        working_days,
    }
}

fn duplicate(employee: &EmployeeSnapshot, window: &MonthWindow) -> HrmError {
    HrmError::DuplicatePayroll {
        employee_name: employee.display_name(),
        month: window.month,
        year: window.year,
    }
}

/// Builds and stores the payroll of one employee for one month.
#[instrument(skip(store))]
pub async fn generate_payroll<S>(
    store: &S,
    employee_id: u64,
    month: u32,
    year: i32,
) -> HrmResult<PayrollRecord>
where
    S: EmployeeDirectory + AttendanceStore + PayrollStore,
{
    let window = MonthWindow::new(month, year)?;

    let employee = store
        .find_employee(employee_id)
        .await?
        .ok_or(HrmError::EmployeeNotFound(employee_id))?;

    if store
        .find_for_period(employee_id, month, year)
        .await?
        .is_some()
    {
        return Err(duplicate(&employee, &window));
    }

    let present = store
        .find_in_range(
            employee_id,
            window.first_day,
            window.last_day,
            Some(AttendanceStatus::Present),
        )
        .await?;
    let working_days = present
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present && window.contains_day(r.date))
        .count() as u32;

    let draft = draft_payroll(&employee, &window, working_days);

    // The UNIQUE key settles a race with a concurrent generation.
    let payroll_id = store
        .insert_payroll(&draft)
        .await?
        .ok_or_else(|| duplicate(&employee, &window))?;

    info!(
        payroll_id,
        working_days,
        net_salary = %draft.net_salary,
        "Payroll generated"
    );

    Ok(draft.into_record(payroll_id))
}

/// An employee the batch could not generate a payroll for.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchFailure {
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(example = "EMPLOYEE_NOT_FOUND")]
    pub code: String,
    pub error: String,
}

/// Result of generating a month for every active employee. Each employee is
/// its own unit of work, so one failure never hides what was created.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchOutcome {
    pub created: Vec<PayrollRecord>,
    /// Employees that already had a payroll for the month
    pub skipped: Vec<u64>,
    pub failed: Vec<BatchFailure>,
}

pub async fn generate_monthly_batch<S>(store: &S, month: u32, year: i32) -> HrmResult<BatchOutcome>
where
    S: EmployeeDirectory + AttendanceStore + PayrollStore,
{
    MonthWindow::new(month, year)?;

    let mut outcome = BatchOutcome {
        created: Vec::new(),
        skipped: Vec::new(),
        failed: Vec::new(),
    };

    for employee_id in store.active_employee_ids().await? {
        match generate_payroll(store, employee_id, month, year).await {
            Ok(record) => outcome.created.push(record),
            Err(HrmError::DuplicatePayroll { .. }) => outcome.skipped.push(employee_id),
            Err(e) => {
                warn!(employee_id, error = %e, "Batch payroll generation failed for employee");
                outcome.failed.push(BatchFailure {
                    employee_id,
                    code: e.code().to_string(),
                    error: e.public_message(),
                });
            }
        }
    }

    info!(
        month,
        year,
        created = outcome.created.len(),
        skipped = outcome.skipped.len(),
        failed = outcome.failed.len(),
        "Monthly payroll batch finished"
    );
    Ok(outcome)
}

/// `pending -> paid`. A paid record is never re-stamped.
pub async fn mark_paid<S: PayrollStore>(
    store: &S,
    payroll_id: u64,
    now: NaiveDateTime,
) -> HrmResult<PayrollRecord> {
    if !store.settle_payroll(payroll_id, now).await? {
        return match store.find_payroll(payroll_id).await? {
            Some(_) => Err(HrmError::AlreadyPaid(payroll_id)),
            None => Err(HrmError::not_found("Payroll", payroll_id)),
        };
    }

    info!(payroll_id, "Payroll marked paid");

    store
        .find_payroll(payroll_id)
        .await?
        .ok_or(HrmError::not_found("Payroll", payroll_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use crate::model::attendance::AttendanceEntry;
    use crate::model::payroll::PayrollStatus;
    use crate::store::memory::MemoryStore;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn mark(store: &MemoryStore, employee_id: u64, day: NaiveDate, status: AttendanceStatus) {
        store
            .upsert_entry(&AttendanceEntry {
                employee_id,
                date: day,
                check_in: None,
                check_out: None,
                hours_worked: None,
                status,
                notes: None,
            })
            .await
            .unwrap();
    }

    #[test]
    fn five_thousand_breaks_down_as_documented() {
        let pay = pay_breakdown(dec("5000"));
        assert_eq!(pay.allowances, dec("500"));
        assert_eq!(pay.deductions, dec("250"));
        assert_eq!(pay.net_salary, dec("5250"));
    }

    #[test]
    fn amounts_round_to_cents() {
        let pay = pay_breakdown(dec("1234.57"));
        assert_eq!(pay.allowances, dec("123.46"));
        assert_eq!(pay.deductions, dec("61.73"));
        assert_eq!(pay.net_salary, dec("1296.30"));
    }

    #[test]
    fn window_covers_whole_month() {
        let feb = MonthWindow::new(2, 2024).unwrap();
        assert_eq!(feb.last_day, date(2024, 2, 29));
        assert_eq!(feb.last_day.day(), 29);
        assert_eq!(feb.start(), date(2024, 2, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(
            feb.end(),
            date(2024, 2, 29).and_hms_milli_opt(23, 59, 59, 999).unwrap()
        );

        let dec_window = MonthWindow::new(12, 2025).unwrap();
        assert_eq!(dec_window.last_day, date(2025, 12, 31));
        assert!(dec_window.contains_day(date(2025, 12, 1)));
        assert!(dec_window.contains_day(date(2025, 12, 31)));
        assert!(!dec_window.contains_day(date(2026, 1, 1)));
        assert!(!dec_window.contains_day(date(2025, 11, 30)));
    }

    #[test]
    fn window_rejects_bad_periods() {
        assert!(matches!(MonthWindow::new(0, 2026), Err(HrmError::Validation(_))));
        assert!(matches!(MonthWindow::new(13, 2026), Err(HrmError::Validation(_))));
        assert!(matches!(MonthWindow::new(6, 1999), Err(HrmError::Validation(_))));
    }

    #[actix_web::test]
    async fn working_days_count_present_rows_inside_the_month() {
        let store = MemoryStore::with_employee(1, "Rafi", "Hasan", dec("5000"));
        mark(&store, 1, date(2026, 2, 28), AttendanceStatus::Present).await;
        mark(&store, 1, date(2026, 3, 1), AttendanceStatus::Present).await;
        mark(&store, 1, date(2026, 3, 2), AttendanceStatus::Late).await;
        mark(&store, 1, date(2026, 3, 3), AttendanceStatus::Absent).await;
        mark(&store, 1, date(2026, 3, 4), AttendanceStatus::HalfDay).await;
        mark(&store, 1, date(2026, 3, 17), AttendanceStatus::Present).await;
        mark(&store, 1, date(2026, 3, 31), AttendanceStatus::Present).await;
        mark(&store, 1, date(2026, 4, 1), AttendanceStatus::Present).await;

        let payroll = generate_payroll(&store, 1, 3, 2026).await.unwrap();

        assert_eq!(payroll.working_days, 3);
        assert_eq!(payroll.basic_salary, dec("5000"));
        assert_eq!(payroll.allowances, dec("500"));
        assert_eq!(payroll.deductions, dec("250"));
        assert_eq!(payroll.net_salary, dec("5250"));
        assert_eq!(payroll.status, PayrollStatus::Pending);
        assert_eq!(payroll.paid_date, None);
    }

    #[actix_web::test]
    async fn second_generation_for_same_month_is_a_duplicate() {
        let store = MemoryStore::with_employee(1, "Rafi", "Hasan", dec("5000"));
        generate_payroll(&store, 1, 3, 2026).await.unwrap();

        let again = generate_payroll(&store, 1, 3, 2026).await;

        match again {
            Err(HrmError::DuplicatePayroll { employee_name, month, year }) => {
                assert_eq!(employee_name, "Rafi Hasan");
                assert_eq!((month, year), (3, 2026));
            }
            other => panic!("expected duplicate payroll, got {other:?}"),
        }
        assert_eq!(store.payroll_rows(), 1);
    }

    #[actix_web::test]
    async fn lost_insert_race_reports_duplicate() {
        let store = MemoryStore::with_employee(1, "Rafi", "Hasan", dec("5000"));
        store.hide_payrolls_from_lookup();
        generate_payroll(&store, 1, 3, 2026).await.unwrap();

        let again = generate_payroll(&store, 1, 3, 2026).await;

        assert!(matches!(again, Err(HrmError::DuplicatePayroll { .. })));
        assert_eq!(store.payroll_rows(), 1);
    }

    #[actix_web::test]
    async fn unknown_employee_is_reported() {
        let store = MemoryStore::default();
        let result = generate_payroll(&store, 42, 3, 2026).await;
        assert!(matches!(result, Err(HrmError::EmployeeNotFound(42))));
    }

    #[actix_web::test]
    async fn invalid_month_is_checked_before_lookup() {
        let store = MemoryStore::default();
        let result = generate_payroll(&store, 42, 13, 2026).await;
        assert!(matches!(result, Err(HrmError::Validation(_))));
    }

    #[actix_web::test]
    async fn mark_paid_is_one_way() {
        let store = MemoryStore::with_employee(1, "Rafi", "Hasan", dec("5000"));
        let payroll = generate_payroll(&store, 1, 3, 2026).await.unwrap();
        let paid_at = date(2026, 4, 1).and_hms_opt(10, 0, 0).unwrap();

        let paid = mark_paid(&store, payroll.id, paid_at).await.unwrap();
        assert_eq!(paid.status, PayrollStatus::Paid);
        assert_eq!(paid.paid_date, Some(paid_at));

        let later = date(2026, 4, 2).and_hms_opt(10, 0, 0).unwrap();
        let again = mark_paid(&store, payroll.id, later).await;
        assert!(matches!(again, Err(HrmError::AlreadyPaid(id)) if id == payroll.id));

        let stored = store.find_payroll(payroll.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PayrollStatus::Paid);
        assert_eq!(stored.paid_date, Some(paid_at));
    }

    #[actix_web::test]
    async fn mark_paid_on_missing_record_is_not_found() {
        let store = MemoryStore::default();
        let now = date(2026, 4, 1).and_hms_opt(10, 0, 0).unwrap();
        let result = mark_paid(&store, 77, now).await;
        assert!(matches!(
            result,
            Err(HrmError::RecordNotFound { entity: "Payroll", id: 77 })
        ));
    }

    #[actix_web::test]
    async fn batch_skips_employees_already_paid_for() {
        let store = MemoryStore::with_employee(1, "Rafi", "Hasan", dec("5000"));
        store.add_employee(2, "Nadia", "Islam", dec("7000"));
        generate_payroll(&store, 1, 3, 2026).await.unwrap();

        let outcome = generate_monthly_batch(&store, 3, 2026).await.unwrap();

        assert_eq!(outcome.skipped, vec![1]);
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].employee_id, 2);
        assert_eq!(outcome.created[0].net_salary, dec("7350"));
    }

    #[actix_web::test]
    async fn batch_keeps_going_past_a_failing_employee() {
        let store = MemoryStore::with_employee(1, "Rafi", "Hasan", dec("5000"));
        store.add_employee(2, "Nadia", "Islam", dec("7000"));
        store.add_employee(3, "Tanvir", "Ahmed", dec("6000"));
        store.fail_payroll_insert_for(2);

        let outcome = generate_monthly_batch(&store, 3, 2026).await.unwrap();

        let created: Vec<u64> = outcome.created.iter().map(|p| p.employee_id).collect();
        assert_eq!(created, vec![1, 3]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].employee_id, 2);
        assert_eq!(outcome.failed[0].code, "INTERNAL_ERROR");
        assert_eq!(outcome.failed[0].error, "Internal Server Error");
        assert_eq!(store.payroll_rows(), 2);
    }
}

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

/// `Pending` moves to `Paid` exactly once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayrollStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 7,
        "employee_id": 1001,
        "month": 1,
        "year": 2026,
        "basic_salary": "5000.00",
        "allowances": "500.00",
        "deductions": "250.00",
        "net_salary": "5250.00",
        "working_days": 21,
        "status": "pending",
        "paid_date": null
    })
)]
pub struct PayrollRecord {
    pub id: u64,
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    #[schema(value_type = String)]
    pub basic_salary: Decimal,
    #[schema(value_type = String)]
    pub allowances: Decimal,
    #[schema(value_type = String)]
    pub deductions: Decimal,
    #[schema(value_type = String)]
    pub net_salary: Decimal,
    pub working_days: u32,
    #[sqlx(try_from = "String")]
    pub status: PayrollStatus,
    pub paid_date: Option<NaiveDateTime>,
}

/// A computed payroll that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollDraft {
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    pub basic_salary: Decimal,
    pub allowances: Decimal,
    pub deductions: Decimal,
    pub net_salary: Decimal,
    pub working_days: u32,
}

impl PayrollDraft {
    pub fn into_record(self, id: u64) -> PayrollRecord {
        PayrollRecord {
            id,
            employee_id: self.employee_id,
            month: self.month,
            year: self.year,
            basic_salary: self.basic_salary,
            allowances: self.allowances,
            deductions: self.deductions,
            net_salary: self.net_salary,
            working_days: self.working_days,
            status: PayrollStatus::Pending,
            paid_date: None,
        }
    }
}

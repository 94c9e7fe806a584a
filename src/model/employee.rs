use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmploymentStatus {
    Active,
    Inactive,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+8801712345678",
        "department_id": 10,
        "position": "Backend Engineer",
        "hire_date": "2024-01-01",
        "salary": "5000.00",
        "status": "active"
    })
)]
pub struct Employee {
    pub id: u64,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub department_id: Option<u64>,
    pub position: Option<String>,
    pub hire_date: NaiveDate,
    #[schema(value_type = String, example = "5000.00")]
    pub salary: Decimal,
    #[sqlx(try_from = "String")]
    pub status: EmploymentStatus,
}

/// The slice of an employee the payroll and attendance rules need.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EmployeeSnapshot {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub salary: Decimal,
    pub department_id: Option<u64>,
    #[sqlx(try_from = "String")]
    pub status: EmploymentStatus,
}

impl EmployeeSnapshot {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

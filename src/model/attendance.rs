use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
}

/// One row per employee per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, example = "8.25")]
    pub hours_worked: Option<Decimal>,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

impl AttendanceRecord {
    pub fn is_checked_in(&self) -> bool {
        self.check_in.is_some()
    }

    pub fn is_checked_out(&self) -> bool {
        self.check_out.is_some()
    }
}

/// Administrative write: every field is taken as given and upserted on
/// (employee_id, date).
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceEntry {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub hours_worked: Option<Decimal>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

/// Per-status day counts for one month window.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub employee_id: u64,
    pub month: u32,
    pub year: i32,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub half_day: u32,
    #[schema(value_type = String, example = "168.50")]
    pub total_hours: Decimal,
}

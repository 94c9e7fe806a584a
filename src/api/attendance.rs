use crate::{
    auth::auth::AuthUser,
    error::HrmError,
    model::attendance::{AttendanceEntry, AttendanceStatus},
    service::{attendance, local_now},
    store::MySqlStore,
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    /// Defaults to the caller's own employee record
    pub employee_id: Option<u64>,
    #[schema(example = "2026-03-01")]
    pub from: NaiveDate,
    #[schema(example = "2026-03-31")]
    pub to: NaiveDate,
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    pub employee_id: Option<u64>,
    #[schema(example = 3)]
    pub month: u32,
    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordAttendance {
    #[schema(example = 7)]
    pub employee_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-03-02T09:00:00", value_type = Option<String>)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-03-02T17:30:00", value_type = Option<String>)]
    pub check_out: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

impl From<RecordAttendance> for AttendanceEntry {
    fn from(body: RecordAttendance) -> Self {
        AttendanceEntry {
            employee_id: body.employee_id,
            date: body.date,
            check_in: body.check_in,
            check_out: body.check_out,
            hours_worked: None,
            status: body.status,
            notes: body.notes,
        }
    }
}

/// Check in for today
#[utoipa::path(
    post,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked in", body = AttendanceRecord),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "error": "Already checked in today",
            "code": "ALREADY_CHECKED_IN"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
) -> Result<HttpResponse, HrmError> {
    let employee_id = auth.own_employee_id()?;
    let record = attendance::check_in(store.get_ref(), employee_id, local_now()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Check out for today
#[utoipa::path(
    put,
    path = "/api/attendance",
    responses(
        (status = 200, description = "Checked out, hours worked derived", body = AttendanceRecord),
        (status = 400, description = "Not checked in, or already checked out", body = Object, example = json!({
            "error": "Already checked out today",
            "code": "ALREADY_CHECKED_OUT"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
) -> Result<HttpResponse, HrmError> {
    let employee_id = auth.own_employee_id()?;
    let record = attendance::check_out(store.get_ref(), employee_id, local_now()).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Attendance of one employee over a date range
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Records, oldest first", body = [AttendanceRecord]),
        (status = 400, description = "`to` is before `from`"),
        (status = 403, description = "Not allowed to access this employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, HrmError> {
    let employee_id = auth.scope_employee(query.employee_id)?;
    let records = attendance::list_attendance(
        store.get_ref(),
        employee_id,
        query.from,
        query.to,
        query.status,
    )
    .await?;
    Ok(HttpResponse::Ok().json(records))
}

/// Per-status counts and total hours for a month
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Monthly summary", body = AttendanceSummary),
        (status = 400, description = "Invalid month or year"),
        (status = 403, description = "Not allowed to access this employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_summary(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    query: web::Query<SummaryQuery>,
) -> Result<HttpResponse, HrmError> {
    let employee_id = auth.scope_employee(query.employee_id)?;
    let summary =
        attendance::monthly_summary(store.get_ref(), employee_id, query.month, query.year).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Enter or correct a day's attendance (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/attendance/record",
    request_body = RecordAttendance,
    responses(
        (status = 200, description = "Record saved", body = AttendanceRecord),
        (status = 400, description = "check_out is not after check_in, or a timestamp is off the entry's day"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn record_attendance(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    body: web::Json<RecordAttendance>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;
    let record = attendance::record_entry(store.get_ref(), body.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(record))
}

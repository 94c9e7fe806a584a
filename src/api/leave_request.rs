use crate::auth::auth::AuthUser;
use crate::error::{HrmError, is_foreign_key_violation};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::utils::db_utils::{Filters, Page, SqlValue, bind_all};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const LEAVE_COLUMNS: &str =
    "id, employee_id, start_date, end_date, leave_type, status, reason, reviewed_by, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "sick")]
    pub leave_type: LeaveType, // enum ensures Swagger dropdown
    #[schema(example = "Flu")]
    pub reason: Option<String>,
}

impl CreateLeave {
    fn validate(&self) -> Result<(), HrmError> {
        if self.end_date < self.start_date {
            return Err(HrmError::InvalidRange(
                "end_date cannot be before start_date".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID (HR/Admin only)
    #[schema(example = 123)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 10)]
    pub per_page: Option<u32>,
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> Result<LeaveRequest, HrmError> {
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
    sqlx::query_as::<_, LeaveRequest>(&sql)
        .bind(leave_id)
        .fetch_optional(pool)
        .await?
        .ok_or(HrmError::not_found("Leave request", leave_id))
}

/// `pending -> approved | rejected`, recorded with the reviewer.
async fn review(
    auth: &AuthUser,
    pool: &MySqlPool,
    leave_id: u64,
    decision: LeaveStatus,
) -> Result<LeaveRequest, HrmError> {
    auth.require_hr_or_admin()?;

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, reviewed_by = ?
        WHERE id = ?
        AND status = ?
        "#,
    )
    .bind(decision.as_str())
    .bind(auth.user_id)
    .bind(leave_id)
    .bind(LeaveStatus::Pending.as_str())
    .execute(pool)
    .await?;

    let leave = fetch_leave(pool, leave_id).await?;

    if result.rows_affected() == 0 {
        return Err(HrmError::Conflict(format!(
            "Leave request {leave_id} is already {}",
            leave.status
        )));
    }

    info!(leave_id, reviewed_by = auth.user_id, status = %decision, "Leave reviewed");
    Ok(leave)
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "end_date before start_date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, HrmError> {
    let employee_id = auth.own_employee_id()?;
    payload.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, start_date, end_date, leave_type, status, reason)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.leave_type.as_str())
    .bind(LeaveStatus::Pending.as_str())
    .bind(payload.reason.as_deref())
    .execute(pool.get_ref())
    .await;

    let leave_id = match result {
        Ok(done) => done.last_insert_id(),
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(HrmError::EmployeeNotFound(employee_id));
        }
        Err(e) => return Err(e.into()),
    };

    let leave = fetch_leave(pool.get_ref(), leave_id).await?;
    info!(leave_id, employee_id, leave_type = %leave.leave_type, days = leave.days(), "Leave requested");
    Ok(HttpResponse::Created().json(leave))
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed", body = Object, example = json!({
            "error": "Leave request 4 is already rejected",
            "code": "CONFLICT"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    let leave = review(&auth, pool.get_ref(), path.into_inner(), LeaveStatus::Approved).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    let leave = review(&auth, pool.get_ref(), path.into_inner(), LeaveStatus::Rejected).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 403, description = "Not allowed to access this employee"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "error": "Leave request 4 not found",
            "code": "NOT_FOUND"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    let leave = fetch_leave(pool.get_ref(), path.into_inner()).await?;
    auth.require_access_to(leave.employee_id)?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, HrmError> {
    let page = Page::new(query.page, query.per_page, 10, 100);

    // employees only ever see their own requests
    let employee_id = if auth.role.is_manager() {
        query.employee_id
    } else {
        Some(auth.own_employee_id()?)
    };

    let mut filters = Filters::default();
    if let Some(employee_id) = employee_id {
        filters.push("employee_id = ?", SqlValue::U64(employee_id));
    }
    if let Some(status) = query.status {
        filters.push("status = ?", SqlValue::String(status.as_str().to_string()));
    }
    let where_clause = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM leave_requests {where_clause}");
    let total = bind_all!(sqlx::query_scalar::<_, i64>(&count_sql), &filters.values)
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        r#"
        SELECT {LEAVE_COLUMNS}
        FROM leave_requests
        {where_clause}
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#
    );

    let leaves = bind_all!(sqlx::query_as::<_, LeaveRequest>(&data_sql), &filters.values)
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn single_day_leave_is_valid() {
        let leave = CreateLeave {
            start_date: date(5),
            end_date: date(5),
            leave_type: LeaveType::Annual,
            reason: None,
        };
        assert!(leave.validate().is_ok());
    }

    #[test]
    fn end_before_start_is_an_invalid_range() {
        let leave = CreateLeave {
            start_date: date(5),
            end_date: date(4),
            leave_type: LeaveType::Sick,
            reason: None,
        };
        assert!(matches!(leave.validate(), Err(HrmError::InvalidRange(_))));
    }

    #[test]
    fn leave_type_outside_the_vocabulary_is_rejected() {
        let parsed = serde_json::from_value::<CreateLeave>(json!({
            "start_date": "2026-01-05",
            "end_date": "2026-01-06",
            "leave_type": "sabbatical"
        }));
        assert!(parsed.is_err());
    }
}

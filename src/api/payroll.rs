use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::HrmError;
use crate::model::payroll::{PayrollRecord, PayrollStatus};
use crate::service::local_now;
use crate::service::payroll;
use crate::store::{MySqlStore, PayrollStore};
use crate::utils::db_utils::{Filters, Page, SqlValue, bind_all};

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayroll {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = 3)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateBatch {
    #[schema(example = 3)]
    pub month: u32,

    #[schema(example = 2026)]
    pub year: i32,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,

    /// Ignored for employees, who only see their own payrolls
    #[schema(example = 1001)]
    pub employee_id: Option<u64>,

    pub month: Option<u32>,

    pub year: Option<i32>,

    pub status: Option<PayrollStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    pub data: Vec<PayrollRecord>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Generate one employee's payroll for a month
#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = GeneratePayroll,
    responses(
        (status = 201, description = "Payroll generated", body = PayrollRecord),
        (status = 400, description = "Invalid month or year"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Payroll already exists", body = Object, example = json!({
            "error": "Payroll for Ana Diaz already exists for 03/2026",
            "code": "DUPLICATE_PAYROLL"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<GeneratePayroll>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;

    let record =
        payroll::generate_payroll(store.get_ref(), payload.employee_id, payload.month, payload.year)
            .await?;

    Ok(HttpResponse::Created().json(record))
}

/// Generate the month's payroll for every active employee
#[utoipa::path(
    post,
    path = "/api/payroll/batch",
    request_body = GenerateBatch,
    responses(
        (status = 200, description = "Created records, skipped and failed employees", body = BatchOutcome),
        (status = 400, description = "Invalid month or year"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_batch(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    payload: web::Json<GenerateBatch>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;

    info!(user_id = auth.user_id, month = payload.month, year = payload.year, "Batch payroll requested");
    let outcome =
        payroll::generate_monthly_batch(store.get_ref(), payload.month, payload.year).await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Mark a pending payroll as paid
#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}/pay",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll paid", body = PayrollRecord),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Payroll not found"),
        (status = 409, description = "Payroll already paid")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn mark_paid(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;

    let record = payroll::mark_paid(store.get_ref(), path.into_inner(), local_now()).await?;
    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(
        ("payroll_id", description = "Payroll ID")
    ),
    responses(
        (status = 200, body = PayrollRecord),
        (status = 403, description = "Not allowed to access this employee"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    store: web::Data<MySqlStore>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    let payroll_id = path.into_inner();

    let record = store
        .find_payroll(payroll_id)
        .await?
        .ok_or(HrmError::not_found("Payroll", payroll_id))?;

    auth.require_access_to(record.employee_id)?;

    Ok(HttpResponse::Ok().json(record))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PaginatedPayrollResponse),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayrollQuery>,
) -> Result<HttpResponse, HrmError> {
    let page = Page::new(query.page, query.per_page, 10, 100);

    let employee_id = if auth.role.is_manager() {
        query.employee_id
    } else {
        Some(auth.own_employee_id()?)
    };

    let mut filters = Filters::default();
    if let Some(employee_id) = employee_id {
        filters.push("employee_id = ?", SqlValue::U64(employee_id));
    }
    if let Some(month) = query.month {
        filters.push("month = ?", SqlValue::U64(u64::from(month)));
    }
    if let Some(year) = query.year {
        filters.push("year = ?", SqlValue::I64(i64::from(year)));
    }
    if let Some(status) = query.status {
        filters.push("status = ?", SqlValue::String(status.as_str().to_string()));
    }
    let where_clause = filters.where_clause();

    let count_sql = format!("SELECT COUNT(*) FROM payroll {where_clause}");
    let total = bind_all!(sqlx::query_scalar::<_, i64>(&count_sql), &filters.values)
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "SELECT id, employee_id, month, year, basic_salary, allowances, deductions, \
         net_salary, working_days, status, paid_date \
         FROM payroll {where_clause} \
         ORDER BY year DESC, month DESC, id DESC \
         LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page = page.page, per_page = page.per_page, "Fetching payrolls");

    let data = bind_all!(sqlx::query_as::<_, PayrollRecord>(&data_sql), &filters.values)
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

use crate::{
    auth::auth::AuthUser,
    error::{HrmError, is_duplicate_key, is_foreign_key_violation},
    model::employee::{Employee, EmploymentStatus},
    utils::{
        db_utils::{
            ColumnKind, Filters, Page, SqlValue, bind_all, build_update_sql, execute_update,
        },
        employee_cache::EmployeeCache,
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, phone, \
     department_id, position, hire_date, salary, status";

/// Columns a partial update may touch
const UPDATABLE: &[(&str, ColumnKind)] = &[
    ("employee_code", ColumnKind::Text),
    ("first_name", ColumnKind::Text),
    ("last_name", ColumnKind::Text),
    ("email", ColumnKind::Text),
    ("phone", ColumnKind::Text),
    ("department_id", ColumnKind::Integer),
    ("position", ColumnKind::Text),
    ("hire_date", ColumnKind::Date),
    ("salary", ColumnKind::Money),
    ("status", ColumnKind::Text),
];

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "Ana")]
    pub first_name: String,
    #[schema(example = "Diaz")]
    pub last_name: String,
    #[schema(example = "ana.diaz@company.com", format = "email")]
    pub email: String,
    #[schema(example = "+8801712345678")]
    pub phone: Option<String>,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    #[schema(example = "Accountant")]
    pub position: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
    #[schema(example = "5000.00", value_type = String)]
    pub salary: Decimal,
}

impl CreateEmployee {
    fn validate(&self) -> Result<(), HrmError> {
        if self.employee_code.trim().is_empty()
            || self.first_name.trim().is_empty()
            || self.last_name.trim().is_empty()
        {
            return Err(HrmError::Validation(
                "employee_code, first_name and last_name are required".into(),
            ));
        }
        if !self.email.contains('@') {
            return Err(HrmError::Validation("email is not valid".into()));
        }
        if self.salary.is_sign_negative() {
            return Err(HrmError::Validation("salary must not be negative".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub status: Option<EmploymentStatus>,
    /// Matches first name, last name or email
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

/// Checks values the column whitelist cannot: the status vocabulary and
/// non-negative salary.
fn validate_patch(body: &Value) -> Result<(), HrmError> {
    if let Some(status) = body.get("status").and_then(Value::as_str) {
        status
            .parse::<EmploymentStatus>()
            .map_err(|_| HrmError::Validation(format!("Unknown status {status}")))?;
    }
    if let Some(salary) = body.get("salary") {
        let negative = match salary {
            Value::Number(n) => n.as_f64().is_some_and(|v| v < 0.0),
            Value::String(s) => s.trim().starts_with('-'),
            _ => false,
        };
        if negative {
            return Err(HrmError::Validation("salary must not be negative".into()));
        }
    }
    Ok(())
}

async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> Result<Employee, HrmError> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
    sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or(HrmError::EmployeeNotFound(employee_id))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Validation error"),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Employee code or email already in use", body = Object, example = json!({
            "error": "Employee code or email already in use",
            "code": "CONFLICT"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;
    payload.validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, first_name, last_name, email, phone, department_id, position, hire_date, salary, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim())
    .bind(payload.phone.as_deref())
    .bind(payload.department_id)
    .bind(payload.position.as_deref())
    .bind(payload.hire_date)
    .bind(payload.salary)
    .bind(EmploymentStatus::Active.as_str())
    .execute(pool.get_ref())
    .await;

    let employee_id = match result {
        Ok(done) => done.last_insert_id(),
        Err(e) if is_duplicate_key(&e) => {
            return Err(HrmError::Conflict(
                "Employee code or email already in use".into(),
            ));
        }
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(HrmError::not_found(
                "Department",
                payload.department_id.unwrap_or_default(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!(employee_id, created_by = auth.user_id, "Employee created");

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;

    let page = Page::new(query.page, query.per_page, 20, 100);

    let mut filters = Filters::default();
    if let Some(department_id) = query.department_id {
        filters.push("department_id = ?", SqlValue::U64(department_id));
    }
    if let Some(status) = query.status {
        filters.push("status = ?", SqlValue::String(status.as_str().to_string()));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filters.push_repeated(
            "(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)",
            &format!("%{search}%"),
        );
    }
    let where_clause = filters.where_clause();

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees {where_clause}");
    let total = bind_all!(sqlx::query_scalar::<_, i64>(&count_sql), &filters.values)
        .fetch_one(pool.get_ref())
        .await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause} ORDER BY id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page = page.page, per_page = page.per_page, "Fetching employees");

    let employees = bind_all!(sqlx::query_as::<_, Employee>(&data_sql), &filters.values)
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Update Employee
///
/// Partial update: only the keys present in the body are written.
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    request_body(content = Object, example = json!({
        "salary": "5500.00",
        "position": "Senior Accountant"
    })),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee code or email already in use")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<EmployeeCache>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;

    let employee_id = path.into_inner();

    validate_patch(&body)?;
    let update = build_update_sql("employees", &body, UPDATABLE, "id", employee_id)?;
    debug!(sql = %update.sql, columns = ?update.columns, "Updating employee");

    // Salary and status feed payroll; never serve them stale.
    let written = cache
        .write_through(employee_id, execute_update(pool.get_ref(), update))
        .await;

    match written {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => {
            return Err(HrmError::Conflict(
                "Employee code or email already in use".into(),
            ));
        }
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(HrmError::Validation("department_id does not exist".into()));
        }
        Err(e) => return Err(e.into()),
    }

    // MySQL reports 0 affected rows for a no-op update, so existence is
    // checked by reading back.
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    info!(employee_id, updated_by = auth.user_id, "Employee updated");

    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee still has attendance, payroll or leave records")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<EmployeeCache>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    auth.require_admin()?;

    let employee_id = path.into_inner();

    let result = cache
        .write_through(
            employee_id,
            sqlx::query("DELETE FROM employees WHERE id = ?")
                .bind(employee_id)
                .execute(pool.get_ref()),
        )
        .await;

    let deleted = match result {
        Ok(res) => res.rows_affected(),
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(HrmError::Conflict(
                "Employee still has attendance, payroll or leave records; set status to terminated instead".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if deleted == 0 {
        return Err(HrmError::EmployeeNotFound(employee_id));
    }

    info!(employee_id, deleted_by = auth.user_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Not allowed to access this employee"),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "error": "Employee 42 not found",
            "code": "EMPLOYEE_NOT_FOUND"
        }))
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    let employee_id = path.into_inner();
    auth.require_access_to(employee_id)?;

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

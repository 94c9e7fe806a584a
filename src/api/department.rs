use crate::{
    auth::auth::AuthUser,
    error::{HrmError, is_duplicate_key, is_foreign_key_violation},
    model::department::Department,
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct DepartmentPayload {
    #[schema(example = "Finance")]
    pub name: String,
    #[schema(example = "Payroll and accounting")]
    pub description: Option<String>,
}

impl DepartmentPayload {
    fn name(&self) -> Result<&str, HrmError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(HrmError::Validation("Department name is required".into()));
        }
        Ok(name)
    }
}

fn name_taken(name: &str) -> HrmError {
    HrmError::Conflict(format!("Department {name} already exists"))
}

async fn fetch_department(pool: &MySqlPool, department_id: u64) -> Result<Department, HrmError> {
    sqlx::query_as::<_, Department>("SELECT id, name, description FROM departments WHERE id = ?")
        .bind(department_id)
        .fetch_optional(pool)
        .await?
        .ok_or(HrmError::not_found("Department", department_id))
}

#[utoipa::path(
    post,
    path = "/api/department",
    request_body = DepartmentPayload,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DepartmentPayload>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;
    let name = payload.name()?;

    let result = sqlx::query("INSERT INTO departments (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(payload.description.as_deref())
        .execute(pool.get_ref())
        .await;

    let department_id = match result {
        Ok(done) => done.last_insert_id(),
        Err(e) if is_duplicate_key(&e) => return Err(name_taken(name)),
        Err(e) => return Err(e.into()),
    };

    info!(department_id, name, "Department created");
    Ok(HttpResponse::Created().json(Department {
        id: department_id,
        name: name.to_string(),
        description: payload.description.clone(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/department",
    responses((status = 200, description = "All departments", body = [Department])),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, HrmError> {
    let departments = sqlx::query_as::<_, Department>(
        "SELECT id, name, description FROM departments ORDER BY name",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(departments))
}

#[utoipa::path(
    get,
    path = "/api/department/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    responses(
        (status = 200, body = Department),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn get_department(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    let department = fetch_department(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    put,
    path = "/api/department/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    request_body = DepartmentPayload,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DepartmentPayload>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;
    let department_id = path.into_inner();
    let name = payload.name()?;

    let result = sqlx::query("UPDATE departments SET name = ?, description = ? WHERE id = ?")
        .bind(name)
        .bind(payload.description.as_deref())
        .bind(department_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => {}
        Err(e) if is_duplicate_key(&e) => return Err(name_taken(name)),
        Err(e) => return Err(e.into()),
    }

    let department = fetch_department(pool.get_ref(), department_id).await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    delete,
    path = "/api/department/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department is still referenced")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;
    let department_id = path.into_inner();

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(done) if done.rows_affected() == 0 => {
            Err(HrmError::not_found("Department", department_id))
        }
        Ok(_) => {
            info!(department_id, "Department deleted");
            Ok(HttpResponse::Ok().json(json!({ "message": "Department deleted" })))
        }
        Err(e) if is_foreign_key_violation(&e) => Err(HrmError::Conflict(
            "Department still has employees or job postings".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

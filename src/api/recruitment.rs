use crate::{
    auth::auth::AuthUser,
    error::{HrmError, is_duplicate_key, is_foreign_key_violation},
    model::recruitment::{Application, ApplicationStatus, JobPosting, JobStatus},
};
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const JOB_COLUMNS: &str = "id, title, department_id, description, status, created_at";
const APPLICATION_COLUMNS: &str =
    "id, job_posting_id, candidate_name, candidate_email, resume_url, status, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateJob {
    #[schema(example = "Payroll Specialist")]
    pub title: String,
    #[schema(example = 2)]
    pub department_id: Option<u64>,
    pub description: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
}

#[derive(Deserialize, ToSchema)]
pub struct Apply {
    #[schema(example = "Ada Lovelace")]
    pub candidate_name: String,
    #[schema(example = "ada@example.com", format = "email")]
    pub candidate_email: String,
    #[schema(example = "https://example.com/ada.pdf")]
    pub resume_url: Option<String>,
}

impl Apply {
    fn validate(&self) -> Result<(), HrmError> {
        if self.candidate_name.trim().is_empty() {
            return Err(HrmError::Validation("candidate_name is required".into()));
        }
        if !self.candidate_email.contains('@') {
            return Err(HrmError::Validation("candidate_email is not valid".into()));
        }
        Ok(())
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MoveApplication {
    #[schema(example = "interview")]
    pub status: ApplicationStatus,
}

async fn fetch_job(pool: &MySqlPool, job_id: u64) -> Result<JobPosting, HrmError> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM job_postings WHERE id = ?");
    sqlx::query_as::<_, JobPosting>(&sql)
        .bind(job_id)
        .fetch_optional(pool)
        .await?
        .ok_or(HrmError::not_found("Job posting", job_id))
}

async fn fetch_application(pool: &MySqlPool, application_id: u64) -> Result<Application, HrmError> {
    let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?");
    sqlx::query_as::<_, Application>(&sql)
        .bind(application_id)
        .fetch_optional(pool)
        .await?
        .ok_or(HrmError::not_found("Application", application_id))
}

fn check_transition(from: ApplicationStatus, to: ApplicationStatus) -> Result<(), HrmError> {
    if from.can_move_to(to) {
        Ok(())
    } else {
        Err(HrmError::Validation(format!(
            "Cannot move application from {from} to {to}"
        )))
    }
}

#[utoipa::path(
    post,
    path = "/api/recruitment/job",
    request_body = CreateJob,
    responses(
        (status = 201, description = "Job posted", body = JobPosting),
        (status = 400, description = "Title missing"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Recruitment"
)]
pub async fn create_job(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateJob>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(HrmError::Validation("title is required".into()));
    }

    let result = sqlx::query(
        "INSERT INTO job_postings (title, department_id, description, status) VALUES (?, ?, ?, ?)",
    )
    .bind(title)
    .bind(payload.department_id)
    .bind(payload.description.as_deref())
    .bind(JobStatus::Open.as_str())
    .execute(pool.get_ref())
    .await;

    let job_id = match result {
        Ok(done) => done.last_insert_id(),
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(HrmError::not_found(
                "Department",
                payload.department_id.unwrap_or_default(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!(job_id, title, "Job posted");
    let job = fetch_job(pool.get_ref(), job_id).await?;
    Ok(HttpResponse::Created().json(job))
}

#[utoipa::path(
    get,
    path = "/api/recruitment/job",
    params(JobQuery),
    responses((status = 200, description = "Job postings, newest first", body = [JobPosting])),
    security(("bearer_auth" = [])),
    tag = "Recruitment"
)]
pub async fn list_jobs(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<JobQuery>,
) -> Result<HttpResponse, HrmError> {
    let jobs = match query.status {
        Some(status) => {
            let sql = format!(
                "SELECT {JOB_COLUMNS} FROM job_postings WHERE status = ? ORDER BY created_at DESC, id DESC"
            );
            sqlx::query_as::<_, JobPosting>(&sql)
                .bind(status.as_str())
                .fetch_all(pool.get_ref())
                .await?
        }
        None => {
            let sql =
                format!("SELECT {JOB_COLUMNS} FROM job_postings ORDER BY created_at DESC, id DESC");
            sqlx::query_as::<_, JobPosting>(&sql)
                .fetch_all(pool.get_ref())
                .await?
        }
    };

    Ok(HttpResponse::Ok().json(jobs))
}

#[utoipa::path(
    get,
    path = "/api/recruitment/job/{job_id}",
    params(("job_id", Path, description = "Job posting ID")),
    responses(
        (status = 200, body = JobPosting),
        (status = 404, description = "Job posting not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Recruitment"
)]
pub async fn get_job(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    let job = fetch_job(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(job))
}

#[utoipa::path(
    put,
    path = "/api/recruitment/job/{job_id}/close",
    params(("job_id", Path, description = "Job posting ID")),
    responses(
        (status = 200, description = "Job closed", body = JobPosting),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Job posting not found"),
        (status = 409, description = "Job already closed")
    ),
    security(("bearer_auth" = [])),
    tag = "Recruitment"
)]
pub async fn close_job(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;
    let job_id = path.into_inner();

    let result = sqlx::query("UPDATE job_postings SET status = ? WHERE id = ? AND status = ?")
        .bind(JobStatus::Closed.as_str())
        .bind(job_id)
        .bind(JobStatus::Open.as_str())
        .execute(pool.get_ref())
        .await?;

    let job = fetch_job(pool.get_ref(), job_id).await?;
    if result.rows_affected() == 0 {
        return Err(HrmError::Conflict(format!("Job posting {job_id} is already closed")));
    }

    info!(job_id, "Job closed");
    Ok(HttpResponse::Ok().json(job))
}

#[utoipa::path(
    post,
    path = "/api/recruitment/job/{job_id}/application",
    params(("job_id", Path, description = "Job posting ID")),
    request_body = Apply,
    responses(
        (status = 201, description = "Application received", body = Application),
        (status = 400, description = "Invalid candidate details"),
        (status = 404, description = "Job posting not found"),
        (status = 409, description = "Job closed, or candidate already applied")
    ),
    security(("bearer_auth" = [])),
    tag = "Recruitment"
)]
pub async fn apply(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<Apply>,
) -> Result<HttpResponse, HrmError> {
    let job_id = path.into_inner();
    payload.validate()?;

    let job = fetch_job(pool.get_ref(), job_id).await?;
    if job.status != JobStatus::Open {
        return Err(HrmError::Conflict(format!("Job posting {job_id} is closed")));
    }

    let email = payload.candidate_email.trim().to_lowercase();
    let result = sqlx::query(
        r#"
        INSERT INTO applications (job_posting_id, candidate_name, candidate_email, resume_url, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(job_id)
    .bind(payload.candidate_name.trim())
    .bind(&email)
    .bind(payload.resume_url.as_deref())
    .bind(ApplicationStatus::Applied.as_str())
    .execute(pool.get_ref())
    .await;

    let application_id = match result {
        Ok(done) => done.last_insert_id(),
        Err(e) if is_duplicate_key(&e) => {
            return Err(HrmError::Conflict(format!(
                "{email} has already applied to job posting {job_id}"
            )));
        }
        Err(e) => return Err(e.into()),
    };

    info!(application_id, job_id, "Application received");
    let application = fetch_application(pool.get_ref(), application_id).await?;
    Ok(HttpResponse::Created().json(application))
}

#[utoipa::path(
    get,
    path = "/api/recruitment/job/{job_id}/application",
    params(("job_id", Path, description = "Job posting ID")),
    responses(
        (status = 200, description = "Applications for the posting", body = [Application]),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Job posting not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Recruitment"
)]
pub async fn list_applications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;
    let job_id = path.into_inner();
    fetch_job(pool.get_ref(), job_id).await?;

    let sql = format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications WHERE job_posting_id = ? ORDER BY id"
    );
    let applications = sqlx::query_as::<_, Application>(&sql)
        .bind(job_id)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(applications))
}

#[utoipa::path(
    put,
    path = "/api/recruitment/application/{application_id}/status",
    params(("application_id", Path, description = "Application ID")),
    request_body = MoveApplication,
    responses(
        (status = 200, description = "Application moved", body = Application),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Recruitment"
)]
pub async fn move_application(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<MoveApplication>,
) -> Result<HttpResponse, HrmError> {
    auth.require_hr_or_admin()?;
    let application_id = path.into_inner();

    let current = fetch_application(pool.get_ref(), application_id).await?;
    check_transition(current.status, payload.status)?;

    // Only applies if nobody moved it since the read.
    let result = sqlx::query("UPDATE applications SET status = ? WHERE id = ? AND status = ?")
        .bind(payload.status.as_str())
        .bind(application_id)
        .bind(current.status.as_str())
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(HrmError::Conflict(format!(
            "Application {application_id} was changed by another request"
        )));
    }

    info!(application_id, from = %current.status, to = %payload.status, "Application moved");
    let application = fetch_application(pool.get_ref(), application_id).await?;
    Ok(HttpResponse::Ok().json(application))
}

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Every failure a request can end in.
///
/// Domain variants come from the attendance and payroll rules; the rest cover
/// auth, validation and storage. All of them render as
/// `{"error": ..., "code": ...}` with a matching status.
#[derive(Debug, Display)]
pub enum HrmError {
    #[display(fmt = "No check-in found for today")]
    NotCheckedIn,

    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,

    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut,

    #[display(
        fmt = "Payroll for {} already exists for {:02}/{}",
        employee_name,
        month,
        year
    )]
    DuplicatePayroll {
        employee_name: String,
        month: u32,
        year: i32,
    },

    #[display(fmt = "Payroll {} is already paid", _0)]
    AlreadyPaid(u64),

    #[display(fmt = "Employee {} not found", _0)]
    EmployeeNotFound(u64),

    #[display(fmt = "{} {} not found", entity, id)]
    RecordNotFound { entity: &'static str, id: u64 },

    #[display(fmt = "{}", _0)]
    InvalidRange(String),

    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "Database error: {}", _0)]
    Database(sqlx::Error),
}

pub type HrmResult<T> = Result<T, HrmError>;

impl std::error::Error for HrmError {}

impl From<sqlx::Error> for HrmError {
    fn from(err: sqlx::Error) -> Self {
        HrmError::Database(err)
    }
}

impl HrmError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        HrmError::RecordNotFound { entity, id }
    }

    /// The message a client may see. Storage errors are logged and replaced
    /// with a generic text.
    pub fn public_message(&self) -> String {
        match self {
            HrmError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            HrmError::NotCheckedIn => "NOT_CHECKED_IN",
            HrmError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            HrmError::AlreadyCheckedOut => "ALREADY_CHECKED_OUT",
            HrmError::DuplicatePayroll { .. } => "DUPLICATE_PAYROLL",
            HrmError::AlreadyPaid(_) => "ALREADY_PAID",
            HrmError::EmployeeNotFound(_) => "EMPLOYEE_NOT_FOUND",
            HrmError::RecordNotFound { .. } => "NOT_FOUND",
            HrmError::InvalidRange(_) => "INVALID_RANGE",
            HrmError::Validation(_) => "VALIDATION_ERROR",
            HrmError::Conflict(_) => "CONFLICT",
            HrmError::Unauthorized(_) => "UNAUTHORIZED",
            HrmError::Forbidden(_) => "FORBIDDEN",
            HrmError::Database(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for HrmError {
    fn status_code(&self) -> StatusCode {
        match self {
            HrmError::NotCheckedIn
            | HrmError::AlreadyCheckedIn
            | HrmError::AlreadyCheckedOut
            | HrmError::InvalidRange(_)
            | HrmError::Validation(_) => StatusCode::BAD_REQUEST,
            HrmError::DuplicatePayroll { .. } | HrmError::AlreadyPaid(_) | HrmError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            HrmError::EmployeeNotFound(_) | HrmError::RecordNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            HrmError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            HrmError::Forbidden(_) => StatusCode::FORBIDDEN,
            HrmError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.public_message(),
            "code": self.code(),
        }))
    }
}

/// True when the error is a UNIQUE key violation.
pub fn is_duplicate_key(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// True when the error is a foreign key violation (row still referenced, or
/// referencing a missing parent).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn render(err: HrmError) -> (StatusCode, serde_json::Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_web::test]
    async fn duplicate_payroll_names_the_employee() {
        let err = HrmError::DuplicatePayroll {
            employee_name: "Jane Roe".into(),
            month: 3,
            year: 2026,
        };

        let (status, json) = render(err).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], "DUPLICATE_PAYROLL");
        assert_eq!(json["error"], "Payroll for Jane Roe already exists for 03/2026");
    }

    #[actix_web::test]
    async fn attendance_errors_are_bad_requests() {
        for (err, code) in [
            (HrmError::NotCheckedIn, "NOT_CHECKED_IN"),
            (HrmError::AlreadyCheckedIn, "ALREADY_CHECKED_IN"),
            (HrmError::AlreadyCheckedOut, "ALREADY_CHECKED_OUT"),
        ] {
            let (status, json) = render(err).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["code"], code);
        }
    }

    #[actix_web::test]
    async fn not_found_variants_return_404() {
        let (status, json) = render(HrmError::not_found("Payroll", 9)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Payroll 9 not found");

        let (status, json) = render(HrmError::EmployeeNotFound(4)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "EMPLOYEE_NOT_FOUND");
    }

    #[actix_web::test]
    async fn database_errors_are_sanitized() {
        let err = HrmError::Database(sqlx::Error::Protocol("secret dsn leaked".into()));

        let (status, json) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert!(!json.to_string().contains("secret"));
    }

    #[test]
    fn row_not_found_is_not_a_duplicate() {
        assert!(!is_duplicate_key(&sqlx::Error::RowNotFound));
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
    }
}

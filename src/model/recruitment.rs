use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Open,
    Closed,
}

/// Hiring pipeline. `Hired` and `Rejected` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Screening,
    Interview,
    Offered,
    Hired,
    Rejected,
}

impl ApplicationStatus {
    fn stage(self) -> u8 {
        match self {
            ApplicationStatus::Applied => 0,
            ApplicationStatus::Screening => 1,
            ApplicationStatus::Interview => 2,
            ApplicationStatus::Offered => 3,
            ApplicationStatus::Hired | ApplicationStatus::Rejected => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ApplicationStatus::Hired | ApplicationStatus::Rejected)
    }

    /// Candidates only move forward. Rejection is allowed from any open stage,
    /// hiring only from an offer.
    pub fn can_move_to(self, next: ApplicationStatus) -> bool {
        if self.is_terminal() || self == next {
            return false;
        }
        match next {
            ApplicationStatus::Rejected => true,
            ApplicationStatus::Hired => self == ApplicationStatus::Offered,
            _ => next.stage() > self.stage(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct JobPosting {
    pub id: u64,
    #[schema(example = "Payroll Specialist")]
    pub title: String,
    pub department_id: Option<u64>,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Application {
    pub id: u64,
    pub job_posting_id: u64,
    #[schema(example = "Ada Lovelace")]
    pub candidate_name: String,
    #[schema(example = "ada@example.com")]
    pub candidate_email: String,
    pub resume_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub created_at: NaiveDateTime,
}

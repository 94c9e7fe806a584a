use crate::api::attendance::{AttendanceQuery, RecordAttendance, SummaryQuery};
use crate::api::department::DepartmentPayload;
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::payroll::{
    GenerateBatch, GeneratePayroll, PaginatedPayrollResponse, PayrollQuery,
};
use crate::api::recruitment::{Apply, CreateJob, JobQuery, MoveApplication};
use crate::auth::auth::AuthUser;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, AttendanceSummary};
use crate::model::department::Department;
use crate::model::employee::{Employee, EmploymentStatus};
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveType};
use crate::model::payroll::{PayrollRecord, PayrollStatus};
use crate::model::recruitment::{Application, ApplicationStatus, JobPosting, JobStatus};
use crate::models::{LoginReqDto, RegisterReq, TokenPair};
use crate::service::payroll::{BatchFailure, BatchOutcome};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM System API",
        version = "1.0.0",
        description = r#"
## Human Resource Management (HRM) System

This API powers a **Human Resource Management (HRM)** system designed to manage core HR operations within an organization.

### 🔹 Key Features
- **Employee Management**
  - Create, update, list, and view employee profiles
- **Departments**
  - Organize employees and job postings
- **Leave Management**
  - Apply for leave, approve/reject requests, and view leave history
- **Attendance Management**
  - Daily check-in and check-out, hours worked derived on check-out
  - HR corrections and monthly summaries
- **Payroll Management**
  - Generate one payroll per employee per month from present days
  - Mark payrolls paid
- **Recruitment**
  - Job postings and a candidate pipeline

### 🔐 Security
Most endpoints are protected using **JWT Bearer authentication**.
Only authorized roles such as **Admin** or **HR** can access sensitive operations.

### 📦 Response Format
- JSON-based RESTful responses
- Errors as `{"error": "...", "code": "..."}`
- Money and hours as decimal strings
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::department::create_department,
        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::list_attendance,
        crate::api::attendance::attendance_summary,
        crate::api::attendance::record_attendance,

        crate::api::payroll::generate_payroll,
        crate::api::payroll::generate_batch,
        crate::api::payroll::get_payroll,
        crate::api::payroll::list_payrolls,
        crate::api::payroll::mark_paid,

        crate::api::recruitment::create_job,
        crate::api::recruitment::list_jobs,
        crate::api::recruitment::get_job,
        crate::api::recruitment::close_job,
        crate::api::recruitment::apply,
        crate::api::recruitment::list_applications,
        crate::api::recruitment::move_application
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            AuthUser,
            Employee,
            EmploymentStatus,
            CreateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            Department,
            DepartmentPayload,
            LeaveRequest,
            LeaveType,
            LeaveStatus,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceSummary,
            AttendanceQuery,
            SummaryQuery,
            RecordAttendance,
            PayrollRecord,
            PayrollStatus,
            GeneratePayroll,
            GenerateBatch,
            PayrollQuery,
            PaginatedPayrollResponse,
            BatchOutcome,
            BatchFailure,
            JobPosting,
            JobStatus,
            JobQuery,
            CreateJob,
            Application,
            ApplicationStatus,
            Apply,
            MoveApplication
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token rotation and user accounts"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Department", description = "Department management APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Attendance", description = "Attendance management APIs"),
        (name = "Payroll", description = "Payroll management APIs"),
        (name = "Recruitment", description = "Job postings and applications"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by `security(...)` on paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_core_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        for path in [
            "/api/attendance",
            "/api/attendance/record",
            "/api/payroll",
            "/api/payroll/{payroll_id}/pay",
            "/auth/login",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        for schema in [
            "PayrollRecord",
            "AttendanceRecord",
            "AttendanceSummary",
            "BatchOutcome",
            "BatchFailure",
        ] {
            assert!(components.schemas.contains_key(schema), "missing schema {schema}");
        }
    }
}

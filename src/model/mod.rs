pub mod attendance;
pub mod department;
pub mod employee;
pub mod leave_request;
pub mod payroll;
pub mod recruitment;
pub mod role;
pub mod user;

/// Status columns are stored as their snake_case names; `FromRow` structs
/// decode them through `#[sqlx(try_from = "String")]` and writers bind
/// `as_str()`.
macro_rules! status_from_column {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $ty {
                pub fn as_str(self) -> &'static str {
                    self.into()
                }
            }

            impl TryFrom<String> for $ty {
                type Error = strum::ParseError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    value.parse()
                }
            }
        )+
    };
}

status_from_column!(
    attendance::AttendanceStatus,
    employee::EmploymentStatus,
    leave_request::LeaveStatus,
    leave_request::LeaveType,
    payroll::PayrollStatus,
    recruitment::JobStatus,
    recruitment::ApplicationStatus,
);

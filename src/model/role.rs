use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// Access level carried in every token. The numeric id is what the
/// `users.role_id` column and the JWT `role` claim store.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// HR managers and system admins manage other people's records.
    pub fn is_manager(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Hr, Role::Employee] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(4), None);
    }

    #[test]
    fn only_admin_and_hr_are_managers() {
        assert!(Role::Admin.is_manager());
        assert!(Role::Hr.is_manager());
        assert!(!Role::Employee.is_manager());
        assert_eq!(Role::Hr.as_ref(), "hr");
    }
}

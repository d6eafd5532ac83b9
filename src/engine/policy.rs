//! Role policy for work orders and appointments.
//!
//! Two static roles: an admin has full read/write everywhere; a mechanic is
//! confined to the work orders and appointments assigned to them. The policy
//! is a pure function of (role, caller id, assignee) and holds no state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Mechanic,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Mechanic => "mechanic",
        }
    }

    /// Unknown role strings fall back to the least-privileged role.
    pub fn parse(raw: &str) -> Role {
        match raw {
            "admin" => Role::Admin,
            _ => Role::Mechanic,
        }
    }
}

/// The authenticated caller, threaded explicitly into every lifecycle
/// operation.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Whether the caller may see a record with the given assignee.
pub fn can_view(caller: &Caller, assigned_mechanic: Option<&str>) -> bool {
    match caller.role {
        Role::Admin => true,
        Role::Mechanic => assigned_mechanic == Some(caller.id.as_str()),
    }
}

/// Whether the caller may mutate a record with the given assignee. Identical
/// to visibility today: a mechanic can touch exactly what they can see.
pub fn can_mutate(caller: &Caller, assigned_mechanic: Option<&str>) -> bool {
    can_view(caller, assigned_mechanic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Caller {
        Caller::new("u-admin", Role::Admin)
    }

    fn mechanic(id: &str) -> Caller {
        Caller::new(id, Role::Mechanic)
    }

    #[test]
    fn test_admin_sees_everything() {
        assert!(can_view(&admin(), None));
        assert!(can_view(&admin(), Some("u-mech")));
        assert!(can_mutate(&admin(), Some("someone-else")));
    }

    #[test]
    fn test_mechanic_confined_to_own_assignments() {
        let m = mechanic("u-mech");
        assert!(can_view(&m, Some("u-mech")));
        assert!(can_mutate(&m, Some("u-mech")));

        assert!(!can_view(&m, Some("u-other")));
        assert!(!can_mutate(&m, Some("u-other")));
        assert!(!can_view(&m, None));
    }

    #[test]
    fn test_unknown_role_is_least_privileged() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("mechanic"), Role::Mechanic);
        assert_eq!(Role::parse("superuser"), Role::Mechanic);
        assert_eq!(Role::parse(""), Role::Mechanic);
    }
}

// security/src/roles.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Staff-facing roles. Both are equally privileged for every clinic
/// operation; the distinction lives in the identity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    /// Whether the role passes the staff gate.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Staff" => Ok(Role::Staff),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Staff => write!(f, "Staff"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_the_two_seeded_roles() {
        assert_eq!("Admin".parse::<Role>().expect("parse"), Role::Admin);
        assert_eq!("Staff".parse::<Role>().expect("parse"), Role::Staff);
    }

    #[test]
    fn should_reject_unknown_role_names() {
        assert!("Patient".parse::<Role>().is_err());
        assert!("admin".parse::<Role>().is_err());
    }
}

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    Admin = 1,
    Manager = 2,
    TeamLead = 3,
    Employee = 4,
}

impl Role {
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Manager),
            3 => Some(Role::TeamLead),
            4 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> i16 {
        self as i16
    }

    /// Manager-level approvers: may take the final decision on a request.
    pub fn is_manager_level(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Manager, Role::TeamLead, Role::Employee] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(9), None);
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(Role::from_str("team_lead").unwrap(), Role::TeamLead);
        assert_eq!(Role::from_str("MANAGER").unwrap(), Role::Manager);
        assert_eq!(Role::TeamLead.to_string(), "team_lead");
    }
}

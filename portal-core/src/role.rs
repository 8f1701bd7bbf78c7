use crate::error::PortalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account types recognised by the portal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Coordinator,
    Donor,
    Volunteer,
    Beneficiary,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Coordinator,
        Role::Donor,
        Role::Volunteer,
        Role::Beneficiary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coordinator => "coordinator",
            Role::Donor => "donor",
            Role::Volunteer => "volunteer",
            Role::Beneficiary => "beneficiary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "coordinator" => Ok(Role::Coordinator),
            "donor" => Ok(Role::Donor),
            "volunteer" => Ok(Role::Volunteer),
            "beneficiary" => Ok(Role::Beneficiary),
            _ => Err(PortalError::UnknownRole(value.to_string())),
        }
    }
}

/// Role claim as carried by a session. Unrecognised claims are kept verbatim
/// so the router can send them to the public landing view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleClaim {
    Known(Role),
    Unrecognized(String),
}

impl RoleClaim {
    pub fn parse(value: &str) -> Self {
        match value.parse::<Role>() {
            Ok(role) => RoleClaim::Known(role),
            Err(_) => RoleClaim::Unrecognized(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleClaim::Known(role) => role.as_str(),
            RoleClaim::Unrecognized(raw) => raw,
        }
    }

    pub fn known(&self) -> Option<Role> {
        match self {
            RoleClaim::Known(role) => Some(*role),
            RoleClaim::Unrecognized(_) => None,
        }
    }
}

impl From<Role> for RoleClaim {
    fn from(role: Role) -> Self {
        RoleClaim::Known(role)
    }
}

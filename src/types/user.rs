//! Farm user accounts and roles

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::lenient;

/// Account role, carried as `role_id` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Supervisor,
    Farmer,
    /// Any id the client does not know; gets no capabilities
    Unknown(u64),
}

impl Role {
    pub fn from_id(id: u64) -> Self {
        match id {
            1 => Self::Admin,
            2 => Self::Supervisor,
            3 => Self::Farmer,
            other => Self::Unknown(other),
        }
    }

    pub fn id(self) -> u64 {
        match self {
            Self::Admin => 1,
            Self::Supervisor => 2,
            Self::Farmer => 3,
            Self::Unknown(id) => id,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Supervisor => "Supervisor",
            Self::Farmer => "Farmer",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.id())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient::id(deserializer).map(Self::from_id)
    }
}

/// A farm user as returned by `/user/list` and `/user/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: u64,
    #[serde(rename = "role_id", default = "unknown_role")]
    pub role: Role,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub username: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
}

fn unknown_role() -> Role {
    Role::Unknown(0)
}

/// Body for `PUT /user/edit/{id}`; only set fields are sent
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "role_id", skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.username.is_none() && self.email.is_none() && self.role.is_none()
    }
}

/// Body for `POST /user/change-password/{id}`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

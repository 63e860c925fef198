//! Session and user profile types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User role as issued by the backend.
///
/// Unrecognized values deserialize to `Unknown` rather than failing the whole
/// profile; such users land on the public services page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Professional,
    Customer,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Landing path for this role after login or a denied navigation.
    pub fn home(self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Professional => "/professional/dashboard",
            Role::Customer => "/customer/dashboard",
            Role::Unknown => "/services",
        }
    }
}

/// User profile as returned by `/auth/login`, `/auth/register` and
/// `/auth/profile`. Professional-only fields are absent for other roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The client session: credentials plus the signed-in user's profile.
///
/// Authentication is derived, never stored, so the invariant
/// "authenticated iff access token and user are both present" cannot be
/// violated by a partial update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

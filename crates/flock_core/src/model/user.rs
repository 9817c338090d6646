//! User domain model.
//!
//! # Responsibility
//! - Define the canonical user record shared by directory, grid and group
//!   views.
//! - Provide role/gender vocabulary as closed enums.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another user.
//! - `role` and `gender` start unset for accounts provisioned by the auth
//!   subsystem and are filled exactly once by profile completion.
//! - `leader_uuid` must never equal `uuid`.

use crate::model::course::ChurchServiceId;
use crate::model::grid::GridId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a user.
pub type UserId = Uuid;

/// Closed role vocabulary. Pastors may own a grid; members may belong to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Pastor,
    Member,
}

impl Role {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Pastor => "pastor",
            Self::Member => "member",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "pastor" => Some(Self::Pastor),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

/// Canonical user record.
///
/// The ordered course enrollment list is stored relationally and carried
/// here so one read model serves profile and dashboard views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: UserId,
    pub name: String,
    /// Unique across users when present.
    pub email: Option<String>,
    pub role: Option<Role>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub birthday: Option<String>,
    /// Network the user belongs to, owned by that grid's pastor.
    pub grid_uuid: Option<GridId>,
    /// Assigned discipler; one hop, never the user itself.
    pub leader_uuid: Option<UserId>,
    /// Congregation service the user attends.
    pub service_uuid: Option<ChurchServiceId>,
    pub is_active_in_school: bool,
    /// Ordered course enrollment.
    pub current_courses: Vec<Uuid>,
}

impl User {
    /// Creates a bare user record with a generated stable id.
    ///
    /// Role and gender stay unset until profile completion.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a user with a caller-provided stable id.
    ///
    /// Used by provisioning paths where identity already exists externally.
    pub fn with_id(uuid: UserId, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            email: None,
            role: None,
            gender: None,
            phone: None,
            birthday: None,
            grid_uuid: None,
            leader_uuid: None,
            service_uuid: None,
            is_active_in_school: false,
            current_courses: Vec::new(),
        }
    }

    /// Whether profile completion has already run for this user.
    pub fn has_complete_profile(&self) -> bool {
        self.role.is_some() && self.gender.is_some()
    }

    pub fn is_pastor(&self) -> bool {
        self.role == Some(Role::Pastor)
    }
}

/// Reduced public projection returned by directory lookups and search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub uuid: UserId,
    pub name: String,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub gender: Option<Gender>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            uuid: user.uuid,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            gender: user.gender,
        }
    }
}

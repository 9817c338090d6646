//! Scheduled group activities and attendance responses.
//!
//! # Invariants
//! - Every activity is owned by exactly one group.
//! - At most one response exists per `(activity, user)` pair; storage
//!   enforces this via the composite primary key.

use crate::model::group::GroupId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an activity.
pub type ActivityId = Uuid;

/// Attendance intent for one activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Confirmed,
    Pending,
    Denied,
}

impl AttendanceStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Pending => "pending",
            Self::Denied => "denied",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "confirmed" => Some(Self::Confirmed),
            "pending" => Some(Self::Pending),
            "denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

/// A scheduled event owned by one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub uuid: ActivityId,
    pub group_uuid: GroupId,
    pub created_by: UserId,
    pub description: String,
    /// Unix epoch milliseconds.
    pub scheduled_at: i64,
    pub created_at: i64,
}

impl Activity {
    pub fn new(
        group_uuid: GroupId,
        created_by: UserId,
        description: impl Into<String>,
        scheduled_at: i64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            group_uuid,
            created_by,
            description: description.into(),
            scheduled_at,
            created_at: 0,
        }
    }
}

/// One attendance response per `(activity, user)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityResponse {
    pub activity_uuid: ActivityId,
    pub user_uuid: UserId,
    pub status: AttendanceStatus,
    pub responded_at: i64,
}

//! Grid (pastor network) domain model.
//!
//! # Invariants
//! - Exactly one pastor owns a grid; storage enforces at most one grid per
//!   pastor via a unique index on `pastor_uuid`.
//! - Member composition is derived from `users.grid_uuid`, not stored here.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a grid.
pub type GridId = Uuid;

/// A pastor-owned network of members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub uuid: GridId,
    pub name: String,
    pub pastor_uuid: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Grid {
    /// Creates a grid record; timestamps are assigned by storage defaults.
    pub fn new(name: impl Into<String>, pastor_uuid: UserId) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            pastor_uuid,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Aggregate counters over one grid's member set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GridStats {
    pub total_members: u32,
    pub members_in_school: u32,
    /// Distinct groups with at least one leader inside the member set.
    pub total_groups: u32,
    pub male_count: u32,
    pub female_count: u32,
}

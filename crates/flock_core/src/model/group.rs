//! Group (recurring meeting) domain model.
//!
//! # Invariants
//! - `invitation_code` is unique across all groups and is the sole join
//!   mechanism.
//! - At most two leaders per group; one-male-one-female is convention only
//!   and not mechanically enforced.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a group.
pub type GroupId = Uuid;

/// Hard cap on the leader roster.
pub const MAX_GROUP_LEADERS: usize = 2;

/// A recurring small meeting with leader and disciple rosters.
///
/// Rosters are ordered; storage keeps them in join tables with a position
/// column so this read model always sees a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub uuid: GroupId,
    pub name: String,
    pub address: String,
    pub district: String,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub day: String,
    pub time: String,
    pub invitation_code: String,
    pub leaders: Vec<UserId>,
    pub disciples: Vec<UserId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Creation parameters for a new group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub address: String,
    pub district: String,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub day: String,
    pub time: String,
}

impl Group {
    /// Creates a group record owned by one founding leader.
    ///
    /// The invitation code is supplied by the caller, which owns uniqueness
    /// retry behavior.
    pub fn new(params: &NewGroup, founder: UserId, invitation_code: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: params.name.clone(),
            address: params.address.clone(),
            district: params.district.clone(),
            min_age: params.min_age,
            max_age: params.max_age,
            day: params.day.clone(),
            time: params.time.clone(),
            invitation_code: invitation_code.into(),
            leaders: vec![founder],
            disciples: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn has_leader(&self, user: UserId) -> bool {
        self.leaders.contains(&user)
    }

    pub fn has_disciple(&self, user: UserId) -> bool {
        self.disciples.contains(&user)
    }

    /// Whether the user participates in this group in any role.
    pub fn has_member(&self, user: UserId) -> bool {
        self.has_leader(user) || self.has_disciple(user)
    }
}

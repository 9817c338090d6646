//! Catalog entries: courses and congregation services.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a course.
pub type CourseId = Uuid;

/// Stable identifier for a congregation service slot.
pub type ChurchServiceId = Uuid;

/// Globally shared course catalog entry, referenced by user enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub uuid: CourseId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Course {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            description,
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Congregation service slot a user attends, resolved in profile reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurchService {
    pub uuid: ChurchServiceId,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ChurchService {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            created_at: 0,
            updated_at: 0,
        }
    }
}

//! Core domain logic for the Flock membership system.
//! This crate is the single source of truth for membership invariants.

pub mod auth;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::{AuthContext, StaticPrincipal};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::activity::{Activity, ActivityId, ActivityResponse, AttendanceStatus};
pub use model::course::{ChurchService, ChurchServiceId, Course, CourseId};
pub use model::grid::{Grid, GridId, GridStats};
pub use model::group::{Group, GroupId, NewGroup, MAX_GROUP_LEADERS};
pub use model::user::{Gender, Role, User, UserId, UserSummary};
pub use repo::activity_repo::{ActivityRepository, SqliteActivityRepository};
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::grid_repo::{GridRepository, SqliteGridRepository};
pub use repo::group_repo::{GroupRepository, SqliteGroupRepository};
pub use repo::user_repo::{ProfilePatch, SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::activity_service::{ActivityService, ResponseView};
pub use service::course_service::CourseService;
pub use service::dashboard_service::{Dashboard, DashboardService};
pub use service::directory_service::{CompleteProfile, DirectoryService, ProfileView};
pub use service::grid_service::{AddMemberOutcome, GridSearchHit, GridService, GridView};
pub use service::group_service::{GroupService, GroupView, JoinOutcome};
pub use service::{ServiceError, ServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

//! Membership use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into permission-scoped operations.
//! - Resolve the authenticated principal at the start of every operation.
//!
//! # Invariants
//! - Services never bypass repository persistence contracts.
//! - Role and ownership checks happen here, never in repositories.
//! - Dangling references inside list-valued enrichments degrade to
//!   omission, never to an error.

use crate::auth::AuthContext;
use crate::model::user::{User, UserId};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod activity_service;
pub mod course_service;
pub mod dashboard_service;
pub mod directory_service;
pub mod grid_service;
pub mod group_service;

/// Policy floor: search terms shorter than this return empty results.
pub const SEARCH_TERM_MIN_CHARS: usize = 2;
/// Cap applied to all directory search results.
pub const SEARCH_RESULT_CAP: u32 = 10;
/// Bound on the upward walk when checking leader-chain acyclicity.
pub const MAX_LEADER_CHAIN_HOPS: usize = 32;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Operation failure taxonomy shared by all services.
#[derive(Debug)]
pub enum ServiceError {
    /// No resolvable principal.
    Unauthenticated,
    /// Principal resolved but lacks the required role or ownership relation.
    Forbidden(&'static str),
    UserNotFound,
    LeaderNotFound,
    GridNotFound,
    GroupNotFound,
    CourseNotFound,
    ActivityNotFound,
    GridAlreadyExists,
    UserAlreadyInOtherGrid,
    UserNotInThisGrid,
    ProfileAlreadyComplete,
    GroupLeadersFull,
    /// Assigning this leader would close a discipleship cycle.
    LeaderChainCycle,
    InvalidInvitationCode,
    Repo(RepoError),
}

impl ServiceError {
    /// Stable machine-readable tag used by the operation boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::UserNotFound => "user_not_found",
            Self::LeaderNotFound => "leader_not_found",
            Self::GridNotFound => "grid_not_found",
            Self::GroupNotFound => "group_not_found",
            Self::CourseNotFound => "course_not_found",
            Self::ActivityNotFound => "activity_not_found",
            Self::GridAlreadyExists => "grid_already_exists",
            Self::UserAlreadyInOtherGrid => "user_already_in_other_grid",
            Self::UserNotInThisGrid => "user_not_in_this_grid",
            Self::ProfileAlreadyComplete => "profile_already_complete",
            Self::GroupLeadersFull => "group_leaders_full",
            Self::LeaderChainCycle => "leader_chain_cycle",
            Self::InvalidInvitationCode => "invalid_invitation_code",
            Self::Repo(_) => "storage_error",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "not authenticated"),
            Self::Forbidden(reason) => write!(f, "forbidden: {reason}"),
            Self::UserNotFound => write!(f, "user not found"),
            Self::LeaderNotFound => write!(f, "leader not found"),
            Self::GridNotFound => write!(f, "grid not found"),
            Self::GroupNotFound => write!(f, "group not found"),
            Self::CourseNotFound => write!(f, "course not found"),
            Self::ActivityNotFound => write!(f, "activity not found"),
            Self::GridAlreadyExists => write!(f, "pastor already owns a grid"),
            Self::UserAlreadyInOtherGrid => write!(f, "user already belongs to another grid"),
            Self::UserNotInThisGrid => write!(f, "user does not belong to this grid"),
            Self::ProfileAlreadyComplete => write!(f, "profile is already complete"),
            Self::GroupLeadersFull => write!(f, "group already has the maximum number of leaders"),
            Self::LeaderChainCycle => {
                write!(f, "leader assignment would create a discipleship cycle")
            }
            Self::InvalidInvitationCode => write!(f, "invitation code is malformed"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Resolves the principal id or fails with `Unauthenticated`.
pub(crate) fn require_principal(auth: &dyn AuthContext) -> ServiceResult<UserId> {
    auth.principal().ok_or(ServiceError::Unauthenticated)
}

/// Resolves the principal and loads its user record.
pub(crate) fn load_principal<U: UserRepository>(
    users: &U,
    auth: &dyn AuthContext,
) -> ServiceResult<User> {
    let id = require_principal(auth)?;
    users.get_user(id)?.ok_or(ServiceError::UserNotFound)
}

/// Maps a repository user-not-found into the service taxonomy.
pub(crate) fn map_user_not_found(err: RepoError) -> ServiceError {
    match err {
        RepoError::NotFound { entity: "user", .. } => ServiceError::UserNotFound,
        other => ServiceError::Repo(other),
    }
}

/// Rejects a leader assignment that would close a cycle through `follower`.
///
/// Walks the candidate's leader chain upward with a bounded hop count;
/// self-assignment counts as the trivial cycle. A dangling link terminates
/// the walk.
pub(crate) fn ensure_chain_acyclic<U: UserRepository>(
    users: &U,
    follower: UserId,
    candidate: UserId,
) -> ServiceResult<()> {
    if candidate == follower {
        return Err(ServiceError::LeaderChainCycle);
    }

    let mut current = candidate;
    for _ in 0..MAX_LEADER_CHAIN_HOPS {
        let Some(user) = users.get_user(current)? else {
            return Ok(());
        };
        match user.leader_uuid {
            Some(next) if next == follower => return Err(ServiceError::LeaderChainCycle),
            Some(next) => current = next,
            None => return Ok(()),
        }
    }

    // Hop budget exhausted: treat an unresolvable chain as a cycle.
    Err(ServiceError::LeaderChainCycle)
}

/// Whether a trimmed search term clears the policy floor.
pub(crate) fn term_clears_floor(term: &str) -> bool {
    term.chars().count() >= SEARCH_TERM_MIN_CHARS
}

//! Directory use-case service.
//!
//! # Responsibility
//! - User lookup, search, and profile read/write operations.
//! - Enforce the self-only rule for disciple listings and the bounded cycle
//!   walk for leader assignment.
//!
//! # Invariants
//! - Every operation except `user_by_email` resolves the principal first.
//! - Profile completion runs at most once per user.

use crate::auth::AuthContext;
use crate::model::course::{ChurchService, Course};
use crate::model::grid::Grid;
use crate::model::user::{Gender, Role, User, UserId, UserSummary};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::grid_repo::GridRepository;
use crate::repo::user_repo::{ProfilePatch, UserRepository};
use crate::service::{
    ensure_chain_acyclic, load_principal, map_user_not_found, require_principal,
    term_clears_floor, ServiceError, ServiceResult, SEARCH_RESULT_CAP,
};
use log::info;
use serde::{Deserialize, Serialize};

/// Caller profile enriched with resolved references.
///
/// Absent references resolve to `None`; dangling course references are
/// dropped from the list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub user: User,
    pub leader: Option<User>,
    pub grid: Option<Grid>,
    pub service: Option<ChurchService>,
    pub courses: Vec<Course>,
}

/// Arguments for one-time profile completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteProfile {
    pub name: String,
    pub role: Role,
    pub gender: Gender,
    pub phone: Option<String>,
}

/// Directory operations over users.
pub struct DirectoryService<U, G, C> {
    users: U,
    grids: G,
    catalog: C,
}

impl<U, G, C> DirectoryService<U, G, C>
where
    U: UserRepository,
    G: GridRepository,
    C: CatalogRepository,
{
    pub fn new(users: U, grids: G, catalog: C) -> Self {
        Self {
            users,
            grids,
            catalog,
        }
    }

    /// Returns the caller's record with leader, grid, congregation service
    /// and course references resolved.
    pub fn my_profile(&self, auth: &dyn AuthContext) -> ServiceResult<ProfileView> {
        let user = load_principal(&self.users, auth)?;

        let leader = match user.leader_uuid {
            Some(id) => self.users.get_user(id)?,
            None => None,
        };
        let grid = match user.grid_uuid {
            Some(id) => self.grids.get_grid(id)?,
            None => None,
        };
        let service = match user.service_uuid {
            Some(id) => self.catalog.get_church_service(id)?,
            None => None,
        };

        let mut courses = Vec::with_capacity(user.current_courses.len());
        for course_id in &user.current_courses {
            if let Some(course) = self.catalog.get_course(*course_id)? {
                courses.push(course);
            }
        }

        Ok(ProfileView {
            user,
            leader,
            grid,
            service,
            courses,
        })
    }

    /// Public exact-match directory lookup; no principal required.
    pub fn user_by_email(&self, email: &str) -> ServiceResult<Option<UserSummary>> {
        let user = self.users.find_by_email(email)?;
        Ok(user.as_ref().map(UserSummary::from))
    }

    /// Substring search over emails, excluding the caller, capped at 10.
    ///
    /// Terms under the policy floor return `[]` rather than erroring.
    pub fn search_users_by_email(
        &self,
        auth: &dyn AuthContext,
        term: &str,
    ) -> ServiceResult<Vec<UserSummary>> {
        let caller = require_principal(auth)?;
        let term = term.trim();
        if !term_clears_floor(term) {
            return Ok(Vec::new());
        }
        Ok(self.users.search_by_email(term, caller, SEARCH_RESULT_CAP)?)
    }

    /// Patches only the explicitly supplied profile fields.
    pub fn update_my_profile(
        &self,
        auth: &dyn AuthContext,
        patch: &ProfilePatch,
    ) -> ServiceResult<()> {
        let caller = require_principal(auth)?;
        self.users
            .patch_profile(caller, patch)
            .map_err(map_user_not_found)
    }

    /// One-time completion of role and gender after provisioning.
    pub fn complete_profile(
        &self,
        auth: &dyn AuthContext,
        args: &CompleteProfile,
    ) -> ServiceResult<()> {
        let user = load_principal(&self.users, auth)?;
        if user.has_complete_profile() {
            return Err(ServiceError::ProfileAlreadyComplete);
        }

        self.users.apply_profile_completion(
            user.uuid,
            &args.name,
            args.role,
            args.gender,
            args.phone.as_deref(),
        )?;
        info!(
            "event=profile_complete module=directory status=ok user={}",
            user.uuid
        );
        Ok(())
    }

    /// Lists a leader's disciples; self-only access.
    pub fn disciples_of_leader(
        &self,
        auth: &dyn AuthContext,
        leader_id: UserId,
    ) -> ServiceResult<Vec<User>> {
        let caller = require_principal(auth)?;
        if self.users.get_user(leader_id)?.is_none() {
            return Err(ServiceError::LeaderNotFound);
        }
        if caller != leader_id {
            return Err(ServiceError::Forbidden(
                "only the leader may list their own disciples",
            ));
        }
        Ok(self.users.find_by_leader(leader_id)?)
    }

    /// Assigns the caller's leader after the bounded acyclicity walk.
    pub fn assign_my_leader(
        &self,
        auth: &dyn AuthContext,
        leader_id: UserId,
    ) -> ServiceResult<()> {
        let caller = load_principal(&self.users, auth)?;
        if self.users.get_user(leader_id)?.is_none() {
            return Err(ServiceError::LeaderNotFound);
        }
        ensure_chain_acyclic(&self.users, caller.uuid, leader_id)?;
        self.users.set_leader(caller.uuid, Some(leader_id))?;
        info!(
            "event=leader_assign module=directory status=ok user={} leader={}",
            caller.uuid, leader_id
        );
        Ok(())
    }
}

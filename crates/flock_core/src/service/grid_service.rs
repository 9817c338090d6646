//! Grid (pastor network) use-case service.
//!
//! # Responsibility
//! - Grid creation, rename, membership mutation and member/statistics reads.
//! - Enforce the pastor role gate and grid ownership on every mutation.
//!
//! # Invariants
//! - A member belongs to at most one grid; moving between grids requires an
//!   explicit remove first.
//! - `GridAlreadyExists` is pre-checked via the pastor index and backstopped
//!   by the storage unique constraint.

use crate::auth::AuthContext;
use crate::model::grid::{Grid, GridId, GridStats};
use crate::model::user::{Gender, User, UserId};
use crate::repo::grid_repo::GridRepository;
use crate::repo::group_repo::GroupRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::{
    load_principal, require_principal, term_clears_floor, ServiceError, ServiceResult,
    SEARCH_RESULT_CAP,
};
use log::info;
use serde::Serialize;

/// Grid search hit enriched with the owning pastor's contact projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridSearchHit {
    pub grid: Grid,
    pub pastor_name: String,
    pub pastor_email: Option<String>,
}

/// A grid together with its resolved pastor record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridView {
    pub grid: Grid,
    pub pastor: User,
}

/// Distinct success shapes for `add_member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddMemberOutcome {
    Added,
    /// The user already belonged to this grid; nothing changed.
    AlreadyMember,
}

/// Grid operations, pastor-gated except for search.
pub struct GridService<U, G, P> {
    users: U,
    grids: G,
    groups: P,
}

impl<U, G, P> GridService<U, G, P>
where
    U: UserRepository,
    G: GridRepository,
    P: GroupRepository,
{
    pub fn new(users: U, grids: G, groups: P) -> Self {
        Self {
            users,
            grids,
            groups,
        }
    }

    fn require_pastor(&self, auth: &dyn AuthContext) -> ServiceResult<User> {
        let user = load_principal(&self.users, auth)?;
        if !user.is_pastor() {
            return Err(ServiceError::Forbidden("pastor role required"));
        }
        Ok(user)
    }

    /// Substring search over grid names with the shared floor and cap.
    ///
    /// Hits whose pastor record dangles are dropped rather than erroring.
    pub fn search_grids_by_name(
        &self,
        auth: &dyn AuthContext,
        term: &str,
    ) -> ServiceResult<Vec<GridSearchHit>> {
        require_principal(auth)?;
        let term = term.trim();
        if !term_clears_floor(term) {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        for grid in self.grids.search_by_name(term, SEARCH_RESULT_CAP)? {
            if let Some(pastor) = self.users.get_user(grid.pastor_uuid)? {
                hits.push(GridSearchHit {
                    grid,
                    pastor_name: pastor.name,
                    pastor_email: pastor.email,
                });
            }
        }
        Ok(hits)
    }

    /// The caller's own grid, or `None` for non-pastors and pastors without
    /// one.
    pub fn my_grid(&self, auth: &dyn AuthContext) -> ServiceResult<Option<GridView>> {
        let user = load_principal(&self.users, auth)?;
        if !user.is_pastor() {
            return Ok(None);
        }
        let Some(grid) = self.grids.find_by_pastor(user.uuid)? else {
            return Ok(None);
        };
        Ok(Some(GridView { grid, pastor: user }))
    }

    /// All members of the caller's grid; `[]` when the pastor has none yet.
    pub fn grid_members(&self, auth: &dyn AuthContext) -> ServiceResult<Vec<User>> {
        let pastor = self.require_pastor(auth)?;
        let Some(grid) = self.grids.find_by_pastor(pastor.uuid)? else {
            return Ok(Vec::new());
        };
        Ok(self.users.find_by_grid(grid.uuid)?)
    }

    /// Aggregate counters over the caller's grid; zeroed when no grid
    /// exists.
    pub fn grid_stats(&self, auth: &dyn AuthContext) -> ServiceResult<GridStats> {
        let pastor = self.require_pastor(auth)?;
        let Some(grid) = self.grids.find_by_pastor(pastor.uuid)? else {
            return Ok(GridStats::default());
        };

        let members = self.users.find_by_grid(grid.uuid)?;
        let mut stats = GridStats {
            total_members: members.len() as u32,
            ..GridStats::default()
        };
        for member in &members {
            if member.is_active_in_school {
                stats.members_in_school += 1;
            }
            match member.gender {
                Some(Gender::Male) => stats.male_count += 1,
                Some(Gender::Female) => stats.female_count += 1,
                None => {}
            }
        }

        let member_ids: Vec<UserId> = members.iter().map(|member| member.uuid).collect();
        stats.total_groups = self.groups.count_groups_with_leader_in(&member_ids)?;
        Ok(stats)
    }

    /// Creates the caller's grid; at most one per pastor.
    pub fn create_grid(&self, auth: &dyn AuthContext, name: &str) -> ServiceResult<GridId> {
        let pastor = self.require_pastor(auth)?;
        if self.grids.find_by_pastor(pastor.uuid)?.is_some() {
            return Err(ServiceError::GridAlreadyExists);
        }

        let grid = Grid::new(name, pastor.uuid);
        let id = self.grids.create_grid(&grid).map_err(|err| match err {
            // Storage backstop for the check-then-insert race.
            crate::repo::RepoError::UniqueViolation { .. } => ServiceError::GridAlreadyExists,
            other => ServiceError::Repo(other),
        })?;
        info!(
            "event=grid_create module=grid status=ok grid={} pastor={}",
            id, pastor.uuid
        );
        Ok(id)
    }

    /// Adds the user with the given email to the caller's grid.
    pub fn add_member(
        &self,
        auth: &dyn AuthContext,
        email: &str,
    ) -> ServiceResult<AddMemberOutcome> {
        let pastor = self.require_pastor(auth)?;
        let grid = self
            .grids
            .find_by_pastor(pastor.uuid)?
            .ok_or(ServiceError::GridNotFound)?;

        let target = self
            .users
            .find_by_email(email)?
            .ok_or(ServiceError::UserNotFound)?;
        match target.grid_uuid {
            Some(existing) if existing == grid.uuid => {
                return Ok(AddMemberOutcome::AlreadyMember);
            }
            Some(_) => return Err(ServiceError::UserAlreadyInOtherGrid),
            None => {}
        }

        self.users.set_grid(target.uuid, Some(grid.uuid))?;
        info!(
            "event=grid_member_add module=grid status=ok grid={} member={}",
            grid.uuid, target.uuid
        );
        Ok(AddMemberOutcome::Added)
    }

    /// Removes a member from the caller's grid.
    pub fn remove_member(&self, auth: &dyn AuthContext, member_id: UserId) -> ServiceResult<()> {
        let pastor = self.require_pastor(auth)?;
        let grid = self
            .grids
            .find_by_pastor(pastor.uuid)?
            .ok_or(ServiceError::GridNotFound)?;

        let target = self
            .users
            .get_user(member_id)?
            .ok_or(ServiceError::UserNotFound)?;
        if target.grid_uuid != Some(grid.uuid) {
            return Err(ServiceError::UserNotInThisGrid);
        }

        self.users.set_grid(target.uuid, None)?;
        info!(
            "event=grid_member_remove module=grid status=ok grid={} member={}",
            grid.uuid, target.uuid
        );
        Ok(())
    }

    /// Renames a grid; owner only.
    pub fn update_grid(
        &self,
        auth: &dyn AuthContext,
        grid_id: GridId,
        name: &str,
    ) -> ServiceResult<()> {
        let caller = load_principal(&self.users, auth)?;
        let grid = self
            .grids
            .get_grid(grid_id)?
            .ok_or(ServiceError::GridNotFound)?;
        if grid.pastor_uuid != caller.uuid {
            return Err(ServiceError::Forbidden("only the owning pastor may rename"));
        }
        Ok(self.grids.rename(grid_id, name)?)
    }
}

//! Group composition use-case service.
//!
//! # Responsibility
//! - Group creation, co-leader management, invitation-code joining and
//!   roster reads.
//!
//! # Invariants
//! - Invitation codes are lowercase `[a-z0-9]{8}`; malformed input is
//!   rejected before any storage access.
//! - At most `MAX_GROUP_LEADERS` leaders per group.
//! - Roster reads are restricted to the group's own participants.

use crate::auth::AuthContext;
use crate::model::group::{Group, GroupId, NewGroup, MAX_GROUP_LEADERS};
use crate::model::user::{User, UserId};
use crate::repo::group_repo::GroupRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use crate::service::{ensure_chain_acyclic, load_principal, ServiceError, ServiceResult};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

static INVITATION_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{8}$").expect("invitation code pattern is valid"));

/// Attempts before giving up on invitation-code collisions.
const CODE_RETRY_LIMIT: usize = 4;

/// A group with leader and disciple rosters resolved to full records.
///
/// Dangling roster entries are dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    pub group: Group,
    pub leaders: Vec<User>,
    pub disciples: Vec<User>,
}

/// Distinct success shapes for `join_group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined,
    /// The caller was already on the disciple roster; nothing changed.
    AlreadyMember,
}

/// Resolves a group's rosters against the user repository.
pub(crate) fn enrich_group<U: UserRepository>(users: &U, group: Group) -> ServiceResult<GroupView> {
    let mut leaders = Vec::with_capacity(group.leaders.len());
    for id in &group.leaders {
        if let Some(user) = users.get_user(*id)? {
            leaders.push(user);
        }
    }
    let mut disciples = Vec::with_capacity(group.disciples.len());
    for id in &group.disciples {
        if let Some(user) = users.get_user(*id)? {
            disciples.push(user);
        }
    }
    Ok(GroupView {
        group,
        leaders,
        disciples,
    })
}

/// Group composition operations.
pub struct GroupService<U, P> {
    users: U,
    groups: P,
}

impl<U, P> GroupService<U, P>
where
    U: UserRepository,
    P: GroupRepository,
{
    pub fn new(users: U, groups: P) -> Self {
        Self { users, groups }
    }

    /// Creates a group led by the caller with a fresh invitation code.
    pub fn create_group(&self, auth: &dyn AuthContext, params: &NewGroup) -> ServiceResult<Group> {
        let caller = load_principal(&self.users, auth)?;
        if !caller.has_complete_profile() {
            return Err(ServiceError::Forbidden(
                "profile completion required to lead a group",
            ));
        }

        let mut attempt = 0;
        loop {
            let group = Group::new(params, caller.uuid, generate_invitation_code());
            match self.groups.create_group(&group) {
                Ok(_) => {
                    info!(
                        "event=group_create module=group status=ok group={} leader={}",
                        group.uuid, caller.uuid
                    );
                    return Ok(group);
                }
                Err(RepoError::UniqueViolation { .. }) if attempt + 1 < CODE_RETRY_LIMIT => {
                    // Code collision; retry with a fresh one.
                    attempt += 1;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Adds a second leader; leaders of the group only.
    ///
    /// Returns `false` as a distinct no-op success when the target already
    /// leads the group.
    pub fn add_co_leader(
        &self,
        auth: &dyn AuthContext,
        group_id: GroupId,
        email: &str,
    ) -> ServiceResult<bool> {
        let caller = load_principal(&self.users, auth)?;
        let group = self
            .groups
            .get_group(group_id)?
            .ok_or(ServiceError::GroupNotFound)?;
        if !group.has_leader(caller.uuid) {
            return Err(ServiceError::Forbidden("only a group leader may add a co-leader"));
        }

        let target = self
            .users
            .find_by_email(email)?
            .ok_or(ServiceError::UserNotFound)?;
        if group.has_leader(target.uuid) {
            return Ok(false);
        }
        if group.leaders.len() >= MAX_GROUP_LEADERS {
            return Err(ServiceError::GroupLeadersFull);
        }

        self.groups.add_leader(group_id, target.uuid)?;
        info!(
            "event=group_leader_add module=group status=ok group={} leader={}",
            group_id, target.uuid
        );
        Ok(true)
    }

    /// Joins the caller to a group's disciple roster by invitation code.
    ///
    /// When the caller has no leader yet, the group's first leader is
    /// assigned; an assignment the cycle walk rejects is skipped without
    /// failing the join.
    pub fn join_group(&self, auth: &dyn AuthContext, code: &str) -> ServiceResult<JoinOutcome> {
        let caller = load_principal(&self.users, auth)?;

        let normalized = code.trim().to_lowercase();
        if !INVITATION_CODE_RE.is_match(&normalized) {
            return Err(ServiceError::InvalidInvitationCode);
        }
        let group = self
            .groups
            .find_by_invitation_code(&normalized)?
            .ok_or(ServiceError::GroupNotFound)?;

        if group.has_disciple(caller.uuid) {
            return Ok(JoinOutcome::AlreadyMember);
        }
        self.groups.add_disciple(group.uuid, caller.uuid)?;

        if caller.leader_uuid.is_none() {
            if let Some(first_leader) = group.leaders.first().copied() {
                if first_leader != caller.uuid {
                    match ensure_chain_acyclic(&self.users, caller.uuid, first_leader) {
                        Ok(()) => self.users.set_leader(caller.uuid, Some(first_leader))?,
                        Err(ServiceError::LeaderChainCycle) => {
                            warn!(
                                "event=group_join module=group status=ok detail=leader_skip_cycle group={} user={}",
                                group.uuid, caller.uuid
                            );
                        }
                        Err(other) => return Err(other),
                    }
                }
            }
        }

        info!(
            "event=group_join module=group status=ok group={} user={}",
            group.uuid, caller.uuid
        );
        Ok(JoinOutcome::Joined)
    }

    /// Removes a user from the disciple roster; leaders only. No-op success
    /// when the user is not on the roster.
    pub fn remove_disciple(
        &self,
        auth: &dyn AuthContext,
        group_id: GroupId,
        user_id: UserId,
    ) -> ServiceResult<()> {
        let caller = load_principal(&self.users, auth)?;
        let group = self
            .groups
            .get_group(group_id)?
            .ok_or(ServiceError::GroupNotFound)?;
        if !group.has_leader(caller.uuid) {
            return Err(ServiceError::Forbidden(
                "only a group leader may remove disciples",
            ));
        }

        self.groups.remove_disciple(group_id, user_id)?;
        Ok(())
    }

    /// The group's full composition; participants only.
    pub fn group_roster(
        &self,
        auth: &dyn AuthContext,
        group_id: GroupId,
    ) -> ServiceResult<GroupView> {
        let caller = load_principal(&self.users, auth)?;
        let group = self
            .groups
            .get_group(group_id)?
            .ok_or(ServiceError::GroupNotFound)?;
        if !group.has_member(caller.uuid) {
            return Err(ServiceError::Forbidden(
                "only group participants may view the roster",
            ));
        }
        enrich_group(&self.users, group)
    }
}

/// Generates an 8-char lowercase hex invitation code.
fn generate_invitation_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    raw[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::{generate_invitation_code, GroupService, INVITATION_CODE_RE};
    use crate::auth::StaticPrincipal;
    use crate::model::grid::GridId;
    use crate::model::group::{Group, GroupId, NewGroup};
    use crate::model::user::{Gender, Role, User, UserId, UserSummary};
    use crate::repo::group_repo::GroupRepository;
    use crate::repo::user_repo::{ProfilePatch, UserRepository};
    use crate::repo::{RepoError, RepoResult};
    use crate::service::ServiceError;
    use uuid::Uuid;

    #[test]
    fn generated_codes_match_the_accepted_shape() {
        for _ in 0..32 {
            let code = generate_invitation_code();
            assert!(INVITATION_CODE_RE.is_match(&code), "bad code: {code}");
        }
    }

    #[test]
    fn code_pattern_rejects_uppercase_and_short_input() {
        assert!(!INVITATION_CODE_RE.is_match("ABCD1234"));
        assert!(!INVITATION_CODE_RE.is_match("abc123"));
        assert!(INVITATION_CODE_RE.is_match("abcd1234"));
    }

    /// Holds exactly one resolvable user.
    struct OneUser(User);

    impl UserRepository for OneUser {
        fn create_user(&self, _: &User) -> RepoResult<UserId> {
            unimplemented!()
        }
        fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
            Ok((id == self.0.uuid).then(|| self.0.clone()))
        }
        fn find_by_email(&self, _: &str) -> RepoResult<Option<User>> {
            Ok(None)
        }
        fn find_by_leader(&self, _: UserId) -> RepoResult<Vec<User>> {
            Ok(Vec::new())
        }
        fn find_by_grid(&self, _: GridId) -> RepoResult<Vec<User>> {
            Ok(Vec::new())
        }
        fn search_by_email(&self, _: &str, _: UserId, _: u32) -> RepoResult<Vec<UserSummary>> {
            Ok(Vec::new())
        }
        fn patch_profile(&self, _: UserId, _: &ProfilePatch) -> RepoResult<()> {
            Ok(())
        }
        fn apply_profile_completion(
            &self,
            _: UserId,
            _: &str,
            _: Role,
            _: Gender,
            _: Option<&str>,
        ) -> RepoResult<()> {
            Ok(())
        }
        fn set_grid(&self, _: UserId, _: Option<GridId>) -> RepoResult<()> {
            Ok(())
        }
        fn set_leader(&self, _: UserId, _: Option<UserId>) -> RepoResult<()> {
            Ok(())
        }
        fn set_school_active(&self, _: UserId, _: bool) -> RepoResult<()> {
            Ok(())
        }
        fn add_course(&self, _: UserId, _: Uuid) -> RepoResult<bool> {
            Ok(true)
        }
        fn remove_course(&self, _: UserId, _: Uuid) -> RepoResult<bool> {
            Ok(true)
        }
    }

    /// Rejects every insert as an invitation-code collision.
    struct CollidingCodes;

    impl GroupRepository for CollidingCodes {
        fn create_group(&self, _: &Group) -> RepoResult<GroupId> {
            Err(RepoError::UniqueViolation {
                constraint: "groups.invitation_code",
            })
        }
        fn get_group(&self, _: GroupId) -> RepoResult<Option<Group>> {
            Ok(None)
        }
        fn find_by_invitation_code(&self, _: &str) -> RepoResult<Option<Group>> {
            Ok(None)
        }
        fn scan_groups(&self) -> RepoResult<Vec<Group>> {
            Ok(Vec::new())
        }
        fn groups_with_leader(&self, _: UserId) -> RepoResult<Vec<Group>> {
            Ok(Vec::new())
        }
        fn add_leader(&self, _: GroupId, _: UserId) -> RepoResult<bool> {
            Ok(true)
        }
        fn add_disciple(&self, _: GroupId, _: UserId) -> RepoResult<bool> {
            Ok(true)
        }
        fn remove_disciple(&self, _: GroupId, _: UserId) -> RepoResult<bool> {
            Ok(true)
        }
        fn count_groups_with_leader_in(&self, _: &[UserId]) -> RepoResult<u32> {
            Ok(0)
        }
    }

    #[test]
    fn exhausted_code_retries_surface_the_storage_conflict() {
        let mut founder = User::new("Founder");
        founder.role = Some(Role::Member);
        founder.gender = Some(Gender::Male);
        let auth = StaticPrincipal::of(founder.uuid);

        let service = GroupService::new(OneUser(founder), CollidingCodes);
        let err = service
            .create_group(
                &auth,
                &NewGroup {
                    name: "Youth".to_string(),
                    address: "1 Main St".to_string(),
                    district: "Central".to_string(),
                    min_age: None,
                    max_age: None,
                    day: "friday".to_string(),
                    time: "20:00".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repo(RepoError::UniqueViolation { .. })
        ));
    }
}

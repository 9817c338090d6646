//! Group activity scheduling and attendance responses.
//!
//! # Invariants
//! - Scheduling is restricted to the owning group's leaders.
//! - Responding is restricted to the owning group's participants.
//! - One response per `(activity, user)` pair; repeat responses refresh the
//!   existing record.

use crate::auth::AuthContext;
use crate::model::activity::{Activity, ActivityId, ActivityResponse, AttendanceStatus};
use crate::model::group::{Group, GroupId};
use crate::model::user::UserSummary;
use crate::repo::activity_repo::ActivityRepository;
use crate::repo::group_repo::GroupRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::{load_principal, ServiceError, ServiceResult};
use log::info;
use serde::Serialize;

/// Attendance response enriched with the responder's projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseView {
    pub response: ActivityResponse,
    pub user: UserSummary,
}

/// Scheduled activity operations.
pub struct ActivityService<U, P, A> {
    users: U,
    groups: P,
    activities: A,
}

impl<U, P, A> ActivityService<U, P, A>
where
    U: UserRepository,
    P: GroupRepository,
    A: ActivityRepository,
{
    pub fn new(users: U, groups: P, activities: A) -> Self {
        Self {
            users,
            groups,
            activities,
        }
    }

    fn require_group(&self, group_id: GroupId) -> ServiceResult<Group> {
        self.groups
            .get_group(group_id)?
            .ok_or(ServiceError::GroupNotFound)
    }

    /// Schedules an activity for a group the caller leads.
    pub fn schedule(
        &self,
        auth: &dyn AuthContext,
        group_id: GroupId,
        description: &str,
        scheduled_at: i64,
    ) -> ServiceResult<Activity> {
        let caller = load_principal(&self.users, auth)?;
        let group = self.require_group(group_id)?;
        if !group.has_leader(caller.uuid) {
            return Err(ServiceError::Forbidden(
                "only a group leader may schedule activities",
            ));
        }

        let activity = Activity::new(group_id, caller.uuid, description, scheduled_at);
        self.activities.create_activity(&activity)?;
        info!(
            "event=activity_schedule module=activity status=ok activity={} group={}",
            activity.uuid, group_id
        );
        Ok(activity)
    }

    /// Records or refreshes the caller's attendance intent.
    pub fn respond(
        &self,
        auth: &dyn AuthContext,
        activity_id: ActivityId,
        status: AttendanceStatus,
    ) -> ServiceResult<()> {
        let caller = load_principal(&self.users, auth)?;
        let activity = self
            .activities
            .get_activity(activity_id)?
            .ok_or(ServiceError::ActivityNotFound)?;
        let group = self.require_group(activity.group_uuid)?;
        if !group.has_member(caller.uuid) {
            return Err(ServiceError::Forbidden(
                "only group participants may respond",
            ));
        }

        self.activities
            .upsert_response(activity_id, caller.uuid, status)?;
        Ok(())
    }

    /// All responses for one activity; owning group's leaders only.
    ///
    /// Responses whose user record dangles are dropped.
    pub fn activity_responses(
        &self,
        auth: &dyn AuthContext,
        activity_id: ActivityId,
    ) -> ServiceResult<Vec<ResponseView>> {
        let caller = load_principal(&self.users, auth)?;
        let activity = self
            .activities
            .get_activity(activity_id)?
            .ok_or(ServiceError::ActivityNotFound)?;
        let group = self.require_group(activity.group_uuid)?;
        if !group.has_leader(caller.uuid) {
            return Err(ServiceError::Forbidden(
                "only a group leader may list responses",
            ));
        }

        let mut views = Vec::new();
        for response in self.activities.responses_for(activity_id)? {
            if let Some(user) = self.users.get_user(response.user_uuid)? {
                views.push(ResponseView {
                    response,
                    user: UserSummary::from(&user),
                });
            }
        }
        Ok(views)
    }

    /// Upcoming and past activities of one group; participants only.
    pub fn group_activities(
        &self,
        auth: &dyn AuthContext,
        group_id: GroupId,
    ) -> ServiceResult<Vec<Activity>> {
        let caller = load_principal(&self.users, auth)?;
        let group = self.require_group(group_id)?;
        if !group.has_member(caller.uuid) {
            return Err(ServiceError::Forbidden(
                "only group participants may list activities",
            ));
        }
        Ok(self.activities.find_by_group(group_id)?)
    }
}

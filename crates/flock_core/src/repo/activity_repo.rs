//! Activity repository contract and SQLite implementation.
//!
//! # Invariants
//! - One response per `(activity, user)` pair; the composite primary key
//!   makes `upsert_response` race-proof.
//! - Activity listings are ordered by `scheduled_at`, then id, for stable
//!   output.

use crate::model::activity::{Activity, ActivityId, ActivityResponse, AttendanceStatus};
use crate::model::group::GroupId;
use crate::model::user::UserId;
use crate::repo::{ensure_initialized, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const ACTIVITY_SELECT_SQL: &str = "SELECT
    uuid,
    group_uuid,
    created_by,
    description,
    scheduled_at,
    created_at
FROM activities";

/// Repository interface for scheduled group activities.
pub trait ActivityRepository {
    fn create_activity(&self, activity: &Activity) -> RepoResult<ActivityId>;
    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>>;
    /// Activities owned by one group, ordered by schedule.
    fn find_by_group(&self, group: GroupId) -> RepoResult<Vec<Activity>>;
    /// Inserts or refreshes the single `(activity, user)` response.
    fn upsert_response(
        &self,
        activity: ActivityId,
        user: UserId,
        status: AttendanceStatus,
    ) -> RepoResult<()>;
    /// All responses for one activity in response order.
    fn responses_for(&self, activity: ActivityId) -> RepoResult<Vec<ActivityResponse>>;
}

/// SQLite-backed activity repository.
pub struct SqliteActivityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_initialized(conn, "activities")?;
        Ok(Self { conn })
    }
}

impl ActivityRepository for SqliteActivityRepository<'_> {
    fn create_activity(&self, activity: &Activity) -> RepoResult<ActivityId> {
        self.conn.execute(
            "INSERT INTO activities (uuid, group_uuid, created_by, description, scheduled_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                activity.uuid.to_string(),
                activity.group_uuid.to_string(),
                activity.created_by.to_string(),
                activity.description.as_str(),
                activity.scheduled_at,
            ],
        )?;
        Ok(activity.uuid)
    }

    fn get_activity(&self, id: ActivityId) -> RepoResult<Option<Activity>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ACTIVITY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_activity_row(row)?));
        }
        Ok(None)
    }

    fn find_by_group(&self, group: GroupId) -> RepoResult<Vec<Activity>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ACTIVITY_SELECT_SQL}
             WHERE group_uuid = ?1
             ORDER BY scheduled_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([group.to_string()])?;
        let mut activities = Vec::new();
        while let Some(row) = rows.next()? {
            activities.push(parse_activity_row(row)?);
        }
        Ok(activities)
    }

    fn upsert_response(
        &self,
        activity: ActivityId,
        user: UserId,
        status: AttendanceStatus,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO activity_responses (activity_uuid, user_uuid, status)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (activity_uuid, user_uuid)
             DO UPDATE SET
                status = excluded.status,
                responded_at = (strftime('%s', 'now') * 1000);",
            params![activity.to_string(), user.to_string(), status.as_db_str()],
        )?;
        Ok(())
    }

    fn responses_for(&self, activity: ActivityId) -> RepoResult<Vec<ActivityResponse>> {
        let mut stmt = self.conn.prepare(
            "SELECT activity_uuid, user_uuid, status, responded_at
             FROM activity_responses
             WHERE activity_uuid = ?1
             ORDER BY responded_at ASC, user_uuid ASC;",
        )?;
        let mut rows = stmt.query([activity.to_string()])?;
        let mut responses = Vec::new();
        while let Some(row) = rows.next()? {
            responses.push(parse_response_row(row)?);
        }
        Ok(responses)
    }
}

fn parse_activity_row(row: &Row<'_>) -> RepoResult<Activity> {
    let uuid_text: String = row.get("uuid")?;
    let group_text: String = row.get("group_uuid")?;
    let creator_text: String = row.get("created_by")?;
    Ok(Activity {
        uuid: parse_uuid(&uuid_text, "activities.uuid")?,
        group_uuid: parse_uuid(&group_text, "activities.group_uuid")?,
        created_by: parse_uuid(&creator_text, "activities.created_by")?,
        description: row.get("description")?,
        scheduled_at: row.get("scheduled_at")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_response_row(row: &Row<'_>) -> RepoResult<ActivityResponse> {
    let activity_text: String = row.get("activity_uuid")?;
    let user_text: String = row.get("user_uuid")?;
    let status_text: String = row.get("status")?;
    let status = AttendanceStatus::from_db_str(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in activity_responses.status"
        ))
    })?;
    Ok(ActivityResponse {
        activity_uuid: parse_uuid(&activity_text, "activity_responses.activity_uuid")?,
        user_uuid: parse_uuid(&user_text, "activity_responses.user_uuid")?,
        status,
        responded_at: row.get("responded_at")?,
    })
}

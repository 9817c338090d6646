//! Group repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup, scan, insert and roster mutation primitives over
//!   `groups` and its leader/disciple join tables.
//!
//! # Invariants
//! - Invitation codes are unique; storage rejects duplicates.
//! - Roster order is deterministic: `position ASC`.
//! - Roster mutations are idempotent at this layer; callers receive whether
//!   a row was actually written.

use crate::model::group::{Group, GroupId};
use crate::model::user::UserId;
use crate::repo::{ensure_initialized, parse_uuid, unique_or_db, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const GROUP_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    address,
    district,
    min_age,
    max_age,
    day,
    time,
    invitation_code,
    created_at,
    updated_at
FROM groups";

/// Repository interface for recurring meeting groups.
pub trait GroupRepository {
    /// Inserts a group with its initial rosters. A duplicate invitation code
    /// fails with `UniqueViolation`.
    fn create_group(&self, group: &Group) -> RepoResult<GroupId>;
    fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>>;
    /// Lookup via the unique invitation-code index.
    fn find_by_invitation_code(&self, code: &str) -> RepoResult<Option<Group>>;
    /// Full scan in storage order, rosters resolved.
    fn scan_groups(&self) -> RepoResult<Vec<Group>>;
    /// Groups whose leader roster contains the given user.
    fn groups_with_leader(&self, leader: UserId) -> RepoResult<Vec<Group>>;
    /// Appends to the leader roster. Returns `false` when already present.
    fn add_leader(&self, group: GroupId, user: UserId) -> RepoResult<bool>;
    /// Appends to the disciple roster. Returns `false` when already present.
    fn add_disciple(&self, group: GroupId, user: UserId) -> RepoResult<bool>;
    /// Removes from the disciple roster. Returns `false` when not present.
    fn remove_disciple(&self, group: GroupId, user: UserId) -> RepoResult<bool>;
    /// Number of distinct groups with at least one leader among the given
    /// users. Used by grid statistics.
    fn count_groups_with_leader_in(&self, users: &[UserId]) -> RepoResult<u32>;
}

/// SQLite-backed group repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_initialized(conn, "groups")?;
        Ok(Self { conn })
    }

    fn load_roster(&self, table: &str, group: GroupId) -> RepoResult<Vec<UserId>> {
        let sql = format!(
            "SELECT user_uuid FROM {table} WHERE group_uuid = ?1 ORDER BY position ASC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([group.to_string()])?;
        let mut roster = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            roster.push(parse_uuid(&text, "roster user_uuid")?);
        }
        Ok(roster)
    }

    fn load_groups(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Group>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        for group in &mut groups {
            group.leaders = self.load_roster("group_leaders", group.uuid)?;
            group.disciples = self.load_roster("group_disciples", group.uuid)?;
        }
        Ok(groups)
    }

    fn roster_append(&self, table: &str, group: GroupId, user: UserId) -> RepoResult<bool> {
        let sql = format!(
            "INSERT OR IGNORE INTO {table} (group_uuid, user_uuid, position)
             VALUES (
                ?1,
                ?2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM {table} WHERE group_uuid = ?1)
             );"
        );
        let changed = self
            .conn
            .execute(&sql, params![group.to_string(), user.to_string()])?;
        if changed > 0 {
            self.touch(group)?;
        }
        Ok(changed > 0)
    }

    fn touch(&self, group: GroupId) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE groups SET updated_at = (strftime('%s', 'now') * 1000) WHERE uuid = ?1;",
            [group.to_string()],
        )?;
        Ok(())
    }

    fn require_group(&self, id: GroupId) -> RepoResult<()> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM groups WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(RepoError::NotFound {
                entity: "group",
                id,
            });
        }
        Ok(())
    }
}

impl GroupRepository for SqliteGroupRepository<'_> {
    fn create_group(&self, group: &Group) -> RepoResult<GroupId> {
        self.conn
            .execute(
                "INSERT INTO groups (
                    uuid,
                    name,
                    address,
                    district,
                    min_age,
                    max_age,
                    day,
                    time,
                    invitation_code
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    group.uuid.to_string(),
                    group.name.as_str(),
                    group.address.as_str(),
                    group.district.as_str(),
                    group.min_age.map(i64::from),
                    group.max_age.map(i64::from),
                    group.day.as_str(),
                    group.time.as_str(),
                    group.invitation_code.as_str(),
                ],
            )
            .map_err(|err| unique_or_db(err, "groups.invitation_code"))?;

        for (position, leader) in group.leaders.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO group_leaders (group_uuid, user_uuid, position)
                 VALUES (?1, ?2, ?3);",
                params![group.uuid.to_string(), leader.to_string(), position as i64],
            )?;
        }
        for (position, disciple) in group.disciples.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO group_disciples (group_uuid, user_uuid, position)
                 VALUES (?1, ?2, ?3);",
                params![
                    group.uuid.to_string(),
                    disciple.to_string(),
                    position as i64
                ],
            )?;
        }

        Ok(group.uuid)
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>> {
        let sql = format!("{GROUP_SELECT_SQL} WHERE uuid = ?;");
        let groups = self.load_groups(&sql, vec![Value::Text(id.to_string())])?;
        Ok(groups.into_iter().next())
    }

    fn find_by_invitation_code(&self, code: &str) -> RepoResult<Option<Group>> {
        let sql = format!("{GROUP_SELECT_SQL} WHERE invitation_code = ?;");
        let groups = self.load_groups(&sql, vec![Value::Text(code.to_string())])?;
        Ok(groups.into_iter().next())
    }

    fn scan_groups(&self) -> RepoResult<Vec<Group>> {
        let sql = format!("{GROUP_SELECT_SQL} ORDER BY rowid ASC;");
        self.load_groups(&sql, Vec::new())
    }

    fn groups_with_leader(&self, leader: UserId) -> RepoResult<Vec<Group>> {
        let sql = format!(
            "{GROUP_SELECT_SQL}
             WHERE uuid IN (SELECT group_uuid FROM group_leaders WHERE user_uuid = ?)
             ORDER BY rowid ASC;"
        );
        self.load_groups(&sql, vec![Value::Text(leader.to_string())])
    }

    fn add_leader(&self, group: GroupId, user: UserId) -> RepoResult<bool> {
        self.require_group(group)?;
        self.roster_append("group_leaders", group, user)
    }

    fn add_disciple(&self, group: GroupId, user: UserId) -> RepoResult<bool> {
        self.require_group(group)?;
        self.roster_append("group_disciples", group, user)
    }

    fn remove_disciple(&self, group: GroupId, user: UserId) -> RepoResult<bool> {
        self.require_group(group)?;
        let changed = self.conn.execute(
            "DELETE FROM group_disciples WHERE group_uuid = ?1 AND user_uuid = ?2;",
            params![group.to_string(), user.to_string()],
        )?;
        if changed > 0 {
            self.touch(group)?;
        }
        Ok(changed > 0)
    }

    fn count_groups_with_leader_in(&self, users: &[UserId]) -> RepoResult<u32> {
        if users.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; users.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(DISTINCT group_uuid) FROM group_leaders WHERE user_uuid IN ({placeholders});"
        );
        let bind_values: Vec<Value> = users
            .iter()
            .map(|id| Value::Text(id.to_string()))
            .collect();
        let count: u32 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count)
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<Group> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Group {
        uuid: parse_uuid(&uuid_text, "groups.uuid")?,
        name: row.get("name")?,
        address: row.get("address")?,
        district: row.get("district")?,
        min_age: row.get("min_age")?,
        max_age: row.get("max_age")?,
        day: row.get("day")?,
        time: row.get("time")?,
        invitation_code: row.get("invitation_code")?,
        leaders: Vec::new(),
        disciples: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

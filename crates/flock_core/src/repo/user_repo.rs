//! User repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide indexed lookup, scan-backed search, insert and partial-update
//!   primitives over the `users` table.
//! - Keep the ordered course enrollment list consistent with `user_courses`.
//!
//! # Invariants
//! - Email uniqueness is a storage constraint (partial unique index).
//! - Partial updates touch only the supplied fields and always bump
//!   `updated_at`.

use crate::model::grid::GridId;
use crate::model::user::{Gender, Role, User, UserId, UserSummary};
use crate::repo::{
    bool_to_int, ensure_initialized, escape_like, int_to_bool, parse_opt_uuid, parse_uuid,
    unique_or_db, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    email,
    role,
    gender,
    phone,
    birthday,
    grid_uuid,
    leader_uuid,
    service_uuid,
    is_active_in_school
FROM users";

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub birthday: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gender.is_none()
            && self.phone.is_none()
            && self.birthday.is_none()
    }
}

/// Repository interface for user directory operations.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Exact-match lookup via the email index.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// All users whose `leader_uuid` equals the given leader, via index.
    fn find_by_leader(&self, leader: UserId) -> RepoResult<Vec<User>>;
    /// All users belonging to the given grid, via index.
    fn find_by_grid(&self, grid: GridId) -> RepoResult<Vec<User>>;
    /// Case-insensitive substring scan over emails, excluding one user,
    /// capped and stable in storage order.
    fn search_by_email(
        &self,
        term: &str,
        exclude: UserId,
        limit: u32,
    ) -> RepoResult<Vec<UserSummary>>;
    fn patch_profile(&self, id: UserId, patch: &ProfilePatch) -> RepoResult<()>;
    /// Profile completion write: sets name/role/gender (phone when given),
    /// resets school activity and clears course enrollment.
    fn apply_profile_completion(
        &self,
        id: UserId,
        name: &str,
        role: Role,
        gender: Gender,
        phone: Option<&str>,
    ) -> RepoResult<()>;
    fn set_grid(&self, id: UserId, grid: Option<GridId>) -> RepoResult<()>;
    fn set_leader(&self, id: UserId, leader: Option<UserId>) -> RepoResult<()>;
    fn set_school_active(&self, id: UserId, active: bool) -> RepoResult<()>;
    /// Appends a course to the ordered enrollment list. Returns `false` when
    /// the user was already enrolled.
    fn add_course(&self, id: UserId, course: Uuid) -> RepoResult<bool>;
    /// Removes a course from the enrollment list. Returns `false` when the
    /// user was not enrolled.
    fn remove_course(&self, id: UserId, course: Uuid) -> RepoResult<bool>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_initialized(conn, "users")?;
        Ok(Self { conn })
    }

    fn load_courses(&self, id: UserId) -> RepoResult<Vec<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT course_uuid FROM user_courses WHERE user_uuid = ?1 ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            courses.push(parse_uuid(&text, "user_courses.course_uuid")?);
        }
        Ok(courses)
    }

    fn load_user_where(&self, clause: &str, key: &str) -> RepoResult<Option<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE {clause};");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            let mut user = parse_user_row(row)?;
            user.current_courses = self.load_courses(user.uuid)?;
            return Ok(Some(user));
        }
        Ok(None)
    }

    fn load_users_where(&self, clause: &str, key: &str) -> RepoResult<Vec<User>> {
        let sql = format!("{USER_SELECT_SQL} WHERE {clause} ORDER BY rowid ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([key])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }
        for user in &mut users {
            user.current_courses = self.load_courses(user.uuid)?;
        }
        Ok(users)
    }

    fn require_user(&self, id: UserId) -> RepoResult<()> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if count == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id,
            });
        }
        Ok(())
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        self.conn
            .execute(
                "INSERT INTO users (
                    uuid,
                    name,
                    email,
                    role,
                    gender,
                    phone,
                    birthday,
                    grid_uuid,
                    leader_uuid,
                    service_uuid,
                    is_active_in_school
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
                params![
                    user.uuid.to_string(),
                    user.name.as_str(),
                    user.email.as_deref(),
                    user.role.map(Role::as_db_str),
                    user.gender.map(Gender::as_db_str),
                    user.phone.as_deref(),
                    user.birthday.as_deref(),
                    user.grid_uuid.map(|id| id.to_string()),
                    user.leader_uuid.map(|id| id.to_string()),
                    user.service_uuid.map(|id| id.to_string()),
                    bool_to_int(user.is_active_in_school),
                ],
            )
            .map_err(|err| unique_or_db(err, "users.email"))?;

        for (position, course) in user.current_courses.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO user_courses (user_uuid, course_uuid, position)
                 VALUES (?1, ?2, ?3);",
                params![user.uuid.to_string(), course.to_string(), position as i64],
            )?;
        }

        Ok(user.uuid)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.load_user_where("uuid = ?1", &id.to_string())
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.load_user_where("email = ?1", email)
    }

    fn find_by_leader(&self, leader: UserId) -> RepoResult<Vec<User>> {
        self.load_users_where("leader_uuid = ?1", &leader.to_string())
    }

    fn find_by_grid(&self, grid: GridId) -> RepoResult<Vec<User>> {
        self.load_users_where("grid_uuid = ?1", &grid.to_string())
    }

    fn search_by_email(
        &self,
        term: &str,
        exclude: UserId,
        limit: u32,
    ) -> RepoResult<Vec<UserSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, email, role, gender
             FROM users
             WHERE email IS NOT NULL
               AND email LIKE '%' || ?1 || '%' ESCAPE '\\'
               AND uuid <> ?2
             ORDER BY rowid ASC
             LIMIT ?3;",
        )?;
        let mut rows = stmt.query(params![
            escape_like(term),
            exclude.to_string(),
            i64::from(limit)
        ])?;
        let mut hits = Vec::new();
        while let Some(row) = rows.next()? {
            hits.push(parse_summary_row(row)?);
        }
        Ok(hits)
    }

    fn patch_profile(&self, id: UserId, patch: &ProfilePatch) -> RepoResult<()> {
        if patch.is_empty() {
            return self.require_user(id);
        }

        let mut clauses: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = &patch.name {
            clauses.push("name = ?");
            bind_values.push(Value::Text(name.clone()));
        }
        if let Some(gender) = patch.gender {
            clauses.push("gender = ?");
            bind_values.push(Value::Text(gender.as_db_str().to_string()));
        }
        if let Some(phone) = &patch.phone {
            clauses.push("phone = ?");
            bind_values.push(Value::Text(phone.clone()));
        }
        if let Some(birthday) = &patch.birthday {
            clauses.push("birthday = ?");
            bind_values.push(Value::Text(birthday.clone()));
        }

        let sql = format!(
            "UPDATE users
             SET {}, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?;",
            clauses.join(", ")
        );
        bind_values.push(Value::Text(id.to_string()));

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id,
            });
        }
        Ok(())
    }

    fn apply_profile_completion(
        &self,
        id: UserId,
        name: &str,
        role: Role,
        gender: Gender,
        phone: Option<&str>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                name = ?1,
                role = ?2,
                gender = ?3,
                phone = COALESCE(?4, phone),
                is_active_in_school = 0,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?5;",
            params![
                name,
                role.as_db_str(),
                gender.as_db_str(),
                phone,
                id.to_string()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id,
            });
        }

        self.conn.execute(
            "DELETE FROM user_courses WHERE user_uuid = ?1;",
            [id.to_string()],
        )?;
        Ok(())
    }

    fn set_grid(&self, id: UserId, grid: Option<GridId>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET grid_uuid = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![grid.map(|g| g.to_string()), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id,
            });
        }
        Ok(())
    }

    fn set_leader(&self, id: UserId, leader: Option<UserId>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET leader_uuid = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![leader.map(|l| l.to_string()), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id,
            });
        }
        Ok(())
    }

    fn set_school_active(&self, id: UserId, active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET is_active_in_school = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![bool_to_int(active), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user",
                id,
            });
        }
        Ok(())
    }

    fn add_course(&self, id: UserId, course: Uuid) -> RepoResult<bool> {
        self.require_user(id)?;
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO user_courses (user_uuid, course_uuid, position)
             VALUES (
                ?1,
                ?2,
                (SELECT COALESCE(MAX(position) + 1, 0) FROM user_courses WHERE user_uuid = ?1)
             );",
            params![id.to_string(), course.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn remove_course(&self, id: UserId, course: Uuid) -> RepoResult<bool> {
        self.require_user(id)?;
        let changed = self.conn.execute(
            "DELETE FROM user_courses WHERE user_uuid = ?1 AND course_uuid = ?2;",
            params![id.to_string(), course.to_string()],
        )?;
        Ok(changed > 0)
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "users.uuid")?;

    let role = match row.get::<_, Option<String>>("role")? {
        Some(value) => Some(Role::from_db_str(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid role `{value}` in users.role"))
        })?),
        None => None,
    };

    let gender = match row.get::<_, Option<String>>("gender")? {
        Some(value) => Some(Gender::from_db_str(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid gender `{value}` in users.gender"))
        })?),
        None => None,
    };

    Ok(User {
        uuid,
        name: row.get("name")?,
        email: row.get("email")?,
        role,
        gender,
        phone: row.get("phone")?,
        birthday: row.get("birthday")?,
        grid_uuid: parse_opt_uuid(row.get("grid_uuid")?, "users.grid_uuid")?,
        leader_uuid: parse_opt_uuid(row.get("leader_uuid")?, "users.leader_uuid")?,
        service_uuid: parse_opt_uuid(row.get("service_uuid")?, "users.service_uuid")?,
        is_active_in_school: int_to_bool(
            row.get("is_active_in_school")?,
            "users.is_active_in_school",
        )?,
        current_courses: Vec::new(),
    })
}

fn parse_summary_row(row: &Row<'_>) -> RepoResult<UserSummary> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "users.uuid")?;

    let role = match row.get::<_, Option<String>>("role")? {
        Some(value) => Some(Role::from_db_str(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid role `{value}` in users.role"))
        })?),
        None => None,
    };

    let gender = match row.get::<_, Option<String>>("gender")? {
        Some(value) => Some(Gender::from_db_str(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid gender `{value}` in users.gender"))
        })?),
        None => None,
    };

    Ok(UserSummary {
        uuid,
        name: row.get("name")?,
        email: row.get("email")?,
        role,
        gender,
    })
}

//! Grid repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup, search, insert and rename primitives over `grids`.
//!
//! # Invariants
//! - At most one grid per pastor; the unique index on `pastor_uuid` is the
//!   race-proof backstop behind the service-level pre-check.

use crate::model::grid::{Grid, GridId};
use crate::model::user::UserId;
use crate::repo::{
    ensure_initialized, escape_like, parse_uuid, unique_or_db, RepoError, RepoResult,
};
use rusqlite::{params, Connection, Row};

const GRID_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    pastor_uuid,
    created_at,
    updated_at
FROM grids";

/// Repository interface for pastor-owned grids.
pub trait GridRepository {
    /// Inserts a grid. A second grid for the same pastor fails with
    /// `UniqueViolation`.
    fn create_grid(&self, grid: &Grid) -> RepoResult<GridId>;
    fn get_grid(&self, id: GridId) -> RepoResult<Option<Grid>>;
    /// The grid owned by the given pastor, via the unique pastor index.
    fn find_by_pastor(&self, pastor: UserId) -> RepoResult<Option<Grid>>;
    /// Case-insensitive substring scan over grid names, capped and stable in
    /// storage order.
    fn search_by_name(&self, term: &str, limit: u32) -> RepoResult<Vec<Grid>>;
    fn rename(&self, id: GridId, name: &str) -> RepoResult<()>;
}

/// SQLite-backed grid repository.
pub struct SqliteGridRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGridRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_initialized(conn, "grids")?;
        Ok(Self { conn })
    }

    fn load_grid_where(&self, clause: &str, key: &str) -> RepoResult<Option<Grid>> {
        let sql = format!("{GRID_SELECT_SQL} WHERE {clause};");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([key])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_grid_row(row)?));
        }
        Ok(None)
    }
}

impl GridRepository for SqliteGridRepository<'_> {
    fn create_grid(&self, grid: &Grid) -> RepoResult<GridId> {
        self.conn
            .execute(
                "INSERT INTO grids (uuid, name, pastor_uuid) VALUES (?1, ?2, ?3);",
                params![
                    grid.uuid.to_string(),
                    grid.name.as_str(),
                    grid.pastor_uuid.to_string()
                ],
            )
            .map_err(|err| unique_or_db(err, "grids.pastor_uuid"))?;
        Ok(grid.uuid)
    }

    fn get_grid(&self, id: GridId) -> RepoResult<Option<Grid>> {
        self.load_grid_where("uuid = ?1", &id.to_string())
    }

    fn find_by_pastor(&self, pastor: UserId) -> RepoResult<Option<Grid>> {
        self.load_grid_where("pastor_uuid = ?1", &pastor.to_string())
    }

    fn search_by_name(&self, term: &str, limit: u32) -> RepoResult<Vec<Grid>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GRID_SELECT_SQL}
             WHERE name LIKE '%' || ?1 || '%' ESCAPE '\\'
             ORDER BY rowid ASC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![escape_like(term), i64::from(limit)])?;
        let mut grids = Vec::new();
        while let Some(row) = rows.next()? {
            grids.push(parse_grid_row(row)?);
        }
        Ok(grids)
    }

    fn rename(&self, id: GridId, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE grids
             SET name = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![name, id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "grid",
                id,
            });
        }
        Ok(())
    }
}

fn parse_grid_row(row: &Row<'_>) -> RepoResult<Grid> {
    let uuid_text: String = row.get("uuid")?;
    let pastor_text: String = row.get("pastor_uuid")?;
    Ok(Grid {
        uuid: parse_uuid(&uuid_text, "grids.uuid")?,
        name: row.get("name")?,
        pastor_uuid: parse_uuid(&pastor_text, "grids.pastor_uuid")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

//! Catalog repository: courses and congregation services.
//!
//! Both catalogs are globally shared, append-mostly reference data resolved
//! during profile and dashboard enrichment.

use crate::model::course::{ChurchService, ChurchServiceId, Course, CourseId};
use crate::repo::{ensure_initialized, parse_uuid, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for shared catalog entries.
pub trait CatalogRepository {
    fn create_course(&self, course: &Course) -> RepoResult<CourseId>;
    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;
    /// Full catalog in storage order.
    fn list_courses(&self) -> RepoResult<Vec<Course>>;
    fn create_church_service(&self, service: &ChurchService) -> RepoResult<ChurchServiceId>;
    fn get_church_service(&self, id: ChurchServiceId) -> RepoResult<Option<ChurchService>>;
}

/// SQLite-backed catalog repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_initialized(conn, "courses")?;
        Ok(Self { conn })
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn create_course(&self, course: &Course) -> RepoResult<CourseId> {
        self.conn.execute(
            "INSERT INTO courses (uuid, name, description) VALUES (?1, ?2, ?3);",
            params![
                course.uuid.to_string(),
                course.name.as_str(),
                course.description.as_deref()
            ],
        )?;
        Ok(course.uuid)
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, description, created_at, updated_at
             FROM courses WHERE uuid = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_course_row(row)?));
        }
        Ok(None)
    }

    fn list_courses(&self) -> RepoResult<Vec<Course>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, description, created_at, updated_at
             FROM courses ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }
        Ok(courses)
    }

    fn create_church_service(&self, service: &ChurchService) -> RepoResult<ChurchServiceId> {
        self.conn.execute(
            "INSERT INTO church_services (uuid, name) VALUES (?1, ?2);",
            params![service.uuid.to_string(), service.name.as_str()],
        )?;
        Ok(service.uuid)
    }

    fn get_church_service(&self, id: ChurchServiceId) -> RepoResult<Option<ChurchService>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, created_at, updated_at
             FROM church_services WHERE uuid = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let uuid_text: String = row.get("uuid")?;
            return Ok(Some(ChurchService {
                uuid: parse_uuid(&uuid_text, "church_services.uuid")?,
                name: row.get("name")?,
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            }));
        }
        Ok(None)
    }
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Course {
        uuid: parse_uuid(&uuid_text, "courses.uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

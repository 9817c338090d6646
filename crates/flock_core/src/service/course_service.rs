//! Course catalog and enrollment use-case service.
//!
//! # Invariants
//! - Enrollment order is preserved; duplicates are no-op successes.
//! - `is_active_in_school` tracks whether any enrollment remains.

use crate::auth::AuthContext;
use crate::model::course::{Course, CourseId};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::{load_principal, require_principal, ServiceError, ServiceResult};
use log::info;

/// Course catalog and enrollment operations.
pub struct CourseService<U, C> {
    users: U,
    catalog: C,
}

impl<U, C> CourseService<U, C>
where
    U: UserRepository,
    C: CatalogRepository,
{
    pub fn new(users: U, catalog: C) -> Self {
        Self { users, catalog }
    }

    /// Adds a catalog entry; pastors only.
    pub fn create_course(
        &self,
        auth: &dyn AuthContext,
        name: &str,
        description: Option<String>,
    ) -> ServiceResult<Course> {
        let caller = load_principal(&self.users, auth)?;
        if !caller.is_pastor() {
            return Err(ServiceError::Forbidden("pastor role required"));
        }

        let course = Course::new(name, description);
        self.catalog.create_course(&course)?;
        info!(
            "event=course_create module=course status=ok course={}",
            course.uuid
        );
        Ok(course)
    }

    /// Full catalog in storage order.
    pub fn list_courses(&self, auth: &dyn AuthContext) -> ServiceResult<Vec<Course>> {
        require_principal(auth)?;
        Ok(self.catalog.list_courses()?)
    }

    /// Enrolls the caller; marks them active in school.
    pub fn enroll(&self, auth: &dyn AuthContext, course_id: CourseId) -> ServiceResult<()> {
        let caller = load_principal(&self.users, auth)?;
        if self.catalog.get_course(course_id)?.is_none() {
            return Err(ServiceError::CourseNotFound);
        }

        self.users.add_course(caller.uuid, course_id)?;
        self.users.set_school_active(caller.uuid, true)?;
        Ok(())
    }

    /// Withdraws the caller; clears the school flag when no enrollment
    /// remains. No-op success when the caller was not enrolled.
    pub fn withdraw(&self, auth: &dyn AuthContext, course_id: CourseId) -> ServiceResult<()> {
        let caller = load_principal(&self.users, auth)?;
        if self.catalog.get_course(course_id)?.is_none() {
            return Err(ServiceError::CourseNotFound);
        }

        let removed = self.users.remove_course(caller.uuid, course_id)?;
        if removed {
            let remaining = self
                .users
                .get_user(caller.uuid)?
                .map(|user| user.current_courses.len())
                .unwrap_or(0);
            if remaining == 0 {
                self.users.set_school_active(caller.uuid, false)?;
            }
        }
        Ok(())
    }
}

//! Dashboard aggregation over directory, group and grid data.
//!
//! # Responsibility
//! - Assemble the caller's full dashboard in one permission-scoped read.
//!
//! # Invariants
//! - `group_as_disciple` is exclusive: the first group in storage order
//!   whose leaders contain the caller's leader and whose disciples contain
//!   the caller. At most one such group is expected to exist.
//! - Dangling references degrade to omission.

use crate::auth::AuthContext;
use crate::model::course::Course;
use crate::model::grid::Grid;
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::grid_repo::GridRepository;
use crate::repo::group_repo::GroupRepository;
use crate::repo::user_repo::UserRepository;
use crate::service::group_service::{enrich_group, GroupView};
use crate::service::{load_principal, ServiceResult};
use serde::Serialize;

/// Aggregated per-user view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// The single group where the caller sits as a disciple under their
    /// assigned leader, if any.
    pub group_as_disciple: Option<GroupView>,
    /// Every group the caller leads.
    pub groups_as_leader: Vec<GroupView>,
    /// Resolved course enrollment.
    pub courses: Vec<Course>,
    /// The grid the caller owns, when the caller is a pastor.
    pub grid: Option<Grid>,
}

/// Read-side aggregation service.
pub struct DashboardService<U, G, P, C> {
    users: U,
    grids: G,
    groups: P,
    catalog: C,
}

impl<U, G, P, C> DashboardService<U, G, P, C>
where
    U: UserRepository,
    G: GridRepository,
    P: GroupRepository,
    C: CatalogRepository,
{
    pub fn new(users: U, grids: G, groups: P, catalog: C) -> Self {
        Self {
            users,
            grids,
            groups,
            catalog,
        }
    }

    /// Assembles the caller's dashboard.
    pub fn dashboard(&self, auth: &dyn AuthContext) -> ServiceResult<Dashboard> {
        let caller = load_principal(&self.users, auth)?;

        let group_as_disciple = match caller.leader_uuid {
            Some(leader) => {
                let mut found = None;
                for group in self.groups.scan_groups()? {
                    if group.has_leader(leader) && group.has_disciple(caller.uuid) {
                        found = Some(enrich_group(&self.users, group)?);
                        break;
                    }
                }
                found
            }
            None => None,
        };

        let mut groups_as_leader = Vec::new();
        for group in self.groups.groups_with_leader(caller.uuid)? {
            groups_as_leader.push(enrich_group(&self.users, group)?);
        }

        let mut courses = Vec::with_capacity(caller.current_courses.len());
        for course_id in &caller.current_courses {
            if let Some(course) = self.catalog.get_course(*course_id)? {
                courses.push(course);
            }
        }

        let grid = if caller.is_pastor() {
            self.grids.find_by_pastor(caller.uuid)?
        } else {
            None
        };

        Ok(Dashboard {
            group_as_disciple,
            groups_as_leader,
            courses,
            grid,
        })
    }
}

//! Named-operation boundary over the membership core.
//!
//! # Responsibility
//! - Expose every core operation as a named call with a JSON argument
//!   record and a JSON result envelope.
//! - Keep process-level configuration (data directory) in one place.
//!
//! # Invariants
//! - `dispatch` never panics; every failure becomes an error envelope.
//! - Envelopes are `{"ok": true, "data": ...}` or
//!   `{"ok": false, "error": {"kind", "message"}}` with stable kinds.

use flock_core::db::open_db;
use flock_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ActivityService, AttendanceStatus, CompleteProfile, CourseService, DashboardService,
    DirectoryService, Gender, GridService, GroupService, NewGroup, ProfilePatch, RepoError, Role,
    ServiceError, SqliteActivityRepository, SqliteCatalogRepository, SqliteGridRepository,
    SqliteGroupRepository, SqliteUserRepository, StaticPrincipal,
};
use log::warn;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const DB_FILE_NAME: &str = "flock.sqlite3";
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check call.
///
/// Never fails; always returns a UTF-8 string.
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and an error message on failure;
/// repeat calls with the same configuration are idempotent.
pub fn init_logging(level: &str, log_dir: &str) -> String {
    match init_logging_inner(level, log_dir) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Configures the directory holding the membership database.
///
/// Returns an empty string on success. A second call with a different
/// directory is rejected.
pub fn set_data_dir(dir: &str) -> String {
    let path = PathBuf::from(dir);
    let stored = DATA_DIR.get_or_init(|| path.clone());
    if *stored != path {
        return format!(
            "data directory already configured at `{}`",
            stored.display()
        );
    }
    String::new()
}

struct ApiError {
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: "bad_request",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: "internal",
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        Self {
            kind: "storage_error",
            message: err.to_string(),
        }
    }
}

type ApiResult = Result<serde_json::Value, ApiError>;

#[derive(Debug, Deserialize)]
struct EmailArgs {
    email: String,
}

#[derive(Debug, Deserialize)]
struct TermArgs {
    term: String,
}

#[derive(Debug, Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Debug, Deserialize)]
struct UpdateProfileArgs {
    name: Option<String>,
    gender: Option<Gender>,
    phone: Option<String>,
    birthday: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeaderArgs {
    leader_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct MemberArgs {
    member_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct UpdateGridArgs {
    grid_id: Uuid,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GroupArgs {
    group_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct GroupEmailArgs {
    group_id: Uuid,
    email: String,
}

#[derive(Debug, Deserialize)]
struct GroupUserArgs {
    group_id: Uuid,
    user_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct CodeArgs {
    code: String,
}

#[derive(Debug, Deserialize)]
struct CreateCourseArgs {
    name: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CourseArgs {
    course_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ScheduleActivityArgs {
    group_id: Uuid,
    description: String,
    scheduled_at: i64,
}

#[derive(Debug, Deserialize)]
struct RespondArgs {
    activity_id: Uuid,
    status: AttendanceStatus,
}

#[derive(Debug, Deserialize)]
struct ActivityArgs {
    activity_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompleteProfileArgs {
    name: String,
    role: Role,
    gender: Gender,
    phone: Option<String>,
}

/// Invokes a named operation with a JSON argument record.
///
/// `principal` carries the authenticated user's id resolved by the embedding
/// auth subsystem, or `None` for anonymous calls. The result is always a
/// JSON envelope; this function never panics.
pub fn dispatch(principal: Option<&str>, op: &str, args_json: &str) -> String {
    match dispatch_inner(principal, op, args_json) {
        Ok(data) => json!({ "ok": true, "data": data }).to_string(),
        Err(err) => {
            warn!(
                "event=op_dispatch module=api status=error op={} error_kind={}",
                op, err.kind
            );
            json!({
                "ok": false,
                "error": { "kind": err.kind, "message": err.message }
            })
            .to_string()
        }
    }
}

fn dispatch_inner(principal: Option<&str>, op: &str, args_json: &str) -> ApiResult {
    let auth = parse_principal(principal)?;
    let conn = open_connection()?;
    run_operation(&conn, &auth, op, args_json)
}

fn parse_principal(principal: Option<&str>) -> Result<StaticPrincipal, ApiError> {
    match principal {
        Some(text) => {
            let id = Uuid::parse_str(text)
                .map_err(|_| ApiError::bad_request(format!("invalid principal id `{text}`")))?;
            Ok(StaticPrincipal::of(id))
        }
        None => Ok(StaticPrincipal::anonymous()),
    }
}

fn open_connection() -> Result<Connection, ApiError> {
    let dir = DATA_DIR
        .get()
        .ok_or_else(|| ApiError::internal("data directory not configured"))?;
    open_db(dir.join(DB_FILE_NAME)).map_err(|err| ApiError {
        kind: "storage_error",
        message: err.to_string(),
    })
}

fn parse_args<T: DeserializeOwned>(args_json: &str) -> Result<T, ApiError> {
    let payload = if args_json.trim().is_empty() {
        "{}"
    } else {
        args_json
    };
    serde_json::from_str(payload)
        .map_err(|err| ApiError::bad_request(format!("invalid arguments: {err}")))
}

fn to_data<T: Serialize>(value: &T) -> ApiResult {
    serde_json::to_value(value).map_err(|err| ApiError::internal(err.to_string()))
}

fn run_operation(conn: &Connection, auth: &StaticPrincipal, op: &str, args_json: &str) -> ApiResult {
    match op {
        "my_profile" => {
            let service = directory(conn)?;
            to_data(&service.my_profile(auth)?)
        }
        "user_by_email" => {
            let args: EmailArgs = parse_args(args_json)?;
            let service = directory(conn)?;
            to_data(&service.user_by_email(&args.email)?)
        }
        "search_users_by_email" => {
            let args: TermArgs = parse_args(args_json)?;
            let service = directory(conn)?;
            to_data(&service.search_users_by_email(auth, &args.term)?)
        }
        "update_my_profile" => {
            let args: UpdateProfileArgs = parse_args(args_json)?;
            let patch = ProfilePatch {
                name: args.name,
                gender: args.gender,
                phone: args.phone,
                birthday: args.birthday,
            };
            let service = directory(conn)?;
            service.update_my_profile(auth, &patch)?;
            Ok(serde_json::Value::Null)
        }
        "complete_profile" => {
            let args: CompleteProfileArgs = parse_args(args_json)?;
            let service = directory(conn)?;
            service.complete_profile(
                auth,
                &CompleteProfile {
                    name: args.name,
                    role: args.role,
                    gender: args.gender,
                    phone: args.phone,
                },
            )?;
            Ok(serde_json::Value::Null)
        }
        "disciples_of_leader" => {
            let args: LeaderArgs = parse_args(args_json)?;
            let service = directory(conn)?;
            to_data(&service.disciples_of_leader(auth, args.leader_id)?)
        }
        "assign_my_leader" => {
            let args: LeaderArgs = parse_args(args_json)?;
            let service = directory(conn)?;
            service.assign_my_leader(auth, args.leader_id)?;
            Ok(serde_json::Value::Null)
        }
        "search_grids_by_name" => {
            let args: TermArgs = parse_args(args_json)?;
            let service = grid(conn)?;
            to_data(&service.search_grids_by_name(auth, &args.term)?)
        }
        "my_grid" => {
            let service = grid(conn)?;
            to_data(&service.my_grid(auth)?)
        }
        "grid_members" => {
            let service = grid(conn)?;
            to_data(&service.grid_members(auth)?)
        }
        "grid_stats" => {
            let service = grid(conn)?;
            to_data(&service.grid_stats(auth)?)
        }
        "create_grid" => {
            let args: NameArgs = parse_args(args_json)?;
            let service = grid(conn)?;
            to_data(&service.create_grid(auth, &args.name)?)
        }
        "add_member_to_grid" => {
            let args: EmailArgs = parse_args(args_json)?;
            let service = grid(conn)?;
            to_data(&service.add_member(auth, &args.email)?)
        }
        "remove_member_from_grid" => {
            let args: MemberArgs = parse_args(args_json)?;
            let service = grid(conn)?;
            service.remove_member(auth, args.member_id)?;
            Ok(serde_json::Value::Null)
        }
        "update_grid" => {
            let args: UpdateGridArgs = parse_args(args_json)?;
            let service = grid(conn)?;
            service.update_grid(auth, args.grid_id, &args.name)?;
            Ok(serde_json::Value::Null)
        }
        "create_group" => {
            let args: NewGroup = parse_args(args_json)?;
            let service = group(conn)?;
            to_data(&service.create_group(auth, &args)?)
        }
        "add_co_leader" => {
            let args: GroupEmailArgs = parse_args(args_json)?;
            let service = group(conn)?;
            to_data(&service.add_co_leader(auth, args.group_id, &args.email)?)
        }
        "join_group" => {
            let args: CodeArgs = parse_args(args_json)?;
            let service = group(conn)?;
            to_data(&service.join_group(auth, &args.code)?)
        }
        "remove_disciple" => {
            let args: GroupUserArgs = parse_args(args_json)?;
            let service = group(conn)?;
            service.remove_disciple(auth, args.group_id, args.user_id)?;
            Ok(serde_json::Value::Null)
        }
        "group_roster" => {
            let args: GroupArgs = parse_args(args_json)?;
            let service = group(conn)?;
            to_data(&service.group_roster(auth, args.group_id)?)
        }
        "create_course" => {
            let args: CreateCourseArgs = parse_args(args_json)?;
            let service = course(conn)?;
            to_data(&service.create_course(auth, &args.name, args.description)?)
        }
        "list_courses" => {
            let service = course(conn)?;
            to_data(&service.list_courses(auth)?)
        }
        "enroll_course" => {
            let args: CourseArgs = parse_args(args_json)?;
            let service = course(conn)?;
            service.enroll(auth, args.course_id)?;
            Ok(serde_json::Value::Null)
        }
        "withdraw_course" => {
            let args: CourseArgs = parse_args(args_json)?;
            let service = course(conn)?;
            service.withdraw(auth, args.course_id)?;
            Ok(serde_json::Value::Null)
        }
        "schedule_activity" => {
            let args: ScheduleActivityArgs = parse_args(args_json)?;
            let service = activity(conn)?;
            to_data(&service.schedule(auth, args.group_id, &args.description, args.scheduled_at)?)
        }
        "respond_to_activity" => {
            let args: RespondArgs = parse_args(args_json)?;
            let service = activity(conn)?;
            service.respond(auth, args.activity_id, args.status)?;
            Ok(serde_json::Value::Null)
        }
        "activity_responses" => {
            let args: ActivityArgs = parse_args(args_json)?;
            let service = activity(conn)?;
            to_data(&service.activity_responses(auth, args.activity_id)?)
        }
        "group_activities" => {
            let args: GroupArgs = parse_args(args_json)?;
            let service = activity(conn)?;
            to_data(&service.group_activities(auth, args.group_id)?)
        }
        "dashboard" => {
            let service = dashboard(conn)?;
            to_data(&service.dashboard(auth)?)
        }
        other => Err(ApiError::bad_request(format!("unknown operation `{other}`"))),
    }
}

type Directory<'c> = DirectoryService<
    SqliteUserRepository<'c>,
    SqliteGridRepository<'c>,
    SqliteCatalogRepository<'c>,
>;

fn directory(conn: &Connection) -> Result<Directory<'_>, ApiError> {
    Ok(DirectoryService::new(
        SqliteUserRepository::try_new(conn)?,
        SqliteGridRepository::try_new(conn)?,
        SqliteCatalogRepository::try_new(conn)?,
    ))
}

type Grid<'c> =
    GridService<SqliteUserRepository<'c>, SqliteGridRepository<'c>, SqliteGroupRepository<'c>>;

fn grid(conn: &Connection) -> Result<Grid<'_>, ApiError> {
    Ok(GridService::new(
        SqliteUserRepository::try_new(conn)?,
        SqliteGridRepository::try_new(conn)?,
        SqliteGroupRepository::try_new(conn)?,
    ))
}

type GroupSvc<'c> = GroupService<SqliteUserRepository<'c>, SqliteGroupRepository<'c>>;

fn group(conn: &Connection) -> Result<GroupSvc<'_>, ApiError> {
    Ok(GroupService::new(
        SqliteUserRepository::try_new(conn)?,
        SqliteGroupRepository::try_new(conn)?,
    ))
}

type CourseSvc<'c> = CourseService<SqliteUserRepository<'c>, SqliteCatalogRepository<'c>>;

fn course(conn: &Connection) -> Result<CourseSvc<'_>, ApiError> {
    Ok(CourseService::new(
        SqliteUserRepository::try_new(conn)?,
        SqliteCatalogRepository::try_new(conn)?,
    ))
}

type ActivitySvc<'c> = ActivityService<
    SqliteUserRepository<'c>,
    SqliteGroupRepository<'c>,
    SqliteActivityRepository<'c>,
>;

fn activity(conn: &Connection) -> Result<ActivitySvc<'_>, ApiError> {
    Ok(ActivityService::new(
        SqliteUserRepository::try_new(conn)?,
        SqliteGroupRepository::try_new(conn)?,
        SqliteActivityRepository::try_new(conn)?,
    ))
}

type DashboardSvc<'c> = DashboardService<
    SqliteUserRepository<'c>,
    SqliteGridRepository<'c>,
    SqliteGroupRepository<'c>,
    SqliteCatalogRepository<'c>,
>;

fn dashboard(conn: &Connection) -> Result<DashboardSvc<'_>, ApiError> {
    Ok(DashboardService::new(
        SqliteUserRepository::try_new(conn)?,
        SqliteGridRepository::try_new(conn)?,
        SqliteGroupRepository::try_new(conn)?,
        SqliteCatalogRepository::try_new(conn)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::{dispatch, parse_principal, ping};

    #[test]
    fn ping_round_trips() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn malformed_principal_is_bad_request() {
        let err = parse_principal(Some("not-a-uuid")).err();
        assert!(err.is_some());
        assert_eq!(err.map(|e| e.kind), Some("bad_request"));
    }

    #[test]
    fn unconfigured_data_dir_yields_error_envelope() {
        let envelope = dispatch(None, "my_profile", "{}");
        assert!(envelope.contains("\"ok\":false"));
    }
}

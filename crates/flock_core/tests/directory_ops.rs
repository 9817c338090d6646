use flock_core::db::open_db_in_memory;
use flock_core::{
    CatalogRepository, ChurchService, CompleteProfile, DirectoryService, Gender, Grid,
    GridRepository, ProfilePatch, RepoError, Role,
    ServiceError, SqliteCatalogRepository, SqliteGridRepository, SqliteUserRepository,
    StaticPrincipal, User, UserRepository,
};
use rusqlite::Connection;

#[test]
fn user_by_email_returns_public_summary() {
    let conn = open_db_in_memory().unwrap();
    let ana = seed_user(&conn, "Ana", "ana@example.com");

    let service = directory(&conn);
    let hit = service.user_by_email("ana@example.com").unwrap().unwrap();
    assert_eq!(hit.uuid, ana.uuid);
    assert_eq!(hit.email.as_deref(), Some("ana@example.com"));

    assert!(service.user_by_email("nobody@example.com").unwrap().is_none());
}

#[test]
fn search_requires_a_principal() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, "Ana", "ana@example.com");

    let service = directory(&conn);
    let err = service
        .search_users_by_email(&StaticPrincipal::anonymous(), "ana")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated));
}

#[test]
fn search_below_floor_returns_empty_not_error() {
    let conn = open_db_in_memory().unwrap();
    let ana = seed_user(&conn, "Ana", "ana@example.com");
    seed_user(&conn, "Bea", "bea@example.com");

    let service = directory(&conn);
    let hits = service
        .search_users_by_email(&StaticPrincipal::of(ana.uuid), "a")
        .unwrap();
    assert!(hits.is_empty());
}

#[test]
fn search_excludes_the_caller_and_caps_results() {
    let conn = open_db_in_memory().unwrap();
    let caller = seed_user(&conn, "Caller", "caller@flock.test");
    for n in 0..12 {
        seed_user(&conn, &format!("User {n}"), &format!("user{n}@flock.test"));
    }

    let service = directory(&conn);
    let hits = service
        .search_users_by_email(&StaticPrincipal::of(caller.uuid), "flock.test")
        .unwrap();
    assert_eq!(hits.len(), 10);
    assert!(hits.iter().all(|hit| hit.uuid != caller.uuid));
}

#[test]
fn update_my_profile_patches_only_supplied_fields() {
    let conn = open_db_in_memory().unwrap();
    let ana = seed_user(&conn, "Ana", "ana@example.com");

    let service = directory(&conn);
    let patch = ProfilePatch {
        phone: Some("555-0100".to_string()),
        ..ProfilePatch::default()
    };
    service
        .update_my_profile(&StaticPrincipal::of(ana.uuid), &patch)
        .unwrap();

    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let loaded = users.get_user(ana.uuid).unwrap().unwrap();
    assert_eq!(loaded.phone.as_deref(), Some("555-0100"));
    assert_eq!(loaded.name, "Ana");
    assert!(loaded.gender.is_none());
}

#[test]
fn complete_profile_runs_at_most_once() {
    let conn = open_db_in_memory().unwrap();
    let ana = seed_user(&conn, "provisional", "ana@example.com");

    let service = directory(&conn);
    let auth = StaticPrincipal::of(ana.uuid);
    let args = CompleteProfile {
        name: "Ana Silva".to_string(),
        role: Role::Member,
        gender: Gender::Female,
        phone: None,
    };
    service.complete_profile(&auth, &args).unwrap();

    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let loaded = users.get_user(ana.uuid).unwrap().unwrap();
    assert_eq!(loaded.name, "Ana Silva");
    assert_eq!(loaded.role, Some(Role::Member));
    assert_eq!(loaded.gender, Some(Gender::Female));
    assert!(!loaded.is_active_in_school);

    let err = service.complete_profile(&auth, &args).unwrap_err();
    assert!(matches!(err, ServiceError::ProfileAlreadyComplete));
}

#[test]
fn disciples_listing_is_self_only() {
    let conn = open_db_in_memory().unwrap();
    let leader = seed_user(&conn, "Leader", "leader@example.com");
    let other = seed_user(&conn, "Other", "other@example.com");
    let disciple = seed_user(&conn, "Disciple", "disciple@example.com");

    let users = SqliteUserRepository::try_new(&conn).unwrap();
    users.set_leader(disciple.uuid, Some(leader.uuid)).unwrap();

    let service = directory(&conn);
    let listed = service
        .disciples_of_leader(&StaticPrincipal::of(leader.uuid), leader.uuid)
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, disciple.uuid);

    let err = service
        .disciples_of_leader(&StaticPrincipal::of(other.uuid), leader.uuid)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = service
        .disciples_of_leader(&StaticPrincipal::of(leader.uuid), uuid::Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, ServiceError::LeaderNotFound));
}

#[test]
fn assign_my_leader_rejects_cycles() {
    let conn = open_db_in_memory().unwrap();
    let ana = seed_user(&conn, "Ana", "ana@example.com");
    let bea = seed_user(&conn, "Bea", "bea@example.com");

    let service = directory(&conn);
    service
        .assign_my_leader(&StaticPrincipal::of(bea.uuid), ana.uuid)
        .unwrap();

    // Closing the loop back onto Ana would make a two-node cycle.
    let err = service
        .assign_my_leader(&StaticPrincipal::of(ana.uuid), bea.uuid)
        .unwrap_err();
    assert!(matches!(err, ServiceError::LeaderChainCycle));

    let err = service
        .assign_my_leader(&StaticPrincipal::of(ana.uuid), ana.uuid)
        .unwrap_err();
    assert!(matches!(err, ServiceError::LeaderChainCycle));
}

#[test]
fn foreign_key_failures_are_not_reported_as_unique_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let users = SqliteUserRepository::try_new(&conn).unwrap();

    let mut user = User::new("Ana");
    user.email = Some("ana@example.com".to_string());
    user.grid_uuid = Some(uuid::Uuid::new_v4());

    let err = users.create_user(&user).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)), "got: {err}");
}

#[test]
fn my_profile_resolves_references() {
    let conn = open_db_in_memory().unwrap();
    let pastor = seed_pastor(&conn, "Pastor", "pastor@example.com");
    let mut ana = User::new("Ana");
    ana.email = Some("ana@example.com".to_string());
    ana.leader_uuid = Some(pastor.uuid);

    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let grids = SqliteGridRepository::try_new(&conn).unwrap();
    let catalog = SqliteCatalogRepository::try_new(&conn).unwrap();

    let grid = Grid::new("North", pastor.uuid);
    grids.create_grid(&grid).unwrap();
    ana.grid_uuid = Some(grid.uuid);

    let sunday = ChurchService::new("Sunday 10am");
    catalog.create_church_service(&sunday).unwrap();
    ana.service_uuid = Some(sunday.uuid);

    users.create_user(&ana).unwrap();

    let service = directory(&conn);
    let profile = service.my_profile(&StaticPrincipal::of(ana.uuid)).unwrap();
    assert_eq!(profile.user.uuid, ana.uuid);
    assert_eq!(profile.leader.map(|l| l.uuid), Some(pastor.uuid));
    assert_eq!(profile.grid.map(|g| g.uuid), Some(grid.uuid));
    assert_eq!(profile.service.map(|s| s.uuid), Some(sunday.uuid));
    assert!(profile.courses.is_empty());
}

fn directory(
    conn: &Connection,
) -> DirectoryService<
    SqliteUserRepository<'_>,
    SqliteGridRepository<'_>,
    SqliteCatalogRepository<'_>,
> {
    DirectoryService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteGridRepository::try_new(conn).unwrap(),
        SqliteCatalogRepository::try_new(conn).unwrap(),
    )
}

fn seed_user(conn: &Connection, name: &str, email: &str) -> User {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let mut user = User::new(name);
    user.email = Some(email.to_string());
    users.create_user(&user).unwrap();
    user
}

fn seed_pastor(conn: &Connection, name: &str, email: &str) -> User {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let mut user = User::new(name);
    user.email = Some(email.to_string());
    user.role = Some(Role::Pastor);
    user.gender = Some(Gender::Male);
    users.create_user(&user).unwrap();
    user
}

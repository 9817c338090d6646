use flock_core::db::open_db_in_memory;
use flock_core::{
    Gender, GroupRepository, GroupService, JoinOutcome, NewGroup, Role, ServiceError,
    SqliteGroupRepository, SqliteUserRepository, StaticPrincipal, User, UserRepository,
};
use rusqlite::Connection;

#[test]
fn create_group_requires_a_complete_profile() {
    let conn = open_db_in_memory().unwrap();
    let provisional = seed_incomplete(&conn, "Provisional", "p@example.com");

    let service = group_service(&conn);
    let err = service
        .create_group(&StaticPrincipal::of(provisional.uuid), &params("Youth"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[test]
fn create_group_makes_the_caller_the_first_leader() {
    let conn = open_db_in_memory().unwrap();
    let leader = seed_complete(&conn, "Leader", "leader@example.com", Gender::Male);

    let service = group_service(&conn);
    let group = service
        .create_group(&StaticPrincipal::of(leader.uuid), &params("Youth"))
        .unwrap();

    assert_eq!(group.leaders, vec![leader.uuid]);
    assert!(group.disciples.is_empty());
    assert_eq!(group.invitation_code.len(), 8);
    assert!(group
        .invitation_code
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
}

#[test]
fn co_leader_roster_is_capped_at_two() {
    let conn = open_db_in_memory().unwrap();
    let leader = seed_complete(&conn, "Leader", "leader@example.com", Gender::Male);
    let co = seed_complete(&conn, "Co", "co@example.com", Gender::Female);
    let third = seed_complete(&conn, "Third", "third@example.com", Gender::Male);

    let service = group_service(&conn);
    let auth = StaticPrincipal::of(leader.uuid);
    let group = service.create_group(&auth, &params("Youth")).unwrap();

    assert!(service
        .add_co_leader(&auth, group.uuid, "co@example.com")
        .unwrap());
    // Repeating the same co-leader is a distinct no-op success.
    assert!(!service
        .add_co_leader(&auth, group.uuid, "co@example.com")
        .unwrap());

    let err = service
        .add_co_leader(&auth, group.uuid, "third@example.com")
        .unwrap_err();
    assert!(matches!(err, ServiceError::GroupLeadersFull));

    let err = service
        .add_co_leader(&StaticPrincipal::of(third.uuid), group.uuid, "co@example.com")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[test]
fn join_validates_and_normalizes_the_code() {
    let conn = open_db_in_memory().unwrap();
    let leader = seed_complete(&conn, "Leader", "leader@example.com", Gender::Male);
    let ana = seed_complete(&conn, "Ana", "ana@example.com", Gender::Female);

    let service = group_service(&conn);
    let group = service
        .create_group(&StaticPrincipal::of(leader.uuid), &params("Youth"))
        .unwrap();

    let auth = StaticPrincipal::of(ana.uuid);
    let err = service.join_group(&auth, "not a code!").unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInvitationCode));
    let err = service.join_group(&auth, "zzzz9999").unwrap_err();
    assert!(matches!(err, ServiceError::GroupNotFound));

    let shouty = format!("  {}  ", group.invitation_code.to_uppercase());
    let outcome = service.join_group(&auth, &shouty).unwrap();
    assert_eq!(outcome, JoinOutcome::Joined);
    let outcome = service.join_group(&auth, &group.invitation_code).unwrap();
    assert_eq!(outcome, JoinOutcome::AlreadyMember);
}

#[test]
fn join_assigns_the_first_leader_only_when_unset() {
    let conn = open_db_in_memory().unwrap();
    let leader = seed_complete(&conn, "Leader", "leader@example.com", Gender::Male);
    let mentor = seed_complete(&conn, "Mentor", "mentor@example.com", Gender::Male);
    let ana = seed_complete(&conn, "Ana", "ana@example.com", Gender::Female);
    let bea = seed_complete(&conn, "Bea", "bea@example.com", Gender::Female);

    let users = SqliteUserRepository::try_new(&conn).unwrap();
    users.set_leader(bea.uuid, Some(mentor.uuid)).unwrap();

    let service = group_service(&conn);
    let group = service
        .create_group(&StaticPrincipal::of(leader.uuid), &params("Youth"))
        .unwrap();

    service
        .join_group(&StaticPrincipal::of(ana.uuid), &group.invitation_code)
        .unwrap();
    service
        .join_group(&StaticPrincipal::of(bea.uuid), &group.invitation_code)
        .unwrap();

    let ana_now = users.get_user(ana.uuid).unwrap().unwrap();
    assert_eq!(ana_now.leader_uuid, Some(leader.uuid));
    let bea_now = users.get_user(bea.uuid).unwrap().unwrap();
    assert_eq!(bea_now.leader_uuid, Some(mentor.uuid));
}

#[test]
fn remove_disciple_is_leader_only_and_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let leader = seed_complete(&conn, "Leader", "leader@example.com", Gender::Male);
    let ana = seed_complete(&conn, "Ana", "ana@example.com", Gender::Female);

    let service = group_service(&conn);
    let auth = StaticPrincipal::of(leader.uuid);
    let group = service.create_group(&auth, &params("Youth")).unwrap();
    service
        .join_group(&StaticPrincipal::of(ana.uuid), &group.invitation_code)
        .unwrap();

    let err = service
        .remove_disciple(&StaticPrincipal::of(ana.uuid), group.uuid, ana.uuid)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    service.remove_disciple(&auth, group.uuid, ana.uuid).unwrap();
    // Removing an absent disciple stays a no-op success.
    service.remove_disciple(&auth, group.uuid, ana.uuid).unwrap();

    let groups = SqliteGroupRepository::try_new(&conn).unwrap();
    let loaded = groups.get_group(group.uuid).unwrap().unwrap();
    assert!(loaded.disciples.is_empty());
}

#[test]
fn roster_is_visible_to_participants_only() {
    let conn = open_db_in_memory().unwrap();
    let leader = seed_complete(&conn, "Leader", "leader@example.com", Gender::Male);
    let ana = seed_complete(&conn, "Ana", "ana@example.com", Gender::Female);
    let outsider = seed_complete(&conn, "Out", "out@example.com", Gender::Male);

    let service = group_service(&conn);
    let group = service
        .create_group(&StaticPrincipal::of(leader.uuid), &params("Youth"))
        .unwrap();
    service
        .join_group(&StaticPrincipal::of(ana.uuid), &group.invitation_code)
        .unwrap();

    let err = service
        .group_roster(&StaticPrincipal::of(outsider.uuid), group.uuid)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let view = service
        .group_roster(&StaticPrincipal::of(ana.uuid), group.uuid)
        .unwrap();
    assert_eq!(view.leaders.len(), 1);
    assert_eq!(view.leaders[0].uuid, leader.uuid);
    assert_eq!(view.disciples.len(), 1);
    assert_eq!(view.disciples[0].uuid, ana.uuid);
}

#[test]
fn dangling_roster_entries_are_dropped_from_the_view() {
    let conn = open_db_in_memory().unwrap();
    let leader = seed_complete(&conn, "Leader", "leader@example.com", Gender::Male);
    let ana = seed_complete(&conn, "Ana", "ana@example.com", Gender::Female);

    let service = group_service(&conn);
    let group = service
        .create_group(&StaticPrincipal::of(leader.uuid), &params("Youth"))
        .unwrap();
    service
        .join_group(&StaticPrincipal::of(ana.uuid), &group.invitation_code)
        .unwrap();

    // Leave a stale roster row behind, as an out-of-band deletion would.
    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    conn.execute("DELETE FROM users WHERE uuid = ?1;", [ana.uuid.to_string()])
        .unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();

    let view = service
        .group_roster(&StaticPrincipal::of(leader.uuid), group.uuid)
        .unwrap();
    assert_eq!(view.group.disciples, vec![ana.uuid]);
    assert!(view.disciples.is_empty());
    assert_eq!(view.leaders.len(), 1);
}

fn group_service(
    conn: &Connection,
) -> GroupService<SqliteUserRepository<'_>, SqliteGroupRepository<'_>> {
    GroupService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteGroupRepository::try_new(conn).unwrap(),
    )
}

fn params(name: &str) -> NewGroup {
    NewGroup {
        name: name.to_string(),
        address: "1 Main St".to_string(),
        district: "Central".to_string(),
        min_age: Some(15),
        max_age: Some(25),
        day: "friday".to_string(),
        time: "20:00".to_string(),
    }
}

fn seed_incomplete(conn: &Connection, name: &str, email: &str) -> User {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let mut user = User::new(name);
    user.email = Some(email.to_string());
    users.create_user(&user).unwrap();
    user
}

fn seed_complete(conn: &Connection, name: &str, email: &str, gender: Gender) -> User {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let mut user = User::new(name);
    user.email = Some(email.to_string());
    user.role = Some(Role::Member);
    user.gender = Some(gender);
    users.create_user(&user).unwrap();
    user
}

use flock_core::db::open_db_in_memory;
use flock_core::{
    CourseService, Gender, Role, ServiceError, SqliteCatalogRepository, SqliteUserRepository,
    StaticPrincipal, User, UserRepository,
};
use rusqlite::Connection;

#[test]
fn course_creation_is_pastor_only() {
    let conn = open_db_in_memory().unwrap();
    let pastor = seed_user(&conn, "Pastor", "pastor@example.com", Role::Pastor);
    let member = seed_user(&conn, "Member", "member@example.com", Role::Member);

    let service = course_service(&conn);
    let err = service
        .create_course(&StaticPrincipal::of(member.uuid), "Foundations", None)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let course = service
        .create_course(
            &StaticPrincipal::of(pastor.uuid),
            "Foundations",
            Some("First steps".to_string()),
        )
        .unwrap();
    assert_eq!(course.name, "Foundations");

    let listed = service
        .list_courses(&StaticPrincipal::of(member.uuid))
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, course.uuid);
}

#[test]
fn listing_requires_a_principal() {
    let conn = open_db_in_memory().unwrap();

    let service = course_service(&conn);
    let err = service.list_courses(&StaticPrincipal::anonymous()).unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated));
}

#[test]
fn enrollment_preserves_order_and_tracks_the_school_flag() {
    let conn = open_db_in_memory().unwrap();
    let pastor = seed_user(&conn, "Pastor", "pastor@example.com", Role::Pastor);
    let ana = seed_user(&conn, "Ana", "ana@example.com", Role::Member);

    let service = course_service(&conn);
    let pastor_auth = StaticPrincipal::of(pastor.uuid);
    let first = service.create_course(&pastor_auth, "Foundations", None).unwrap();
    let second = service.create_course(&pastor_auth, "Leadership", None).unwrap();

    let auth = StaticPrincipal::of(ana.uuid);
    service.enroll(&auth, first.uuid).unwrap();
    service.enroll(&auth, second.uuid).unwrap();
    // Re-enrolling must not duplicate or reorder.
    service.enroll(&auth, first.uuid).unwrap();

    let users = SqliteUserRepository::try_new(&conn).unwrap();
    let loaded = users.get_user(ana.uuid).unwrap().unwrap();
    assert_eq!(loaded.current_courses, vec![first.uuid, second.uuid]);
    assert!(loaded.is_active_in_school);

    service.withdraw(&auth, first.uuid).unwrap();
    let loaded = users.get_user(ana.uuid).unwrap().unwrap();
    assert_eq!(loaded.current_courses, vec![second.uuid]);
    assert!(loaded.is_active_in_school);

    service.withdraw(&auth, second.uuid).unwrap();
    let loaded = users.get_user(ana.uuid).unwrap().unwrap();
    assert!(loaded.current_courses.is_empty());
    assert!(!loaded.is_active_in_school);
}

#[test]
fn withdrawing_from_an_unknown_course_fails() {
    let conn = open_db_in_memory().unwrap();
    let ana = seed_user(&conn, "Ana", "ana@example.com", Role::Member);

    let service = course_service(&conn);
    let err = service
        .withdraw(&StaticPrincipal::of(ana.uuid), uuid::Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, ServiceError::CourseNotFound));
}

#[test]
fn withdrawing_without_enrollment_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let pastor = seed_user(&conn, "Pastor", "pastor@example.com", Role::Pastor);
    let ana = seed_user(&conn, "Ana", "ana@example.com", Role::Member);

    let service = course_service(&conn);
    let course = service
        .create_course(&StaticPrincipal::of(pastor.uuid), "Foundations", None)
        .unwrap();

    service
        .withdraw(&StaticPrincipal::of(ana.uuid), course.uuid)
        .unwrap();
}

fn course_service(
    conn: &Connection,
) -> CourseService<SqliteUserRepository<'_>, SqliteCatalogRepository<'_>> {
    CourseService::new(
        SqliteUserRepository::try_new(conn).unwrap(),
        SqliteCatalogRepository::try_new(conn).unwrap(),
    )
}

fn seed_user(conn: &Connection, name: &str, email: &str, role: Role) -> User {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let mut user = User::new(name);
    user.email = Some(email.to_string());
    user.role = Some(role);
    user.gender = Some(Gender::Female);
    users.create_user(&user).unwrap();
    user
}

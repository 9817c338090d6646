//! Pins the JSON shapes the operation boundary relies on.

use flock_core::{
    AddMemberOutcome, AttendanceStatus, Dashboard, Gender, GridStats, JoinOutcome, Role, User,
    UserSummary,
};
use serde_json::{json, to_value};

#[test]
fn role_gender_and_status_serialize_snake_case() {
    assert_eq!(to_value(Role::Pastor).unwrap(), json!("pastor"));
    assert_eq!(to_value(Gender::Female).unwrap(), json!("female"));
    assert_eq!(
        to_value(AttendanceStatus::Confirmed).unwrap(),
        json!("confirmed")
    );
    assert_eq!(
        serde_json::from_value::<AttendanceStatus>(json!("denied")).unwrap(),
        AttendanceStatus::Denied
    );
}

#[test]
fn outcome_enums_serialize_snake_case() {
    assert_eq!(to_value(JoinOutcome::AlreadyMember).unwrap(), json!("already_member"));
    assert_eq!(to_value(AddMemberOutcome::Added).unwrap(), json!("added"));
}

#[test]
fn user_summary_carries_the_public_projection_fields() {
    let mut user = User::new("Ana");
    user.email = Some("ana@example.com".to_string());
    user.role = Some(Role::Member);
    user.gender = Some(Gender::Female);

    let value = to_value(UserSummary::from(&user)).unwrap();
    assert_eq!(
        value,
        json!({
            "uuid": user.uuid,
            "name": "Ana",
            "email": "ana@example.com",
            "role": "member",
            "gender": "female",
        })
    );
}

#[test]
fn empty_dashboard_has_stable_keys() {
    let dashboard = Dashboard {
        group_as_disciple: None,
        groups_as_leader: Vec::new(),
        courses: Vec::new(),
        grid: None,
    };
    assert_eq!(
        to_value(&dashboard).unwrap(),
        json!({
            "group_as_disciple": null,
            "groups_as_leader": [],
            "courses": [],
            "grid": null,
        })
    );
}

#[test]
fn grid_stats_zero_state_serializes_all_counters() {
    assert_eq!(
        to_value(GridStats::default()).unwrap(),
        json!({
            "total_members": 0,
            "members_in_school": 0,
            "total_groups": 0,
            "male_count": 0,
            "female_count": 0,
        })
    );
}

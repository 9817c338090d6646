//! Domain model for the membership graph.
//!
//! # Responsibility
//! - Define canonical entity structs and closed role/status enums.
//! - Keep cross-entity references as stable ids, resolved by services.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - A user's `leader_uuid`, when set, references a different user.
//! - Grid membership lives on the user record, never on the grid.

pub mod activity;
pub mod course;
pub mod grid;
pub mod group;
pub mod user;

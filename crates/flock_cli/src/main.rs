//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `flock_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("flock_core ping={}", flock_core::ping());
    println!("flock_core version={}", flock_core::core_version());
    match flock_core::db::open_db_in_memory() {
        Ok(_) => println!("flock_core schema=ok"),
        Err(err) => println!("flock_core schema=error detail={err}"),
    }
}

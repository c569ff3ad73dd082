//! Storyloom game session and scene lifecycle.
//!
//! Responsible for the card catalog, per-game card allocation, the session
//! record, turn submission and voting, ending-card rerolls and prompt
//! validation.

pub mod application;
pub mod domain;

//! Application layer for the game context.

pub mod command_handlers;
pub mod config;
pub mod query_handlers;
pub mod session_gateway;

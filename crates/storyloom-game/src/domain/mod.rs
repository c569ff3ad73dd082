//! Domain layer for the game context.

pub mod allocation;
pub mod cards;
pub mod commands;
pub mod session;
pub mod tokenizer;
pub mod validation;

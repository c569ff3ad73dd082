//! Storyloom core: shared abstractions.
//!
//! This crate defines the error taxonomy, the determinism seams (clock and
//! RNG) and the traits for every collaborator the engine talks to: the session
//! cache, the scene keyspace, the book store, the blob store, the illustration
//! services and the tokenizer. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod ports;
pub mod repository;
pub mod rng;

//! Storyloom storage adapters.
//!
//! In-process implementations of the session cache and scene keyspace, local
//! and in-memory blob stores, and the `PostgreSQL` book repository.

pub mod blob_store;
pub mod pg_book_repository;
pub mod scene_store;
pub mod schema;
pub mod session_cache;

//! Storyloom illustration service client.
//!
//! A reqwest-based implementation of the `ImageGenerator` and
//! `CoverGenerator` ports.

mod client;

pub use client::{DEFAULT_TIMEOUT, HttpIllustrator};

//! Storyloom book compilation.
//!
//! Turns the accepted scenes of a finished game into a persisted book with a
//! generated title and cover, then purges the game's transient state.

mod pipeline;

pub use pipeline::{
    DEFAULT_UPLOAD_CONCURRENCY, FinalizationPipeline, PipelineConfig, cover_key, scene_key,
};

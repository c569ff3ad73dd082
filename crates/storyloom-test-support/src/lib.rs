//! Shared test doubles for the Storyloom storytelling engine.

mod clock;
mod collaborators;
mod repository;
mod rng;

pub use clock::{FixedClock, ManualClock};
pub use collaborators::{
    FailingCoverGenerator, FailingImageGenerator, RecordingBlobStore, StubCoverGenerator,
    StubImageGenerator,
};
pub use repository::{
    FailingBookRepository, FailingSceneRepository, FailingSessionRepository,
    RecordingBookRepository, RecordingSceneRepository, RecordingSessionRepository,
};
pub use rng::{MockRng, SequenceRng};

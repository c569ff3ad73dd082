//! Stub illustration services and a recording blob store.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use storyloom_core::error::DomainError;
use storyloom_core::ports::{
    BlobStore, CoverGenerator, CoverRequest, GeneratedCover, GeneratedImage, ImageAsset,
    ImageGenerator, SceneImageRequest,
};

/// An image generator that returns the same bytes for every request and
/// records what it was asked for.
#[derive(Debug)]
pub struct StubImageGenerator {
    bytes: Vec<u8>,
    delay: Duration,
    requests: Mutex<Vec<SceneImageRequest>>,
}

impl StubImageGenerator {
    /// Create a generator that answers every request with `bytes`.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Makes every request take `delay` before it answers.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns a snapshot of every request received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<SceneImageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for StubImageGenerator {
    async fn generate_scene(
        &self,
        request: &SceneImageRequest,
    ) -> Result<GeneratedImage, DomainError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(GeneratedImage {
            bytes: self.bytes.clone(),
            caption: None,
        })
    }
}

/// An image generator that always fails.
#[derive(Debug)]
pub struct FailingImageGenerator;

#[async_trait]
impl ImageGenerator for FailingImageGenerator {
    async fn generate_scene(
        &self,
        _request: &SceneImageRequest,
    ) -> Result<GeneratedImage, DomainError> {
        Err(DomainError::GenerationUnavailable("service timeout".into()))
    }
}

/// A cover generator that returns a configured title and cover and records
/// what it was asked for.
#[derive(Debug)]
pub struct StubCoverGenerator {
    title: String,
    cover: ImageAsset,
    requests: Mutex<Vec<CoverRequest>>,
}

impl StubCoverGenerator {
    /// Create a generator that answers every request with `title` and `cover`.
    #[must_use]
    pub fn new(title: impl Into<String>, cover: ImageAsset) -> Self {
        Self {
            title: title.into(),
            cover,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of every request received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<CoverRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CoverGenerator for StubCoverGenerator {
    async fn generate_cover(&self, request: &CoverRequest) -> Result<GeneratedCover, DomainError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(GeneratedCover {
            title: self.title.clone(),
            cover: self.cover.clone(),
        })
    }
}

/// A cover generator that always fails.
#[derive(Debug)]
pub struct FailingCoverGenerator;

#[async_trait]
impl CoverGenerator for FailingCoverGenerator {
    async fn generate_cover(&self, _request: &CoverRequest) -> Result<GeneratedCover, DomainError> {
        Err(DomainError::GenerationUnavailable("service timeout".into()))
    }
}

/// A blob store that keeps objects in memory and can be told to reject some
/// or all writes. It also tracks how many writes were in flight at once.
#[derive(Debug, Default)]
pub struct RecordingBlobStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_suffixes: HashSet<String>,
    fail_all: bool,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl RecordingBlobStore {
    /// Create a store that accepts every write.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes to keys ending with any of
    /// `suffixes`. Suffixes let tests target keys whose prefix is generated.
    #[must_use]
    pub fn failing_on<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing_suffixes: suffixes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Create a store that rejects every write.
    #[must_use]
    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Makes every write take `delay` before it completes.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The largest number of writes that were in progress at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Returns the keys written so far, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), DomainError> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_all || self.failing_suffixes.iter().any(|s| key.ends_with(s.as_str())) {
            return Err(DomainError::StorageUnavailable(format!(
                "write rejected for {key}"
            )));
        }
        self.objects.lock().unwrap().insert(key.to_owned(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, DomainError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("blob {key}")))
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://blobs.test/{key}")
    }
}

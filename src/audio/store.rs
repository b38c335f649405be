//! Audio resource store
//!
//! Maps a song's resource key to decoded PCM. A missing resource is
//! `ResourceNotFound`; a resource that exists but cannot be decoded is
//! `DecodeFailure`.

use crate::audio::wav::read_wav;
use crate::{Result, TurnUpError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Decoded, ready-to-play audio
#[derive(Clone, Debug)]
pub struct DecodedTrack {
    /// Resource key the track was loaded from
    pub resource: String,
    /// Interleaved samples in -1.0..=1.0
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedTrack {
    pub fn new(resource: impl Into<String>, samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            resource: resource.into(),
            samples: Arc::new(samples),
            sample_rate,
            channels,
        }
    }

    /// Silent track of the given length, at a low sample rate to keep it cheap
    pub fn silence(resource: impl Into<String>, duration: Duration) -> Self {
        const RATE: u32 = 100;
        let frames = (duration.as_secs_f64() * RATE as f64).round() as usize;
        Self::new(resource, vec![0.0; frames], RATE, 1)
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Total playing time
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Keyed lookup of decodable audio
pub trait AudioStore: Send {
    /// Load and decode the resource
    fn load(&self, resource: &str) -> Result<DecodedTrack>;
}

/// Store backed by a directory of audio files named `<resource>.<extension>`
#[derive(Debug, Clone)]
pub struct DirectoryAudioStore {
    root: PathBuf,
    extension: String,
}

impl DirectoryAudioStore {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a resource key resolves to
    pub fn path_for(&self, resource: &str) -> PathBuf {
        self.root.join(format!("{}.{}", resource, self.extension))
    }
}

impl AudioStore for DirectoryAudioStore {
    fn load(&self, resource: &str) -> Result<DecodedTrack> {
        let path = self.path_for(resource);
        if !path.is_file() {
            warn!("Song not found: {}", path.display());
            return Err(TurnUpError::ResourceNotFound(resource.to_string()));
        }

        let (samples, sample_rate, channels) = read_wav(&path)?;
        let track = DecodedTrack::new(resource, samples, sample_rate, channels);
        debug!(
            "Loaded {} ({:.1}s)",
            path.display(),
            track.duration().as_secs_f32()
        );
        Ok(track)
    }
}

/// In-memory store, mostly for tests and demos
#[derive(Clone, Default)]
pub struct MemoryAudioStore {
    tracks: Arc<RwLock<HashMap<String, DecodedTrack>>>,
    corrupt: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryAudioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoded track under its resource key
    pub fn insert(&self, track: DecodedTrack) {
        self.tracks.write().insert(track.resource.clone(), track);
    }

    /// Register a silent track of the given length
    pub fn insert_silence(&self, resource: &str, duration: Duration) {
        self.insert(DecodedTrack::silence(resource, duration));
    }

    /// Register a resource that exists but fails to decode
    pub fn insert_corrupt(&self, resource: &str, reason: &str) {
        self.corrupt
            .write()
            .insert(resource.to_string(), reason.to_string());
    }

    /// Forget a resource
    pub fn remove(&self, resource: &str) {
        self.tracks.write().remove(resource);
        self.corrupt.write().remove(resource);
    }

    /// Builder helper: silent tracks for every song in a catalog
    pub fn with_catalog(catalog: &crate::catalog::Catalog, duration: Duration) -> Self {
        let store = Self::new();
        for playlist in catalog
            .playlists()
            .iter()
            .chain(std::iter::once(catalog.hidden()))
        {
            for song in &playlist.songs {
                store.insert_silence(&song.file_name, duration);
            }
        }
        store
    }
}

impl AudioStore for MemoryAudioStore {
    fn load(&self, resource: &str) -> Result<DecodedTrack> {
        if let Some(reason) = self.corrupt.read().get(resource) {
            return Err(TurnUpError::DecodeFailure(format!("{}: {}", resource, reason)));
        }
        self.tracks
            .read()
            .get(resource)
            .cloned()
            .ok_or_else(|| TurnUpError::ResourceNotFound(resource.to_string()))
    }
}

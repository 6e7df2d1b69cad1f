//! Playback backend seam
//!
//! The cue engine never touches sample buffers. Everything that crosses into
//! "currently rendering" state goes through [`PlaybackBackend`]: open a voice,
//! send it parameter updates, release it, and ask whether it finished.
//!
//! Two implementations ship with the crate:
//! - [`QueuedBackend`] / [`VoiceRenderer`]: logic side and real-time side of an
//!   rtrb command ring. The renderer lives on the audio callback.
//! - [`OfflineBackend`]: single-threaded and deterministic, advanced by hand.

mod offline;
mod queue;

pub use offline::{BackendOp, OfflineBackend, OfflineVoice};
pub use queue::{QueuedBackend, RenderVoice, VoiceRenderer, create_voice_queue};

use cf_core::Position3D;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BackendError;
use crate::track::LoopPolicy;
use crate::wave::WaveResource;

/// Backend voice identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle(pub u64);

/// Everything a backend needs to start a voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceRequest {
    pub resource: WaveResource,
    /// Source frames per pass
    pub frames: u64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Effective volume (dB)
    pub volume_db: f32,
    /// Effective pitch (semitones)
    pub pitch: f32,
    pub pan: f32,
    /// Effective reverb send (dB)
    pub reverb_send_db: f32,
    pub loop_policy: LoopPolicy,
    /// Emitter placement for positional sounds
    pub position: Option<Position3D>,
    pub emitter_radius: f32,
}

/// Parameter change for an open voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceUpdate {
    Volume(f32),
    Pitch(f32),
    Pan(f32),
    ReverbSend(f32),
    Filter { frequency: f32, q: f32 },
    Position { position: Position3D, radius: f32 },
    Paused(bool),
}

/// Voice-level audio output
///
/// Every method runs on the logic tick and must not block.
pub trait PlaybackBackend: Send {
    /// Collect render-side notifications (finished voices); called once per tick
    fn poll(&mut self) {}

    /// Open a voice for a wave resource
    fn open(&mut self, request: &VoiceRequest) -> Result<VoiceHandle, BackendError>;

    /// Send a parameter change to an open voice
    fn update(&mut self, voice: VoiceHandle, update: VoiceUpdate);

    /// Stop and release a voice; unknown handles are ignored
    fn release(&mut self, voice: VoiceHandle);

    /// Whether a voice reached its end (unknown handles count as finished)
    fn is_finished(&self, voice: VoiceHandle) -> bool;

    /// Number of open voices
    fn active_voices(&self) -> usize;
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESIDENCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Which wave resources have their data in memory
///
/// Shared between the loader (which marks resources resident) and a backend
/// (which refuses to open voices for resources that are not). Cloning shares
/// the same table.
#[derive(Debug, Clone, Default)]
pub struct WaveResidency {
    /// resource → loaded
    table: Arc<RwLock<HashMap<WaveResource, bool>>>,
}

impl WaveResidency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a resource whose data is still loading
    pub fn register(&self, resource: WaveResource) {
        self.table.write().entry(resource).or_insert(false);
    }

    /// Mark a resource's data as resident
    pub fn mark_loaded(&self, resource: WaveResource) {
        self.table.write().insert(resource, true);
    }

    /// Forget a resource
    pub fn unload(&self, resource: WaveResource) {
        self.table.write().remove(&resource);
    }

    pub fn is_loaded(&self, resource: WaveResource) -> bool {
        self.table.read().get(&resource).copied().unwrap_or(false)
    }

    /// Open-time check: unknown resources fail, loading ones are not ready
    pub fn check(&self, resource: WaveResource) -> Result<(), BackendError> {
        match self.table.read().get(&resource) {
            Some(true) => Ok(()),
            Some(false) => Err(BackendError::NotReady),
            None => Err(BackendError::UnknownResource(resource.0)),
        }
    }
}

//! Sound definitions

use serde::{Deserialize, Serialize};

use crate::category::{CategoryIndex, DEFAULT_CATEGORY};
use crate::track::Track;

/// Index of a sound inside its bank
pub type SoundIndex = u32;

/// One or more tracks that play together as a single take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sound {
    pub name: String,
    pub category: CategoryIndex,
    /// Base volume (dB)
    pub volume_db: f32,
    /// Base pitch (semitones)
    pub pitch: f32,
    /// Whether the sound follows the emitter position
    pub positional: bool,
    pub tracks: Vec<Track>,
    /// RPC curve IDs applying to every track
    pub rpc_curves: Vec<u32>,
}

impl Sound {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: DEFAULT_CATEGORY,
            volume_db: 0.0,
            pitch: 0.0,
            positional: false,
            tracks: Vec::new(),
            rpc_curves: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: CategoryIndex) -> Self {
        self.category = category;
        self
    }

    pub fn with_volume(mut self, db: f32) -> Self {
        self.volume_db = db;
        self
    }

    pub fn with_pitch(mut self, semitones: f32) -> Self {
        self.pitch = semitones;
        self
    }

    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn with_curve(mut self, curve_id: u32) -> Self {
        self.rpc_curves.push(curve_id);
        self
    }
}

//! Engine configuration

use serde::{Deserialize, Serialize};

/// Configuration for an [`AudioEngine`](crate::AudioEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Random seed for variation selection (None = OS entropy)
    pub seed: Option<u64>,

    /// Maximum deferred play requests per cue (Queue limit behavior)
    pub max_queued_per_cue: usize,

    /// Capacity of the logic → render voice command ring
    pub voice_queue_capacity: usize,

    /// Maximum simultaneously open backend voices
    pub max_voices: usize,

    /// Upper bound on a single tick's time step (seconds)
    ///
    /// Protects timelines from a huge jump after a stall.
    pub max_frame_delta_secs: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_queued_per_cue: 16,
            voice_queue_capacity: 4096,
            max_voices: 256,
            max_frame_delta_secs: 0.25,
        }
    }
}

impl EngineConfig {
    /// Deterministic config for tests and offline tools
    pub fn deterministic(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Small footprint config for constrained targets
    pub fn compact() -> Self {
        Self {
            max_queued_per_cue: 4,
            voice_queue_capacity: 512,
            max_voices: 32,
            ..Default::default()
        }
    }

    /// Parse from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Replace unusable values with defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.voice_queue_capacity == 0 {
            log::warn!("voice_queue_capacity must be > 0, using default");
            self.voice_queue_capacity = defaults.voice_queue_capacity;
        }
        if self.max_voices == 0 {
            log::warn!("max_voices must be > 0, using default");
            self.max_voices = defaults.max_voices;
        }
        if !(self.max_frame_delta_secs > 0.0) {
            log::warn!("max_frame_delta_secs must be > 0, using default");
            self.max_frame_delta_secs = defaults.max_frame_delta_secs;
        }
        self
    }
}

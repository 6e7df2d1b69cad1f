//! Wave definitions

use serde::{Deserialize, Serialize};

/// Index of a wave inside its bank
pub type WaveIndex = usize;

/// Opaque handle of a backend audio resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveResource(pub u32);

/// Reference to an audio resource plus its format
///
/// A wave without a resource is silent: it has a duration but no samples and
/// is timed by the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub name: String,
    pub resource: Option<WaveResource>,
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: u64,
}

impl Wave {
    /// Wave backed by a resource
    pub fn new(
        name: impl Into<String>,
        resource: WaveResource,
        channels: u16,
        sample_rate: u32,
        frames: u64,
    ) -> Self {
        Self {
            name: name.into(),
            resource: Some(resource),
            channels,
            sample_rate,
            frames,
        }
    }

    /// Silent placeholder lasting `frames` at `sample_rate`
    pub fn silent(name: impl Into<String>, sample_rate: u32, frames: u64) -> Self {
        Self {
            name: name.into(),
            resource: None,
            channels: 1,
            sample_rate,
            frames,
        }
    }

    #[inline]
    pub fn is_silent(&self) -> bool {
        self.resource.is_none()
    }

    /// Duration of one pass in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

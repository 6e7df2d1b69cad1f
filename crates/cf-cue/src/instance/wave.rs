//! Wave instances: one playing wave on a track

use cf_core::Position3D;

use crate::backend::{PlaybackBackend, VoiceHandle, VoiceRequest, VoiceUpdate};
use crate::error::BackendError;
use crate::track::LoopPolicy;
use crate::wave::{Wave, WaveIndex};

/// Changes below this are not sent to the backend
const LEVEL_EPSILON: f32 = 1e-4;

/// Composed levels of a track
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackLevels {
    pub volume_db: f32,
    pub pitch: f32,
    pub pan: f32,
    pub reverb_send_db: f32,
    pub filter_frequency: Option<f32>,
    pub filter_q: Option<f32>,
}

/// Where a wave's audio comes from
#[derive(Debug, Clone, Copy, PartialEq)]
enum Playback {
    /// Backend voice
    Voice(VoiceHandle),
    /// Silent wave timed here (None = loops forever)
    Silent { elapsed: f64, length: Option<f64> },
}

/// A wave playing on a track
#[derive(Debug, Clone, PartialEq)]
pub struct WaveInstance {
    wave: WaveIndex,
    playback: Playback,
    paused: bool,
    /// Last levels sent to the backend
    sent: TrackLevels,
}

impl WaveInstance {
    /// Start a wave; silent waves never reach the backend
    pub fn start(
        index: WaveIndex,
        wave: &Wave,
        levels: TrackLevels,
        loop_policy: LoopPolicy,
        placement: Option<(Position3D, f32)>,
        backend: &mut dyn PlaybackBackend,
    ) -> Result<Self, BackendError> {
        let playback = match wave.resource {
            None => Playback::Silent {
                elapsed: 0.0,
                length: loop_policy
                    .passes()
                    .map(|passes| wave.duration_secs() * passes as f64),
            },
            Some(resource) => {
                let request = VoiceRequest {
                    resource,
                    frames: wave.frames,
                    sample_rate: wave.sample_rate,
                    channels: wave.channels,
                    volume_db: levels.volume_db,
                    pitch: levels.pitch,
                    pan: levels.pan,
                    reverb_send_db: levels.reverb_send_db,
                    loop_policy,
                    position: placement.map(|(position, _)| position),
                    emitter_radius: placement.map_or(0.0, |(_, radius)| radius),
                };
                let voice = backend.open(&request)?;
                if let (Some(frequency), Some(q)) = (levels.filter_frequency, levels.filter_q) {
                    backend.update(voice, VoiceUpdate::Filter { frequency, q });
                }
                Playback::Voice(voice)
            }
        };

        Ok(Self {
            wave: index,
            playback,
            paused: false,
            sent: levels,
        })
    }

    pub fn wave(&self) -> WaveIndex {
        self.wave
    }

    /// Backend voice, if any
    pub fn voice(&self) -> Option<VoiceHandle> {
        match self.playback {
            Playback::Voice(voice) => Some(voice),
            Playback::Silent { .. } => None,
        }
    }

    /// Levels most recently sent
    pub fn levels(&self) -> &TrackLevels {
        &self.sent
    }

    /// Advance internal timing (silent waves only)
    pub fn advance(&mut self, dt: f64) {
        if self.paused {
            return;
        }
        if let Playback::Silent { elapsed, .. } = &mut self.playback {
            *elapsed += dt;
        }
    }

    pub fn is_finished(&self, backend: &dyn PlaybackBackend) -> bool {
        match self.playback {
            Playback::Voice(voice) => backend.is_finished(voice),
            Playback::Silent { elapsed, length } => length.is_some_and(|len| elapsed >= len),
        }
    }

    /// Send the levels that changed since the last call
    pub fn apply_levels(&mut self, levels: &TrackLevels, backend: &mut dyn PlaybackBackend) {
        if let Playback::Voice(voice) = self.playback {
            let sent = &self.sent;
            if differs(sent.volume_db, levels.volume_db) {
                backend.update(voice, VoiceUpdate::Volume(levels.volume_db));
            }
            if differs(sent.pitch, levels.pitch) {
                backend.update(voice, VoiceUpdate::Pitch(levels.pitch));
            }
            if differs(sent.pan, levels.pan) {
                backend.update(voice, VoiceUpdate::Pan(levels.pan));
            }
            if differs(sent.reverb_send_db, levels.reverb_send_db) {
                backend.update(voice, VoiceUpdate::ReverbSend(levels.reverb_send_db));
            }
            if (sent.filter_frequency, sent.filter_q) != (levels.filter_frequency, levels.filter_q)
            {
                if let (Some(frequency), Some(q)) = (levels.filter_frequency, levels.filter_q) {
                    backend.update(voice, VoiceUpdate::Filter { frequency, q });
                }
            }
        }
        self.sent = *levels;
    }

    /// Send only a reverb send change
    pub fn apply_reverb(&mut self, reverb_send_db: f32, backend: &mut dyn PlaybackBackend) {
        if let Playback::Voice(voice) = self.playback {
            if differs(self.sent.reverb_send_db, reverb_send_db) {
                backend.update(voice, VoiceUpdate::ReverbSend(reverb_send_db));
            }
        }
        self.sent.reverb_send_db = reverb_send_db;
    }

    pub fn set_placement(&mut self, position: Position3D, radius: f32, backend: &mut dyn PlaybackBackend) {
        if let Playback::Voice(voice) = self.playback {
            backend.update(voice, VoiceUpdate::Position { position, radius });
        }
    }

    pub fn set_paused(&mut self, paused: bool, backend: &mut dyn PlaybackBackend) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        if let Playback::Voice(voice) = self.playback {
            backend.update(voice, VoiceUpdate::Paused(paused));
        }
    }

    /// Release the backend voice
    pub fn stop(self, backend: &mut dyn PlaybackBackend) {
        if let Playback::Voice(voice) = self.playback {
            backend.release(voice);
        }
    }
}

#[inline]
fn differs(a: f32, b: f32) -> bool {
    (a - b).abs() > LEVEL_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendOp, OfflineBackend};
    use crate::wave::WaveResource;

    #[test]
    fn test_voice_wave_lifecycle() {
        let mut backend = OfflineBackend::new();
        let wave = Wave::new("a", WaveResource(1), 1, 1000, 1000);
        let mut inst = WaveInstance::start(
            0,
            &wave,
            TrackLevels::default(),
            LoopPolicy::None,
            None,
            &mut backend,
        )
        .unwrap();
        let voice = inst.voice().unwrap();

        inst.apply_levels(
            &TrackLevels {
                volume_db: -6.0,
                ..Default::default()
            },
            &mut backend,
        );
        // Unchanged levels are not resent
        inst.apply_levels(
            &TrackLevels {
                volume_db: -6.0,
                ..Default::default()
            },
            &mut backend,
        );
        let updates = backend
            .ops()
            .iter()
            .filter(|op| matches!(op, BackendOp::Update { .. }))
            .count();
        assert_eq!(updates, 1);

        backend.advance(1.0);
        assert!(inst.is_finished(&backend));
        inst.stop(&mut backend);
        assert_eq!(backend.ops().last(), Some(&BackendOp::Release { voice }));
    }

    #[test]
    fn test_silent_wave_timed_locally() {
        let mut backend = OfflineBackend::new();
        let wave = Wave::silent("gap", 1000, 500);
        let mut inst = WaveInstance::start(
            0,
            &wave,
            TrackLevels::default(),
            LoopPolicy::Count(1),
            None,
            &mut backend,
        )
        .unwrap();
        assert!(inst.voice().is_none());
        assert!(backend.ops().is_empty());

        inst.advance(0.5);
        assert!(!inst.is_finished(&backend));
        inst.set_paused(true, &mut backend);
        inst.advance(10.0);
        assert!(!inst.is_finished(&backend));
        inst.set_paused(false, &mut backend);
        inst.advance(0.5);
        assert!(inst.is_finished(&backend));
    }
}

//! Deterministic single-threaded backend
//!
//! Voices advance only when [`OfflineBackend::advance`] is called, and every
//! operation is recorded. Used by the CLI and by tests.

use cf_core::semitones_to_ratio;
use std::collections::BTreeMap;

use super::{PlaybackBackend, VoiceHandle, VoiceRequest, VoiceUpdate, WaveResidency};
use crate::error::BackendError;
use crate::wave::WaveResource;

/// Recorded backend call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackendOp {
    Open {
        voice: VoiceHandle,
        resource: WaveResource,
    },
    Update {
        voice: VoiceHandle,
        update: VoiceUpdate,
    },
    Release {
        voice: VoiceHandle,
    },
}

/// State of one offline voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfflineVoice {
    pub request: VoiceRequest,
    pub volume_db: f32,
    pub pitch: f32,
    pub pan: f32,
    pub reverb_send_db: f32,
    pub paused: bool,
    /// Source-time played so far (seconds, pitch applied)
    pub elapsed_secs: f64,
    pub finished: bool,
}

impl OfflineVoice {
    fn new(request: &VoiceRequest) -> Self {
        Self {
            request: *request,
            volume_db: request.volume_db,
            pitch: request.pitch,
            pan: request.pan,
            reverb_send_db: request.reverb_send_db,
            paused: false,
            elapsed_secs: 0.0,
            finished: false,
        }
    }

    fn pass_secs(&self) -> f64 {
        if self.request.sample_rate == 0 {
            return 0.0;
        }
        self.request.frames as f64 / self.request.sample_rate as f64
    }
}

/// Backend that renders nothing and keeps a log
#[derive(Debug, Default)]
pub struct OfflineBackend {
    voices: BTreeMap<VoiceHandle, OfflineVoice>,
    ops: Vec<BackendOp>,
    residency: Option<WaveResidency>,
    next_voice: u64,
    max_voices: Option<usize>,
}

impl OfflineBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap simultaneously open voices
    pub fn with_max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = Some(max_voices);
        self
    }

    /// Refuse voices for resources that are not resident
    pub fn with_residency(mut self, residency: WaveResidency) -> Self {
        self.residency = Some(residency);
        self
    }

    /// Let time pass for every unpaused voice
    pub fn advance(&mut self, secs: f64) {
        for voice in self.voices.values_mut() {
            if voice.paused || voice.finished {
                continue;
            }
            voice.elapsed_secs += secs * semitones_to_ratio(voice.pitch) as f64;

            let pass = voice.pass_secs();
            voice.finished = match voice.request.loop_policy.passes() {
                _ if pass <= 0.0 => true,
                Some(passes) => voice.elapsed_secs >= pass * passes as f64,
                None => false,
            };
        }
    }

    pub fn voice(&self, handle: VoiceHandle) -> Option<&OfflineVoice> {
        self.voices.get(&handle)
    }

    /// Open voices in handle order
    pub fn voices(&self) -> impl Iterator<Item = (&VoiceHandle, &OfflineVoice)> {
        self.voices.iter()
    }

    /// Recorded operations
    pub fn ops(&self) -> &[BackendOp] {
        &self.ops
    }

    /// Take and clear the operation log
    pub fn take_ops(&mut self) -> Vec<BackendOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of voices opened so far
    pub fn opened_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, BackendOp::Open { .. }))
            .count()
    }
}

impl PlaybackBackend for OfflineBackend {
    fn open(&mut self, request: &VoiceRequest) -> Result<VoiceHandle, BackendError> {
        if let Some(residency) = &self.residency {
            residency.check(request.resource)?;
        }
        if self
            .max_voices
            .is_some_and(|max| self.voices.len() >= max)
        {
            return Err(BackendError::VoiceLimit);
        }

        self.next_voice += 1;
        let voice = VoiceHandle(self.next_voice);
        self.voices.insert(voice, OfflineVoice::new(request));
        self.ops.push(BackendOp::Open {
            voice,
            resource: request.resource,
        });
        Ok(voice)
    }

    fn update(&mut self, voice: VoiceHandle, update: VoiceUpdate) {
        let Some(v) = self.voices.get_mut(&voice) else {
            return;
        };
        match update {
            VoiceUpdate::Volume(db) => v.volume_db = db,
            VoiceUpdate::Pitch(semitones) => v.pitch = semitones,
            VoiceUpdate::Pan(pan) => v.pan = pan,
            VoiceUpdate::ReverbSend(db) => v.reverb_send_db = db,
            VoiceUpdate::Paused(paused) => v.paused = paused,
            VoiceUpdate::Filter { .. } | VoiceUpdate::Position { .. } => {}
        }
        self.ops.push(BackendOp::Update { voice, update });
    }

    fn release(&mut self, voice: VoiceHandle) {
        if self.voices.remove(&voice).is_some() {
            self.ops.push(BackendOp::Release { voice });
        }
    }

    fn is_finished(&self, voice: VoiceHandle) -> bool {
        self.voices.get(&voice).is_none_or(|v| v.finished)
    }

    fn active_voices(&self) -> usize {
        self.voices.len()
    }
}

//! Lock-free voice queue between the logic tick and the audio callback
//!
//! ## Thread Safety Design
//!
//! - `QueuedBackend`: logic-thread side. Owns the command producer and the
//!   finished-voice consumer; implements [`PlaybackBackend`].
//! - `VoiceRenderer`: audio-thread side. Owns the command consumer and the
//!   finished-voice producer. `process` never allocates or blocks.
//!
//! ```text
//!   logic tick                         audio callback
//!  ┌──────────────┐  VoiceCommand    ┌───────────────┐
//!  │ QueuedBackend│ ───── rtrb ────► │ VoiceRenderer │
//!  │              │ ◄──── rtrb ───── │               │
//!  └──────────────┘  finished voice  └───────────────┘
//! ```

use cf_core::{db_to_gain, semitones_to_ratio};
use rtrb::{Consumer, Producer, RingBuffer};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{PlaybackBackend, VoiceHandle, VoiceRequest, VoiceUpdate, WaveResidency};
use crate::error::BackendError;

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Commands sent from the logic tick to the audio callback
#[derive(Debug, Clone, Copy)]
enum VoiceCommand {
    Start {
        voice: VoiceHandle,
        request: VoiceRequest,
    },
    Update {
        voice: VoiceHandle,
        update: VoiceUpdate,
    },
    Stop {
        voice: VoiceHandle,
    },
}

/// Counters published by the renderer
#[derive(Debug, Default)]
struct QueueShared {
    rendering: AtomicUsize,
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOGIC SIDE
// ═══════════════════════════════════════════════════════════════════════════════

/// Logic-thread end of the voice queue
pub struct QueuedBackend {
    command_tx: Producer<VoiceCommand>,
    finished_rx: Consumer<VoiceHandle>,
    shared: Arc<QueueShared>,
    residency: Option<WaveResidency>,
    /// Voices opened and not yet released
    open: HashSet<VoiceHandle>,
    /// Open voices the renderer reported as finished
    finished: HashSet<VoiceHandle>,
    /// Stops that did not fit in the ring; retried on poll
    pending_stops: Vec<VoiceHandle>,
    /// Updates that did not fit in the ring, latest value per voice and kind
    pending_updates: Vec<(VoiceHandle, VoiceUpdate)>,
    next_voice: u64,
    max_voices: usize,
}

impl QueuedBackend {
    /// Refuse voices for resources that are not resident
    pub fn with_residency(mut self, residency: WaveResidency) -> Self {
        self.residency = Some(residency);
        self
    }

    /// Voices the renderer is currently playing
    pub fn rendering_count(&self) -> usize {
        self.shared.rendering.load(Ordering::Relaxed)
    }

    /// Updates waiting for ring space
    pub fn pending_update_count(&self) -> usize {
        self.pending_updates.len()
    }

    fn push_stop(&mut self, voice: VoiceHandle) {
        if self.command_tx.push(VoiceCommand::Stop { voice }).is_err() {
            self.pending_stops.push(voice);
        }
    }

    /// Hold an update for the next poll, replacing an older one of the same kind
    fn defer_update(&mut self, voice: VoiceHandle, update: VoiceUpdate) {
        let kind = std::mem::discriminant(&update);
        match self
            .pending_updates
            .iter_mut()
            .find(|(v, u)| *v == voice && std::mem::discriminant(u) == kind)
        {
            Some(slot) => slot.1 = update,
            None => self.pending_updates.push((voice, update)),
        }
    }

    /// Push held updates in order until the ring fills again
    fn flush_updates(&mut self) {
        let mut sent = 0;
        for &(voice, update) in &self.pending_updates {
            if self
                .command_tx
                .push(VoiceCommand::Update { voice, update })
                .is_err()
            {
                break;
            }
            sent += 1;
        }
        self.pending_updates.drain(..sent);
    }
}

impl PlaybackBackend for QueuedBackend {
    fn poll(&mut self) {
        while let Ok(voice) = self.finished_rx.pop() {
            if self.open.contains(&voice) {
                self.finished.insert(voice);
            }
        }

        let retry = std::mem::take(&mut self.pending_stops);
        for voice in retry {
            self.push_stop(voice);
        }
        self.flush_updates();
    }

    fn open(&mut self, request: &VoiceRequest) -> Result<VoiceHandle, BackendError> {
        if let Some(residency) = &self.residency {
            residency.check(request.resource)?;
        }
        if self.open.len() >= self.max_voices {
            return Err(BackendError::VoiceLimit);
        }

        let voice = VoiceHandle(self.next_voice);
        self.command_tx
            .push(VoiceCommand::Start {
                voice,
                request: *request,
            })
            .map_err(|_| BackendError::QueueFull)?;

        self.next_voice += 1;
        self.open.insert(voice);
        Ok(voice)
    }

    fn update(&mut self, voice: VoiceHandle, update: VoiceUpdate) {
        if !self.open.contains(&voice) || self.finished.contains(&voice) {
            return;
        }
        // Held updates go first so a newer value is never overtaken
        if !self.pending_updates.is_empty()
            || self
                .command_tx
                .push(VoiceCommand::Update { voice, update })
                .is_err()
        {
            log::debug!("Voice queue full, holding update for {:?}", voice);
            self.defer_update(voice, update);
        }
    }

    fn release(&mut self, voice: VoiceHandle) {
        if !self.open.remove(&voice) {
            return;
        }
        self.pending_updates.retain(|(v, _)| *v != voice);
        // The renderer already dropped voices it reported as finished
        if !self.finished.remove(&voice) {
            self.push_stop(voice);
        }
    }

    fn is_finished(&self, voice: VoiceHandle) -> bool {
        !self.open.contains(&voice) || self.finished.contains(&voice)
    }

    fn active_voices(&self) -> usize {
        self.open.len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIO SIDE
// ═══════════════════════════════════════════════════════════════════════════════

/// Render-side state of one voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderVoice {
    pub handle: VoiceHandle,
    /// Play position within the current pass (source frames)
    pub position: f64,
    pub frames: u64,
    pub source_rate: u32,
    /// Passes still to play including the current one (None = infinite)
    pub passes_left: Option<u64>,
    pub gain: f32,
    pub pitch_ratio: f32,
    pub pan: f32,
    pub reverb_gain: f32,
    pub paused: bool,
}

impl RenderVoice {
    fn new(handle: VoiceHandle, request: &VoiceRequest) -> Self {
        Self {
            handle,
            position: 0.0,
            frames: request.frames,
            source_rate: request.sample_rate,
            passes_left: request.loop_policy.passes(),
            gain: db_to_gain(request.volume_db),
            pitch_ratio: semitones_to_ratio(request.pitch),
            pan: request.pan,
            reverb_gain: db_to_gain(request.reverb_send_db),
            paused: false,
        }
    }

    fn apply(&mut self, update: VoiceUpdate) {
        match update {
            VoiceUpdate::Volume(db) => self.gain = db_to_gain(db),
            VoiceUpdate::Pitch(semitones) => self.pitch_ratio = semitones_to_ratio(semitones),
            VoiceUpdate::Pan(pan) => self.pan = pan,
            VoiceUpdate::ReverbSend(db) => self.reverb_gain = db_to_gain(db),
            VoiceUpdate::Paused(paused) => self.paused = paused,
            // Filtering and spatialization belong to the mixer
            VoiceUpdate::Filter { .. } | VoiceUpdate::Position { .. } => {}
        }
    }

    /// Advance by output frames; returns true when the voice ended
    fn advance(&mut self, output_frames: u32, output_rate: u32) -> bool {
        if self.frames == 0 || self.source_rate == 0 {
            return true;
        }
        if self.paused {
            return false;
        }

        let step = output_frames as f64 * self.source_rate as f64 / output_rate.max(1) as f64
            * self.pitch_ratio as f64;
        self.position += step;

        let length = self.frames as f64;
        while self.position >= length {
            self.position -= length;
            if let Some(left) = self.passes_left.as_mut() {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    return true;
                }
            }
        }
        false
    }
}

/// Audio-thread end of the voice queue
pub struct VoiceRenderer {
    command_rx: Consumer<VoiceCommand>,
    finished_tx: Producer<VoiceHandle>,
    shared: Arc<QueueShared>,
    voices: Vec<RenderVoice>,
    /// Finished voices that did not fit in the ring yet
    unreported: Vec<VoiceHandle>,
    sample_rate: u32,
}

impl VoiceRenderer {
    /// Process one audio block
    pub fn process(&mut self, num_frames: u32) {
        // 1. Drain commands
        while let Ok(cmd) = self.command_rx.pop() {
            match cmd {
                VoiceCommand::Start { voice, request } => {
                    if self.voices.len() < self.voices.capacity() {
                        self.voices.push(RenderVoice::new(voice, &request));
                    } else {
                        self.report(voice);
                    }
                }
                VoiceCommand::Update { voice, update } => {
                    if let Some(v) = self.voices.iter_mut().find(|v| v.handle == voice) {
                        v.apply(update);
                    }
                }
                VoiceCommand::Stop { voice } => {
                    self.voices.retain(|v| v.handle != voice);
                }
            }
        }

        // 2. Retry reports that did not fit last block
        let mut i = 0;
        while i < self.unreported.len() {
            if self.finished_tx.push(self.unreported[i]).is_ok() {
                self.unreported.swap_remove(i);
            } else {
                i += 1;
            }
        }

        // 3. Advance voices, reporting the ones that ended
        let mut i = 0;
        while i < self.voices.len() {
            if self.voices[i].advance(num_frames, self.sample_rate) {
                let ended = self.voices.swap_remove(i);
                self.report(ended.handle);
            } else {
                i += 1;
            }
        }

        self.shared
            .rendering
            .store(self.voices.len(), Ordering::Relaxed);
    }

    /// Voices currently rendering
    pub fn voices(&self) -> &[RenderVoice] {
        &self.voices
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn report(&mut self, voice: VoiceHandle) {
        if self.finished_tx.push(voice).is_err() && self.unreported.len() < self.unreported.capacity() {
            self.unreported.push(voice);
        }
    }
}

/// Create both ends of a voice queue
///
/// `capacity` sizes the command ring, `max_voices` bounds open voices on the
/// logic side and preallocates render-side storage.
pub fn create_voice_queue(
    capacity: usize,
    max_voices: usize,
    sample_rate: u32,
) -> (QueuedBackend, VoiceRenderer) {
    let (command_tx, command_rx) = RingBuffer::new(capacity.max(1));
    let (finished_tx, finished_rx) = RingBuffer::new(max_voices.max(1));
    let shared = Arc::new(QueueShared::default());

    let backend = QueuedBackend {
        command_tx,
        finished_rx,
        shared: Arc::clone(&shared),
        residency: None,
        open: HashSet::with_capacity(max_voices),
        finished: HashSet::new(),
        pending_stops: Vec::new(),
        pending_updates: Vec::new(),
        next_voice: 1,
        max_voices: max_voices.max(1),
    };

    let renderer = VoiceRenderer {
        command_rx,
        finished_tx,
        shared,
        voices: Vec::with_capacity(max_voices.max(1)),
        unreported: Vec::with_capacity(max_voices.max(1)),
        sample_rate,
    };

    (backend, renderer)
}

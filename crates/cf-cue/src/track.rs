//! Track definitions: timelines of play / stop / automation events
//!
//! The event set is closed, so events are a tagged [`TrackEvent`] matched by
//! the track instance rather than a trait-object hierarchy.

use rand::{Rng, RngCore};
use rand::distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::wave::WaveIndex;

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED PIECES
// ═══════════════════════════════════════════════════════════════════════════════

/// Random offset range rolled each time an event fires
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VariationRange {
    pub min: f32,
    pub max: f32,
}

impl VariationRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// No variation
    pub fn none() -> Self {
        Self::default()
    }

    /// Finite bounds with a representable span
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && (self.max - self.min).is_finite()
    }

    /// Roll a value in `[min, max]`
    ///
    /// A collapsed or inverted range yields `min`; a range that cannot be
    /// sampled yields `min` when finite, otherwise 0.
    pub fn roll(&self, rng: &mut dyn RngCore) -> f32 {
        let fallback = if self.min.is_finite() { self.min } else { 0.0 };
        if self.max <= self.min {
            return fallback;
        }
        match Uniform::new_inclusive(self.min, self.max) {
            Ok(uniform) => uniform.sample(rng),
            Err(_) => fallback,
        }
    }
}

/// How often a wave repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopPolicy {
    /// Play once
    #[default]
    None,
    /// Play once, then repeat `n` more times
    Count(u32),
    /// Repeat until stopped
    Infinite,
}

impl LoopPolicy {
    /// Total passes (None = infinite)
    pub fn passes(&self) -> Option<u64> {
        match self {
            LoopPolicy::None => Some(1),
            LoopPolicy::Count(n) => Some(*n as u64 + 1),
            LoopPolicy::Infinite => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLAY WAVE
// ═══════════════════════════════════════════════════════════════════════════════

/// Weighted wave choice inside a play event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveEntry {
    pub wave: WaveIndex,
    pub weight: u32,
}

/// Starts a wave on the track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayWaveEvent {
    /// Offset from track start (seconds)
    pub timestamp: f32,
    /// Candidate waves (one is chosen per firing)
    pub waves: Vec<WaveEntry>,
    /// Base volume offset (dB)
    pub volume_db: f32,
    /// Base pitch offset (semitones)
    pub pitch: f32,
    /// Pan (-1..1)
    pub pan: f32,
    pub loop_policy: LoopPolicy,
    pub volume_variation: VariationRange,
    pub pitch_variation: VariationRange,
    pub pan_variation: VariationRange,
}

impl PlayWaveEvent {
    /// Play a single wave at time zero
    pub fn new(wave: WaveIndex) -> Self {
        Self {
            timestamp: 0.0,
            waves: vec![WaveEntry { wave, weight: 1 }],
            volume_db: 0.0,
            pitch: 0.0,
            pan: 0.0,
            loop_policy: LoopPolicy::None,
            volume_variation: VariationRange::none(),
            pitch_variation: VariationRange::none(),
            pan_variation: VariationRange::none(),
        }
    }

    pub fn at(mut self, timestamp: f32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Add an alternative wave
    pub fn with_variant(mut self, wave: WaveIndex, weight: u32) -> Self {
        self.waves.push(WaveEntry { wave, weight });
        self
    }

    pub fn with_loop(mut self, policy: LoopPolicy) -> Self {
        self.loop_policy = policy;
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

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.pan = pan;
        self
    }

    pub fn with_volume_variation(mut self, min: f32, max: f32) -> Self {
        self.volume_variation = VariationRange::new(min, max);
        self
    }

    pub fn with_pitch_variation(mut self, min: f32, max: f32) -> Self {
        self.pitch_variation = VariationRange::new(min, max);
        self
    }

    pub fn with_pan_variation(mut self, min: f32, max: f32) -> Self {
        self.pan_variation = VariationRange::new(min, max);
        self
    }

    /// Pick a wave, weighted; all-zero weights fall back to uniform
    pub fn choose_wave(&self, rng: &mut dyn RngCore) -> Option<WaveIndex> {
        match self.waves.len() {
            0 => return None,
            1 => return Some(self.waves[0].wave),
            _ => {}
        }

        let total: u64 = self.waves.iter().map(|w| w.weight as u64).sum();
        if total == 0 {
            let pick = rng.random_range(0..self.waves.len());
            return Some(self.waves[pick].wave);
        }

        let mut roll = rng.random_range(0..total);
        for entry in &self.waves {
            let weight = entry.weight as u64;
            if roll < weight {
                return Some(entry.wave);
            }
            roll -= weight;
        }
        self.waves.last().map(|w| w.wave)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STOP
// ═══════════════════════════════════════════════════════════════════════════════

/// How a stop event ends playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum StopBehavior {
    #[default]
    Immediate = 0,
    /// Recognized but has no effect
    WithRelease = 1,
}

impl StopBehavior {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(StopBehavior::Immediate),
            1 => Some(StopBehavior::WithRelease),
            _ => None,
        }
    }
}

/// What a stop event stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum StopObject {
    /// This track only
    #[default]
    Track = 0,
    /// The whole owning cue instance
    Cue = 1,
}

impl StopObject {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(StopObject::Track),
            1 => Some(StopObject::Cue),
            _ => None,
        }
    }
}

/// Ends a track or its cue at a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopEvent {
    pub timestamp: f32,
    pub behavior: StopBehavior,
    pub object: StopObject,
}

impl StopEvent {
    pub fn new(timestamp: f32, object: StopObject) -> Self {
        Self {
            timestamp,
            behavior: StopBehavior::Immediate,
            object,
        }
    }

    pub fn with_release(mut self) -> Self {
        self.behavior = StopBehavior::WithRelease;
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTOMATION
// ═══════════════════════════════════════════════════════════════════════════════

/// How an automation value is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum AutomationOp {
    /// Replace the current offset
    #[default]
    Set = 0,
    /// Add to the current offset
    Add = 1,
}

impl AutomationOp {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(AutomationOp::Set),
            1 => Some(AutomationOp::Add),
            _ => None,
        }
    }
}

/// Repetition of an automation event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Extra firings after the first (None = forever)
    pub count: Option<u32>,
    /// Time between firings (seconds)
    pub interval_secs: f32,
}

/// Volume or pitch change at a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationEvent {
    pub timestamp: f32,
    pub op: AutomationOp,
    /// Base value (dB for volume, semitones for pitch)
    pub value: f32,
    /// Random offset added to `value` per firing
    pub variation: VariationRange,
    pub recurrence: Option<Recurrence>,
}

impl AutomationEvent {
    pub fn set(timestamp: f32, value: f32) -> Self {
        Self {
            timestamp,
            op: AutomationOp::Set,
            value,
            variation: VariationRange::none(),
            recurrence: None,
        }
    }

    pub fn add(timestamp: f32, value: f32) -> Self {
        Self {
            op: AutomationOp::Add,
            ..Self::set(timestamp, value)
        }
    }

    pub fn with_variation(mut self, min: f32, max: f32) -> Self {
        self.variation = VariationRange::new(min, max);
        self
    }

    pub fn repeating(mut self, count: Option<u32>, interval_secs: f32) -> Self {
        self.recurrence = Some(Recurrence {
            count,
            interval_secs,
        });
        self
    }

    /// Apply one firing to the current offset
    pub fn apply(&self, current: f32, rng: &mut dyn RngCore) -> f32 {
        let value = self.value + self.variation.roll(rng);
        match self.op {
            AutomationOp::Set => value,
            AutomationOp::Add => current + value,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRACK
// ═══════════════════════════════════════════════════════════════════════════════

/// Event on a track timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackEvent {
    PlayWave(PlayWaveEvent),
    Stop(StopEvent),
    Volume(AutomationEvent),
    Pitch(AutomationEvent),
}

impl TrackEvent {
    pub fn timestamp(&self) -> f32 {
        match self {
            TrackEvent::PlayWave(e) => e.timestamp,
            TrackEvent::Stop(e) => e.timestamp,
            TrackEvent::Volume(e) | TrackEvent::Pitch(e) => e.timestamp,
        }
    }

    /// Short name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            TrackEvent::PlayWave(_) => "play wave",
            TrackEvent::Stop(_) => "stop",
            TrackEvent::Volume(_) => "volume",
            TrackEvent::Pitch(_) => "pitch",
        }
    }
}

/// Timeline of events within a sound
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    /// Track volume (dB)
    pub volume_db: f32,
    /// Track pitch (semitones)
    pub pitch: f32,
    /// RPC curve IDs applying to this track only
    pub rpc_curves: Vec<u32>,
    /// Events ordered by timestamp
    events: Vec<TrackEvent>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(mut self, db: f32) -> Self {
        self.volume_db = db;
        self
    }

    pub fn with_pitch(mut self, semitones: f32) -> Self {
        self.pitch = semitones;
        self
    }

    pub fn with_curve(mut self, curve_id: u32) -> Self {
        self.rpc_curves.push(curve_id);
        self
    }

    /// Builder form of [`Track::add_event`]
    pub fn with_event(mut self, event: TrackEvent) -> Self {
        self.add_event(event);
        self
    }

    /// Insert an event in timestamp order
    ///
    /// A track holds at most one play-wave and one stop event; a second one is
    /// rejected and `false` is returned.
    pub fn add_event(&mut self, event: TrackEvent) -> bool {
        let duplicate = match &event {
            TrackEvent::PlayWave(_) => self.play_event().is_some(),
            TrackEvent::Stop(_) => self.stop_event().is_some(),
            _ => false,
        };
        if duplicate {
            return false;
        }

        let ts = event.timestamp();
        let pos = self.events.partition_point(|e| e.timestamp() <= ts);
        self.events.insert(pos, event);
        true
    }

    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    pub fn play_event(&self) -> Option<&PlayWaveEvent> {
        self.events.iter().find_map(|e| match e {
            TrackEvent::PlayWave(p) => Some(p),
            _ => None,
        })
    }

    pub fn stop_event(&self) -> Option<&StopEvent> {
        self.events.iter().find_map(|e| match e {
            TrackEvent::Stop(s) => Some(s),
            _ => None,
        })
    }
}

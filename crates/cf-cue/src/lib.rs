//! CueForge sound-cue playback engine
//!
//! Game-facing cue playback on top of an abstract voice backend:
//! - Banks of waves, sounds (multi-track) and cues (weighted play lists)
//! - Variation selection (ordered, random, no-repeat, shuffle)
//! - Instance limits with fail, queue and replace policies
//! - Categories (volume / reverb buses) looked up live
//! - RPC curves mapping runtime variables to volume, pitch, reverb and filter
//! - Lock-free voice command queue toward the render thread
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         AudioEngine                              │
//! │  categories · rpc curves · variables · listener · rng            │
//! │                                                                  │
//! │  SoundBank ──► Cue ──select──► Sound ──► Track ──► PlayWave/Stop │
//! │                 │                                 Volume/Pitch   │
//! │                 └──owns──► CueInstance ──► TrackInstance         │
//! │                                              └──► WaveInstance   │
//! └───────────────────────────────────┬──────────────────────────────┘
//!              logic tick             │ PlaybackBackend
//!                                     ▼
//!        ┌──────────────────┐   rtrb   ┌──────────────────┐
//!        │ QueuedBackend    │─────────▶│ VoiceRenderer    │ audio thread
//!        │ (open / update / │◀─────────│ (.process())     │
//!        │  release)        │ finished └──────────────────┘
//!        └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cf_cue::{AudioEngine, EngineConfig, SoundBank, Cue, Sound, Track, TrackEvent,
//!              PlayWaveEvent, Wave, WaveResource};
//!
//! let mut engine = AudioEngine::offline(EngineConfig::deterministic(1));
//!
//! let mut bank = SoundBank::new("ui");
//! let wave = bank.add_wave(Wave::new("click.wav", WaveResource(1), 1, 48_000, 4_800));
//! let sound = bank.add_sound(Sound::new("click").with_track(
//!     Track::new().with_event(TrackEvent::PlayWave(PlayWaveEvent::new(wave))),
//! ));
//! bank.add_cue(Cue::new("click").with_entry(sound.unwrap(), 1));
//! let bank = engine.load_bank(bank);
//!
//! let id = engine.play(bank, "click")?;
//! engine.update(1.0 / 60.0);
//! ```

#![allow(clippy::new_without_default)]

pub mod backend;
pub mod bank;
pub mod category;
pub mod config;
pub mod context;
pub mod cue;
pub mod curve;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod instance;
pub mod persist;
pub mod sound;
pub mod track;
pub mod variation;
pub mod wave;

// Re-exports
pub use backend::{
    BackendOp, OfflineBackend, OfflineVoice, PlaybackBackend, QueuedBackend, RenderVoice,
    VoiceHandle, VoiceRenderer, VoiceRequest, VoiceUpdate, WaveResidency, create_voice_queue,
};
pub use bank::{BankIndex, CueRef, SoundBank};
pub use category::{Category, CategoryIndex, CategoryTable, DEFAULT_CATEGORY};
pub use config::EngineConfig;
pub use context::{Emitter, PlaybackContext, Variables};
pub use cue::{Cue, CueIndex, LimitBehavior};
pub use curve::{
    CurveType, RpcAdjustments, RpcCurve, RpcCurveTable, RpcPoint, RuntimeParameter,
    SoundVariable,
};
pub use descriptor::{BankDescriptor, GlobalsDescriptor};
pub use engine::AudioEngine;
pub use error::{
    BackendError, CueError, CueResult, ErrorStatus, LoadReport, LoadWarning, PersistError,
    PersistResult,
};
pub use instance::{CueInstance, CueInstanceId, CueInstanceState, TrackLevels};
pub use sound::{Sound, SoundIndex};
pub use track::{
    AutomationEvent, AutomationOp, LoopPolicy, PlayWaveEvent, Recurrence, StopBehavior,
    StopEvent, StopObject, Track, TrackEvent, VariationRange,
};
pub use variation::{PlayListEntry, VariationType};
pub use wave::{Wave, WaveIndex, WaveResource};

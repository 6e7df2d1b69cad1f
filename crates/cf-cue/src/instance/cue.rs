//! Cue instances: one playback of a cue's chosen sound

use cf_core::{Position3D, clamp_volume_db};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::track::{TrackInstance, TrackSignal};
use super::wave::TrackLevels;
use crate::bank::BankIndex;
use crate::context::{Emitter, InstanceEnv, PlaybackContext};
use crate::cue::CueIndex;
use crate::sound::{Sound, SoundIndex};
use crate::wave::Wave;

/// Handle of a cue instance
///
/// Issued when a play request is accepted, including requests parked in a
/// Queue backlog. Handles are never reused within a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CueInstanceId {
    pub bank: BankIndex,
    pub cue: CueIndex,
    pub serial: u32,
}

impl fmt::Display for CueInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.bank, self.cue, self.serial)
    }
}

/// State of a cue instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CueInstanceState {
    /// Created, waiting for start
    #[default]
    Prepared = 0,
    Playing = 1,
    Paused = 2,
    /// Stop cascade in progress
    Stopping = 3,
    /// Finished or stopped (ready for removal)
    Stopped = 4,
}

impl CueInstanceState {
    /// Check if instance is active (playing or paused)
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, CueInstanceState::Playing | CueInstanceState::Paused)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        *self == CueInstanceState::Stopped
    }
}

/// Live playback of one sound chosen by a cue
#[derive(Debug, Clone)]
pub struct CueInstance {
    id: CueInstanceId,
    sound: SoundIndex,
    /// Play-list entry the sound came from
    entry: usize,
    state: CueInstanceState,
    tracks: Vec<TrackInstance>,
    /// Seconds played
    clock: f64,
    emitter: Emitter,
}

impl CueInstance {
    pub fn new(id: CueInstanceId, entry: usize, sound_index: SoundIndex, sound: &Sound) -> Self {
        Self {
            id,
            sound: sound_index,
            entry,
            state: CueInstanceState::Prepared,
            tracks: sound
                .tracks
                .iter()
                .enumerate()
                .map(|(i, track)| TrackInstance::new(i, track))
                .collect(),
            clock: 0.0,
            emitter: Emitter::default(),
        }
    }

    pub fn id(&self) -> CueInstanceId {
        self.id
    }

    pub fn sound(&self) -> SoundIndex {
        self.sound
    }

    pub fn entry(&self) -> usize {
        self.entry
    }

    pub fn state(&self) -> CueInstanceState {
        self.state
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn tracks(&self) -> &[TrackInstance] {
        &self.tracks
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Start a prepared instance; events at time zero fire immediately
    pub fn start(
        &mut self,
        sound: &Sound,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
        instance_count: usize,
    ) -> bool {
        if self.state != CueInstanceState::Prepared {
            return false;
        }
        self.state = CueInstanceState::Playing;
        self.update(0.0, sound, waves, ctx, instance_count);
        true
    }

    /// Advance every track by `dt` seconds
    pub fn update(
        &mut self,
        dt: f32,
        sound: &Sound,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
        instance_count: usize,
    ) {
        if self.state != CueInstanceState::Playing {
            return;
        }
        self.clock += dt as f64;

        let env = InstanceEnv {
            emitter: &self.emitter,
            instance_count,
        };
        let mut stop_requested = false;
        let mut all_done = true;
        for track in self.tracks.iter_mut() {
            match track.update(dt, sound, waves, ctx, &env) {
                TrackSignal::Continue => all_done = false,
                TrackSignal::Done => {}
                TrackSignal::StopCue => {
                    stop_requested = true;
                    break;
                }
            }
        }

        if stop_requested {
            log::debug!("Cue instance {} stopped by stop event", self.id);
            self.stop(ctx);
        } else if all_done {
            self.state = CueInstanceState::Stopped;
        }
    }

    /// Stop every track and release their voices
    ///
    /// Returns false if the instance was already stopping or stopped.
    pub fn stop(&mut self, ctx: &mut PlaybackContext<'_>) -> bool {
        if matches!(
            self.state,
            CueInstanceState::Stopping | CueInstanceState::Stopped
        ) {
            return false;
        }
        self.state = CueInstanceState::Stopping;
        for track in self.tracks.iter_mut() {
            track.stop(ctx);
        }
        self.state = CueInstanceState::Stopped;
        true
    }

    pub fn pause(&mut self, ctx: &mut PlaybackContext<'_>) -> bool {
        if self.state != CueInstanceState::Playing {
            return false;
        }
        self.state = CueInstanceState::Paused;
        for track in self.tracks.iter_mut() {
            track.set_paused(true, ctx);
        }
        true
    }

    pub fn resume(&mut self, ctx: &mut PlaybackContext<'_>) -> bool {
        if self.state != CueInstanceState::Paused {
            return false;
        }
        self.state = CueInstanceState::Playing;
        for track in self.tracks.iter_mut() {
            track.set_paused(false, ctx);
        }
        true
    }

    /// Move the emitter; voices of positional sounds follow
    pub fn set_position(&mut self, position: Position3D, sound: &Sound, ctx: &mut PlaybackContext<'_>) {
        self.emitter.position = position;
        self.push_placement(sound, ctx);
    }

    pub fn set_emitter_radius(&mut self, radius: f32, sound: &Sound, ctx: &mut PlaybackContext<'_>) {
        self.emitter.radius = radius.max(0.0);
        self.push_placement(sound, ctx);
    }

    fn push_placement(&mut self, sound: &Sound, ctx: &mut PlaybackContext<'_>) {
        if !sound.positional {
            return;
        }
        let (position, radius) = (self.emitter.position, self.emitter.radius);
        for track in self.tracks.iter_mut() {
            track.set_placement(position, radius, ctx);
        }
    }

    /// Set an instance variable; picked up on the next update
    pub fn set_variable(&mut self, name: impl Into<String>, value: f32) {
        self.emitter.variables.insert(name.into(), value);
    }

    pub fn variable(&self, name: &str) -> Option<f32> {
        self.emitter.variables.get(name).copied()
    }

    /// Set the instance reverb offset and push only the reverb channel
    pub fn set_reverb_volume(
        &mut self,
        db: f32,
        sound: &Sound,
        ctx: &mut PlaybackContext<'_>,
        instance_count: usize,
    ) {
        self.emitter.reverb_volume_db = clamp_volume_db(db);
        let env = InstanceEnv {
            emitter: &self.emitter,
            instance_count,
        };
        for track in self.tracks.iter_mut() {
            track.update_reverb_volume(sound, ctx, &env);
        }
    }

    /// Current composed levels of every track
    pub fn track_levels(
        &self,
        sound: &Sound,
        ctx: &PlaybackContext<'_>,
        instance_count: usize,
    ) -> Vec<TrackLevels> {
        let env = InstanceEnv {
            emitter: &self.emitter,
            instance_count,
        };
        self.tracks
            .iter()
            .filter_map(|inst| {
                let track = sound.tracks.get(inst.track_index())?;
                Some(inst.levels(track, sound, ctx, &env))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{OfflineBackend, PlaybackBackend};
    use crate::category::CategoryTable;
    use crate::context::Variables;
    use crate::curve::RpcCurveTable;
    use crate::track::{LoopPolicy, PlayWaveEvent, StopEvent, StopObject, Track, TrackEvent};
    use crate::wave::WaveResource;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct World {
        categories: CategoryTable,
        curves: RpcCurveTable,
        globals: Variables,
        listener: Position3D,
        backend: OfflineBackend,
        rng: StdRng,
    }

    impl World {
        fn new() -> Self {
            Self {
                categories: CategoryTable::new(),
                curves: RpcCurveTable::new(),
                globals: Variables::new(),
                listener: Position3D::origin(),
                backend: OfflineBackend::new(),
                rng: StdRng::seed_from_u64(4),
            }
        }

        fn ctx(&mut self) -> PlaybackContext<'_> {
            PlaybackContext {
                categories: &self.categories,
                curves: &self.curves,
                globals: &self.globals,
                listener: &self.listener,
                backend: &mut self.backend,
                rng: &mut self.rng,
            }
        }
    }

    fn id(serial: u32) -> CueInstanceId {
        CueInstanceId {
            bank: 0,
            cue: 0,
            serial,
        }
    }

    fn two_track_sound(loop_policy: LoopPolicy) -> Sound {
        Sound::new("pair")
            .with_track(Track::new().with_event(TrackEvent::PlayWave(
                PlayWaveEvent::new(0).with_loop(loop_policy),
            )))
            .with_track(Track::new().with_event(TrackEvent::PlayWave(
                PlayWaveEvent::new(0).with_loop(loop_policy),
            )))
    }

    fn waves() -> Vec<Wave> {
        vec![Wave::new("w", WaveResource(1), 1, 100, 100)]
    }

    #[test]
    fn test_start_opens_voices() {
        let mut world = World::new();
        let sound = two_track_sound(LoopPolicy::None);
        let waves = waves();
        let mut inst = CueInstance::new(id(1), 0, 0, &sound);
        assert_eq!(inst.state(), CueInstanceState::Prepared);

        assert!(inst.start(&sound, &waves, &mut world.ctx(), 1));
        assert!(!inst.start(&sound, &waves, &mut world.ctx(), 1));
        assert_eq!(inst.state(), CueInstanceState::Playing);
        assert_eq!(world.backend.active_voices(), 2);
    }

    #[test]
    fn test_finishes_when_all_tracks_done() {
        let mut world = World::new();
        let sound = two_track_sound(LoopPolicy::None);
        let waves = waves();
        let mut inst = CueInstance::new(id(1), 0, 0, &sound);
        inst.start(&sound, &waves, &mut world.ctx(), 1);

        world.backend.advance(1.0);
        inst.update(1.0, &sound, &waves, &mut world.ctx(), 1);
        assert!(inst.is_finished());
        assert_eq!(world.backend.active_voices(), 0);
    }

    #[test]
    fn test_stop_is_idempotent_and_cascades() {
        let mut world = World::new();
        let sound = two_track_sound(LoopPolicy::Infinite);
        let waves = waves();
        let mut inst = CueInstance::new(id(1), 0, 0, &sound);
        inst.start(&sound, &waves, &mut world.ctx(), 1);

        assert!(inst.stop(&mut world.ctx()));
        assert!(!inst.stop(&mut world.ctx()));
        assert_eq!(world.backend.active_voices(), 0);
        assert!(inst.tracks().iter().all(|t| t.is_done()));
    }

    #[test]
    fn test_pause_resume() {
        let mut world = World::new();
        let sound = two_track_sound(LoopPolicy::None);
        let waves = waves();
        let mut inst = CueInstance::new(id(1), 0, 0, &sound);

        assert!(!inst.pause(&mut world.ctx()));
        inst.start(&sound, &waves, &mut world.ctx(), 1);
        assert!(inst.pause(&mut world.ctx()));
        assert!(!inst.pause(&mut world.ctx()));

        // Paused voices do not progress
        world.backend.advance(5.0);
        inst.update(5.0, &sound, &waves, &mut world.ctx(), 1);
        assert_eq!(inst.state(), CueInstanceState::Paused);
        assert_eq!(inst.clock(), 0.0);

        assert!(inst.resume(&mut world.ctx()));
        assert_eq!(inst.state(), CueInstanceState::Playing);
    }

    #[test]
    fn test_stop_event_stops_whole_cue() {
        let mut world = World::new();
        let sound = Sound::new("s")
            .with_track(Track::new().with_event(TrackEvent::PlayWave(
                PlayWaveEvent::new(0).with_loop(LoopPolicy::Infinite),
            )))
            .with_track(
                Track::new()
                    .with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0)))
                    .with_event(TrackEvent::Stop(StopEvent::new(0.5, StopObject::Cue))),
            );
        let waves = waves();
        let mut inst = CueInstance::new(id(1), 0, 0, &sound);
        inst.start(&sound, &waves, &mut world.ctx(), 1);

        inst.update(0.5, &sound, &waves, &mut world.ctx(), 1);
        assert!(inst.is_finished());
        assert_eq!(world.backend.active_voices(), 0);
    }

    #[test]
    fn test_reverb_volume_only_touches_reverb() {
        use crate::backend::{BackendOp, VoiceUpdate};

        let mut world = World::new();
        let sound = two_track_sound(LoopPolicy::Infinite);
        let waves = waves();
        let mut inst = CueInstance::new(id(1), 0, 0, &sound);
        inst.start(&sound, &waves, &mut world.ctx(), 1);
        world.backend.take_ops();

        inst.set_reverb_volume(-12.0, &sound, &mut world.ctx(), 1);
        let ops = world.backend.take_ops();
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(
            op,
            BackendOp::Update {
                update: VoiceUpdate::ReverbSend(_),
                ..
            }
        )));

        let levels = inst.track_levels(&sound, &world.ctx(), 1);
        assert_eq!(levels[0].reverb_send_db, -12.0);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(id(7).to_string(), "0:0#7");
    }
}

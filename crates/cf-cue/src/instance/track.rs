//! Track instances: event timeline and level composition
//!
//! Each tick the track clock advances and due events are dispatched in
//! timestamp order. Levels are recomposed from live sources every tick:
//!
//! ```text
//! volume = clamp(track + event + automation + category + sound + rpc, -96, 6)
//! pitch  = clamp(track + event + automation + sound + rpc)
//! reverb = clamp(category reverb + instance reverb + rpc reverb, -96, 6)
//! ```

use cf_core::{Position3D, clamp_pan, clamp_pitch, clamp_volume_db};

use super::event::{EventInstance, PlayState};
use super::wave::{TrackLevels, WaveInstance};
use crate::context::{InstanceEnv, PlaybackContext};
use crate::curve::RpcAdjustments;
use crate::sound::Sound;
use crate::track::{PlayWaveEvent, StopBehavior, StopObject, Track, TrackEvent};
use crate::wave::Wave;

/// Outcome of a track update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSignal {
    /// Still running
    Continue,
    /// Finished on its own or stopped itself
    Done,
    /// A stop event asked for the whole cue instance to stop
    StopCue,
}

/// Values rolled when the play event fired
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Rolled {
    volume_db: f32,
    pitch: f32,
    pan: f32,
}

/// Live counterpart of a [`Track`]
#[derive(Debug, Clone)]
pub struct TrackInstance {
    /// Index of the track within its sound
    track: usize,
    /// Seconds since the track started
    clock: f64,
    events: Vec<EventInstance>,
    wave: Option<WaveInstance>,
    rolled: Rolled,
    volume_offset: f32,
    pitch_offset: f32,
    done: bool,
}

impl TrackInstance {
    pub fn new(track_index: usize, track: &Track) -> Self {
        Self {
            track: track_index,
            clock: 0.0,
            events: track.events().iter().map(EventInstance::new).collect(),
            wave: None,
            rolled: Rolled::default(),
            volume_offset: 0.0,
            pitch_offset: 0.0,
            done: false,
        }
    }

    pub fn track_index(&self) -> usize {
        self.track
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The wave currently playing, if any
    pub fn wave(&self) -> Option<&WaveInstance> {
        self.wave.as_ref()
    }

    /// Advance the timeline by `dt` seconds
    pub fn update(
        &mut self,
        dt: f32,
        sound: &Sound,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
        env: &InstanceEnv<'_>,
    ) -> TrackSignal {
        if self.done {
            return TrackSignal::Done;
        }
        let Some(track) = sound.tracks.get(self.track) else {
            self.done = true;
            return TrackSignal::Done;
        };

        self.clock += dt as f64;

        if let Some(wave) = self.wave.as_mut() {
            wave.advance(dt as f64);
            if wave.is_finished(&*ctx.backend) {
                if let Some(finished) = self.wave.take() {
                    finished.stop(ctx.backend);
                }
            }
        }

        for (event, state) in track.events().iter().zip(self.events.iter_mut()) {
            match (event, state) {
                (TrackEvent::PlayWave(play), EventInstance::PlayWave(play_state)) => {
                    if *play_state == PlayState::Fired || play.timestamp as f64 > self.clock {
                        continue;
                    }
                    *play_state = Self::fire_play(
                        &mut self.wave,
                        &mut self.rolled,
                        (self.volume_offset, self.pitch_offset),
                        play,
                        track,
                        sound,
                        waves,
                        ctx,
                        env,
                    );
                }
                (TrackEvent::Stop(stop), EventInstance::Stop { fired }) => {
                    if *fired || stop.timestamp as f64 > self.clock {
                        continue;
                    }
                    *fired = true;
                    if stop.behavior == StopBehavior::WithRelease {
                        log::warn!("Stop with release is not supported, ignoring stop event");
                        continue;
                    }
                    match stop.object {
                        StopObject::Track => {
                            if let Some(wave) = self.wave.take() {
                                wave.stop(ctx.backend);
                            }
                            self.done = true;
                            return TrackSignal::Done;
                        }
                        StopObject::Cue => return TrackSignal::StopCue,
                    }
                }
                (TrackEvent::Volume(auto), EventInstance::Volume(auto_state)) => {
                    if let Some(v) = auto_state.fire_due(auto, self.clock, self.volume_offset, ctx.rng) {
                        self.volume_offset = v;
                    }
                }
                (TrackEvent::Pitch(auto), EventInstance::Pitch(auto_state)) => {
                    if let Some(v) = auto_state.fire_due(auto, self.clock, self.pitch_offset, ctx.rng) {
                        self.pitch_offset = v;
                    }
                }
                _ => {}
            }
        }

        if self.wave.is_some() {
            let levels = self.levels(track, sound, ctx, env);
            if let Some(wave) = self.wave.as_mut() {
                wave.apply_levels(&levels, ctx.backend);
            }
        }

        if self.play_finished() {
            self.done = true;
            return TrackSignal::Done;
        }
        TrackSignal::Continue
    }

    #[allow(clippy::too_many_arguments)]
    fn fire_play(
        slot: &mut Option<WaveInstance>,
        rolled: &mut Rolled,
        offsets: (f32, f32),
        play: &PlayWaveEvent,
        track: &Track,
        sound: &Sound,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
        env: &InstanceEnv<'_>,
    ) -> PlayState {
        let Some(index) = play.choose_wave(ctx.rng) else {
            log::warn!("Sound `{}`: play event has no waves", sound.name);
            return PlayState::Fired;
        };
        let Some(wave) = waves.get(index) else {
            log::warn!("Sound `{}`: wave {} out of range", sound.name, index);
            return PlayState::Fired;
        };

        *rolled = Rolled {
            volume_db: play.volume_db + play.volume_variation.roll(ctx.rng),
            pitch: play.pitch + play.pitch_variation.roll(ctx.rng),
            pan: clamp_pan(play.pan + play.pan_variation.roll(ctx.rng)),
        };

        let levels = compose(track, sound, *rolled, offsets, ctx, env);
        let placement = sound
            .positional
            .then(|| (env.emitter.position, env.emitter.radius));

        match WaveInstance::start(index, wave, levels, play.loop_policy, placement, ctx.backend) {
            Ok(instance) => {
                *slot = Some(instance);
                PlayState::Fired
            }
            Err(err) if err.is_transient() => {
                log::debug!("Sound `{}`: wave `{}` deferred ({})", sound.name, wave.name, err);
                PlayState::Deferred
            }
            Err(err) => {
                log::warn!("Sound `{}`: wave `{}` failed to start: {}", sound.name, wave.name, err);
                PlayState::Fired
            }
        }
    }

    /// Whether the play event has fired and its wave has ended
    fn play_finished(&self) -> bool {
        if self.wave.is_some() {
            return false;
        }
        self.events.iter().all(|e| match e {
            EventInstance::PlayWave(state) => *state == PlayState::Fired,
            _ => true,
        })
    }

    /// Current composed levels
    pub fn levels(
        &self,
        track: &Track,
        sound: &Sound,
        ctx: &PlaybackContext<'_>,
        env: &InstanceEnv<'_>,
    ) -> TrackLevels {
        compose(
            track,
            sound,
            self.rolled,
            (self.volume_offset, self.pitch_offset),
            ctx,
            env,
        )
    }

    /// Effective volume in dB
    pub fn effective_volume(
        &self,
        sound: &Sound,
        ctx: &PlaybackContext<'_>,
        env: &InstanceEnv<'_>,
    ) -> f32 {
        sound
            .tracks
            .get(self.track)
            .map_or(cf_core::MIN_VOLUME_DB, |track| {
                self.levels(track, sound, ctx, env).volume_db
            })
    }

    /// Re-apply only the reverb send
    pub fn update_reverb_volume(
        &mut self,
        sound: &Sound,
        ctx: &mut PlaybackContext<'_>,
        env: &InstanceEnv<'_>,
    ) {
        let Some(track) = sound.tracks.get(self.track) else {
            return;
        };
        let reverb = compose_reverb(track, sound, ctx, env);
        if let Some(wave) = self.wave.as_mut() {
            wave.apply_reverb(reverb, ctx.backend);
        }
    }

    pub fn set_placement(&mut self, position: Position3D, radius: f32, ctx: &mut PlaybackContext<'_>) {
        if let Some(wave) = self.wave.as_mut() {
            wave.set_placement(position, radius, ctx.backend);
        }
    }

    pub fn set_paused(&mut self, paused: bool, ctx: &mut PlaybackContext<'_>) {
        if let Some(wave) = self.wave.as_mut() {
            wave.set_paused(paused, ctx.backend);
        }
    }

    /// Stop the wave and finish the track; repeated calls do nothing
    pub fn stop(&mut self, ctx: &mut PlaybackContext<'_>) {
        if let Some(wave) = self.wave.take() {
            wave.stop(ctx.backend);
        }
        self.done = true;
    }
}

/// Curves that apply to a track: sound-wide first, then track-specific
fn rpc_adjustments(
    track: &Track,
    sound: &Sound,
    ctx: &PlaybackContext<'_>,
    env: &InstanceEnv<'_>,
) -> RpcAdjustments {
    RpcAdjustments::evaluate(
        sound.rpc_curves.iter().chain(track.rpc_curves.iter()),
        ctx.curves,
        |variable| ctx.sample(variable, sound.positional, env),
    )
}

fn compose(
    track: &Track,
    sound: &Sound,
    rolled: Rolled,
    (volume_offset, pitch_offset): (f32, f32),
    ctx: &PlaybackContext<'_>,
    env: &InstanceEnv<'_>,
) -> TrackLevels {
    let rpc = rpc_adjustments(track, sound, ctx, env);
    let category_volume = ctx.categories.volume(sound.category);

    TrackLevels {
        volume_db: clamp_volume_db(
            track.volume_db
                + rolled.volume_db
                + volume_offset
                + category_volume
                + sound.volume_db
                + rpc.volume_db,
        ),
        pitch: clamp_pitch(track.pitch + rolled.pitch + pitch_offset + sound.pitch + rpc.pitch),
        pan: rolled.pan,
        reverb_send_db: clamp_volume_db(
            ctx.categories.reverb_volume(sound.category)
                + env.emitter.reverb_volume_db
                + rpc.reverb_db,
        ),
        filter_frequency: rpc.filter_frequency,
        filter_q: rpc.filter_q,
    }
}

fn compose_reverb(
    track: &Track,
    sound: &Sound,
    ctx: &PlaybackContext<'_>,
    env: &InstanceEnv<'_>,
) -> f32 {
    let rpc = rpc_adjustments(track, sound, ctx, env);
    clamp_volume_db(
        ctx.categories.reverb_volume(sound.category) + env.emitter.reverb_volume_db + rpc.reverb_db,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendOp, OfflineBackend, PlaybackBackend, VoiceUpdate};
    use crate::category::{Category, CategoryTable};
    use crate::context::{Emitter, Variables};
    use crate::curve::{CurveType, RpcCurve, RpcCurveTable, RuntimeParameter, SoundVariable};
    use crate::track::{AutomationEvent, LoopPolicy, StopEvent};
    use crate::wave::WaveResource;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Fixture {
        categories: CategoryTable,
        curves: RpcCurveTable,
        globals: Variables,
        listener: Position3D,
        backend: OfflineBackend,
        rng: StdRng,
        emitter: Emitter,
    }

    impl Fixture {
        fn new() -> Self {
            let mut categories = CategoryTable::new();
            categories.add(Category::new("Sfx").with_volume(-3.0));
            Self {
                categories,
                curves: RpcCurveTable::new(),
                globals: Variables::new(),
                listener: Position3D::origin(),
                backend: OfflineBackend::new(),
                rng: StdRng::seed_from_u64(1),
                emitter: Emitter::default(),
            }
        }

        fn run<R>(&mut self, f: impl FnOnce(&mut PlaybackContext<'_>, &InstanceEnv<'_>) -> R) -> R {
            let mut ctx = PlaybackContext {
                categories: &self.categories,
                curves: &self.curves,
                globals: &self.globals,
                listener: &self.listener,
                backend: &mut self.backend,
                rng: &mut self.rng,
            };
            let env = InstanceEnv {
                emitter: &self.emitter,
                instance_count: 1,
            };
            f(&mut ctx, &env)
        }
    }

    fn waves() -> Vec<Wave> {
        vec![Wave::new("one_sec", WaveResource(1), 1, 1000, 1000)]
    }

    fn sound_with(track: Track) -> Sound {
        Sound::new("s").with_category(1).with_track(track)
    }

    #[test]
    fn test_volume_composition_follows_category() {
        let mut fx = Fixture::new();
        let sound = sound_with(
            Track::new()
                .with_volume(-6.0)
                .with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0))),
        );
        let waves = waves();
        let mut inst = TrackInstance::new(0, &sound.tracks[0]);

        fx.run(|ctx, env| inst.update(0.0, &sound, &waves, ctx, env));
        let vol = fx.run(|ctx, env| inst.effective_volume(&sound, ctx, env));
        assert_relative_eq!(vol, -9.0);

        if let Some(cat) = fx.categories.get_mut(1) {
            cat.set_volume(0.0);
        }
        let vol = fx.run(|ctx, env| inst.effective_volume(&sound, ctx, env));
        assert_relative_eq!(vol, -6.0);

        // The next tick pushes the new level to the playing voice
        fx.run(|ctx, env| inst.update(0.1, &sound, &waves, ctx, env));
        let voice = inst.wave().and_then(|w| w.voice()).unwrap();
        assert_eq!(fx.backend.voice(voice).map(|v| v.volume_db), Some(-6.0));
    }

    #[test]
    fn test_volume_clamped() {
        let mut fx = Fixture::new();
        let sound = sound_with(
            Track::new()
                .with_volume(20.0)
                .with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0))),
        );
        let inst = TrackInstance::new(0, &sound.tracks[0]);
        let vol = fx.run(|ctx, env| inst.effective_volume(&sound, ctx, env));
        assert_eq!(vol, 6.0);
    }

    #[test]
    fn test_track_finishes_with_wave() {
        let mut fx = Fixture::new();
        let sound = sound_with(Track::new().with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0))));
        let waves = waves();
        let mut inst = TrackInstance::new(0, &sound.tracks[0]);

        let sig = fx.run(|ctx, env| inst.update(0.0, &sound, &waves, ctx, env));
        assert_eq!(sig, TrackSignal::Continue);

        fx.backend.advance(1.0);
        let sig = fx.run(|ctx, env| inst.update(1.0, &sound, &waves, ctx, env));
        assert_eq!(sig, TrackSignal::Done);
        assert_eq!(fx.backend.active_voices(), 0);
    }

    #[test]
    fn test_delayed_play_event() {
        let mut fx = Fixture::new();
        let sound = sound_with(
            Track::new().with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0).at(0.5))),
        );
        let waves = waves();
        let mut inst = TrackInstance::new(0, &sound.tracks[0]);

        fx.run(|ctx, env| inst.update(0.0, &sound, &waves, ctx, env));
        assert!(inst.wave().is_none());
        fx.run(|ctx, env| inst.update(0.5, &sound, &waves, ctx, env));
        assert!(inst.wave().is_some());
    }

    #[test]
    fn test_stop_event_objects() {
        let mut fx = Fixture::new();
        let waves = waves();

        let track_stop = sound_with(
            Track::new()
                .with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0).with_loop(LoopPolicy::Infinite)))
                .with_event(TrackEvent::Stop(StopEvent::new(0.25, StopObject::Track))),
        );
        let mut inst = TrackInstance::new(0, &track_stop.tracks[0]);
        fx.run(|ctx, env| inst.update(0.0, &track_stop, &waves, ctx, env));
        let sig = fx.run(|ctx, env| inst.update(0.25, &track_stop, &waves, ctx, env));
        assert_eq!(sig, TrackSignal::Done);
        assert!(inst.wave().is_none());

        let cue_stop = sound_with(
            Track::new()
                .with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0)))
                .with_event(TrackEvent::Stop(StopEvent::new(0.25, StopObject::Cue))),
        );
        let mut inst = TrackInstance::new(0, &cue_stop.tracks[0]);
        fx.run(|ctx, env| inst.update(0.0, &cue_stop, &waves, ctx, env));
        let sig = fx.run(|ctx, env| inst.update(0.5, &cue_stop, &waves, ctx, env));
        assert_eq!(sig, TrackSignal::StopCue);
    }

    #[test]
    fn test_stop_with_release_is_ignored() {
        let mut fx = Fixture::new();
        let waves = waves();
        let sound = sound_with(
            Track::new()
                .with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0).with_loop(LoopPolicy::Infinite)))
                .with_event(TrackEvent::Stop(StopEvent::new(0.1, StopObject::Cue).with_release())),
        );
        let mut inst = TrackInstance::new(0, &sound.tracks[0]);
        fx.run(|ctx, env| inst.update(0.0, &sound, &waves, ctx, env));
        let sig = fx.run(|ctx, env| inst.update(0.5, &sound, &waves, ctx, env));
        assert_eq!(sig, TrackSignal::Continue);
        assert!(inst.wave().is_some());
    }

    #[test]
    fn test_volume_automation() {
        let mut fx = Fixture::new();
        let waves = waves();
        let sound = Sound::new("s").with_track(
            Track::new()
                .with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0).with_loop(LoopPolicy::Infinite)))
                .with_event(TrackEvent::Volume(AutomationEvent::set(0.5, -12.0))),
        );
        let mut inst = TrackInstance::new(0, &sound.tracks[0]);

        fx.run(|ctx, env| inst.update(0.0, &sound, &waves, ctx, env));
        assert_eq!(fx.run(|ctx, env| inst.effective_volume(&sound, ctx, env)), 0.0);

        fx.run(|ctx, env| inst.update(0.5, &sound, &waves, ctx, env));
        assert_eq!(fx.run(|ctx, env| inst.effective_volume(&sound, ctx, env)), -12.0);
        assert!(fx.backend.ops().iter().any(|op| matches!(
            op,
            BackendOp::Update {
                update: VoiceUpdate::Volume(v),
                ..
            } if *v == -12.0
        )));
    }

    #[test]
    fn test_rpc_volume_curve() {
        let mut fx = Fixture::new();
        fx.curves.insert(
            RpcCurve::new(9, SoundVariable::Distance, RuntimeParameter::Volume)
                .with_point(0.0, 0.0, CurveType::Linear)
                .with_point(10.0, -20.0, CurveType::Linear),
        );
        fx.emitter.position = Position3D::new(5.0, 0.0, 0.0);
        let sound = Sound::new("s")
            .positional()
            .with_curve(9)
            .with_track(Track::new().with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0))));
        let inst = TrackInstance::new(0, &sound.tracks[0]);

        let vol = fx.run(|ctx, env| inst.effective_volume(&sound, ctx, env));
        assert_relative_eq!(vol, -10.0);
    }

    #[test]
    fn test_not_ready_defers_play() {
        use crate::backend::WaveResidency;

        let residency = WaveResidency::new();
        residency.register(WaveResource(1));
        let mut fx = Fixture::new();
        fx.backend = OfflineBackend::new().with_residency(residency.clone());

        let sound = sound_with(Track::new().with_event(TrackEvent::PlayWave(PlayWaveEvent::new(0))));
        let waves = waves();
        let mut inst = TrackInstance::new(0, &sound.tracks[0]);

        let sig = fx.run(|ctx, env| inst.update(0.0, &sound, &waves, ctx, env));
        assert_eq!(sig, TrackSignal::Continue);
        assert!(inst.wave().is_none());

        residency.mark_loaded(WaveResource(1));
        fx.run(|ctx, env| inst.update(0.1, &sound, &waves, ctx, env));
        assert!(inst.wave().is_some());
    }
}

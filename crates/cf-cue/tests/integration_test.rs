//! End-to-end cue playback tests
//!
//! Drives the public engine API against the offline and queued backends:
//! - Instance-limit policies
//! - Variation selection over many plays
//! - Volume composition with categories and RPC curves
//! - Deferred playback while wave data is not resident
//! - Non-finite input, long playback and a saturated voice ring

use approx::assert_relative_eq;

use cf_core::Position3D;
use cf_cue::{
    AudioEngine, AutomationEvent, BankIndex, Category, Cue, CueError, CueInstanceId,
    CueInstanceState, CurveType, EngineConfig, LimitBehavior, LoopPolicy, OfflineBackend,
    PlayWaveEvent, PlaybackBackend, RpcCurve, RuntimeParameter, Sound, SoundBank, SoundIndex,
    SoundVariable, Track, TrackEvent, VariationType, Wave, WaveResidency, WaveResource,
    create_voice_queue,
};

const SEED: u64 = 0xC0FFEE;

/// Bank with looping sounds A, B, C and a one-shot "blip"
fn abc_bank() -> SoundBank {
    let mut bank = SoundBank::new("test");
    let wave = bank.add_wave(Wave::new("tone.wav", WaveResource(1), 1, 1_000, 1_000));
    for name in ["A", "B", "C"] {
        bank.add_sound(Sound::new(name).with_track(Track::new().with_event(
            TrackEvent::PlayWave(PlayWaveEvent::new(wave).with_loop(LoopPolicy::Infinite)),
        )))
        .unwrap();
    }
    bank.add_sound(Sound::new("blip").with_track(
        Track::new().with_event(TrackEvent::PlayWave(PlayWaveEvent::new(wave))),
    ))
    .unwrap();
    bank
}

fn abc_cue(name: &str) -> Cue {
    Cue::new(name).with_entry(0, 1).with_entry(1, 1).with_entry(2, 1)
}

fn engine_with(cue: Cue) -> (AudioEngine, BankIndex) {
    let mut engine = AudioEngine::offline(EngineConfig::deterministic(SEED));
    let mut bank = abc_bank();
    bank.add_cue(cue).unwrap();
    let index = engine.load_bank(bank);
    (engine, index)
}

fn sound_of(engine: &AudioEngine, id: CueInstanceId) -> SoundIndex {
    engine
        .bank(id.bank)
        .and_then(|bank| bank.instance(id))
        .map(|inst| inst.sound())
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSTANCE LIMITS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_fail_to_play_rejects_over_limit() {
    for limit in 1..=4u32 {
        let (mut engine, bank) =
            engine_with(abc_cue("c").with_limit(LimitBehavior::FailToPlay, limit));
        for _ in 0..limit {
            engine.play(bank, "c").unwrap();
        }
        assert_eq!(engine.play(bank, "c"), Err(CueError::InstanceLimited));
        assert_eq!(engine.live_instance_count(bank, "c"), limit as usize);
        assert_eq!(engine.backend().active_voices(), limit as usize);
    }
}

#[test]
fn test_replace_removes_oldest() {
    let limit = 3;
    let (mut engine, bank) = engine_with(
        abc_cue("c")
            .with_variation(VariationType::Random)
            .with_limit(LimitBehavior::Replace, limit),
    );

    let mut issued = Vec::new();
    for _ in 0..10 {
        issued.push(engine.play(bank, "c").unwrap());
        assert!(engine.live_instance_count(bank, "c") <= limit as usize);

        let live: Vec<CueInstanceId> = engine
            .bank(bank)
            .and_then(|b| b.cue("c"))
            .map(|c| c.instances().iter().map(|i| i.id()).collect())
            .unwrap();
        let expected = &issued[issued.len().saturating_sub(limit as usize)..];
        assert_eq!(live, expected);
    }
    assert_eq!(engine.backend().active_voices(), limit as usize);
}

#[test]
fn test_ordered_replace_scenario() {
    let (mut engine, bank) = engine_with(abc_cue("c").with_limit(LimitBehavior::Replace, 1));

    let i1 = engine.play(bank, "c").unwrap();
    assert_eq!(sound_of(&engine, i1), 0);
    assert_eq!(engine.live_instance_count(bank, "c"), 1);

    let i2 = engine.play(bank, "c").unwrap();
    assert_eq!(sound_of(&engine, i2), 1);
    assert_eq!(engine.instance_state(i1), None);
    assert_eq!(engine.live_instance_count(bank, "c"), 1);
    assert!(!engine.stop(i1));
}

#[test]
fn test_queue_is_fifo_and_drains_on_completion() {
    let mut engine = AudioEngine::offline(EngineConfig::deterministic(SEED));
    let mut bank = abc_bank();
    let blip = bank.sound_index("blip").unwrap();
    bank.add_cue(
        Cue::new("q")
            .with_entry(blip, 1)
            .with_limit(LimitBehavior::Queue, 1),
    )
    .unwrap();
    let bank = engine.load_bank(bank);

    let first = engine.play(bank, "q").unwrap();
    let second = engine.play(bank, "q").unwrap();
    let third = engine.play(bank, "q").unwrap();
    assert!(engine.is_queued(second) && engine.is_queued(third));

    // One-second blip: finishing the first admits the second
    engine.backend_mut().advance(1.0);
    engine.update(0.1);
    assert_eq!(engine.instance_state(first), None);
    assert_eq!(engine.instance_state(second), Some(CueInstanceState::Playing));
    assert!(engine.is_queued(third));

    engine.backend_mut().advance(1.0);
    engine.update(0.1);
    assert_eq!(engine.instance_state(third), Some(CueInstanceState::Playing));
    assert_eq!(engine.live_instance_count(bank, "q"), 1);
}

#[test]
fn test_queued_prepared_request_waits_for_start() {
    let (mut engine, bank) = engine_with(abc_cue("c").with_limit(LimitBehavior::Queue, 1));
    let first = engine.play(bank, "c").unwrap();
    let prepared = engine.create_cue(bank, "c").unwrap();
    assert!(engine.is_queued(prepared));

    engine.stop(first);
    assert_eq!(engine.instance_state(prepared), Some(CueInstanceState::Prepared));
    assert_eq!(engine.backend().active_voices(), 0);

    assert!(engine.start(prepared));
    assert_eq!(engine.instance_state(prepared), Some(CueInstanceState::Playing));
}

#[test]
fn test_lowering_limit_keeps_existing_instances() {
    let (mut engine, bank) = engine_with(abc_cue("c").with_limit(LimitBehavior::FailToPlay, 3));
    for _ in 0..3 {
        engine.play(bank, "c").unwrap();
    }
    engine.cue_mut(bank, "c").unwrap().set_instance_limit(1);
    assert_eq!(engine.live_instance_count(bank, "c"), 3);
    assert_eq!(engine.play(bank, "c"), Err(CueError::InstanceLimited));
}

// ═══════════════════════════════════════════════════════════════════════════════
// VARIATIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn selections(variation: VariationType, plays: usize) -> Vec<SoundIndex> {
    let (mut engine, bank) = engine_with(abc_cue("c").with_variation(variation));
    (0..plays)
        .map(|_| {
            let id = engine.play(bank, "c").unwrap();
            sound_of(&engine, id)
        })
        .collect()
}

#[test]
fn test_ordered_cycles() {
    assert_eq!(selections(VariationType::Ordered, 7), vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn test_ordered_from_random_continues_sequentially() {
    let picks = selections(VariationType::OrderedFromRandom, 9);
    for pair in picks.windows(2) {
        assert_eq!(pair[1], (pair[0] + 1) % 3);
    }
}

#[test]
fn test_shuffle_passes_are_permutations() {
    let picks = selections(VariationType::Shuffle, 30);
    for pass in picks.chunks(3) {
        let mut sorted = pass.to_vec();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2]);
    }
    for pair in picks.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

#[test]
fn test_random_no_repeat_never_repeats() {
    let picks = selections(VariationType::RandomNoRepeat, 200);
    for pair in picks.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    for sound in 0..3 {
        assert!(picks.contains(&sound));
    }
}

#[test]
fn test_random_respects_weights() {
    let mut engine = AudioEngine::offline(EngineConfig::deterministic(SEED));
    let mut bank = abc_bank();
    bank.add_cue(Cue::new("w").with_entry(0, 9).with_entry(1, 1).with_variation(VariationType::Random))
        .unwrap();
    let bank = engine.load_bank(bank);

    let mut heavy = 0;
    for _ in 0..500 {
        let id = engine.play(bank, "w").unwrap();
        if sound_of(&engine, id) == 0 {
            heavy += 1;
        }
    }
    assert!(heavy > 350, "weight 9 of 10 picked {} / 500", heavy);
}

#[test]
fn test_seeded_engines_agree() {
    assert_eq!(
        selections(VariationType::Random, 50),
        selections(VariationType::Random, 50)
    );
}

#[test]
fn test_interactive_is_unsupported() {
    let (mut engine, bank) = engine_with(abc_cue("c").with_variation(VariationType::Interactive));
    assert_eq!(engine.play(bank, "c"), Err(CueError::NoPreviousSound));
    assert_eq!(engine.live_instance_count(bank, "c"), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEVELS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_category_clamps() {
    let mut category = Category::new("Sfx");
    category.set_volume(10.0);
    assert_eq!(category.volume(), 6.0);
    category.set_volume(-200.0);
    assert_eq!(category.volume(), -96.0);
}

#[test]
fn test_category_change_applies_mid_playback() {
    let mut engine = AudioEngine::offline(EngineConfig::deterministic(SEED));
    let sfx = engine.add_category(Category::new("Sfx").with_volume(-3.0));

    let mut bank = SoundBank::new("levels");
    let wave = bank.add_wave(Wave::new("hit.wav", WaveResource(4), 1, 1_000, 10_000));
    let hit = bank
        .add_sound(Sound::new("hit").with_category(sfx).with_track(
            Track::new()
                .with_volume(-6.0)
                .with_event(TrackEvent::PlayWave(PlayWaveEvent::new(wave))),
        ))
        .unwrap();
    bank.add_cue(Cue::new("hit").with_entry(hit, 1)).unwrap();
    let bank = engine.load_bank(bank);

    let id = engine.play(bank, "hit").unwrap();
    assert_relative_eq!(engine.track_levels(id).unwrap()[0].volume_db, -9.0);

    engine.set_category_volume("Sfx", 0.0);
    assert_relative_eq!(engine.track_levels(id).unwrap()[0].volume_db, -6.0);

    // The voice picks it up on the next tick without restarting
    let opened = engine.backend().opened_count();
    engine.update(0.01);
    assert_eq!(engine.backend().opened_count(), opened);
    let (_, voice) = engine.backend().voices().next().unwrap();
    assert_relative_eq!(voice.volume_db, -6.0);
}

#[test]
fn test_rpc_distance_curve() {
    let mut engine = AudioEngine::offline(EngineConfig::deterministic(SEED));
    engine.add_curve(
        RpcCurve::new(1, SoundVariable::Distance, RuntimeParameter::Volume)
            .with_point(0.0, 0.0, CurveType::Linear)
            .with_point(10.0, -20.0, CurveType::Linear),
    );

    let mut bank = SoundBank::new("rpc");
    let wave = bank.add_wave(Wave::new("engine.wav", WaveResource(9), 1, 1_000, 1_000));
    let hum = bank
        .add_sound(Sound::new("hum").positional().with_curve(1).with_track(
            Track::new().with_event(TrackEvent::PlayWave(
                PlayWaveEvent::new(wave).with_loop(LoopPolicy::Infinite),
            )),
        ))
        .unwrap();
    bank.add_cue(Cue::new("hum").with_entry(hum, 1)).unwrap();
    let bank = engine.load_bank(bank);

    let id = engine.play(bank, "hum").unwrap();
    assert_relative_eq!(engine.track_levels(id).unwrap()[0].volume_db, 0.0);

    engine.set_position(id, Position3D::new(3.0, 4.0, 0.0));
    assert_relative_eq!(engine.track_levels(id).unwrap()[0].volume_db, -10.0);

    // Beyond the last point the curve holds its final value
    engine.set_position(id, Position3D::new(0.0, 500.0, 0.0));
    assert_relative_eq!(engine.track_levels(id).unwrap()[0].volume_db, -20.0);
}

#[test]
fn test_rpc_curve_bounds_and_midpoint() {
    let curve = RpcCurve::new(1, SoundVariable::Volume, RuntimeParameter::Pitch)
        .with_point(0.0, 0.0, CurveType::Linear)
        .with_point(1.0, 1.0, CurveType::Linear);
    assert_relative_eq!(curve.get_parameter_value(0.5), 0.5);
    assert_relative_eq!(curve.get_parameter_value(-3.0), 0.0);
    assert_relative_eq!(curve.get_parameter_value(3.0), 1.0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// BACKENDS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_not_ready_wave_is_deferred() {
    let residency = WaveResidency::new();
    residency.register(WaveResource(1));
    let backend = OfflineBackend::new().with_residency(residency.clone());
    let mut engine = AudioEngine::new(EngineConfig::deterministic(SEED), backend);
    let mut bank = abc_bank();
    bank.add_cue(abc_cue("c")).unwrap();
    let bank = engine.load_bank(bank);

    let id = engine.play(bank, "c").unwrap();
    assert_eq!(engine.instance_state(id), Some(CueInstanceState::Playing));
    assert_eq!(engine.backend().active_voices(), 0);

    residency.mark_loaded(WaveResource(1));
    engine.update(0.01);
    assert_eq!(engine.backend().active_voices(), 1);
}

#[test]
fn test_queued_backend_round_trip() {
    let (backend, mut renderer) = create_voice_queue(64, 8, 1_000);
    let mut engine = AudioEngine::new(EngineConfig::deterministic(SEED), backend);
    let bank = engine.load_bank({
        let mut bank = abc_bank();
        let blip = bank.sound_index("blip").unwrap();
        bank.add_cue(Cue::new("blip").with_entry(blip, 1)).unwrap();
        bank
    });

    let id = engine.play(bank, "blip").unwrap();
    renderer.process(100);
    assert_eq!(renderer.voices().len(), 1);
    assert_eq!(engine.backend().rendering_count(), 1);

    // One second of audio at 1 kHz
    for _ in 0..10 {
        renderer.process(100);
    }
    assert!(renderer.voices().is_empty());

    engine.update(0.01);
    assert_eq!(engine.instance_state(id), None);
    assert_eq!(engine.backend().active_voices(), 0);
}

#[test]
fn test_stop_all_releases_every_voice() {
    let (mut engine, bank) = engine_with(abc_cue("c"));
    for _ in 0..5 {
        engine.play(bank, "c").unwrap();
    }
    assert_eq!(engine.stop_all(), 5);
    assert_eq!(engine.backend().active_voices(), 0);
    assert_eq!(engine.total_instances(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTREME INPUT AND LONG RUNS
// ═══════════════════════════════════════════════════════════════════════════════

/// Engine with one looping sound "loop" built from `track`
fn looping_engine(
    config: EngineConfig,
    track: Track,
    curve: Option<RpcCurve>,
) -> (AudioEngine, BankIndex) {
    let mut engine = AudioEngine::offline(config);
    let mut sound = Sound::new("loop").with_track(track);
    if let Some(curve) = curve {
        sound = sound.with_curve(curve.id);
        engine.add_curve(curve);
    }
    let mut bank = SoundBank::new("long");
    bank.add_wave(Wave::new("loop.wav", WaveResource(3), 1, 1_000, 1_000));
    let sound = bank.add_sound(sound).unwrap();
    bank.add_cue(Cue::new("loop").with_entry(sound, 1)).unwrap();
    let index = engine.load_bank(bank);
    (engine, index)
}

fn looping_track() -> Track {
    Track::new().with_event(TrackEvent::PlayWave(
        PlayWaveEvent::new(0).with_loop(LoopPolicy::Infinite),
    ))
}

#[test]
fn test_nan_variable_reads_first_curve_point() {
    let curve = RpcCurve::new(2, SoundVariable::Custom("speed".into()), RuntimeParameter::Volume)
        .with_point(0.0, -3.0, CurveType::Linear)
        .with_point(1.0, -15.0, CurveType::Linear);
    let (mut engine, bank) =
        looping_engine(EngineConfig::deterministic(SEED), looping_track(), Some(curve));

    let id = engine.play(bank, "loop").unwrap();
    assert!(engine.set_variable(id, "speed", f32::NAN));
    engine.update(0.016);
    assert_eq!(engine.instance_state(id), Some(CueInstanceState::Playing));
    assert_relative_eq!(engine.track_levels(id).unwrap()[0].volume_db, -3.0);

    engine.set_position(id, Position3D::new(f32::NAN, 0.0, 0.0));
    engine.update(0.016);

    engine.set_variable(id, "speed", 0.5);
    assert_relative_eq!(engine.track_levels(id).unwrap()[0].volume_db, -9.0);
}

#[test]
fn test_overflowing_variation_range_plays() {
    let track = Track::new().with_event(TrackEvent::PlayWave(
        PlayWaveEvent::new(0)
            .with_loop(LoopPolicy::Infinite)
            .with_volume_variation(-3.0e38, 3.0e38),
    ));
    let (mut engine, bank) = looping_engine(EngineConfig::deterministic(SEED), track, None);

    let id = engine.play(bank, "loop").unwrap();
    assert_eq!(engine.instance_state(id), Some(CueInstanceState::Playing));
    assert_eq!(engine.track_levels(id).unwrap()[0].volume_db, -96.0);
}

#[test]
fn test_fine_recurrence_survives_long_playback() {
    let track = looping_track().with_event(TrackEvent::Volume(
        AutomationEvent::add(0.0, 0.0).repeating(None, 0.001),
    ));
    let config = EngineConfig {
        max_frame_delta_secs: 100.0,
        ..EngineConfig::deterministic(SEED)
    };
    let (mut engine, bank) = looping_engine(config, track, None);

    let id = engine.play(bank, "loop").unwrap();
    for _ in 0..400 {
        engine.update(100.0);
    }

    let instance = engine.bank(bank).and_then(|b| b.instance(id)).unwrap();
    assert_eq!(instance.state(), CueInstanceState::Playing);
    assert_relative_eq!(instance.clock(), 40_000.0);
    assert_relative_eq!(instance.tracks()[0].clock(), 40_000.0);
}

#[test]
fn test_full_voice_ring_delivers_level_changes() {
    let (backend, mut renderer) = create_voice_queue(1, 8, 1_000);
    let mut engine = AudioEngine::new(EngineConfig::deterministic(SEED), backend);
    let sfx = engine.add_category(Category::new("Sfx"));

    let mut bank = SoundBank::new("ring");
    let wave = bank.add_wave(Wave::new("loop.wav", WaveResource(3), 1, 1_000, 1_000));
    let sound = bank
        .add_sound(Sound::new("loop").with_category(sfx).with_track(Track::new().with_event(
            TrackEvent::PlayWave(PlayWaveEvent::new(wave).with_loop(LoopPolicy::Infinite)),
        )))
        .unwrap();
    bank.add_cue(Cue::new("loop").with_entry(sound, 1)).unwrap();
    let bank = engine.load_bank(bank);

    engine.play(bank, "loop").unwrap();
    engine.set_category_volume("Sfx", -40.0);
    for _ in 0..11 {
        engine.update(0.01);
        renderer.process(10);
    }

    assert_eq!(engine.backend().pending_update_count(), 0);
    assert_relative_eq!(renderer.voices()[0].gain, 0.01, epsilon = 1e-6);
}

#[test]
fn test_raised_limit_serves_queue_before_new_requests() {
    let (mut engine, bank) = engine_with(abc_cue("c").with_limit(LimitBehavior::Queue, 1));
    let first = engine.play(bank, "c").unwrap();
    let queued = engine.play(bank, "c").unwrap();
    assert!(engine.is_queued(queued));

    engine.cue_mut(bank, "c").unwrap().set_instance_limit(3);
    let latest = engine.play(bank, "c").unwrap();

    assert!(!engine.is_queued(queued));
    let order: Vec<CueInstanceId> = engine
        .bank(bank)
        .and_then(|b| b.cue("c"))
        .map(|cue| cue.instances().iter().map(|i| i.id()).collect())
        .unwrap();
    assert_eq!(order, vec![first, queued, latest]);
}

//! Engine façade
//!
//! [`AudioEngine`] owns the global state (categories, RPC curves, variables,
//! listener), the loaded banks, the backend and the random source. Every call
//! borrows those into a [`PlaybackContext`] and routes to the owning bank.

use cf_core::Position3D;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

use crate::backend::{OfflineBackend, PlaybackBackend};
use crate::bank::{BankIndex, CueRef, SoundBank};
use crate::category::{Category, CategoryIndex, CategoryTable};
use crate::config::EngineConfig;
use crate::context::{PlaybackContext, Variables};
use crate::cue::Cue;
use crate::curve::{RpcCurve, RpcCurveTable};
use crate::error::{CueError, CueResult};
use crate::instance::{CueInstanceId, CueInstanceState, TrackLevels};

/// Sound-cue playback engine
pub struct AudioEngine<B: PlaybackBackend = OfflineBackend> {
    config: EngineConfig,
    categories: CategoryTable,
    curves: RpcCurveTable,
    globals: Variables,
    listener: Position3D,
    banks: BTreeMap<BankIndex, SoundBank>,
    next_bank: BankIndex,
    backend: B,
    rng: StdRng,
}

impl AudioEngine<OfflineBackend> {
    /// Engine on the offline backend, capped at the configured voice count
    pub fn offline(config: EngineConfig) -> Self {
        let backend = OfflineBackend::new().with_max_voices(config.max_voices);
        Self::new(config, backend)
    }
}

impl<B: PlaybackBackend> AudioEngine<B> {
    pub fn new(config: EngineConfig, backend: B) -> Self {
        let config = config.sanitized();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            categories: CategoryTable::new(),
            curves: RpcCurveTable::new(),
            globals: Variables::new(),
            listener: Position3D::origin(),
            banks: BTreeMap::new(),
            next_bank: 0,
            backend,
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Banks plus a context borrowing everything else
    fn split(&mut self) -> (&mut BTreeMap<BankIndex, SoundBank>, PlaybackContext<'_>) {
        (
            &mut self.banks,
            PlaybackContext {
                categories: &self.categories,
                curves: &self.curves,
                globals: &self.globals,
                listener: &self.listener,
                backend: &mut self.backend,
                rng: &mut self.rng,
            },
        )
    }

    /// Run `f` on the bank owning `id`; false if there is none
    fn with_bank(
        &mut self,
        bank: BankIndex,
        f: impl FnOnce(&mut SoundBank, &mut PlaybackContext<'_>) -> bool,
    ) -> bool {
        let (banks, mut ctx) = self.split();
        banks.get_mut(&bank).is_some_and(|b| f(b, &mut ctx))
    }

    // ═══════════════════════════════════════════════════════════════════
    // GLOBALS
    // ═══════════════════════════════════════════════════════════════════

    /// Replace categories and curves (loaded banks keep their indices)
    pub fn set_globals(&mut self, categories: CategoryTable, curves: RpcCurveTable) {
        log::info!(
            "Globals set: {} categories, {} RPC curves",
            categories.len(),
            curves.len()
        );
        self.categories = categories;
        self.curves = curves;
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    pub fn curves(&self) -> &RpcCurveTable {
        &self.curves
    }

    pub fn add_category(&mut self, category: Category) -> CategoryIndex {
        self.categories.add(category)
    }

    /// Set a category volume (clamped); playing tracks follow on their next update
    pub fn set_category_volume(&mut self, name: &str, db: f32) -> bool {
        match self.categories.by_name_mut(name) {
            Some(category) => {
                category.set_volume(db);
                true
            }
            None => false,
        }
    }

    pub fn set_category_reverb_volume(&mut self, name: &str, db: f32) -> bool {
        match self.categories.by_name_mut(name) {
            Some(category) => {
                category.set_reverb_volume(db);
                true
            }
            None => false,
        }
    }

    /// Add or replace an RPC curve
    pub fn add_curve(&mut self, curve: RpcCurve) -> Option<RpcCurve> {
        self.curves.insert(curve)
    }

    pub fn set_global_variable(&mut self, name: impl Into<String>, value: f32) {
        self.globals.insert(name.into(), value);
    }

    pub fn global_variable(&self, name: &str) -> Option<f32> {
        self.globals.get(name).copied()
    }

    pub fn set_listener(&mut self, position: Position3D) {
        self.listener = position;
    }

    pub fn listener(&self) -> Position3D {
        self.listener
    }

    // ═══════════════════════════════════════════════════════════════════
    // BANKS
    // ═══════════════════════════════════════════════════════════════════

    /// Register a bank and return its index
    pub fn load_bank(&mut self, mut bank: SoundBank) -> BankIndex {
        let index = self.next_bank;
        self.next_bank += 1;
        bank.attach(index);
        bank.set_queue_capacity(self.config.max_queued_per_cue);
        log::info!(
            "Loaded bank `{}` as {}: {} sounds, {} cues",
            bank.name,
            index,
            bank.sounds().len(),
            bank.cues().len()
        );
        self.banks.insert(index, bank);
        index
    }

    /// Stop every instance of a bank and drop it
    pub fn unload_bank(&mut self, index: BankIndex) -> bool {
        let (banks, mut ctx) = self.split();
        let Some(mut bank) = banks.remove(&index) else {
            return false;
        };
        let stopped = bank.stop_all(&mut ctx);
        log::info!("Unloaded bank `{}` ({} instances stopped)", bank.name, stopped);
        true
    }

    pub fn bank(&self, index: BankIndex) -> Option<&SoundBank> {
        self.banks.get(&index)
    }

    pub fn bank_mut(&mut self, index: BankIndex) -> Option<&mut SoundBank> {
        self.banks.get_mut(&index)
    }

    pub fn bank_index(&self, name: &str) -> Option<BankIndex> {
        self.banks
            .iter()
            .find(|(_, bank)| bank.name == name)
            .map(|(index, _)| *index)
    }

    /// Cue access for policy setters (variation, limit behavior, limit)
    pub fn cue_mut(&mut self, bank: BankIndex, cue: impl Into<CueRef>) -> Option<&mut Cue> {
        self.banks.get_mut(&bank)?.cue_mut(cue)
    }

    // ═══════════════════════════════════════════════════════════════════
    // PLAYBACK
    // ═══════════════════════════════════════════════════════════════════

    pub fn play(&mut self, bank: BankIndex, cue: impl Into<CueRef>) -> CueResult<CueInstanceId> {
        let (banks, mut ctx) = self.split();
        let bank = banks.get_mut(&bank).ok_or(CueError::InvalidCue)?;
        bank.play(cue, &mut ctx)
    }

    /// Prepare an instance without starting it
    pub fn create_cue(
        &mut self,
        bank: BankIndex,
        cue: impl Into<CueRef>,
    ) -> CueResult<CueInstanceId> {
        let (banks, mut ctx) = self.split();
        let bank = banks.get_mut(&bank).ok_or(CueError::InvalidCue)?;
        bank.create_cue(cue, &mut ctx)
    }

    pub fn start(&mut self, id: CueInstanceId) -> bool {
        self.with_bank(id.bank, |bank, ctx| bank.start(id, ctx))
    }

    pub fn stop(&mut self, id: CueInstanceId) -> bool {
        self.with_bank(id.bank, |bank, ctx| bank.stop(id, ctx))
    }

    pub fn pause(&mut self, id: CueInstanceId) -> bool {
        self.with_bank(id.bank, |bank, ctx| bank.pause(id, ctx))
    }

    pub fn resume(&mut self, id: CueInstanceId) -> bool {
        self.with_bank(id.bank, |bank, ctx| bank.resume(id, ctx))
    }

    /// Stop every instance of one cue
    pub fn stop_cue(&mut self, bank: BankIndex, cue: impl Into<CueRef>) -> usize {
        let (banks, mut ctx) = self.split();
        banks
            .get_mut(&bank)
            .map_or(0, |bank| bank.stop_cue(cue, &mut ctx))
    }

    pub fn stop_all(&mut self) -> usize {
        let (banks, mut ctx) = self.split();
        banks.values_mut().map(|bank| bank.stop_all(&mut ctx)).sum()
    }

    /// Advance the engine by one logic tick
    pub fn update(&mut self, dt: f32) {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, self.config.max_frame_delta_secs)
        } else {
            0.0
        };
        self.backend.poll();

        let (banks, mut ctx) = self.split();
        for bank in banks.values_mut() {
            bank.update(dt, &mut ctx);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // INSTANCE CONTROL
    // ═══════════════════════════════════════════════════════════════════

    pub fn set_position(&mut self, id: CueInstanceId, position: Position3D) -> bool {
        self.with_bank(id.bank, |bank, ctx| bank.set_position(id, position, ctx))
    }

    pub fn set_emitter_radius(&mut self, id: CueInstanceId, radius: f32) -> bool {
        self.with_bank(id.bank, |bank, ctx| bank.set_emitter_radius(id, radius, ctx))
    }

    pub fn set_variable(&mut self, id: CueInstanceId, name: &str, value: f32) -> bool {
        self.banks
            .get_mut(&id.bank)
            .is_some_and(|bank| bank.set_variable(id, name, value))
    }

    pub fn set_reverb_volume(&mut self, id: CueInstanceId, db: f32) -> bool {
        self.with_bank(id.bank, |bank, ctx| bank.set_reverb_volume(id, db, ctx))
    }

    // ═══════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════

    /// State of an instance; queued requests report `Prepared`
    pub fn instance_state(&self, id: CueInstanceId) -> Option<CueInstanceState> {
        let bank = self.banks.get(&id.bank)?;
        if bank.is_queued(id) {
            return Some(CueInstanceState::Prepared);
        }
        bank.instance(id).map(|inst| inst.state())
    }

    pub fn is_queued(&self, id: CueInstanceId) -> bool {
        self.banks.get(&id.bank).is_some_and(|bank| bank.is_queued(id))
    }

    /// Composed levels of every track of an instance
    pub fn track_levels(&mut self, id: CueInstanceId) -> Option<Vec<TrackLevels>> {
        let (banks, ctx) = self.split();
        banks.get(&id.bank)?.track_levels(id, &ctx)
    }

    pub fn live_instance_count(&self, bank: BankIndex, cue: impl Into<CueRef>) -> usize {
        self.banks
            .get(&bank)
            .map_or(0, |bank| bank.live_instance_count(cue))
    }

    /// Live instances across all banks
    pub fn total_instances(&self) -> usize {
        self.banks.values().map(SoundBank::total_instances).sum()
    }
}

//! Sound banks: definitions indexed by integer and by name
//!
//! A bank owns its waves, sounds and cues. Cues own their live instances, so
//! every by-id operation routes through the bank to the owning cue and hands
//! the instance the definitions it refers to.

use cf_core::Position3D;
use std::collections::{BTreeMap, HashMap};

use crate::context::PlaybackContext;
use crate::cue::{Cue, CueIndex};
use crate::error::{CueError, CueResult};
use crate::instance::{CueInstance, CueInstanceId, TrackLevels};
use crate::sound::{Sound, SoundIndex};
use crate::wave::{Wave, WaveIndex};

/// Index of a loaded bank
pub type BankIndex = u32;

/// Cue lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueRef {
    Index(CueIndex),
    Name(String),
}

impl From<CueIndex> for CueRef {
    fn from(index: CueIndex) -> Self {
        CueRef::Index(index)
    }
}

impl From<&str> for CueRef {
    fn from(name: &str) -> Self {
        CueRef::Name(name.to_string())
    }
}

impl From<String> for CueRef {
    fn from(name: String) -> Self {
        CueRef::Name(name)
    }
}

/// Loaded collection of waves, sounds and cues
#[derive(Debug, Clone, Default)]
pub struct SoundBank {
    pub name: String,
    index: BankIndex,
    waves: Vec<Wave>,
    sounds: BTreeMap<SoundIndex, Sound>,
    cues: BTreeMap<CueIndex, Cue>,
    sound_names: HashMap<String, SoundIndex>,
    cue_names: HashMap<String, CueIndex>,
}

impl SoundBank {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn index(&self) -> BankIndex {
        self.index
    }

    /// Assign the bank index; cues re-issue ids under it
    pub(crate) fn attach(&mut self, index: BankIndex) {
        self.index = index;
        for (cue_index, cue) in self.cues.iter_mut() {
            cue.attach(index, *cue_index);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // DEFINITIONS
    // ═══════════════════════════════════════════════════════════════════

    pub fn add_wave(&mut self, wave: Wave) -> WaveIndex {
        self.waves.push(wave);
        self.waves.len() - 1
    }

    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    pub fn wave_index(&self, name: &str) -> Option<WaveIndex> {
        self.waves.iter().position(|w| w.name == name)
    }

    /// Add a sound at the next free index
    ///
    /// Returns None if a sound with the same name exists.
    pub fn add_sound(&mut self, sound: Sound) -> Option<SoundIndex> {
        let index = self.sounds.keys().next_back().map_or(0, |i| i + 1);
        self.insert_sound(index, sound).then_some(index)
    }

    /// Add a sound at a fixed index; false if the index or name is taken
    pub fn insert_sound(&mut self, index: SoundIndex, sound: Sound) -> bool {
        if self.sounds.contains_key(&index) || self.sound_names.contains_key(&sound.name) {
            return false;
        }
        self.sound_names.insert(sound.name.clone(), index);
        self.sounds.insert(index, sound);
        true
    }

    pub fn sound(&self, index: SoundIndex) -> Option<&Sound> {
        self.sounds.get(&index)
    }

    pub fn sound_index(&self, name: &str) -> Option<SoundIndex> {
        self.sound_names.get(name).copied()
    }

    pub fn sounds(&self) -> &BTreeMap<SoundIndex, Sound> {
        &self.sounds
    }

    /// Add a cue at the next free index
    pub fn add_cue(&mut self, cue: Cue) -> Option<CueIndex> {
        let index = self.cues.keys().next_back().map_or(0, |i| i + 1);
        self.insert_cue(index, cue).then_some(index)
    }

    pub fn insert_cue(&mut self, index: CueIndex, mut cue: Cue) -> bool {
        if self.cues.contains_key(&index) || self.cue_names.contains_key(&cue.name) {
            return false;
        }
        cue.attach(self.index, index);
        self.cue_names.insert(cue.name.clone(), index);
        self.cues.insert(index, cue);
        true
    }

    pub fn cue_index(&self, cue: &CueRef) -> Option<CueIndex> {
        match cue {
            CueRef::Index(index) => self.cues.contains_key(index).then_some(*index),
            CueRef::Name(name) => self.cue_names.get(name).copied(),
        }
    }

    pub fn cue(&self, cue: impl Into<CueRef>) -> Option<&Cue> {
        let index = self.cue_index(&cue.into())?;
        self.cues.get(&index)
    }

    /// Mutable cue access for policy setters
    pub fn cue_mut(&mut self, cue: impl Into<CueRef>) -> Option<&mut Cue> {
        let index = self.cue_index(&cue.into())?;
        self.cues.get_mut(&index)
    }

    pub fn cues(&self) -> &BTreeMap<CueIndex, Cue> {
        &self.cues
    }

    /// Apply a backlog bound to every cue
    pub fn set_queue_capacity(&mut self, capacity: usize) {
        for cue in self.cues.values_mut() {
            cue.set_queue_capacity(capacity);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // PLAYBACK
    // ═══════════════════════════════════════════════════════════════════

    /// Play a cue by index or name
    pub fn play(
        &mut self,
        cue: impl Into<CueRef>,
        ctx: &mut PlaybackContext<'_>,
    ) -> CueResult<CueInstanceId> {
        let index = self.cue_index(&cue.into()).ok_or(CueError::InvalidCue)?;
        let cue = self.cues.get_mut(&index).ok_or(CueError::InvalidCue)?;
        cue.play(&self.sounds, &self.waves, ctx)
    }

    /// Admit and select without starting
    pub fn create_cue(
        &mut self,
        cue: impl Into<CueRef>,
        ctx: &mut PlaybackContext<'_>,
    ) -> CueResult<CueInstanceId> {
        let index = self.cue_index(&cue.into()).ok_or(CueError::InvalidCue)?;
        let cue = self.cues.get_mut(&index).ok_or(CueError::InvalidCue)?;
        cue.create_instance(&self.sounds, &self.waves, ctx)
    }

    fn owning_cue(&mut self, id: CueInstanceId) -> Option<&mut Cue> {
        if id.bank != self.index {
            return None;
        }
        self.cues.get_mut(&id.cue)
    }

    pub fn start(&mut self, id: CueInstanceId, ctx: &mut PlaybackContext<'_>) -> bool {
        if id.bank != self.index {
            return false;
        }
        let Some(cue) = self.cues.get_mut(&id.cue) else {
            return false;
        };
        cue.start_instance(id, &self.sounds, &self.waves, ctx)
    }

    pub fn stop(&mut self, id: CueInstanceId, ctx: &mut PlaybackContext<'_>) -> bool {
        if id.bank != self.index {
            return false;
        }
        let Some(cue) = self.cues.get_mut(&id.cue) else {
            return false;
        };
        cue.stop_instance(id, &self.sounds, &self.waves, ctx)
    }

    pub fn pause(&mut self, id: CueInstanceId, ctx: &mut PlaybackContext<'_>) -> bool {
        self.owning_cue(id)
            .and_then(|cue| cue.instance_mut(id))
            .is_some_and(|inst| inst.pause(ctx))
    }

    pub fn resume(&mut self, id: CueInstanceId, ctx: &mut PlaybackContext<'_>) -> bool {
        self.owning_cue(id)
            .and_then(|cue| cue.instance_mut(id))
            .is_some_and(|inst| inst.resume(ctx))
    }

    /// Stop every instance of one cue; returns how many were stopped
    pub fn stop_cue(&mut self, cue: impl Into<CueRef>, ctx: &mut PlaybackContext<'_>) -> usize {
        let Some(index) = self.cue_index(&cue.into()) else {
            return 0;
        };
        self.cues
            .get_mut(&index)
            .map_or(0, |cue| cue.stop_all(ctx))
    }

    pub fn stop_all(&mut self, ctx: &mut PlaybackContext<'_>) -> usize {
        self.cues.values_mut().map(|cue| cue.stop_all(ctx)).sum()
    }

    /// Advance every cue by `dt` seconds
    pub fn update(&mut self, dt: f32, ctx: &mut PlaybackContext<'_>) {
        for cue in self.cues.values_mut() {
            cue.update(dt, &self.sounds, &self.waves, ctx);
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // INSTANCE CONTROL
    // ═══════════════════════════════════════════════════════════════════

    pub fn set_position(
        &mut self,
        id: CueInstanceId,
        position: Position3D,
        ctx: &mut PlaybackContext<'_>,
    ) -> bool {
        if id.bank != self.index {
            return false;
        }
        let Some(inst) = self.cues.get_mut(&id.cue).and_then(|c| c.instance_mut(id)) else {
            return false;
        };
        let Some(sound) = self.sounds.get(&inst.sound()) else {
            return false;
        };
        inst.set_position(position, sound, ctx);
        true
    }

    pub fn set_emitter_radius(
        &mut self,
        id: CueInstanceId,
        radius: f32,
        ctx: &mut PlaybackContext<'_>,
    ) -> bool {
        if id.bank != self.index {
            return false;
        }
        let Some(inst) = self.cues.get_mut(&id.cue).and_then(|c| c.instance_mut(id)) else {
            return false;
        };
        let Some(sound) = self.sounds.get(&inst.sound()) else {
            return false;
        };
        inst.set_emitter_radius(radius, sound, ctx);
        true
    }

    pub fn set_variable(&mut self, id: CueInstanceId, name: &str, value: f32) -> bool {
        match self.owning_cue(id).and_then(|cue| cue.instance_mut(id)) {
            Some(inst) => {
                inst.set_variable(name, value);
                true
            }
            None => false,
        }
    }

    pub fn set_reverb_volume(
        &mut self,
        id: CueInstanceId,
        db: f32,
        ctx: &mut PlaybackContext<'_>,
    ) -> bool {
        if id.bank != self.index {
            return false;
        }
        let Some(cue) = self.cues.get_mut(&id.cue) else {
            return false;
        };
        let count = cue.live_count();
        let Some(inst) = cue.instance_mut(id) else {
            return false;
        };
        let Some(sound) = self.sounds.get(&inst.sound()) else {
            return false;
        };
        inst.set_reverb_volume(db, sound, ctx, count);
        true
    }

    // ═══════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════

    pub fn instance(&self, id: CueInstanceId) -> Option<&CueInstance> {
        if id.bank != self.index {
            return None;
        }
        self.cues.get(&id.cue)?.instance(id)
    }

    pub fn is_queued(&self, id: CueInstanceId) -> bool {
        id.bank == self.index && self.cues.get(&id.cue).is_some_and(|c| c.is_queued(id))
    }

    pub fn track_levels(&self, id: CueInstanceId, ctx: &PlaybackContext<'_>) -> Option<Vec<TrackLevels>> {
        let cue = self.cues.get(&id.cue).filter(|_| id.bank == self.index)?;
        let inst = cue.instance(id)?;
        let sound = self.sounds.get(&inst.sound())?;
        Some(inst.track_levels(sound, ctx, cue.live_count()))
    }

    pub fn live_instance_count(&self, cue: impl Into<CueRef>) -> usize {
        self.cue(cue).map_or(0, Cue::live_count)
    }

    /// Live instances across every cue
    pub fn total_instances(&self) -> usize {
        self.cues.values().map(Cue::live_count).sum()
    }
}

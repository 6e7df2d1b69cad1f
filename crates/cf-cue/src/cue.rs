//! Cues: variation selection and instance-limit admission
//!
//! A cue owns its play list, its selection memory, its live instances (oldest
//! first) and, for the Queue policy, a FIFO backlog of deferred requests.
//! Admission is check-then-act under `&mut self`, so two requests can never
//! both observe a free slot.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::bank::BankIndex;
use crate::context::PlaybackContext;
use crate::error::{CueError, CueResult};
use crate::instance::{CueInstance, CueInstanceId};
use crate::sound::{Sound, SoundIndex};
use crate::variation::{PlayListEntry, VariationState, VariationType};
use crate::wave::Wave;

/// Index of a cue inside its bank
pub type CueIndex = u32;

/// Default backlog bound for the Queue policy
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// What happens when a play request finds the cue at its instance limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum LimitBehavior {
    /// No limit
    #[default]
    None = 0,
    /// Reject the request
    FailToPlay = 1,
    /// Defer the request until a slot frees (FIFO)
    Queue = 2,
    /// Stop the oldest instance, then admit
    Replace = 3,
}

impl LimitBehavior {
    /// Convert from u8 index
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(LimitBehavior::None),
            1 => Some(LimitBehavior::FailToPlay),
            2 => Some(LimitBehavior::Queue),
            3 => Some(LimitBehavior::Replace),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "None" => Some(LimitBehavior::None),
            "FailToPlay" => Some(LimitBehavior::FailToPlay),
            "Queue" => Some(LimitBehavior::Queue),
            "Replace" => Some(LimitBehavior::Replace),
            _ => None,
        }
    }
}

/// Request waiting in a Queue backlog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingPlay {
    id: CueInstanceId,
    /// Start as soon as admitted (play) or stay prepared (create)
    autoplay: bool,
}

/// Outcome of the admission check
enum Admission {
    Admit,
    /// Admit after stopping the oldest instance
    Replace,
    Defer,
}

/// Weighted play list of sounds plus variation and limit policies
#[derive(Debug, Clone)]
pub struct Cue {
    pub name: String,
    index: CueIndex,
    bank: BankIndex,
    play_list: Vec<PlayListEntry>,
    variation: VariationType,
    variation_state: VariationState,
    limit_behavior: LimitBehavior,
    /// Maximum live instances (0 = unlimited)
    instance_limit: u32,
    /// Live instances, oldest first
    instances: Vec<CueInstance>,
    pending: VecDeque<PendingPlay>,
    queue_capacity: usize,
    next_serial: u32,
}

impl Cue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 0,
            bank: 0,
            play_list: Vec::new(),
            variation: VariationType::Ordered,
            variation_state: VariationState::new(),
            limit_behavior: LimitBehavior::None,
            instance_limit: 0,
            instances: Vec::new(),
            pending: VecDeque::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            next_serial: 1,
        }
    }

    /// Add a play-list entry (builder)
    pub fn with_entry(mut self, sound: SoundIndex, weight: u32) -> Self {
        self.play_list.push(PlayListEntry::new(sound, weight));
        self
    }

    pub fn with_variation(mut self, variation: VariationType) -> Self {
        self.variation = variation;
        self
    }

    pub fn with_limit(mut self, behavior: LimitBehavior, limit: u32) -> Self {
        self.limit_behavior = behavior;
        self.instance_limit = limit;
        self
    }

    pub(crate) fn attach(&mut self, bank: BankIndex, index: CueIndex) {
        self.bank = bank;
        self.index = index;
    }

    pub fn index(&self) -> CueIndex {
        self.index
    }

    pub fn play_list(&self) -> &[PlayListEntry] {
        &self.play_list
    }

    pub(crate) fn play_list_mut(&mut self) -> &mut Vec<PlayListEntry> {
        &mut self.play_list
    }

    pub fn variation(&self) -> VariationType {
        self.variation
    }

    pub fn limit_behavior(&self) -> LimitBehavior {
        self.limit_behavior
    }

    pub fn instance_limit(&self) -> u32 {
        self.instance_limit
    }

    /// Change the variation algorithm; selection history starts over
    pub fn set_variation(&mut self, variation: VariationType) {
        self.variation = variation;
        self.variation_state.reset();
    }

    pub fn set_limit_behavior(&mut self, behavior: LimitBehavior) {
        self.limit_behavior = behavior;
    }

    /// Change the limit; applies to future admissions only
    pub fn set_instance_limit(&mut self, limit: u32) {
        self.instance_limit = limit;
    }

    pub fn set_queue_capacity(&mut self, capacity: usize) {
        self.queue_capacity = capacity;
    }

    /// Live instances, oldest first
    pub fn instances(&self) -> &[CueInstance] {
        &self.instances
    }

    pub fn instance(&self, id: CueInstanceId) -> Option<&CueInstance> {
        self.instances.iter().find(|i| i.id() == id)
    }

    pub fn instance_mut(&mut self, id: CueInstanceId) -> Option<&mut CueInstance> {
        self.instances.iter_mut().find(|i| i.id() == id)
    }

    pub fn live_count(&self) -> usize {
        self.instances.len()
    }

    /// Requests waiting in the Queue backlog
    pub fn queued_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_queued(&self, id: CueInstanceId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    fn is_limited(&self) -> bool {
        self.limit_behavior != LimitBehavior::None && self.instance_limit > 0
    }

    fn has_free_slot(&self) -> bool {
        !self.is_limited() || self.instances.len() < self.instance_limit as usize
    }

    fn allocate_id(&mut self) -> CueInstanceId {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1).max(1);
        CueInstanceId {
            bank: self.bank,
            cue: self.index,
            serial,
        }
    }

    fn admission(&self) -> CueResult<Admission> {
        if self.has_free_slot() {
            return Ok(Admission::Admit);
        }
        match self.limit_behavior {
            LimitBehavior::None => Ok(Admission::Admit),
            LimitBehavior::FailToPlay => {
                log::debug!("Cue `{}` at limit {}, rejected", self.name, self.instance_limit);
                Err(CueError::InstanceLimited)
            }
            LimitBehavior::Queue if self.pending.len() >= self.queue_capacity => {
                log::debug!("Cue `{}` backlog full, rejected", self.name);
                Err(CueError::InstanceLimited)
            }
            LimitBehavior::Queue => Ok(Admission::Defer),
            LimitBehavior::Replace => Ok(Admission::Replace),
        }
    }

    /// Play a sound from the play list
    pub fn play(
        &mut self,
        sounds: &BTreeMap<SoundIndex, Sound>,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
    ) -> CueResult<CueInstanceId> {
        self.request(true, sounds, waves, ctx)
    }

    /// Admit and select like [`Cue::play`], leaving the instance prepared
    pub fn create_instance(
        &mut self,
        sounds: &BTreeMap<SoundIndex, Sound>,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
    ) -> CueResult<CueInstanceId> {
        self.request(false, sounds, waves, ctx)
    }

    fn request(
        &mut self,
        autoplay: bool,
        sounds: &BTreeMap<SoundIndex, Sound>,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
    ) -> CueResult<CueInstanceId> {
        if self.play_list.is_empty() {
            return Err(CueError::InvalidCue);
        }

        // Older queued requests take any slot freed by a policy change first
        self.drain_pending(sounds, waves, ctx);
        let admission = self.admission()?;
        if let Admission::Defer = admission {
            let id = self.allocate_id();
            self.pending.push_back(PendingPlay { id, autoplay });
            log::debug!("Cue `{}` at limit, queued {}", self.name, id);
            return Ok(id);
        }

        let (entry, sound_index, sound) = self.select(sounds, ctx)?;

        if let Admission::Replace = admission {
            if !self.instances.is_empty() {
                let mut victim = self.instances.remove(0);
                victim.stop(ctx);
                log::debug!("Cue `{}` replaced {}", self.name, victim.id());
            }
        }

        let id = self.allocate_id();
        self.instantiate(id, entry, sound_index, sound, autoplay, waves, ctx);
        Ok(id)
    }

    fn select<'s>(
        &mut self,
        sounds: &'s BTreeMap<SoundIndex, Sound>,
        ctx: &mut PlaybackContext<'_>,
    ) -> CueResult<(usize, SoundIndex, &'s Sound)> {
        let entry = self
            .variation_state
            .select(self.variation, &self.play_list, ctx.rng)?;
        let sound_index = self.play_list[entry].sound;
        let sound = sounds.get(&sound_index).ok_or_else(|| {
            log::warn!("Cue `{}` references missing sound {}", self.name, sound_index);
            CueError::InvalidCue
        })?;
        Ok((entry, sound_index, sound))
    }

    #[allow(clippy::too_many_arguments)]
    fn instantiate(
        &mut self,
        id: CueInstanceId,
        entry: usize,
        sound_index: SoundIndex,
        sound: &Sound,
        autoplay: bool,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
    ) {
        let mut instance = CueInstance::new(id, entry, sound_index, sound);
        if autoplay {
            // Count includes the instance being started
            let count = self.instances.len() + 1;
            instance.start(sound, waves, ctx, count);
        }
        self.instances.push(instance);
    }

    /// Start a prepared (or queued prepared) instance
    pub fn start_instance(
        &mut self,
        id: CueInstanceId,
        sounds: &BTreeMap<SoundIndex, Sound>,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
    ) -> bool {
        if let Some(pending) = self.pending.iter_mut().find(|p| p.id == id) {
            pending.autoplay = true;
            return true;
        }

        let count = self.instances.len();
        let Some(instance) = self.instances.iter_mut().find(|i| i.id() == id) else {
            return false;
        };
        let Some(sound) = sounds.get(&instance.sound()) else {
            return false;
        };
        instance.start(sound, waves, ctx, count)
    }

    /// Stop one instance (or drop it from the backlog)
    pub fn stop_instance(
        &mut self,
        id: CueInstanceId,
        sounds: &BTreeMap<SoundIndex, Sound>,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
    ) -> bool {
        if let Some(pos) = self.pending.iter().position(|p| p.id == id) {
            self.pending.remove(pos);
            return true;
        }

        let Some(pos) = self.instances.iter().position(|i| i.id() == id) else {
            return false;
        };
        let mut instance = self.instances.remove(pos);
        instance.stop(ctx);
        self.drain_pending(sounds, waves, ctx);
        true
    }

    /// Stop every instance and clear the backlog
    pub fn stop_all(&mut self, ctx: &mut PlaybackContext<'_>) -> usize {
        let stopped = self.instances.len() + self.pending.len();
        self.pending.clear();
        for mut instance in self.instances.drain(..) {
            instance.stop(ctx);
        }
        stopped
    }

    /// Advance every instance, remove finished ones, then admit queued requests
    pub fn update(
        &mut self,
        dt: f32,
        sounds: &BTreeMap<SoundIndex, Sound>,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
    ) {
        let count = self.instances.len();
        for instance in self.instances.iter_mut() {
            if let Some(sound) = sounds.get(&instance.sound()) {
                instance.update(dt, sound, waves, ctx, count);
            } else {
                instance.stop(ctx);
            }
        }

        let before = self.instances.len();
        self.instances.retain(|i| !i.is_finished());
        if self.instances.len() != before {
            log::debug!(
                "Cue `{}`: {} instance(s) finished",
                self.name,
                before - self.instances.len()
            );
        }

        self.drain_pending(sounds, waves, ctx);
    }

    /// Admit queued requests while slots are free
    fn drain_pending(
        &mut self,
        sounds: &BTreeMap<SoundIndex, Sound>,
        waves: &[Wave],
        ctx: &mut PlaybackContext<'_>,
    ) {
        while self.has_free_slot() {
            let Some(pending) = self.pending.pop_front() else {
                break;
            };
            match self.select(sounds, ctx) {
                Ok((entry, sound_index, sound)) => {
                    log::debug!("Cue `{}` admitted queued {}", self.name, pending.id);
                    self.instantiate(
                        pending.id,
                        entry,
                        sound_index,
                        sound,
                        pending.autoplay,
                        waves,
                        ctx,
                    );
                }
                Err(err) => {
                    log::warn!("Cue `{}` dropped queued {}: {}", self.name, pending.id, err);
                }
            }
        }
    }
}

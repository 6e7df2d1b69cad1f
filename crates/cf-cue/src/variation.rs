//! Variation selection: which play-list entry a cue plays next
//!
//! Selection state lives on the cue and every random draw goes through the
//! injected generator, so a seeded engine replays the same choices.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{CueError, CueResult};
use crate::sound::SoundIndex;

/// Play-list entry: a sound and its weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayListEntry {
    pub sound: SoundIndex,
    /// Repeat count in the random sampling population
    pub weight: u32,
}

impl PlayListEntry {
    pub fn new(sound: SoundIndex, weight: u32) -> Self {
        Self { sound, weight }
    }
}

/// Variation algorithm of a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum VariationType {
    /// Entries in definition order, wrapping
    #[default]
    Ordered = 0,
    /// Random starting entry, then definition order
    OrderedFromRandom = 1,
    /// Weighted random
    Random = 2,
    /// Weighted random, never the same entry twice in a row
    RandomNoRepeat = 3,
    /// Permutation per pass
    Shuffle = 4,
    /// Recognized, never resolves
    Interactive = 5,
}

impl VariationType {
    /// Convert from u8 index
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(VariationType::Ordered),
            1 => Some(VariationType::OrderedFromRandom),
            2 => Some(VariationType::Random),
            3 => Some(VariationType::RandomNoRepeat),
            4 => Some(VariationType::Shuffle),
            5 => Some(VariationType::Interactive),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Ordered" => Some(VariationType::Ordered),
            "OrderedFromRandom" => Some(VariationType::OrderedFromRandom),
            "Random" => Some(VariationType::Random),
            "RandomNoRepeat" => Some(VariationType::RandomNoRepeat),
            "Shuffle" => Some(VariationType::Shuffle),
            "Interactive" => Some(VariationType::Interactive),
            _ => None,
        }
    }
}

/// Per-cue selection memory
#[derive(Debug, Clone, Default)]
pub struct VariationState {
    /// Next entry for the ordered modes
    cursor: usize,
    /// Whether OrderedFromRandom has picked its starting point
    started: bool,
    /// Last selected entry
    previous: Option<usize>,
    /// Current shuffle pass
    deck: Vec<usize>,
    deck_pos: usize,
}

impl VariationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last selected entry index
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Forget all history
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Select the next entry index
    pub fn select(
        &mut self,
        kind: VariationType,
        entries: &[PlayListEntry],
        rng: &mut dyn RngCore,
    ) -> CueResult<usize> {
        if entries.is_empty() {
            return Err(CueError::InvalidCue);
        }

        let index = match kind {
            VariationType::Ordered => self.next_ordered(entries.len()),
            VariationType::OrderedFromRandom => {
                if !self.started {
                    self.started = true;
                    self.cursor = rng.random_range(0..entries.len());
                }
                self.next_ordered(entries.len())
            }
            VariationType::Random => {
                weighted_pick(entries, None, rng).ok_or(CueError::NoPreviousSound)?
            }
            VariationType::RandomNoRepeat => {
                let first = weighted_pick(entries, None, rng).ok_or(CueError::NoPreviousSound)?;
                if entries.len() > 1 && Some(first) == self.previous {
                    weighted_pick(entries, self.previous, rng).ok_or(CueError::NoPreviousSound)?
                } else {
                    first
                }
            }
            VariationType::Shuffle => self.next_shuffled(entries.len(), rng),
            VariationType::Interactive => {
                log::warn!("Interactive variation is not supported");
                return Err(CueError::NoPreviousSound);
            }
        };

        self.previous = Some(index);
        Ok(index)
    }

    fn next_ordered(&mut self, len: usize) -> usize {
        let index = self.cursor % len;
        self.cursor = (index + 1) % len;
        index
    }

    fn next_shuffled(&mut self, len: usize, rng: &mut dyn RngCore) -> usize {
        if self.deck.len() != len || self.deck_pos >= self.deck.len() {
            self.deck = (0..len).collect();
            self.deck.shuffle(&mut *rng);

            // A new pass never opens with the entry that closed the last one
            if len > 1 && self.deck.first().copied() == self.previous {
                let swap_with = rng.random_range(1..len);
                self.deck.swap(0, swap_with);
            }
            self.deck_pos = 0;
        }

        let index = self.deck[self.deck_pos];
        self.deck_pos += 1;
        index
    }
}

/// Weighted draw over entries, optionally excluding one index
///
/// When every candidate has weight zero the draw is uniform over candidates.
fn weighted_pick(
    entries: &[PlayListEntry],
    exclude: Option<usize>,
    rng: &mut dyn RngCore,
) -> Option<usize> {
    let candidates = (0..entries.len()).filter(|&i| Some(i) != exclude);

    let count = candidates.clone().count();
    if count == 0 {
        return None;
    }

    let total: u64 = candidates.clone().map(|i| entries[i].weight as u64).sum();
    if total == 0 {
        let pick = rng.random_range(0..count);
        return candidates.clone().nth(pick);
    }

    let mut roll = rng.random_range(0..total);
    for i in candidates {
        let weight = entries[i].weight as u64;
        if roll < weight {
            return Some(i);
        }
        roll -= weight;
    }
    None
}

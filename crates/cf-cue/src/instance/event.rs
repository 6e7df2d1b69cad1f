//! Event instances: per-playback firing state of track events

use rand::RngCore;

use crate::track::{AutomationEvent, TrackEvent};

/// Firing state of a play-wave event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    /// Timestamp not reached
    #[default]
    Waiting,
    /// Due, but the backend was not ready; retried every tick
    Deferred,
    /// Wave started (or failed for good)
    Fired,
}

/// Most firings applied in one tick; later due firings are skipped
const MAX_FIRINGS_PER_TICK: u32 = 64;

/// Firing state of a volume or pitch automation event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationState {
    /// Firings so far (applied or skipped)
    fired: u64,
    finished: bool,
}

impl AutomationState {
    fn new(_event: &AutomationEvent) -> Self {
        Self {
            fired: 0,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Track time of the next firing
    fn next_at(&self, event: &AutomationEvent) -> f64 {
        let start = event.timestamp as f64;
        match event.recurrence {
            Some(rec) if self.fired > 0 => start + self.fired as f64 * rec.interval_secs as f64,
            _ => start,
        }
    }

    /// Total firings the event allows (None = unbounded)
    fn allowed(event: &AutomationEvent) -> Option<u64> {
        match event.recurrence {
            Some(rec) if rec.interval_secs > 0.0 => rec.count.map(|count| count as u64 + 1),
            _ => Some(1),
        }
    }

    /// Apply every firing due by `time` to `current`
    ///
    /// Returns the new value, or None when nothing fired.
    pub fn fire_due(
        &mut self,
        event: &AutomationEvent,
        time: f64,
        current: f32,
        rng: &mut dyn RngCore,
    ) -> Option<f32> {
        let allowed = Self::allowed(event);
        let mut value = None;
        let mut applied = 0;
        while !self.finished && time >= self.next_at(event) {
            if applied == MAX_FIRINGS_PER_TICK {
                self.skip_to(event, time, allowed);
                break;
            }
            value = Some(event.apply(value.unwrap_or(current), rng));
            applied += 1;
            self.fired += 1;
            self.finished = allowed.is_some_and(|allowed| self.fired >= allowed);
        }
        value
    }

    /// Count every firing due by `time` as passed without applying it
    fn skip_to(&mut self, event: &AutomationEvent, time: f64, allowed: Option<u64>) {
        let Some(rec) = event.recurrence else {
            return;
        };
        let elapsed = time - event.timestamp as f64;
        let due = (elapsed / rec.interval_secs as f64).floor() as u64 + 1;
        let due = allowed.map_or(due, |allowed| due.min(allowed));
        log::debug!("Automation fell behind, skipping {} firings", due.saturating_sub(self.fired));
        self.fired = self.fired.max(due);
        self.finished = allowed.is_some_and(|allowed| self.fired >= allowed);
    }
}

/// Per-playback state of one track event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventInstance {
    PlayWave(PlayState),
    Stop { fired: bool },
    Volume(AutomationState),
    Pitch(AutomationState),
}

impl EventInstance {
    pub fn new(event: &TrackEvent) -> Self {
        match event {
            TrackEvent::PlayWave(_) => EventInstance::PlayWave(PlayState::Waiting),
            TrackEvent::Stop(_) => EventInstance::Stop { fired: false },
            TrackEvent::Volume(e) => EventInstance::Volume(AutomationState::new(e)),
            TrackEvent::Pitch(e) => EventInstance::Pitch(AutomationState::new(e)),
        }
    }
}

//! Instance layer: live playback objects
//!
//! ```text
//! CueInstance ──owns──► TrackInstance ──owns──► WaveInstance ──► backend voice
//!                              │
//!                              └──owns──► EventInstance (play / stop / automation)
//! ```
//!
//! Instances refer to their definitions by index; the bank that owns the
//! definitions passes them in on every call.

mod cue;
mod event;
mod track;
mod wave;

pub use cue::{CueInstance, CueInstanceId, CueInstanceState};
pub use event::{AutomationState, EventInstance, PlayState};
pub use track::{TrackInstance, TrackSignal};
pub use wave::{TrackLevels, WaveInstance};

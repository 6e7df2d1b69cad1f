//! Per-tick playback context and per-instance environment

use cf_core::Position3D;
use rand::RngCore;
use std::collections::HashMap;

use crate::backend::PlaybackBackend;
use crate::category::CategoryTable;
use crate::curve::{RpcCurveTable, SoundVariable};

/// Named variable values
pub type Variables = HashMap<String, f32>;

/// Everything the instance layer borrows from the engine for one call
///
/// Definitions are shared; the backend and the random source are the only
/// mutable collaborators.
pub struct PlaybackContext<'a> {
    pub categories: &'a CategoryTable,
    pub curves: &'a RpcCurveTable,
    pub globals: &'a Variables,
    pub listener: &'a Position3D,
    pub backend: &'a mut dyn PlaybackBackend,
    pub rng: &'a mut dyn RngCore,
}

impl PlaybackContext<'_> {
    /// Current value of a curve input for one cue instance
    pub fn sample(&self, variable: &SoundVariable, positional: bool, env: &InstanceEnv<'_>) -> f32 {
        let emitter = env.emitter;
        match variable {
            SoundVariable::Distance if positional => self.listener.distance_to(&emitter.position),
            SoundVariable::Distance => 0.0,
            SoundVariable::NumCueInstances => env.instance_count as f32,
            SoundVariable::OrientationAngle if positional => {
                self.listener.azimuth_to(&emitter.position)
            }
            SoundVariable::OrientationAngle => 0.0,
            SoundVariable::DopplerPitchScalar => self.lookup(variable.name(), emitter).unwrap_or(1.0),
            SoundVariable::Volume | SoundVariable::Custom(_) => {
                self.lookup(variable.name(), emitter).unwrap_or(0.0)
            }
        }
    }

    /// Instance variables shadow globals
    fn lookup(&self, name: &str, emitter: &Emitter) -> Option<f32> {
        emitter
            .variables
            .get(name)
            .or_else(|| self.globals.get(name))
            .copied()
    }
}

/// Placement and per-instance controls of a cue instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Emitter {
    pub position: Position3D,
    pub radius: f32,
    pub variables: Variables,
    /// Reverb send offset set on the instance (dB)
    pub reverb_volume_db: f32,
}

/// What a track instance knows about the cue instance it belongs to
#[derive(Debug, Clone, Copy)]
pub struct InstanceEnv<'a> {
    pub emitter: &'a Emitter,
    /// Live instances of the owning cue
    pub instance_count: usize,
}

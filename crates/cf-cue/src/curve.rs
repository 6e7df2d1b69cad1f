//! RPC (Runtime Parameter Control) curves
//!
//! An RPC curve maps a live variable (distance to the listener, number of
//! playing instances, a game-defined value, ...) onto an adjustment of one
//! runtime parameter (volume, pitch, reverb send, filter). Curves are built
//! once at load time and are pure functions of their input afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::{E, PI};

use cf_core::{
    MAX_FILTER_FREQUENCY, MAX_FILTER_Q, MIN_FILTER_FREQUENCY, MIN_FILTER_Q,
};

// ═══════════════════════════════════════════════════════════════════════════════
// SEGMENT SHAPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Interpolation shape of the segment that starts at a point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CurveType {
    /// Straight line
    #[default]
    Linear = 0,
    /// Moves quickly toward the end value, then settles
    Fast = 1,
    /// Lingers near the start value, then moves quickly
    Slow = 2,
    /// Sinusoidal ease in and out
    SinCos = 3,
}

impl CurveType {
    /// Convert from u8 index
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(CurveType::Linear),
            1 => Some(CurveType::Fast),
            2 => Some(CurveType::Slow),
            3 => Some(CurveType::SinCos),
            _ => None,
        }
    }

    /// Shape a normalized position (0.0 - 1.0) within a segment
    #[inline]
    pub fn shape(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match self {
            CurveType::Linear => t,
            // y = ln(1 + 3t) / ln(4)
            CurveType::Fast => (1.0 + t * 3.0).ln() / 4.0_f32.ln(),
            // y = (e^(3t) - 1) / (e^3 - 1)
            CurveType::Slow => (E.powf(t * 3.0) - 1.0) / (E.powi(3) - 1.0),
            // y = (1 - cos(πt)) / 2
            CurveType::SinCos => 0.5 - 0.5 * (t * PI).cos(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VARIABLES AND PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Live value sampled as a curve's input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundVariable {
    /// Distance between emitter and listener
    Distance,
    /// Live instance count of the owning cue
    NumCueInstances,
    /// The cue instance's `Volume` variable
    Volume,
    /// Horizontal angle of the emitter as seen from the listener (degrees)
    OrientationAngle,
    /// Doppler pitch scalar supplied by the game
    DopplerPitchScalar,
    /// Game-defined variable looked up by name
    Custom(String),
}

impl SoundVariable {
    /// Canonical name
    pub fn name(&self) -> &str {
        match self {
            SoundVariable::Distance => "Distance",
            SoundVariable::NumCueInstances => "NumCueInstances",
            SoundVariable::Volume => "Volume",
            SoundVariable::OrientationAngle => "OrientationAngle",
            SoundVariable::DopplerPitchScalar => "DopplerPitchScalar",
            SoundVariable::Custom(name) => name,
        }
    }

    /// Resolve a name; unknown names become custom variables
    pub fn from_name(name: &str) -> Self {
        match name {
            "Distance" => SoundVariable::Distance,
            "NumCueInstances" => SoundVariable::NumCueInstances,
            "Volume" => SoundVariable::Volume,
            "OrientationAngle" => SoundVariable::OrientationAngle,
            "DopplerPitchScalar" => SoundVariable::DopplerPitchScalar,
            other => SoundVariable::Custom(other.to_string()),
        }
    }
}

/// Parameter a curve's output feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RuntimeParameter {
    /// Volume offset in dB
    Volume = 0,
    /// Pitch offset in semitones
    Pitch = 1,
    /// Reverb send offset in dB
    ReverbSend = 2,
    /// Filter cutoff in Hz
    FilterFrequency = 3,
    /// Filter Q
    FilterQFactor = 4,
}

impl RuntimeParameter {
    /// Convert from u8 index
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(RuntimeParameter::Volume),
            1 => Some(RuntimeParameter::Pitch),
            2 => Some(RuntimeParameter::ReverbSend),
            3 => Some(RuntimeParameter::FilterFrequency),
            4 => Some(RuntimeParameter::FilterQFactor),
            _ => None,
        }
    }

    /// Resolve from name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Volume" => Some(RuntimeParameter::Volume),
            "Pitch" => Some(RuntimeParameter::Pitch),
            "ReverbSend" => Some(RuntimeParameter::ReverbSend),
            "FilterFrequency" => Some(RuntimeParameter::FilterFrequency),
            "FilterQFactor" => Some(RuntimeParameter::FilterQFactor),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RPC CURVE
// ═══════════════════════════════════════════════════════════════════════════════

/// Curve point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RpcPoint {
    /// Variable value
    pub x: f32,
    /// Parameter value
    pub y: f32,
    /// Shape of the segment starting at this point
    pub curve: CurveType,
}

impl RpcPoint {
    pub fn new(x: f32, y: f32, curve: CurveType) -> Self {
        Self { x, y, curve }
    }
}

/// Piecewise curve from a [`SoundVariable`] to a [`RuntimeParameter`]
///
/// ## Example
/// ```rust
/// use cf_cue::{CurveType, RpcCurve, RuntimeParameter, SoundVariable};
///
/// // Fade out between 10 and 100 units from the listener
/// let curve = RpcCurve::new(1, SoundVariable::Distance, RuntimeParameter::Volume)
///     .with_point(10.0, 0.0, CurveType::Fast)
///     .with_point(100.0, -96.0, CurveType::Linear);
///
/// assert_eq!(curve.get_parameter_value(5.0), 0.0);
/// assert_eq!(curve.get_parameter_value(200.0), -96.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcCurve {
    /// Curve ID (referenced by sounds and tracks)
    pub id: u32,
    /// Whether the curve is authored at sound level (all tracks) or per track
    pub applies_to_sound: bool,
    /// Input variable
    pub variable: SoundVariable,
    /// Output parameter
    pub parameter: RuntimeParameter,
    /// Points sorted ascending by x
    points: Vec<RpcPoint>,
}

impl RpcCurve {
    /// Create an empty curve
    pub fn new(id: u32, variable: SoundVariable, parameter: RuntimeParameter) -> Self {
        Self {
            id,
            applies_to_sound: true,
            variable,
            parameter,
            points: Vec::new(),
        }
    }

    /// Create from an unordered point list
    pub fn from_points(
        id: u32,
        variable: SoundVariable,
        parameter: RuntimeParameter,
        mut points: Vec<RpcPoint>,
    ) -> Self {
        points.retain(|p| {
            let finite = p.x.is_finite() && p.y.is_finite();
            if !finite {
                log::warn!("RPC curve {}: dropped non-finite point ({}, {})", id, p.x, p.y);
            }
            finite
        });
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self {
            id,
            applies_to_sound: true,
            variable,
            parameter,
            points,
        }
    }

    /// Add a point (builder)
    pub fn with_point(mut self, x: f32, y: f32, curve: CurveType) -> Self {
        self.add_point(x, y, curve);
        self
    }

    /// Mark as a per-track curve
    pub fn per_track(mut self) -> Self {
        self.applies_to_sound = false;
        self
    }

    /// Add a point, keeping points ordered by x
    ///
    /// Non-finite coordinates are dropped.
    pub fn add_point(&mut self, x: f32, y: f32, curve: CurveType) {
        if !x.is_finite() || !y.is_finite() {
            log::warn!("RPC curve {}: dropped non-finite point ({}, {})", self.id, x, y);
            return;
        }
        let pos = self.points.partition_point(|p| p.x <= x);
        self.points.insert(pos, RpcPoint::new(x, y, curve));
    }

    /// Ordered points
    pub fn points(&self) -> &[RpcPoint] {
        &self.points
    }

    /// Evaluate the curve at a variable value
    ///
    /// Clamps to the first/last point outside the authored range; an empty
    /// curve yields no adjustment (0.0). NaN input reads as the first point.
    pub fn get_parameter_value(&self, variable_value: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };

        if variable_value.is_nan() || variable_value <= first.x {
            return first.y;
        }
        if variable_value >= last.x {
            return last.y;
        }

        // First point strictly right of the value; both neighbours exist here.
        let upper = self
            .points
            .partition_point(|p| p.x <= variable_value)
            .clamp(1, self.points.len() - 1);
        let p0 = &self.points[upper - 1];
        let p1 = &self.points[upper];

        let span = p1.x - p0.x;
        if span <= f32::EPSILON {
            return p1.y;
        }

        let t = (variable_value - p0.x) / span;
        p0.y + p0.curve.shape(t) * (p1.y - p0.y)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CURVE TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// All RPC curves known to the engine, keyed by ID
#[derive(Debug, Clone, Default)]
pub struct RpcCurveTable {
    curves: BTreeMap<u32, RpcCurve>,
}

impl RpcCurveTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a curve, replacing any curve with the same ID
    pub fn insert(&mut self, curve: RpcCurve) -> Option<RpcCurve> {
        self.curves.insert(curve.id, curve)
    }

    pub fn get(&self, id: u32) -> Option<&RpcCurve> {
        self.curves.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.curves.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Curves in ID order
    pub fn iter(&self) -> impl Iterator<Item = &RpcCurve> {
        self.curves.values()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ADJUSTMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Combined output of every curve attached to a track
///
/// Volume, pitch and reverb contributions add up; filter parameters take the
/// value of the last curve that targets them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RpcAdjustments {
    pub volume_db: f32,
    pub pitch: f32,
    pub reverb_db: f32,
    pub filter_frequency: Option<f32>,
    pub filter_q: Option<f32>,
}

impl RpcAdjustments {
    /// Evaluate the given curves with a variable sampler
    ///
    /// Unknown curve IDs are skipped.
    pub fn evaluate<'a>(
        curve_ids: impl IntoIterator<Item = &'a u32>,
        curves: &RpcCurveTable,
        mut sample: impl FnMut(&SoundVariable) -> f32,
    ) -> Self {
        let mut adjustments = Self::default();
        for id in curve_ids {
            if let Some(curve) = curves.get(*id) {
                let value = curve.get_parameter_value(sample(&curve.variable));
                adjustments.accumulate(curve.parameter, value);
            }
        }
        adjustments
    }

    /// Fold one curve output into the adjustments
    pub fn accumulate(&mut self, parameter: RuntimeParameter, value: f32) {
        match parameter {
            RuntimeParameter::Volume => self.volume_db += value,
            RuntimeParameter::Pitch => self.pitch += value,
            RuntimeParameter::ReverbSend => self.reverb_db += value,
            RuntimeParameter::FilterFrequency => {
                self.filter_frequency =
                    Some(value.clamp(MIN_FILTER_FREQUENCY, MAX_FILTER_FREQUENCY))
            }
            RuntimeParameter::FilterQFactor => {
                self.filter_q = Some(value.clamp(MIN_FILTER_Q, MAX_FILTER_Q))
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

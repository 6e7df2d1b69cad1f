//! Mix level ranges and conversions
//!
//! All volumes in CueForge are expressed in dB and clamped to
//! [`MIN_VOLUME_DB`, `MAX_VOLUME_DB`]. Pitch is expressed in semitones.

/// Quietest representable volume (treated as silence)
pub const MIN_VOLUME_DB: f32 = -96.0;

/// Loudest representable volume
pub const MAX_VOLUME_DB: f32 = 6.0;

/// Lowest pitch offset in semitones
pub const MIN_PITCH_SEMITONES: f32 = -24.0;

/// Highest pitch offset in semitones
pub const MAX_PITCH_SEMITONES: f32 = 24.0;

/// Filter cutoff range (Hz)
pub const MIN_FILTER_FREQUENCY: f32 = 20.0;
pub const MAX_FILTER_FREQUENCY: f32 = 20_000.0;

/// Filter Q range
pub const MIN_FILTER_Q: f32 = 0.1;
pub const MAX_FILTER_Q: f32 = 20.0;

/// Pan range (-1 = hard left, 1 = hard right)
pub const MIN_PAN: f32 = -1.0;
pub const MAX_PAN: f32 = 1.0;

/// Clamp a volume into the representable dB range
///
/// NaN collapses to silence.
#[inline]
pub fn clamp_volume_db(db: f32) -> f32 {
    if db.is_nan() {
        return MIN_VOLUME_DB;
    }
    db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB)
}

/// Clamp a pitch offset into the representable semitone range
#[inline]
pub fn clamp_pitch(semitones: f32) -> f32 {
    if semitones.is_nan() {
        return 0.0;
    }
    semitones.clamp(MIN_PITCH_SEMITONES, MAX_PITCH_SEMITONES)
}

/// Clamp a pan position
#[inline]
pub fn clamp_pan(pan: f32) -> f32 {
    if pan.is_nan() {
        return 0.0;
    }
    pan.clamp(MIN_PAN, MAX_PAN)
}

/// Convert dB to linear gain
///
/// Anything at or below [`MIN_VOLUME_DB`] is true silence.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    if db <= MIN_VOLUME_DB {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Convert linear gain to dB (clamped)
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    if gain <= 0.0 {
        MIN_VOLUME_DB
    } else {
        clamp_volume_db(20.0 * gain.log10())
    }
}

/// Convert a semitone offset to a playback-rate ratio
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f32 {
    2.0_f32.powf(semitones / 12.0)
}

//! Error types for the cue engine
//!
//! Runtime failures are a small closed set ([`CueError`]). Loading never
//! aborts on a bad definition: problems become [`LoadWarning`]s and the
//! definition falls back to a safe default.

use thiserror::Error;

/// Reason a cue could not be played or prepared
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueError {
    /// Malformed or empty cue, or a missing definition
    #[error("Invalid cue")]
    InvalidCue,

    /// Admission rejected by the cue's instance-limit policy
    #[error("Cue instance limit reached")]
    InstanceLimited,

    /// The variation algorithm could not resolve a sound
    #[error("No sound could be selected")]
    NoPreviousSound,
}

/// Result type for cue operations
pub type CueResult<T> = Result<T, CueError>;

/// Closed status code for FFI and binary consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ErrorStatus {
    #[default]
    Ok = 0,
    InvalidCue = 1,
    InstanceLimited = 2,
    NoPreviousSound = 3,
}

impl ErrorStatus {
    /// Status for the outcome of a cue operation
    pub fn from_result<T>(result: &CueResult<T>) -> Self {
        match result {
            Ok(_) => ErrorStatus::Ok,
            Err(e) => (*e).into(),
        }
    }

    /// Convert from u8 code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ErrorStatus::Ok),
            1 => Some(ErrorStatus::InvalidCue),
            2 => Some(ErrorStatus::InstanceLimited),
            3 => Some(ErrorStatus::NoPreviousSound),
            _ => None,
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        *self == ErrorStatus::Ok
    }
}

impl From<CueError> for ErrorStatus {
    fn from(err: CueError) -> Self {
        match err {
            CueError::InvalidCue => ErrorStatus::InvalidCue,
            CueError::InstanceLimited => ErrorStatus::InstanceLimited,
            CueError::NoPreviousSound => ErrorStatus::NoPreviousSound,
        }
    }
}

/// Failure to open a playback voice
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// Wave data is not resident yet; retry on a later tick
    #[error("Wave resource not ready")]
    NotReady,

    /// The command queue to the render thread is full; retry on a later tick
    #[error("Voice command queue full")]
    QueueFull,

    /// Backend has no free voices
    #[error("Voice limit reached")]
    VoiceLimit,

    /// Backend does not know the resource
    #[error("Unknown wave resource {0}")]
    UnknownResource(u32),
}

impl BackendError {
    /// Whether the open should be retried on the next tick
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::NotReady | BackendError::QueueFull)
    }
}

/// Binary bank / settings persistence errors
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad magic bytes: expected {expected:?}")]
    BadMagic { expected: [u8; 4] },

    #[error("File version {0} is newer than supported")]
    UnsupportedVersion(u32),

    #[error("Invalid data: {0}")]
    Invalid(String),
}

/// Result type for persistence
pub type PersistResult<T> = Result<T, PersistError>;

/// Recoverable problem found while loading definitions
///
/// Each warning names what was defaulted; loading always continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadWarning {
    #[error("{owner}: missing field `{field}`, using default")]
    MissingField { owner: String, field: &'static str },

    #[error("{owner}: unknown {field} value `{value}`, using default")]
    UnknownValue {
        owner: String,
        field: &'static str,
        value: String,
    },

    #[error("{owner}: invalid {field} range [{min}, {max}], using none")]
    InvalidRange {
        owner: String,
        field: &'static str,
        min: f32,
        max: f32,
    },

    #[error("Sound `{sound}`: unknown category `{category}`, using default category")]
    UnknownCategory { sound: String, category: String },

    #[error("Sound `{sound}`: unknown wave `{wave}`, substituting silence")]
    UnknownWave { sound: String, wave: String },

    #[error("Cue `{cue}`: unknown sound `{sound}`, entry dropped")]
    UnknownSound { cue: String, sound: String },

    #[error("{owner}: unknown RPC curve {curve}, ignored")]
    UnknownCurve { owner: String, curve: u32 },

    #[error("Duplicate {kind} name `{name}`, later definition ignored")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Sound `{sound}` track {track}: extra {kind} event ignored")]
    DuplicateEvent {
        sound: String,
        track: usize,
        kind: &'static str,
    },

    #[error("Cue `{cue}` has an empty play list")]
    EmptyPlayList { cue: String },
}

/// Warnings collected while loading one bank or settings file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub warnings: Vec<LoadWarning>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log a warning
    pub fn warn(&mut self, warning: LoadWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Merge another report into this one
    pub fn extend(&mut self, other: LoadReport) {
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_result() {
        let ok: CueResult<u32> = Ok(1);
        assert_eq!(ErrorStatus::from_result(&ok), ErrorStatus::Ok);

        let limited: CueResult<u32> = Err(CueError::InstanceLimited);
        assert_eq!(
            ErrorStatus::from_result(&limited),
            ErrorStatus::InstanceLimited
        );
    }

    #[test]
    fn test_status_codes() {
        for status in [
            ErrorStatus::Ok,
            ErrorStatus::InvalidCue,
            ErrorStatus::InstanceLimited,
            ErrorStatus::NoPreviousSound,
        ] {
            assert_eq!(ErrorStatus::from_code(status as u8), Some(status));
        }
        assert_eq!(ErrorStatus::from_code(9), None);
    }

    #[test]
    fn test_transient_backend_errors() {
        assert!(BackendError::NotReady.is_transient());
        assert!(BackendError::QueueFull.is_transient());
        assert!(!BackendError::VoiceLimit.is_transient());
    }

    #[test]
    fn test_warning_display() {
        let w = LoadWarning::UnknownCategory {
            sound: "shot".into(),
            category: "Guns".into(),
        };
        assert!(w.to_string().contains("Guns"));
    }

    #[test]
    fn test_load_report() {
        let mut report = LoadReport::new();
        assert!(report.is_clean());
        report.warn(LoadWarning::EmptyPlayList { cue: "c".into() });

        let mut total = LoadReport::new();
        total.extend(report);
        assert_eq!(total.len(), 1);
        assert!(!total.is_clean());
    }
}

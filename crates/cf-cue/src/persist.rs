//! Binary persistence for banks and global settings
//!
//! Two little-endian formats share one layout convention: 4 magic bytes, a
//! `u32` version, then length-prefixed records.
//!
//! ```text
//! CFGS  version  categories[ {volume f32, name str} ]
//!                curves[ {id u32, applies_to_sound u8, variable, parameter u8, points[ {x, y, curve u8} ]} ]
//!
//! CFSB  version  name  waves[..]  sounds[ {index u32, ..} ]  cues[ {index u32, ..} ]
//! ```
//!
//! Structural damage (truncation, bad UTF-8, oversized counts) is an error.
//! Unknown enum tags and dangling references are warned about and defaulted.

use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::bank::SoundBank;
use crate::category::{Category, CategoryTable, DEFAULT_CATEGORY};
use crate::cue::{Cue, LimitBehavior};
use crate::curve::{CurveType, RpcCurve, RpcCurveTable, RuntimeParameter, SoundVariable};
use crate::error::{LoadReport, LoadWarning, PersistError, PersistResult};
use crate::sound::Sound;
use crate::track::{
    AutomationEvent, AutomationOp, LoopPolicy, PlayWaveEvent, Recurrence, StopBehavior,
    StopEvent, StopObject, Track, TrackEvent, VariationRange, WaveEntry,
};
use crate::variation::VariationType;
use crate::wave::{Wave, WaveIndex, WaveResource};

/// Magic bytes of a bank file
pub const BANK_MAGIC: &[u8; 4] = b"CFSB";

/// Magic bytes of a global settings file
pub const GLOBALS_MAGIC: &[u8; 4] = b"CFGS";

/// Current format version (both files)
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound for any record count or string length
const MAX_ENTRIES: usize = 1 << 20;

const EVENT_PLAY_WAVE: u8 = 0;
const EVENT_STOP: u8 = 1;
const EVENT_VOLUME: u8 = 2;
const EVENT_PITCH: u8 = 3;

const VARIABLE_CUSTOM: u8 = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// PRIMITIVES
// ═══════════════════════════════════════════════════════════════════════════════

struct Encoder<W: Write> {
    out: W,
}

impl<W: Write> Encoder<W> {
    fn u8(&mut self, v: u8) -> PersistResult<()> {
        self.out.write_all(&[v])?;
        Ok(())
    }

    fn bool(&mut self, v: bool) -> PersistResult<()> {
        self.u8(v as u8)
    }

    fn u16(&mut self, v: u16) -> PersistResult<()> {
        self.out.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn u32(&mut self, v: u32) -> PersistResult<()> {
        self.out.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn u64(&mut self, v: u64) -> PersistResult<()> {
        self.out.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn f32(&mut self, v: f32) -> PersistResult<()> {
        self.out.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn len(&mut self, len: usize) -> PersistResult<()> {
        if len > MAX_ENTRIES {
            return Err(PersistError::Invalid(format!("Too many entries: {}", len)));
        }
        self.u32(len as u32)
    }

    fn str(&mut self, s: &str) -> PersistResult<()> {
        self.len(s.len())?;
        self.out.write_all(s.as_bytes())?;
        Ok(())
    }

    fn range(&mut self, range: &VariationRange) -> PersistResult<()> {
        self.f32(range.min)?;
        self.f32(range.max)
    }

    fn curve_ids(&mut self, ids: &[u32]) -> PersistResult<()> {
        self.len(ids.len())?;
        for id in ids {
            self.u32(*id)?;
        }
        Ok(())
    }

    fn header(&mut self, magic: &[u8; 4]) -> PersistResult<()> {
        self.out.write_all(magic)?;
        self.u32(FORMAT_VERSION)
    }
}

struct Decoder<R: Read> {
    input: R,
}

impl<R: Read> Decoder<R> {
    fn bytes<const N: usize>(&mut self) -> PersistResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.input.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn u8(&mut self) -> PersistResult<u8> {
        Ok(self.bytes::<1>()?[0])
    }

    fn bool(&mut self) -> PersistResult<bool> {
        Ok(self.u8()? != 0)
    }

    fn u16(&mut self) -> PersistResult<u16> {
        Ok(u16::from_le_bytes(self.bytes()?))
    }

    fn u32(&mut self) -> PersistResult<u32> {
        Ok(u32::from_le_bytes(self.bytes()?))
    }

    fn u64(&mut self) -> PersistResult<u64> {
        Ok(u64::from_le_bytes(self.bytes()?))
    }

    fn f32(&mut self) -> PersistResult<f32> {
        Ok(f32::from_le_bytes(self.bytes()?))
    }

    fn len(&mut self) -> PersistResult<usize> {
        let len = self.u32()? as usize;
        if len > MAX_ENTRIES {
            return Err(PersistError::Invalid(format!("Entry count too large: {}", len)));
        }
        Ok(len)
    }

    fn str(&mut self) -> PersistResult<String> {
        let len = self.len()?;
        let mut buf = vec![0u8; len];
        self.input.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|_| PersistError::Invalid("Invalid UTF-8 string".to_string()))
    }

    fn range(&mut self) -> PersistResult<VariationRange> {
        let min = self.f32()?;
        let max = self.f32()?;
        Ok(VariationRange::new(min, max))
    }

    fn curve_ids(&mut self) -> PersistResult<Vec<u32>> {
        let count = self.len()?;
        (0..count).map(|_| self.u32()).collect()
    }

    fn header(&mut self, magic: &[u8; 4]) -> PersistResult<u32> {
        let found: [u8; 4] = self.bytes()?;
        if &found != magic {
            return Err(PersistError::BadMagic { expected: *magic });
        }
        let version = self.u32()?;
        if version > FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }
        Ok(version)
    }
}

/// Decode an enum tag, warning and defaulting when it is unknown
fn tag_or_default<T: Default>(
    tag: u8,
    decode: impl FnOnce(u8) -> Option<T>,
    owner: impl FnOnce() -> String,
    field: &'static str,
    report: &mut LoadReport,
) -> T {
    decode(tag).unwrap_or_else(|| {
        report.warn(LoadWarning::UnknownValue {
            owner: owner(),
            field,
            value: tag.to_string(),
        });
        T::default()
    })
}

/// Replace a range that cannot be sampled with no variation
fn checked_range(
    range: VariationRange,
    owner: impl FnOnce() -> String,
    field: &'static str,
    report: &mut LoadReport,
) -> VariationRange {
    if range.is_valid() {
        return range;
    }
    report.warn(LoadWarning::InvalidRange {
        owner: owner(),
        field,
        min: range.min,
        max: range.max,
    });
    VariationRange::none()
}

// ═══════════════════════════════════════════════════════════════════════════════
// GLOBAL SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Write categories and RPC curves
pub fn write_globals<W: Write>(
    categories: &CategoryTable,
    curves: &RpcCurveTable,
    out: W,
) -> PersistResult<()> {
    let mut enc = Encoder { out };
    enc.header(GLOBALS_MAGIC)?;

    enc.len(categories.len())?;
    for category in categories.iter() {
        enc.f32(category.volume())?;
        enc.str(category.name())?;
    }

    enc.len(curves.len())?;
    for curve in curves.iter() {
        enc.u32(curve.id)?;
        enc.bool(curve.applies_to_sound)?;
        match &curve.variable {
            SoundVariable::Custom(name) => {
                enc.u8(VARIABLE_CUSTOM)?;
                enc.str(name)?;
            }
            builtin => enc.u8(variable_tag(builtin))?,
        }
        enc.u8(curve.parameter as u8)?;
        enc.len(curve.points().len())?;
        for point in curve.points() {
            enc.f32(point.x)?;
            enc.f32(point.y)?;
            enc.u8(point.curve as u8)?;
        }
    }

    enc.out.flush()?;
    Ok(())
}

/// Read categories and RPC curves
///
/// The returned table always contains the default category.
pub fn read_globals<R: Read>(
    input: R,
) -> PersistResult<(CategoryTable, RpcCurveTable, LoadReport)> {
    let mut dec = Decoder { input };
    dec.header(GLOBALS_MAGIC)?;
    let mut report = LoadReport::new();

    let mut categories = CategoryTable::new();
    for _ in 0..dec.len()? {
        let volume = dec.f32()?;
        let name = dec.str()?;
        let existed = categories.index_of(&name).is_some();
        let index = categories.add(Category::new(name.as_str()));
        if existed && index != DEFAULT_CATEGORY {
            report.warn(LoadWarning::DuplicateName {
                kind: "category",
                name,
            });
            continue;
        }
        if let Some(category) = categories.get_mut(index) {
            category.set_volume(volume);
        }
    }

    let mut curves = RpcCurveTable::new();
    for _ in 0..dec.len()? {
        let id = dec.u32()?;
        let owner = || format!("RPC curve {}", id);
        let applies_to_sound = dec.bool()?;
        let variable = match dec.u8()? {
            VARIABLE_CUSTOM => SoundVariable::Custom(dec.str()?),
            tag => variable_from_tag(tag).unwrap_or_else(|| {
                report.warn(LoadWarning::UnknownValue {
                    owner: owner(),
                    field: "variable",
                    value: tag.to_string(),
                });
                SoundVariable::Distance
            }),
        };
        let parameter = dec.u8()?;
        let parameter = RuntimeParameter::from_index(parameter).unwrap_or_else(|| {
            report.warn(LoadWarning::UnknownValue {
                owner: owner(),
                field: "parameter",
                value: parameter.to_string(),
            });
            RuntimeParameter::Volume
        });

        let mut curve = RpcCurve::new(id, variable, parameter);
        curve.applies_to_sound = applies_to_sound;
        for _ in 0..dec.len()? {
            let x = dec.f32()?;
            let y = dec.f32()?;
            let shape = tag_or_default(dec.u8()?, CurveType::from_index, owner, "curve type", &mut report);
            curve.add_point(x, y, shape);
        }

        if curves.insert(curve).is_some() {
            report.warn(LoadWarning::DuplicateName {
                kind: "RPC curve",
                name: id.to_string(),
            });
        }
    }

    Ok((categories, curves, report))
}

pub fn save_globals(
    categories: &CategoryTable,
    curves: &RpcCurveTable,
    path: &Path,
) -> PersistResult<()> {
    let file = std::fs::File::create(path)?;
    write_globals(categories, curves, BufWriter::new(file))
}

pub fn load_globals(path: &Path) -> PersistResult<(CategoryTable, RpcCurveTable, LoadReport)> {
    let file = std::fs::File::open(path)?;
    read_globals(BufReader::new(file))
}

fn variable_tag(variable: &SoundVariable) -> u8 {
    match variable {
        SoundVariable::Distance => 0,
        SoundVariable::NumCueInstances => 1,
        SoundVariable::Volume => 2,
        SoundVariable::OrientationAngle => 3,
        SoundVariable::DopplerPitchScalar => 4,
        SoundVariable::Custom(_) => VARIABLE_CUSTOM,
    }
}

fn variable_from_tag(tag: u8) -> Option<SoundVariable> {
    match tag {
        0 => Some(SoundVariable::Distance),
        1 => Some(SoundVariable::NumCueInstances),
        2 => Some(SoundVariable::Volume),
        3 => Some(SoundVariable::OrientationAngle),
        4 => Some(SoundVariable::DopplerPitchScalar),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BANKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Write a bank's definitions (live instances are not persisted)
pub fn write_bank<W: Write>(bank: &SoundBank, out: W) -> PersistResult<()> {
    let mut enc = Encoder { out };
    enc.header(BANK_MAGIC)?;
    enc.str(&bank.name)?;

    enc.len(bank.waves().len())?;
    for wave in bank.waves() {
        enc.str(&wave.name)?;
        match wave.resource {
            Some(WaveResource(id)) => {
                enc.bool(true)?;
                enc.u32(id)?;
            }
            None => enc.bool(false)?,
        }
        enc.u16(wave.channels)?;
        enc.u32(wave.sample_rate)?;
        enc.u64(wave.frames)?;
    }

    enc.len(bank.sounds().len())?;
    for (index, sound) in bank.sounds() {
        enc.u32(*index)?;
        write_sound(&mut enc, sound)?;
    }

    enc.len(bank.cues().len())?;
    for (index, cue) in bank.cues() {
        enc.u32(*index)?;
        enc.str(&cue.name)?;
        enc.u8(cue.variation() as u8)?;
        enc.u8(cue.limit_behavior() as u8)?;
        enc.u32(cue.instance_limit())?;
        enc.len(cue.play_list().len())?;
        for entry in cue.play_list() {
            enc.u32(entry.sound)?;
            enc.u32(entry.weight)?;
        }
    }

    enc.out.flush()?;
    Ok(())
}

fn write_sound<W: Write>(enc: &mut Encoder<W>, sound: &Sound) -> PersistResult<()> {
    enc.str(&sound.name)?;
    enc.u32(sound.category as u32)?;
    enc.f32(sound.volume_db)?;
    enc.f32(sound.pitch)?;
    enc.bool(sound.positional)?;
    enc.curve_ids(&sound.rpc_curves)?;

    enc.len(sound.tracks.len())?;
    for track in &sound.tracks {
        enc.f32(track.volume_db)?;
        enc.f32(track.pitch)?;
        enc.curve_ids(&track.rpc_curves)?;
        enc.len(track.events().len())?;
        for event in track.events() {
            write_event(enc, event)?;
        }
    }
    Ok(())
}

fn write_event<W: Write>(enc: &mut Encoder<W>, event: &TrackEvent) -> PersistResult<()> {
    match event {
        TrackEvent::PlayWave(e) => {
            enc.u8(EVENT_PLAY_WAVE)?;
            enc.f32(e.timestamp)?;
            enc.len(e.waves.len())?;
            for entry in &e.waves {
                enc.u32(entry.wave as u32)?;
                enc.u32(entry.weight)?;
            }
            enc.f32(e.volume_db)?;
            enc.f32(e.pitch)?;
            enc.f32(e.pan)?;
            match e.loop_policy {
                LoopPolicy::None => enc.u8(0)?,
                LoopPolicy::Count(n) => {
                    enc.u8(1)?;
                    enc.u32(n)?;
                }
                LoopPolicy::Infinite => enc.u8(2)?,
            }
            enc.range(&e.volume_variation)?;
            enc.range(&e.pitch_variation)?;
            enc.range(&e.pan_variation)?;
        }
        TrackEvent::Stop(e) => {
            enc.u8(EVENT_STOP)?;
            enc.f32(e.timestamp)?;
            enc.u8(e.behavior as u8)?;
            enc.u8(e.object as u8)?;
        }
        TrackEvent::Volume(e) | TrackEvent::Pitch(e) => {
            let tag = if matches!(event, TrackEvent::Volume(_)) {
                EVENT_VOLUME
            } else {
                EVENT_PITCH
            };
            enc.u8(tag)?;
            enc.f32(e.timestamp)?;
            enc.u8(e.op as u8)?;
            enc.f32(e.value)?;
            enc.range(&e.variation)?;
            match e.recurrence {
                Some(rec) => {
                    enc.bool(true)?;
                    enc.u32(rec.count.map_or(0, |c| c.saturating_add(1)))?;
                    enc.f32(rec.interval_secs)?;
                }
                None => enc.bool(false)?,
            }
        }
    }
    Ok(())
}

/// Read a bank, resolving references against the loaded globals
pub fn read_bank<R: Read>(
    input: R,
    categories: &CategoryTable,
    curves: &RpcCurveTable,
) -> PersistResult<(SoundBank, LoadReport)> {
    let mut dec = Decoder { input };
    dec.header(BANK_MAGIC)?;
    let mut report = LoadReport::new();
    let mut bank = SoundBank::new(dec.str()?);

    for _ in 0..dec.len()? {
        let name = dec.str()?;
        let resource = if dec.bool()? {
            Some(WaveResource(dec.u32()?))
        } else {
            None
        };
        let channels = dec.u16()?;
        let sample_rate = dec.u32()?;
        let frames = dec.u64()?;
        bank.add_wave(Wave {
            name,
            resource,
            channels,
            sample_rate,
            frames,
        });
    }

    let mut resolver = Resolver {
        categories,
        curves,
        wave_count: bank.waves().len(),
        placeholder: None,
        report: &mut report,
    };
    let mut sounds = Vec::new();
    for _ in 0..dec.len()? {
        let index = dec.u32()?;
        sounds.push((index, read_sound(&mut dec, &mut resolver)?));
    }

    if resolver.placeholder.is_some() {
        bank.add_wave(Wave::silent("<missing>", 48_000, 0));
    }
    for (index, sound) in sounds {
        let name = sound.name.clone();
        if !bank.insert_sound(index, sound) {
            report.warn(LoadWarning::DuplicateName { kind: "sound", name });
        }
    }

    for _ in 0..dec.len()? {
        let index = dec.u32()?;
        let cue = read_cue(&mut dec, &bank, &mut report)?;
        let name = cue.name.clone();
        if !bank.insert_cue(index, cue) {
            report.warn(LoadWarning::DuplicateName { kind: "cue", name });
        }
    }

    Ok((bank, report))
}

pub fn save_bank(bank: &SoundBank, path: &Path) -> PersistResult<()> {
    let file = std::fs::File::create(path)?;
    write_bank(bank, BufWriter::new(file))
}

pub fn load_bank(
    path: &Path,
    categories: &CategoryTable,
    curves: &RpcCurveTable,
) -> PersistResult<(SoundBank, LoadReport)> {
    let file = std::fs::File::open(path)?;
    read_bank(BufReader::new(file), categories, curves)
}

/// Reference checks shared by every sound of one bank
struct Resolver<'a> {
    categories: &'a CategoryTable,
    curves: &'a RpcCurveTable,
    wave_count: usize,
    /// Index of the silent stand-in for dangling wave references
    placeholder: Option<WaveIndex>,
    report: &'a mut LoadReport,
}

impl Resolver<'_> {
    fn curves(&mut self, owner: &str, ids: Vec<u32>) -> Vec<u32> {
        ids.into_iter()
            .filter(|id| {
                let known = self.curves.contains(*id);
                if !known {
                    self.report.warn(LoadWarning::UnknownCurve {
                        owner: owner.to_string(),
                        curve: *id,
                    });
                }
                known
            })
            .collect()
    }

    fn wave(&mut self, sound: &str, wave: WaveIndex) -> WaveIndex {
        if wave < self.wave_count {
            return wave;
        }
        self.report.warn(LoadWarning::UnknownWave {
            sound: sound.to_string(),
            wave: wave.to_string(),
        });
        *self.placeholder.get_or_insert(self.wave_count)
    }
}

fn read_sound<R: Read>(dec: &mut Decoder<R>, resolver: &mut Resolver<'_>) -> PersistResult<Sound> {
    let mut sound = Sound::new(dec.str()?);
    let owner = format!("Sound `{}`", sound.name);

    let category = dec.u32()? as usize;
    if resolver.categories.get(category).is_some() {
        sound.category = category;
    } else {
        resolver.report.warn(LoadWarning::UnknownCategory {
            sound: sound.name.clone(),
            category: category.to_string(),
        });
    }
    sound.volume_db = dec.f32()?;
    sound.pitch = dec.f32()?;
    sound.positional = dec.bool()?;
    let ids = dec.curve_ids()?;
    sound.rpc_curves = resolver.curves(&owner, ids);

    for track_index in 0..dec.len()? {
        let mut track = Track::new()
            .with_volume(dec.f32()?)
            .with_pitch(dec.f32()?);
        let ids = dec.curve_ids()?;
        track.rpc_curves = resolver.curves(&owner, ids);

        for _ in 0..dec.len()? {
            let event = read_event(dec, &sound.name, &owner, resolver)?;
            let kind = event.kind();
            if !track.add_event(event) {
                resolver.report.warn(LoadWarning::DuplicateEvent {
                    sound: sound.name.clone(),
                    track: track_index,
                    kind,
                });
            }
        }
        sound.tracks.push(track);
    }
    Ok(sound)
}

fn read_event<R: Read>(
    dec: &mut Decoder<R>,
    sound: &str,
    owner: &str,
    resolver: &mut Resolver<'_>,
) -> PersistResult<TrackEvent> {
    let tag = dec.u8()?;
    let timestamp = dec.f32()?;
    let owned = || owner.to_string();

    match tag {
        EVENT_PLAY_WAVE => {
            let mut waves = Vec::new();
            for _ in 0..dec.len()? {
                let wave = resolver.wave(sound, dec.u32()? as usize);
                waves.push(WaveEntry {
                    wave,
                    weight: dec.u32()?,
                });
            }
            if waves.is_empty() {
                resolver.report.warn(LoadWarning::MissingField {
                    owner: owned(),
                    field: "wave",
                });
                let wave = resolver.wave(sound, usize::MAX);
                waves.push(WaveEntry { wave, weight: 1 });
            }

            let mut event = PlayWaveEvent::new(waves[0].wave).at(timestamp);
            event.waves = waves;
            event.volume_db = dec.f32()?;
            event.pitch = dec.f32()?;
            event.pan = dec.f32()?;
            event.loop_policy = match dec.u8()? {
                0 => LoopPolicy::None,
                1 => LoopPolicy::Count(dec.u32()?),
                2 => LoopPolicy::Infinite,
                other => {
                    resolver.report.warn(LoadWarning::UnknownValue {
                        owner: owned(),
                        field: "loop",
                        value: other.to_string(),
                    });
                    LoopPolicy::None
                }
            };
            event.volume_variation =
                checked_range(dec.range()?, owned, "volume variation", resolver.report);
            event.pitch_variation =
                checked_range(dec.range()?, owned, "pitch variation", resolver.report);
            event.pan_variation =
                checked_range(dec.range()?, owned, "pan variation", resolver.report);
            Ok(TrackEvent::PlayWave(event))
        }
        EVENT_STOP => {
            let report = &mut *resolver.report;
            let behavior =
                tag_or_default(dec.u8()?, StopBehavior::from_index, owned, "stop behavior", report);
            let object =
                tag_or_default(dec.u8()?, StopObject::from_index, owned, "stop object", report);
            Ok(TrackEvent::Stop(StopEvent {
                timestamp,
                behavior,
                object,
            }))
        }
        EVENT_VOLUME | EVENT_PITCH => {
            let op = tag_or_default(
                dec.u8()?,
                AutomationOp::from_index,
                owned,
                "automation op",
                resolver.report,
            );
            let value = dec.f32()?;
            let variation =
                checked_range(dec.range()?, owned, "automation variation", resolver.report);
            let recurrence = if dec.bool()? {
                let count = dec.u32()?;
                Some(Recurrence {
                    count: count.checked_sub(1),
                    interval_secs: dec.f32()?,
                })
            } else {
                None
            };
            let event = AutomationEvent {
                timestamp,
                op,
                value,
                variation,
                recurrence,
            };
            Ok(if tag == EVENT_VOLUME {
                TrackEvent::Volume(event)
            } else {
                TrackEvent::Pitch(event)
            })
        }
        other => Err(PersistError::Invalid(format!(
            "{}: unknown event tag {}",
            owner, other
        ))),
    }
}

fn read_cue<R: Read>(
    dec: &mut Decoder<R>,
    bank: &SoundBank,
    report: &mut LoadReport,
) -> PersistResult<Cue> {
    let name = dec.str()?;
    let owner = || format!("Cue `{}`", name);
    let variation = tag_or_default(dec.u8()?, VariationType::from_index, owner, "variation", report);
    let behavior = tag_or_default(dec.u8()?, LimitBehavior::from_index, owner, "limit behavior", report);
    let limit = dec.u32()?;

    let mut cue = Cue::new(name.as_str())
        .with_variation(variation)
        .with_limit(behavior, limit);
    for _ in 0..dec.len()? {
        let sound = dec.u32()?;
        let weight = dec.u32()?;
        if bank.sound(sound).is_some() {
            cue = cue.with_entry(sound, weight);
        } else {
            report.warn(LoadWarning::UnknownSound {
                cue: name.clone(),
                sound: sound.to_string(),
            });
        }
    }
    if cue.play_list().is_empty() {
        report.warn(LoadWarning::EmptyPlayList { cue: name.clone() });
    }
    Ok(cue)
}

//! JSON descriptors for global settings and banks
//!
//! Descriptors mirror the definition types with every field optional and
//! every reference spelled by name. Building them never fails: missing or
//! unknown values are reported as [`LoadWarning`]s and replaced by defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bank::SoundBank;
use crate::category::{Category, CategoryTable, DEFAULT_CATEGORY};
use crate::cue::{Cue, LimitBehavior};
use crate::curve::{CurveType, RpcCurve, RpcCurveTable, RuntimeParameter, SoundVariable};
use crate::error::{LoadReport, LoadWarning};
use crate::sound::Sound;
use crate::track::{
    AutomationEvent, AutomationOp, LoopPolicy, PlayWaveEvent, Recurrence, StopBehavior,
    StopEvent, StopObject, Track, TrackEvent, VariationRange, WaveEntry,
};
use crate::variation::VariationType;
use crate::wave::{Wave, WaveIndex, WaveResource};

/// Sample rate assumed for waves that do not declare one
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

// ═══════════════════════════════════════════════════════════════════════════════
// GLOBALS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryDescriptor {
    pub name: Option<String>,
    pub volume: Option<f32>,
    pub reverb_volume: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PointDescriptor {
    pub x: f32,
    pub y: f32,
    /// Segment shape name (`Linear`, `Fast`, `Slow`, `SinCos`)
    pub curve: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveDescriptor {
    pub id: Option<u32>,
    pub applies_to_sound: Option<bool>,
    pub variable: Option<String>,
    pub parameter: Option<String>,
    pub points: Vec<PointDescriptor>,
}

/// Categories and RPC curves shared by every bank
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalsDescriptor {
    pub categories: Vec<CategoryDescriptor>,
    pub curves: Vec<CurveDescriptor>,
}

impl GlobalsDescriptor {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Build the category table and curve table
    pub fn build(&self) -> (CategoryTable, RpcCurveTable, LoadReport) {
        let mut report = LoadReport::new();

        let mut categories = CategoryTable::new();
        for (i, desc) in self.categories.iter().enumerate() {
            let Some(name) = desc.name.clone() else {
                report.warn(LoadWarning::MissingField {
                    owner: format!("Category #{}", i),
                    field: "name",
                });
                continue;
            };
            if categories.index_of(&name).is_some_and(|idx| idx != DEFAULT_CATEGORY) {
                report.warn(LoadWarning::DuplicateName {
                    kind: "category",
                    name,
                });
                continue;
            }
            let index = categories.add(Category::new(name.as_str()));
            if let Some(category) = categories.get_mut(index) {
                category.set_volume(desc.volume.unwrap_or(0.0));
                category.set_reverb_volume(desc.reverb_volume.unwrap_or(0.0));
            }
        }

        let mut curves = RpcCurveTable::new();
        for (i, desc) in self.curves.iter().enumerate() {
            let Some(id) = desc.id else {
                report.warn(LoadWarning::MissingField {
                    owner: format!("RPC curve #{}", i),
                    field: "id",
                });
                continue;
            };
            let owner = format!("RPC curve {}", id);

            let variable = match &desc.variable {
                Some(name) => SoundVariable::from_name(name),
                None => {
                    report.warn(LoadWarning::MissingField {
                        owner: owner.clone(),
                        field: "variable",
                    });
                    SoundVariable::Distance
                }
            };
            let parameter = lookup(
                desc.parameter.as_deref(),
                RuntimeParameter::from_name,
                RuntimeParameter::Volume,
                &owner,
                "parameter",
                &mut report,
            );

            let mut curve = RpcCurve::new(id, variable, parameter);
            curve.applies_to_sound = desc.applies_to_sound.unwrap_or(true);
            for point in &desc.points {
                let shape = lookup(
                    point.curve.as_deref(),
                    curve_type_from_name,
                    CurveType::Linear,
                    &owner,
                    "curve type",
                    &mut report,
                );
                curve.add_point(point.x, point.y, shape);
            }

            if curves.contains(id) {
                report.warn(LoadWarning::DuplicateName {
                    kind: "RPC curve",
                    name: id.to_string(),
                });
                continue;
            }
            curves.insert(curve);
        }

        (categories, curves, report)
    }
}

fn curve_type_from_name(name: &str) -> Option<CurveType> {
    match name {
        "Linear" => Some(CurveType::Linear),
        "Fast" => Some(CurveType::Fast),
        "Slow" => Some(CurveType::Slow),
        "SinCos" => Some(CurveType::SinCos),
        _ => None,
    }
}

/// Resolve an optional name; absent gives the default silently, unknown warns
fn lookup<T>(
    name: Option<&str>,
    parse: impl FnOnce(&str) -> Option<T>,
    default: T,
    owner: &str,
    field: &'static str,
    report: &mut LoadReport,
) -> T {
    let Some(name) = name else {
        return default;
    };
    parse(name).unwrap_or_else(|| {
        report.warn(LoadWarning::UnknownValue {
            owner: owner.to_string(),
            field,
            value: name.to_string(),
        });
        default
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// BANKS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveDescriptor {
    pub name: Option<String>,
    /// Backend resource ID; absent means a silent wave
    pub resource: Option<u32>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    pub frames: Option<u64>,
    /// Alternative to `frames`
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedName {
    pub name: String,
    pub weight: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayWaveDescriptor {
    pub timestamp: f32,
    /// Single wave shorthand
    pub wave: Option<String>,
    /// Weighted wave variations
    pub waves: Vec<WeightedName>,
    pub volume: f32,
    pub pitch: f32,
    pub pan: f32,
    /// Extra repetitions
    pub loop_count: Option<u32>,
    pub loop_infinite: bool,
    pub volume_variation: Option<[f32; 2]>,
    pub pitch_variation: Option<[f32; 2]>,
    pub pan_variation: Option<[f32; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StopDescriptor {
    pub timestamp: f32,
    pub behavior: Option<String>,
    pub object: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationDescriptor {
    pub timestamp: f32,
    /// `Set` or `Add`
    pub op: Option<String>,
    pub value: f32,
    pub variation: Option<[f32; 2]>,
    pub repeat_count: Option<u32>,
    pub repeat_forever: bool,
    pub interval_secs: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventDescriptor {
    PlayWave(PlayWaveDescriptor),
    Stop(StopDescriptor),
    Volume(AutomationDescriptor),
    Pitch(AutomationDescriptor),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackDescriptor {
    pub volume: f32,
    pub pitch: f32,
    pub curves: Vec<u32>,
    pub events: Vec<EventDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundDescriptor {
    pub name: Option<String>,
    pub category: Option<String>,
    pub volume: f32,
    pub pitch: f32,
    pub positional: bool,
    pub curves: Vec<u32>,
    pub tracks: Vec<TrackDescriptor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CueDescriptor {
    pub name: Option<String>,
    pub play_list: Vec<WeightedName>,
    pub variation: Option<String>,
    pub limit_behavior: Option<String>,
    pub instance_limit: Option<u32>,
}

/// One bank's waves, sounds and cues
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BankDescriptor {
    pub name: String,
    pub waves: Vec<WaveDescriptor>,
    pub sounds: Vec<SoundDescriptor>,
    pub cues: Vec<CueDescriptor>,
}

/// Name resolution state while building one bank
struct BankBuilder<'a> {
    categories: &'a CategoryTable,
    curves: &'a RpcCurveTable,
    waves: HashMap<String, WaveIndex>,
    placeholder: Option<WaveIndex>,
    bank: SoundBank,
    report: LoadReport,
}

impl BankDescriptor {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Build a bank, resolving names against the loaded globals
    pub fn build(
        &self,
        categories: &CategoryTable,
        curves: &RpcCurveTable,
    ) -> (SoundBank, LoadReport) {
        let mut builder = BankBuilder {
            categories,
            curves,
            waves: HashMap::new(),
            placeholder: None,
            bank: SoundBank::new(self.name.as_str()),
            report: LoadReport::new(),
        };

        for (i, desc) in self.waves.iter().enumerate() {
            builder.add_wave(i, desc);
        }
        for (i, desc) in self.sounds.iter().enumerate() {
            builder.add_sound(i, desc);
        }
        for (i, desc) in self.cues.iter().enumerate() {
            builder.add_cue(i, desc);
        }

        log::debug!(
            "Built bank `{}`: {} waves, {} sounds, {} cues, {} warnings",
            self.name,
            builder.bank.waves().len(),
            builder.bank.sounds().len(),
            builder.bank.cues().len(),
            builder.report.len()
        );
        (builder.bank, builder.report)
    }
}

impl BankBuilder<'_> {
    fn name_or_default(&mut self, name: &Option<String>, kind: &str, i: usize) -> String {
        match name {
            Some(name) => name.clone(),
            None => {
                let fallback = format!("{}{}", kind, i);
                self.report.warn(LoadWarning::MissingField {
                    owner: format!("{} #{}", kind, i),
                    field: "name",
                });
                fallback
            }
        }
    }

    fn add_wave(&mut self, i: usize, desc: &WaveDescriptor) {
        let name = self.name_or_default(&desc.name, "wave", i);
        if self.waves.contains_key(&name) {
            self.report.warn(LoadWarning::DuplicateName { kind: "wave", name });
            return;
        }

        let sample_rate = desc.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE).max(1);
        let frames = desc.frames.unwrap_or_else(|| {
            desc.duration_secs
                .map_or(0, |secs| (secs.max(0.0) * sample_rate as f64).round() as u64)
        });
        if desc.frames.is_none() && desc.duration_secs.is_none() {
            self.report.warn(LoadWarning::MissingField {
                owner: format!("Wave `{}`", name),
                field: "frames",
            });
        }

        let wave = match desc.resource {
            Some(id) => Wave::new(
                name.as_str(),
                WaveResource(id),
                desc.channels.unwrap_or(1),
                sample_rate,
                frames,
            ),
            None => Wave::silent(name.as_str(), sample_rate, frames),
        };
        let index = self.bank.add_wave(wave);
        self.waves.insert(name, index);
    }

    fn wave(&mut self, sound: &str, name: &str) -> WaveIndex {
        if let Some(&index) = self.waves.get(name) {
            return index;
        }
        self.report.warn(LoadWarning::UnknownWave {
            sound: sound.to_string(),
            wave: name.to_string(),
        });
        match self.placeholder {
            Some(index) => index,
            None => {
                let index = self.bank.add_wave(Wave::silent("<missing>", DEFAULT_SAMPLE_RATE, 0));
                self.placeholder = Some(index);
                index
            }
        }
    }

    fn curve_ids(&mut self, owner: &str, ids: &[u32]) -> Vec<u32> {
        let mut kept = Vec::with_capacity(ids.len());
        for &id in ids {
            if self.curves.contains(id) {
                kept.push(id);
            } else {
                self.report.warn(LoadWarning::UnknownCurve {
                    owner: owner.to_string(),
                    curve: id,
                });
            }
        }
        kept
    }

    fn add_sound(&mut self, i: usize, desc: &SoundDescriptor) {
        let name = self.name_or_default(&desc.name, "sound", i);
        let owner = format!("Sound `{}`", name);

        let category = match &desc.category {
            None => DEFAULT_CATEGORY,
            Some(category) => self.categories.index_of(category).unwrap_or_else(|| {
                self.report.warn(LoadWarning::UnknownCategory {
                    sound: name.clone(),
                    category: category.clone(),
                });
                DEFAULT_CATEGORY
            }),
        };

        let mut sound = Sound::new(name.as_str())
            .with_category(category)
            .with_volume(desc.volume)
            .with_pitch(desc.pitch);
        sound.positional = desc.positional;
        sound.rpc_curves = self.curve_ids(&owner, &desc.curves);

        for (track_index, track_desc) in desc.tracks.iter().enumerate() {
            let mut track = Track::new()
                .with_volume(track_desc.volume)
                .with_pitch(track_desc.pitch);
            track.rpc_curves = self.curve_ids(&owner, &track_desc.curves);

            for event_desc in &track_desc.events {
                let event = self.event(&name, &owner, event_desc);
                let kind = event.kind();
                if !track.add_event(event) {
                    self.report.warn(LoadWarning::DuplicateEvent {
                        sound: name.clone(),
                        track: track_index,
                        kind,
                    });
                }
            }
            sound.tracks.push(track);
        }

        if self.bank.add_sound(sound).is_none() {
            self.report.warn(LoadWarning::DuplicateName { kind: "sound", name });
        }
    }

    fn event(&mut self, sound: &str, owner: &str, desc: &EventDescriptor) -> TrackEvent {
        match desc {
            EventDescriptor::PlayWave(d) => {
                let mut names: Vec<(&str, u32)> = d
                    .waves
                    .iter()
                    .map(|w| (w.name.as_str(), w.weight.unwrap_or(1)))
                    .collect();
                if let Some(wave) = &d.wave {
                    names.insert(0, (wave.as_str(), 1));
                }
                if names.is_empty() {
                    self.report.warn(LoadWarning::MissingField {
                        owner: owner.to_string(),
                        field: "wave",
                    });
                    names.push(("", 1));
                }
                let waves: Vec<WaveEntry> = names
                    .into_iter()
                    .map(|(name, weight)| WaveEntry {
                        wave: self.wave(sound, name),
                        weight,
                    })
                    .collect();

                let mut event = PlayWaveEvent::new(waves[0].wave)
                    .at(d.timestamp)
                    .with_volume(d.volume)
                    .with_pitch(d.pitch)
                    .with_pan(d.pan)
                    .with_loop(match (d.loop_infinite, d.loop_count) {
                        (true, _) => LoopPolicy::Infinite,
                        (false, Some(n)) if n > 0 => LoopPolicy::Count(n),
                        _ => LoopPolicy::None,
                    });
                event.waves = waves;
                event.volume_variation = self.range(owner, "volume variation", d.volume_variation);
                event.pitch_variation = self.range(owner, "pitch variation", d.pitch_variation);
                event.pan_variation = self.range(owner, "pan variation", d.pan_variation);
                TrackEvent::PlayWave(event)
            }
            EventDescriptor::Stop(d) => {
                let behavior = lookup(
                    d.behavior.as_deref(),
                    |s| match s {
                        "Immediate" => Some(StopBehavior::Immediate),
                        "WithRelease" => Some(StopBehavior::WithRelease),
                        _ => None,
                    },
                    StopBehavior::Immediate,
                    owner,
                    "stop behavior",
                    &mut self.report,
                );
                let object = lookup(
                    d.object.as_deref(),
                    |s| match s {
                        "Track" => Some(StopObject::Track),
                        "Cue" => Some(StopObject::Cue),
                        _ => None,
                    },
                    StopObject::Track,
                    owner,
                    "stop object",
                    &mut self.report,
                );
                TrackEvent::Stop(StopEvent {
                    timestamp: d.timestamp,
                    behavior,
                    object,
                })
            }
            EventDescriptor::Volume(d) => TrackEvent::Volume(self.automation(owner, d)),
            EventDescriptor::Pitch(d) => TrackEvent::Pitch(self.automation(owner, d)),
        }
    }

    fn automation(&mut self, owner: &str, d: &AutomationDescriptor) -> AutomationEvent {
        let op = lookup(
            d.op.as_deref(),
            |s| match s {
                "Set" => Some(AutomationOp::Set),
                "Add" => Some(AutomationOp::Add),
                _ => None,
            },
            AutomationOp::Set,
            owner,
            "automation op",
            &mut self.report,
        );
        let recurrence = (d.repeat_forever || d.repeat_count.is_some()).then(|| Recurrence {
            count: if d.repeat_forever { None } else { d.repeat_count },
            interval_secs: d.interval_secs,
        });
        AutomationEvent {
            timestamp: d.timestamp,
            op,
            value: d.value,
            variation: self.range(owner, "automation variation", d.variation),
            recurrence,
        }
    }

    fn range(
        &mut self,
        owner: &str,
        field: &'static str,
        bounds: Option<[f32; 2]>,
    ) -> VariationRange {
        let Some([min, max]) = bounds else {
            return VariationRange::none();
        };
        let range = VariationRange::new(min, max);
        if range.is_valid() {
            return range;
        }
        self.report.warn(LoadWarning::InvalidRange {
            owner: owner.to_string(),
            field,
            min,
            max,
        });
        VariationRange::none()
    }

    fn add_cue(&mut self, i: usize, desc: &CueDescriptor) {
        let name = self.name_or_default(&desc.name, "cue", i);
        let owner = format!("Cue `{}`", name);

        let variation = lookup(
            desc.variation.as_deref(),
            VariationType::from_name,
            VariationType::Ordered,
            &owner,
            "variation",
            &mut self.report,
        );
        let behavior = lookup(
            desc.limit_behavior.as_deref(),
            LimitBehavior::from_name,
            LimitBehavior::None,
            &owner,
            "limit behavior",
            &mut self.report,
        );

        let mut cue = Cue::new(name.as_str())
            .with_variation(variation)
            .with_limit(behavior, desc.instance_limit.unwrap_or(0));
        for entry in &desc.play_list {
            match self.bank.sound_index(&entry.name) {
                Some(sound) => cue = cue.with_entry(sound, entry.weight.unwrap_or(1)),
                None => self.report.warn(LoadWarning::UnknownSound {
                    cue: name.clone(),
                    sound: entry.name.clone(),
                }),
            }
        }
        if cue.play_list().is_empty() {
            self.report.warn(LoadWarning::EmptyPlayList { cue: name.clone() });
        }

        if self.bank.add_cue(cue).is_none() {
            self.report.warn(LoadWarning::DuplicateName { kind: "cue", name });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOBALS: &str = r#"{
        "categories": [
            { "name": "Music", "volume": -3.0 },
            { "name": "Sfx", "volume": 12.0, "reverb_volume": -6.0 },
            { "volume": 1.0 }
        ],
        "curves": [
            { "id": 1, "variable": "Distance", "parameter": "Volume",
              "points": [ { "x": 0, "y": 0 }, { "x": 50, "y": -30, "curve": "Slow" } ] },
            { "id": 2, "variable": "rpm", "parameter": "Loudness", "points": [] }
        ]
    }"#;

    const BANK: &str = r#"{
        "name": "demo",
        "waves": [
            { "name": "kick", "resource": 1, "channels": 2, "frames": 48000 },
            { "name": "pad", "resource": 2, "duration_secs": 2.0 },
            { "name": "gap", "duration_secs": 0.5 }
        ],
        "sounds": [
            { "name": "kick", "category": "Music", "curves": [1, 99],
              "tracks": [ { "volume": -6, "events": [
                  { "type": "PlayWave", "wave": "kick", "volume_variation": [-1, 1] },
                  { "type": "PlayWave", "wave": "pad" },
                  { "type": "Stop", "timestamp": 1.0, "object": "Cue" },
                  { "type": "Volume", "timestamp": 0.5, "op": "Add", "value": -2,
                    "repeat_count": 2, "interval_secs": 0.25 }
              ] } ] },
            { "name": "pad", "category": "Ambience", "positional": true,
              "tracks": [ { "events": [
                  { "type": "PlayWave", "waves": [ { "name": "pad", "weight": 3 }, { "name": "nope" } ],
                    "loop_infinite": true }
              ] } ] }
        ],
        "cues": [
            { "name": "beat", "play_list": [ { "name": "kick" }, { "name": "pad", "weight": 2 } ],
              "variation": "Shuffle", "limit_behavior": "Queue", "instance_limit": 2 },
            { "name": "ghost", "play_list": [ { "name": "missing" } ], "variation": "Sideways" }
        ]
    }"#;

    #[test]
    fn test_globals_build() {
        let (categories, curves, report) = GlobalsDescriptor::from_json(GLOBALS).unwrap().build();
        assert_eq!(categories.len(), 3);
        let sfx = categories.index_of("Sfx").unwrap();
        assert_eq!(categories.volume(sfx), 6.0);
        assert_eq!(categories.reverb_volume(sfx), -6.0);

        assert_eq!(curves.len(), 2);
        let custom = curves.get(2).unwrap();
        assert_eq!(custom.variable, SoundVariable::Custom("rpm".into()));
        assert_eq!(custom.parameter, RuntimeParameter::Volume);
        assert_eq!(curves.get(1).unwrap().points()[1].curve, CurveType::Slow);

        // Nameless category and unknown parameter
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_bank_build_with_warnings() {
        let (categories, curves, _) = GlobalsDescriptor::from_json(GLOBALS).unwrap().build();
        let (bank, report) = BankDescriptor::from_json(BANK)
            .unwrap()
            .build(&categories, &curves);

        let kick = bank.sound(bank.sound_index("kick").unwrap()).unwrap();
        assert_eq!(kick.category, categories.index_of("Music").unwrap());
        assert_eq!(kick.rpc_curves, vec![1]);
        assert_eq!(kick.tracks[0].events().len(), 3);
        assert_eq!(kick.tracks[0].volume_db, -6.0);

        let pad = bank.sound(bank.sound_index("pad").unwrap()).unwrap();
        assert_eq!(pad.category, DEFAULT_CATEGORY);
        let play = pad.tracks[0].play_event().unwrap();
        assert_eq!(play.loop_policy, LoopPolicy::Infinite);
        assert_eq!(play.waves.len(), 2);
        assert!(bank.waves()[play.waves[1].wave].is_silent());

        assert_eq!(bank.waves()[1].frames, 96_000);
        assert!(bank.waves()[2].is_silent());

        let beat = bank.cue("beat").unwrap();
        assert_eq!(beat.variation(), VariationType::Shuffle);
        assert_eq!(beat.limit_behavior(), LimitBehavior::Queue);
        assert_eq!(beat.play_list().len(), 2);

        let ghost = bank.cue("ghost").unwrap();
        assert!(ghost.play_list().is_empty());

        let count = |pred: fn(&LoadWarning) -> bool| report.warnings.iter().filter(|w| pred(w)).count();
        assert_eq!(count(|w| matches!(w, LoadWarning::UnknownCurve { curve: 99, .. })), 1);
        assert_eq!(count(|w| matches!(w, LoadWarning::DuplicateEvent { .. })), 1);
        assert_eq!(count(|w| matches!(w, LoadWarning::UnknownCategory { .. })), 1);
        assert_eq!(count(|w| matches!(w, LoadWarning::UnknownWave { .. })), 1);
        assert_eq!(count(|w| matches!(w, LoadWarning::UnknownSound { .. })), 1);
        assert_eq!(count(|w| matches!(w, LoadWarning::UnknownValue { .. })), 1);
        assert_eq!(count(|w| matches!(w, LoadWarning::EmptyPlayList { .. })), 1);
    }

    #[test]
    fn test_unsampleable_ranges_warn() {
        let json = r#"{
            "waves": [ { "name": "w", "duration_secs": 0.1 } ],
            "sounds": [ { "name": "s", "tracks": [ { "events": [
                { "type": "PlayWave", "wave": "w",
                  "volume_variation": [-3e38, 3e38], "pitch_variation": [-1, 1] },
                { "type": "Pitch", "timestamp": 0.2, "value": 1, "variation": [0, 1e39] }
            ] } ] } ]
        }"#;
        let (bank, report) = BankDescriptor::from_json(json)
            .unwrap()
            .build(&CategoryTable::new(), &RpcCurveTable::new());

        assert_eq!(report.len(), 2);
        assert!(report.warnings.iter().all(|w| matches!(w, LoadWarning::InvalidRange { .. })));

        let track = &bank.sound(0).unwrap().tracks[0];
        let play = track.play_event().unwrap();
        assert_eq!(play.volume_variation, VariationRange::none());
        assert_eq!(play.pitch_variation, VariationRange::new(-1.0, 1.0));
    }

    #[test]
    fn test_empty_descriptor() {
        let (bank, report) = BankDescriptor::from_json("{}")
            .unwrap()
            .build(&CategoryTable::new(), &RpcCurveTable::new());
        assert!(report.is_clean());
        assert!(bank.cues().is_empty());
    }

    #[test]
    fn test_json_roundtrip_keeps_events() {
        let desc = BankDescriptor::from_json(BANK).unwrap();
        let again = BankDescriptor::from_json(&desc.to_json().unwrap()).unwrap();
        assert_eq!(again.sounds[0].tracks[0].events.len(), 4);
    }
}

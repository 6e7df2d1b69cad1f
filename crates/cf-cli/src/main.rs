//! cueforge: CueForge bank tool
//!
//! Usage:
//!   cueforge inspect  --bank bank.json [--globals globals.json]
//!   cueforge compile  --bank bank.json [--globals globals.json] --out-dir build/
//!   cueforge simulate --bank bank.json --cue footstep --plays 4 --seconds 2

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use cf_core::Position3D;
use cf_cue::persist::{save_bank, save_globals};
use cf_cue::{
    AudioEngine, BankDescriptor, CategoryTable, EngineConfig, GlobalsDescriptor, LoadReport,
    PlaybackBackend, RpcCurveTable, SoundBank,
};

#[derive(Parser)]
#[command(name = "cueforge", about = "CueForge sound bank tool")]
struct Cli {
    /// Engine config (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load descriptors and print a summary with all warnings
    Inspect {
        #[arg(short, long)]
        bank: PathBuf,
        #[arg(short, long)]
        globals: Option<PathBuf>,
    },
    /// Convert JSON descriptors to binary globals and bank files
    Compile {
        #[arg(short, long)]
        bank: PathBuf,
        #[arg(short, long)]
        globals: Option<PathBuf>,
        #[arg(short, long, default_value = "build")]
        out_dir: PathBuf,
    },
    /// Play a cue on the offline backend and report activity per tick
    Simulate {
        #[arg(short, long)]
        bank: PathBuf,
        #[arg(short, long)]
        globals: Option<PathBuf>,
        /// Cue name
        #[arg(short, long)]
        cue: String,
        /// Play requests issued at start
        #[arg(short, long, default_value_t = 1)]
        plays: u32,
        /// Simulated duration
        #[arg(short, long, default_value_t = 2.0)]
        seconds: f32,
        /// Logic tick length
        #[arg(long, default_value_t = 1.0 / 60.0)]
        tick: f32,
        /// Emitter distance from the listener
        #[arg(long)]
        distance: Option<f32>,
        /// Random seed (overrides the config)
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { bank, globals } => inspect(&bank, globals.as_deref()),
        Commands::Compile {
            bank,
            globals,
            out_dir,
        } => compile(&bank, globals.as_deref(), &out_dir),
        Commands::Simulate {
            bank,
            globals,
            cue,
            plays,
            seconds,
            tick,
            distance,
            seed,
        } => {
            let config = EngineConfig {
                seed: seed.or(config.seed),
                ..config
            };
            simulate(
                config,
                &bank,
                globals.as_deref(),
                &cue,
                Simulation {
                    plays,
                    seconds,
                    tick,
                    distance,
                },
            )
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    EngineConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
}

/// Globals, bank and every load warning
struct Loaded {
    categories: CategoryTable,
    curves: RpcCurveTable,
    bank: SoundBank,
    report: LoadReport,
}

fn load(bank_path: &Path, globals_path: Option<&Path>) -> Result<Loaded> {
    let (categories, curves, mut report) = match globals_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read globals {}", path.display()))?;
            GlobalsDescriptor::from_json(&json)
                .with_context(|| format!("Invalid globals {}", path.display()))?
                .build()
        }
        None => (CategoryTable::new(), RpcCurveTable::new(), LoadReport::new()),
    };

    let json = std::fs::read_to_string(bank_path)
        .with_context(|| format!("Failed to read bank {}", bank_path.display()))?;
    let (bank, bank_report) = BankDescriptor::from_json(&json)
        .with_context(|| format!("Invalid bank {}", bank_path.display()))?
        .build(&categories, &curves);
    report.extend(bank_report);

    Ok(Loaded {
        categories,
        curves,
        bank,
        report,
    })
}

fn inspect(bank_path: &Path, globals_path: Option<&Path>) -> Result<()> {
    let loaded = load(bank_path, globals_path)?;
    let bank = &loaded.bank;

    println!("Bank `{}`", bank.name);
    println!(
        "  {} categories, {} RPC curves, {} waves, {} sounds, {} cues",
        loaded.categories.len(),
        loaded.curves.len(),
        bank.waves().len(),
        bank.sounds().len(),
        bank.cues().len()
    );
    for (index, cue) in bank.cues() {
        println!(
            "  cue {:>3} {:<24} {:?}, {:?} x{}, {} entries",
            index,
            cue.name,
            cue.variation(),
            cue.limit_behavior(),
            cue.instance_limit(),
            cue.play_list().len()
        );
    }

    if loaded.report.is_clean() {
        println!("No warnings");
    } else {
        println!("{} warning(s):", loaded.report.len());
        for warning in &loaded.report.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}

fn compile(bank_path: &Path, globals_path: Option<&Path>, out_dir: &Path) -> Result<()> {
    let loaded = load(bank_path, globals_path)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let globals_out = out_dir.join("globals.cfgs");
    save_globals(&loaded.categories, &loaded.curves, &globals_out)
        .with_context(|| format!("Failed to write {}", globals_out.display()))?;

    let bank_out = out_dir.join(format!("{}.cfsb", file_stem(&loaded.bank.name)));
    save_bank(&loaded.bank, &bank_out)
        .with_context(|| format!("Failed to write {}", bank_out.display()))?;

    println!("Wrote {}", globals_out.display());
    println!("Wrote {}", bank_out.display());
    if !loaded.report.is_clean() {
        println!("{} warning(s), run `inspect` for details", loaded.report.len());
    }
    Ok(())
}

fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "bank".to_string() } else { stem }
}

struct Simulation {
    plays: u32,
    seconds: f32,
    tick: f32,
    distance: Option<f32>,
}

fn simulate(
    config: EngineConfig,
    bank_path: &Path,
    globals_path: Option<&Path>,
    cue: &str,
    sim: Simulation,
) -> Result<()> {
    if !sim.tick.is_finite() || sim.tick <= 0.0 || !sim.seconds.is_finite() || sim.seconds < 0.0 {
        bail!("tick must be positive and seconds non-negative");
    }

    let loaded = load(bank_path, globals_path)?;
    if loaded.bank.cue(cue).is_none() {
        bail!("Cue `{}` not found in bank `{}`", cue, loaded.bank.name);
    }

    let mut engine = AudioEngine::offline(config);
    engine.set_globals(loaded.categories, loaded.curves);
    let bank = engine.load_bank(loaded.bank);

    let mut ids = Vec::new();
    for n in 0..sim.plays {
        match engine.play(bank, cue) {
            Ok(id) => {
                if let Some(distance) = sim.distance {
                    engine.set_position(id, Position3D::new(distance, 0.0, 0.0));
                }
                let queued = if engine.is_queued(id) { " (queued)" } else { "" };
                println!("play #{} -> {}{}", n + 1, id, queued);
                ids.push(id);
            }
            Err(err) => println!("play #{} -> {}", n + 1, err),
        }
    }

    let ticks = (sim.seconds / sim.tick).ceil() as u32;
    let mut last = None;
    for tick in 0..=ticks {
        if tick > 0 {
            engine.backend_mut().advance(sim.tick as f64);
            engine.update(sim.tick);
        }

        let live = engine.live_instance_count(bank, cue);
        let voices = engine.backend().active_voices();
        if last != Some((live, voices)) {
            println!(
                "t={:>7.3}s  instances={}  voices={}",
                tick as f32 * sim.tick,
                live,
                voices
            );
            last = Some((live, voices));
        }
    }

    for id in ids {
        if let Some(levels) = engine.track_levels(id) {
            for (track, level) in levels.iter().enumerate() {
                println!(
                    "{} track {}: {:.1} dB, {:+.2} st, reverb {:.1} dB",
                    id, track, level.volume_db, level.pitch, level.reverb_send_db
                );
            }
        }
    }

    let stopped = engine.stop_all();
    log::info!("Simulation finished, {} instance(s) stopped", stopped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("ui/menu sounds"), "ui_menu_sounds");
        assert_eq!(file_stem(""), "bank");
    }

    #[test]
    fn test_compile_and_simulate() {
        let dir = tempfile::tempdir().unwrap();
        let bank_path = dir.path().join("bank.json");
        std::fs::write(
            &bank_path,
            r#"{ "name": "demo",
                 "waves": [ { "name": "w", "resource": 1, "duration_secs": 0.1 } ],
                 "sounds": [ { "name": "s", "tracks": [ { "events": [ { "type": "PlayWave", "wave": "w" } ] } ] } ],
                 "cues": [ { "name": "c", "play_list": [ { "name": "s" } ] } ] }"#,
        )
        .unwrap();

        let out = dir.path().join("out");
        compile(&bank_path, None, &out).unwrap();
        assert!(out.join("globals.cfgs").exists());
        assert!(out.join("demo.cfsb").exists());

        let sim = Simulation {
            plays: 2,
            seconds: 0.2,
            tick: 0.05,
            distance: None,
        };
        simulate(EngineConfig::deterministic(1), &bank_path, None, "c", sim).unwrap();

        let missing = Simulation {
            plays: 1,
            seconds: 0.1,
            tick: 0.05,
            distance: None,
        };
        assert!(simulate(EngineConfig::default(), &bank_path, None, "nope", missing).is_err());
    }
}

//! CPR Pacer CLI
//!
//! Compression-rate trainer with a terminal metronome and coaching feedback.

use clap::{Parser, Subcommand};
use cpr_pacer::{
    coach::{AnyCoach, RuleCoach},
    collector::{MotionSource, NoopSource, ReplaySource, SimulatedConfig, SimulatedSource},
    config::{CoachKind, Config, SourceKind},
    core::ideal_range,
    runtime::{Command, Trainer, TrainerEvent},
    SAFETY_NOTICE, VERSION,
};
use crossbeam_channel::{unbounded, Sender};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Tempo change for each `+`/`-` key press.
const TEMPO_STEP: i32 = 5;

#[derive(Parser)]
#[command(name = "cpr-pacer")]
#[command(version = VERSION)]
#[command(about = "Real-time CPR compression-rate trainer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive training session
    Start {
        /// Motion source (simulated, replay, or none)
        #[arg(long)]
        source: Option<SourceKind>,

        /// Compressions per minute for the simulated source
        #[arg(long)]
        rate: Option<u32>,

        /// JSON-lines motion trace for the replay source
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Feedback coach (rule or http)
        #[arg(long)]
        coach: Option<CoachKind>,

        /// Base URL of the feedback service
        #[arg(long)]
        coach_url: Option<String>,

        /// Metronome tempo in beats per minute
        #[arg(long)]
        tempo: Option<u32>,

        /// Quit after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Begin the session immediately instead of waiting for `s`
        #[arg(long)]
        now: bool,

        /// Silence the metronome bell
        #[arg(long)]
        mute: bool,
    },

    /// Persist the metronome tempo
    Tempo {
        /// Beats per minute
        bpm: u32,
    },

    /// Show configuration
    Config,

    /// Display the training disclaimer
    Safety,

    /// Serve the rule coach over HTTP (requires server feature)
    #[cfg(feature = "server")]
    ServeCoach {
        /// Port to bind on 127.0.0.1
        #[arg(long, default_value = "8787")]
        port: u16,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            source,
            rate,
            replay,
            coach,
            coach_url,
            tempo,
            duration,
            now,
            mute,
        } => {
            let mut config = load_config();
            if let Some(source) = source {
                config.source = source;
            }
            if replay.is_some() && source.is_none() {
                config.source = SourceKind::Replay;
            }
            if let Some(rate) = rate {
                config.simulated_rate_cpm = rate;
            }
            if let Some(coach) = coach {
                config.coach.kind = coach;
            }
            if let Some(url) = coach_url {
                config.coach.url = url;
            }
            if let Some(tempo) = tempo {
                config.target_tempo = tempo;
            }
            if mute {
                config.metronome_muted = true;
            }
            cmd_start(config.clamped(), replay, duration, now);
        }
        Commands::Tempo { bpm } => {
            cmd_tempo(bpm);
        }
        Commands::Config => {
            cmd_config();
        }
        Commands::Safety => {
            cmd_safety();
        }
        #[cfg(feature = "server")]
        Commands::ServeCoach { port } => {
            cmd_serve_coach(port);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config ({e}); using defaults");
            Config::default()
        }
    }
}

fn cmd_start(config: Config, replay: Option<PathBuf>, duration: Option<u64>, start_now: bool) {
    println!("CPR Pacer v{VERSION}");
    println!("Rate practice only; compression depth is not measured.");
    println!();

    let source: Box<dyn MotionSource> = match build_source(&config, replay) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("Error: {message}");
            std::process::exit(1);
        }
    };

    let coach = match build_coach(&config) {
        Ok(coach) => coach,
        Err(message) => {
            eprintln!("Error: {message}");
            std::process::exit(1);
        }
    };

    let (low, high) = ideal_range(config.target_tempo);
    println!("  Source: {:?}", config.source);
    println!("  Coach: {:?}", config.coach.kind);
    println!(
        "  Tempo: {} BPM (on target {}-{} CPM)",
        config.target_tempo, low, high
    );
    println!();
    println!("Controls: Enter = tap, s = start/stop, m = mute, +/- = tempo, q = quit");
    println!();

    let mut trainer = match Trainer::new(&config, source, coach) {
        Ok(trainer) => trainer,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(secs) = duration {
        trainer = trainer.with_time_limit(Duration::from_secs(secs));
    }

    let (command_tx, command_rx) = unbounded();
    ctrlc_handler(command_tx.clone());
    spawn_stdin_reader(command_tx);

    if start_now {
        trainer.start_session();
    }

    let stats = trainer.run(&command_rx, render);

    println!();
    println!();
    println!("{}", trainer.controller().stats().summary());
    tracing::debug!(?stats, "trainer finished");
}

fn build_source(config: &Config, replay: Option<PathBuf>) -> Result<Box<dyn MotionSource>, String> {
    match config.source {
        SourceKind::Simulated => Ok(Box::new(SimulatedSource::new(SimulatedConfig {
            rate_cpm: config.simulated_rate_cpm,
            ..SimulatedConfig::default()
        }))),
        SourceKind::Replay => {
            let path = replay.ok_or("--replay <FILE> is required for the replay source")?;
            let source = ReplaySource::from_path(&path)
                .map_err(|e| format!("Could not load trace {path:?}: {e}"))?;
            println!("Loaded {} samples from {:?}", source.len(), path);
            Ok(Box::new(source))
        }
        SourceKind::None => Ok(Box::new(NoopSource::new())),
    }
}

fn build_coach(config: &Config) -> Result<AnyCoach, String> {
    match config.coach.kind {
        CoachKind::Rule => Ok(AnyCoach::Rule(RuleCoach::new())),
        #[cfg(feature = "remote")]
        CoachKind::Http => {
            let coach = cpr_pacer::HttpCoach::new(config.coach.url.clone(), config.feedback_timeout)
                .map_err(|e| e.to_string())?;
            Ok(AnyCoach::Http(coach))
        }
        #[cfg(not(feature = "remote"))]
        CoachKind::Http => {
            Err("the http coach requires the `remote` feature at compile time".to_string())
        }
    }
}

fn render(event: TrainerEvent<'_>) {
    let mut stdout = std::io::stdout();
    match event {
        TrainerEvent::Display(state) => {
            let session = if state.active { "●" } else { "○" };
            let _ = write!(stdout, "\r\x1b[2K{session} {}", state.status_line());
        }
        TrainerEvent::Beat { audible: true } => {
            let _ = write!(stdout, "\x07");
        }
        TrainerEvent::Beat { audible: false } => {}
        TrainerEvent::MuteChanged(muted) => {
            tracing::info!(muted, "metronome mute toggled");
        }
        TrainerEvent::TempoLocked => {
            tracing::warn!("stop the session before changing tempo");
        }
    }
    let _ = stdout.flush();
}

/// Translate terminal lines into trainer commands.
fn spawn_stdin_reader(commands: Sender<Command>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let command = match line.trim() {
                "" => Command::Tap,
                "s" => Command::Toggle,
                "m" => Command::ToggleMute,
                "+" => Command::AdjustTempo(TEMPO_STEP),
                "-" => Command::AdjustTempo(-TEMPO_STEP),
                "q" => Command::Quit,
                other => match other.parse::<u32>() {
                    Ok(bpm) => Command::SetTempo(bpm),
                    Err(_) => {
                        tracing::warn!(input = other, "unknown command");
                        continue;
                    }
                },
            };
            if commands.send(command).is_err() {
                break;
            }
        }
    });
}

fn cmd_tempo(bpm: u32) {
    let mut config = load_config();
    config.target_tempo = bpm;
    let config = config.clamped();

    match config.save() {
        Ok(()) => {
            let (low, high) = ideal_range(config.target_tempo);
            println!(
                "Tempo set to {} BPM (on target {}-{} CPM)",
                config.target_tempo, low, high
            );
        }
        Err(e) => {
            eprintln!("Error saving config: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_safety() {
    println!("{SAFETY_NOTICE}");
}

#[cfg(feature = "server")]
fn cmd_serve_coach(port: u16) {
    use cpr_pacer::server::{run, ServerConfig};

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        let (addr, shutdown_tx) = match run(ServerConfig::new(port)).await {
            Ok(bound) => bound,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };
        println!("Coach listening on http://{addr} (Ctrl+C to stop)");
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Warning: Could not listen for Ctrl+C: {e}");
        }
        let _ = shutdown_tx.send(());
    });
}

fn ctrlc_handler(commands: Sender<Command>) {
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = commands.send(Command::Quit);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}

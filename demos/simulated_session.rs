//! Runs a short session against the simulated motion source.
//!
//! ```text
//! cargo run --example simulated_session -- 95
//! ```
//!
//! The optional argument is the simulated compression rate.

use cpr_pacer::coach::RuleCoach;
use cpr_pacer::collector::{SimulatedConfig, SimulatedSource};
use cpr_pacer::runtime::{Command, Trainer, TrainerEvent};
use cpr_pacer::Config;
use std::time::Duration;

fn main() {
    let rate: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(110);

    let mut config = Config::default();
    config.metronome_muted = true;

    let source = SimulatedSource::new(SimulatedConfig {
        rate_cpm: rate,
        ..SimulatedConfig::default()
    });
    let mut trainer = Trainer::new(&config, source, RuleCoach::new())
        .expect("Failed to build trainer")
        .with_time_limit(Duration::from_secs(15));

    let (tx, rx) = crossbeam_channel::unbounded::<Command>();
    ctrlc::set_handler(move || {
        let _ = tx.send(Command::Quit);
    })
    .expect("Error setting Ctrl+C handler");

    println!("Simulating {rate} compressions per minute for 15 seconds...");
    trainer.start_session();
    trainer.run(&rx, |event| {
        if let TrainerEvent::Display(state) = event {
            println!("{}", state.status_line());
        }
    });

    println!();
    println!("{}", trainer.controller().stats().summary());
}

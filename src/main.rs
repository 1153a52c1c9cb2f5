// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use wavinst::controller::{self, keyboard, Controller};
use wavinst::instrument::{Instrument, RetriggerBehavior};
use wavinst::samples::{self, Quality, SampleLoader};
use wavinst::{audio, config, midi, notes};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sample-based MIDI instrument."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Processes a sample across a note range and prints the resulting buffers.
    Process {
        /// The path to the sample.
        sample: PathBuf,
        /// The note the sample was recorded at.
        #[arg(short, long, default_value_t = notes::MIDDLE_C)]
        base_note: u8,
        /// The lowest note to process.
        #[arg(long, default_value_t = 36)]
        min_note: u8,
        /// The highest note to process.
        #[arg(long, default_value_t = 84)]
        max_note: u8,
        /// Resampling quality: fast, balanced or best.
        #[arg(short, long, default_value = "balanced")]
        quality: Quality,
    },
    /// Start will start the instrument.
    Start {
        /// The path to the instrument config.
        config_path: PathBuf,
        /// What to do when a held note is struck again, overriding the config.
        #[arg(short, long)]
        retrigger: Option<RetriggerBehavior>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Process {
            sample,
            base_note,
            min_note,
            max_note,
            quality,
        } => {
            let range = notes::NoteRange::new(base_note, min_note, max_note)?;
            let sample = SampleLoader::new(None, quality).load(&sample)?;
            println!("{}", sample);

            let report = samples::process(&sample, range, quality, |_, _| {});
            for note in report.cache.notes() {
                if let Some(buffer) = report.cache.get(note) {
                    println!(
                        "- {:>3} {:<4} {:>9.2}Hz {:>8} samples",
                        note,
                        notes::name(note),
                        notes::frequency(note),
                        buffer.len()
                    );
                }
            }
            for (note, e) in report.skipped.iter() {
                println!("- {:>3} skipped: {}", note, e);
            }
            println!(
                "Processed {} of {} notes ({})",
                report.processed(),
                report.total,
                range
            );
        }
        Commands::Start {
            config_path,
            retrigger,
        } => {
            start(config_path, retrigger).await?;
            // Stdin is still being read on a blocking thread, which would hold the runtime open.
            std::process::exit(0);
        }
    }

    Ok(())
}

/// Runs the instrument until the keyboard driver quits or Ctrl-C is pressed.
async fn start(
    config_path: PathBuf,
    retrigger: Option<RetriggerBehavior>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = config::Instrument::deserialize(&config_path)?;

    let output = audio::get_device(&config.audio())?;
    let instrument = Arc::new(Instrument::new(
        output,
        retrigger.unwrap_or(config.retrigger()),
        config.quality(),
    ));

    let range = config.note_range()?;
    instrument.set_range(range.base_note(), range.min_note(), range.max_note())?;
    instrument.set_master_volume(config.master_volume())?;
    instrument.load_sample_file(&config.sample())?;
    {
        let instrument = instrument.clone();
        let summary = tokio::task::spawn_blocking(move || {
            instrument.process(|done, total| info!(done, total, "Processing notes."))
        })
        .await??;
        println!("{}", summary);
    }

    let midi_driver = match config.midi() {
        Some(midi_config) => {
            let device = midi::get_device(midi_config.device())?;
            Some(controller::midi::Driver::start(instrument.clone(), device)?)
        }
        None => {
            warn!("No MIDI device configured, only keyboard commands are available.");
            None
        }
    };

    let mut controller = Controller::new(instrument.clone(), Arc::new(keyboard::Driver::new()));
    tokio::select! {
        result = controller.join() => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received Ctrl-C.");
        }
    }

    if let Some(midi_driver) = midi_driver {
        midi_driver.stop().await;
    }
    instrument.close();

    Ok(())
}

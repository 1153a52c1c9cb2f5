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
use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Level};

use crate::instrument::Instrument;
use crate::notes;

pub mod keyboard;
pub mod midi;

/// Controller events that will trigger behavior in the instrument.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// Sets the master volume, in percent.
    Volume(f32),

    /// Sets the note range used by the next processing run.
    Range { base: u8, min: u8, max: u8 },

    /// Processes the loaded sample across the note range.
    Process,

    /// Plays the processed sound for a note once.
    Test(u8),

    /// Prints the instrument status.
    Status,

    /// Stops the controller.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Controls an instrument.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(instrument: Arc<Instrument>, driver: Arc<dyn Driver>) -> Controller {
        Controller {
            handle: tokio::spawn(
                async move { Controller::trigger_events(instrument, driver).await },
            ),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers instrument operations by watching the driver and getting events from it.
    async fn trigger_events(instrument: Arc<Instrument>, driver: Arc<dyn Driver>) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!("Controller started.");

        while let Some(event) = events_rx.recv().await {
            info!(event = format!("{:?}", event), "Received event.");
            if event == Event::Quit {
                break;
            }

            match Controller::apply(instrument.clone(), event).await {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    error!("Error talking to instrument: {}", e);
                    println!("Error: {}", e);
                }
            }
        }

        info!("Controller closing.");
        drop(events_rx);
        join_handle.abort();
    }

    /// Applies a single event to the instrument and returns the text to show the user.
    pub async fn apply(
        instrument: Arc<Instrument>,
        event: Event,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        match event {
            Event::Volume(percent) => {
                instrument.set_master_volume_percent(percent)?;
                Ok(format!("Master volume: {:.0}%", percent))
            }
            Event::Range { base, min, max } => {
                let range = instrument.set_range(base, min, max)?;
                Ok(format!("Range: {}", range))
            }
            Event::Process => {
                let summary = tokio::task::spawn_blocking(move || {
                    instrument.process(|done, total| {
                        info!(done, total, "Processing notes.");
                    })
                })
                .await??;
                Ok(summary.to_string())
            }
            Event::Test(note) => {
                instrument.preview(note)?;
                Ok(format!(
                    "Playing test sound for note {} ({}, {:.2}Hz)",
                    note,
                    notes::name(note),
                    notes::frequency(note)
                ))
            }
            Event::Status => Ok(instrument.status().to_string()),
            Event::Quit => Ok(String::from("Quitting.")),
        }
    }
}

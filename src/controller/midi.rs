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
use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, span, Level};

use crate::instrument::Instrument;
use crate::midi::{Device, MidiPortError};

/// How many raw MIDI messages can wait for the consumer before the input thread blocks.
const MIDI_QUEUE_SIZE: usize = 256;

/// Feeds MIDI input into an instrument. Messages are handled one at a time in
/// arrival order.
pub struct Driver {
    /// The MIDI device.
    midi_device: Arc<dyn Device>,
    /// The consumer task.
    handle: JoinHandle<()>,
}

impl Driver {
    /// Starts watching the device and handling its messages.
    pub fn start(
        instrument: Arc<Instrument>,
        midi_device: Arc<dyn Device>,
    ) -> Result<Driver, MidiPortError> {
        let (midi_events_tx, mut midi_events_rx) = mpsc::channel::<Vec<u8>>(MIDI_QUEUE_SIZE);
        midi_device.watch_events(midi_events_tx)?;

        let name = midi_device.name();
        let handle = tokio::spawn(async move {
            let span = span!(Level::INFO, "MIDI driver");
            let _enter = span.enter();

            info!(device = name, "MIDI driver started.");
            while let Some(raw_event) = midi_events_rx.recv().await {
                if let Some(event) = instrument.handle_midi(&raw_event) {
                    debug!(%event, "Handled MIDI event.");
                }
            }
            info!(device = name, "MIDI watcher closed.");
        });

        Ok(Driver {
            midi_device,
            handle,
        })
    }

    /// Stops watching the device and waits for queued messages to be handled.
    pub async fn stop(self) {
        self.midi_device.stop_watch_events();
        // The consumer ends once the device drops its sender.
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::{
        audio::{mock, Device as _},
        instrument::{Instrument, RetriggerBehavior},
        midi,
        samples::Quality,
        testutil::{eventually_async, sine},
    };

    use super::Driver;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_midi_driver() {
        let audio_device = mock::Device::get("mock-device", 4, 44100);
        let instrument = Arc::new(Instrument::new(
            Arc::new(audio_device.clone()),
            RetriggerBehavior::Overlap,
            Quality::Fast,
        ));
        instrument
            .load_sample(sine(440.0, 44100, 44100), 44100)
            .unwrap();
        instrument.set_range(60, 58, 62).unwrap();
        instrument.process(|_, _| {}).unwrap();

        let midi_device = midi::test::Device::get("mock-midi-device");
        let driver = Driver::start(instrument.clone(), Arc::new(midi_device.clone())).unwrap();

        assert!(midi_device.mock_event(&[0x90, 60, 64]));
        assert!(midi_device.mock_event(&[0x98, 62, 50]));
        eventually_async(
            || {
                let instrument = instrument.clone();
                async move { instrument.active_notes() == vec![60, 62] }
            },
            "notes should be sounding",
        )
        .await;
        assert_eq!(2, audio_device.busy_channels());

        // Unrecognized and malformed input is ignored.
        assert!(midi_device.mock_event(&[0xC0, 5]));
        assert!(midi_device.mock_event(&[1, 2, 3, 4]));

        assert!(midi_device.mock_event(&[0x80, 60, 0]));
        assert!(midi_device.mock_event(&[0x98, 62, 0]));
        eventually_async(
            || {
                let instrument = instrument.clone();
                async move { instrument.active_notes().is_empty() }
            },
            "notes should be released",
        )
        .await;

        driver.stop().await;
        assert!(!midi_device.is_watching());
        assert_eq!(
            Some("MIDI event: status=0x98, channel=8, note=62, velocity=0".to_string()),
            instrument.status().last_midi_event
        );
    }
}

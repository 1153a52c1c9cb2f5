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

//! The playable instrument.
//!
//! An instrument owns one base sample, the per-note buffers derived from it and the
//! voices currently sounding. Control operations (loading, processing, volume) may
//! run on any thread while MIDI events are handled on another.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{error, info, span, warn, Level};

use crate::audio::{self, ChannelHandle};
use crate::midi::{self, NoteEvent};
use crate::notes::NoteRange;
use crate::samples::{
    self, BaseSample, ProcessingError, Quality, SampleLoadError, SampleLoader, SharedCache,
};

mod error;
mod status;
mod voice;
mod volume;

pub use error::{TriggerError, VolumeError};
pub use status::Status;
pub use voice::{RetriggerBehavior, Voice, VoiceAllocator};
pub use volume::{from_percent, velocity_gain, MasterVolume, DEFAULT_MASTER_VOLUME};

/// The result of a processing run.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessSummary {
    pub range: NoteRange,
    pub processed: usize,
    pub total: usize,
    pub skipped: Vec<(u8, ProcessingError)>,
}

impl fmt::Display for ProcessSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} of {} notes ({})",
            self.processed, self.total, self.range
        )?;
        if !self.skipped.is_empty() {
            let skipped: Vec<String> = self.skipped.iter().map(|(n, _)| n.to_string()).collect();
            write!(f, ", skipped {}", skipped.join(", "))?;
        }
        Ok(())
    }
}

/// Observational messages for display.
#[derive(Default)]
struct Messages {
    last_midi_event: Option<String>,
    last_message: Option<String>,
    last_error: Option<String>,
}

/// A sample-based instrument driving an audio output.
pub struct Instrument {
    output: Arc<dyn audio::Device>,
    quality: Quality,
    sample: RwLock<Option<BaseSample>>,
    range: RwLock<NoteRange>,
    cache: SharedCache,
    processed_range: RwLock<Option<NoteRange>>,
    voices: VoiceAllocator,
    volume: MasterVolume,
    messages: Mutex<Messages>,
}

impl Instrument {
    /// Creates an instrument with the default range and master volume and no sample.
    pub fn new(
        output: Arc<dyn audio::Device>,
        retrigger: RetriggerBehavior,
        quality: Quality,
    ) -> Instrument {
        Instrument {
            voices: VoiceAllocator::new(output.clone(), retrigger),
            output,
            quality,
            sample: RwLock::new(None),
            range: RwLock::new(NoteRange::default()),
            cache: SharedCache::new(),
            processed_range: RwLock::new(None),
            volume: MasterVolume::default(),
            messages: Mutex::new(Messages::default()),
        }
    }

    /// Loads a mono waveform as the base sample. It is normalized to a peak of 1.0 and
    /// converted to the output sample rate. The current buffers keep playing until the
    /// next processing run.
    pub fn load_sample(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), SampleLoadError> {
        let result = BaseSample::new(samples, sample_rate).and_then(|sample| {
            match self.output.sample_rate() {
                0 => Ok(sample),
                target_rate => sample.to_sample_rate(target_rate, self.quality),
            }
        });
        self.install_sample(result)
    }

    /// Loads the base sample from an audio file.
    pub fn load_sample_file(&self, path: &Path) -> Result<(), SampleLoadError> {
        let target_rate = Some(self.output.sample_rate()).filter(|rate| *rate > 0);
        let result = SampleLoader::new(target_rate, self.quality).load(path);
        self.install_sample(result)
    }

    fn install_sample(
        &self,
        result: Result<BaseSample, SampleLoadError>,
    ) -> Result<(), SampleLoadError> {
        match result {
            Ok(sample) => {
                info!(sample = %sample, "Sample loaded.");
                self.set_message(format!("Sample loaded. {}", sample));
                *self.sample.write() = Some(sample);
                Ok(())
            }
            Err(e) => {
                self.set_error(format!("Error loading sample: {}", e));
                Err(e)
            }
        }
    }

    /// Sets the range used by the next processing run. An invalid range changes nothing.
    pub fn set_range(
        &self,
        base_note: u8,
        min_note: u8,
        max_note: u8,
    ) -> Result<NoteRange, ProcessingError> {
        match NoteRange::new(base_note, min_note, max_note) {
            Ok(range) => {
                *self.range.write() = range;
                info!(range = %range, "Note range set.");
                Ok(range)
            }
            Err(e) => {
                self.set_error(e.to_string());
                Err(e)
            }
        }
    }

    pub fn range(&self) -> NoteRange {
        *self.range.read()
    }

    /// Derives a buffer for every note in the range and publishes them as a whole.
    /// `progress` receives (notes completed, total notes).
    pub fn process<F>(&self, progress: F) -> Result<ProcessSummary, ProcessingError>
    where
        F: Fn(usize, usize) + Sync,
    {
        let span = span!(Level::INFO, "process sample");
        let _enter = span.enter();

        let Some(sample) = self.sample.read().clone() else {
            self.set_error(ProcessingError::NoSample.to_string());
            return Err(ProcessingError::NoSample);
        };
        let range = self.range();

        let report = samples::process(&sample, range, self.quality, progress);
        let summary = ProcessSummary {
            range,
            processed: report.processed(),
            total: report.total,
            skipped: report.skipped,
        };

        self.cache.publish(report.cache);
        *self.processed_range.write() = Some(range);
        self.set_message(summary.to_string());
        Ok(summary)
    }

    /// Decodes a raw MIDI message and acts on it. Failures are recorded in the status
    /// rather than returned, so one bad event never disturbs the others.
    pub fn handle_midi(&self, raw: &[u8]) -> Option<NoteEvent> {
        self.messages.lock().last_midi_event = Some(midi::summarize(raw));

        let event = midi::decode(raw)?;
        match event {
            NoteEvent::NoteOn { note, velocity, .. } => {
                // Errors are already recorded.
                let _ = self.note_on(note, velocity);
            }
            NoteEvent::NoteOff { note, .. } => {
                self.note_off(note);
            }
        }
        Some(event)
    }

    /// Starts a note at the given velocity.
    pub fn note_on(&self, note: u8, velocity: u8) -> Result<Voice, TriggerError> {
        let cache = self.cache.load();
        self.voices
            .note_on(&cache, note, velocity, &self.volume)
            .inspect_err(|e| {
                warn!(note, velocity, err = %e, "Dropped note on.");
                self.set_error(e.to_string());
            })
    }

    /// Stops a note. Stopping a note that isn't sounding does nothing.
    pub fn note_off(&self, note: u8) -> Option<Voice> {
        self.voices.note_off(note)
    }

    /// Plays a note's buffer once at master volume without tracking it as a voice.
    pub fn preview(&self, note: u8) -> Result<ChannelHandle, TriggerError> {
        let result = self.play_untracked(note);
        match &result {
            Ok(_) => self.set_message(format!("Playing test sound for note {}", note)),
            Err(e) => self.set_error(e.to_string()),
        }
        result
    }

    fn play_untracked(&self, note: u8) -> Result<ChannelHandle, TriggerError> {
        let buffer = self
            .cache
            .load()
            .get(note)
            .ok_or(TriggerError::UnknownNote { note })?;
        let handle = self
            .output
            .acquire_channel()
            .ok_or(TriggerError::NoChannelAvailable { note })?;
        if let Err(e) = self.output.play(handle, buffer, self.volume.get()) {
            self.output.stop(handle);
            return Err(e.into());
        }
        Ok(handle)
    }

    /// Sets the master volume in [0.0, 1.0] and re-applies it to every sounding voice.
    pub fn set_master_volume(&self, volume: f32) -> Result<(), VolumeError> {
        let updated = self
            .voices
            .set_master_volume(&self.volume, volume)
            .inspect_err(|e| self.set_error(e.to_string()))?;
        info!(volume, updated, "Master volume set.");
        Ok(())
    }

    /// Sets the master volume from a percentage in [0, 100].
    pub fn set_master_volume_percent(&self, percent: f32) -> Result<(), VolumeError> {
        let volume = from_percent(percent).inspect_err(|e| self.set_error(e.to_string()))?;
        self.set_master_volume(volume)
    }

    pub fn master_volume(&self) -> f32 {
        self.volume.get()
    }

    /// Returns the notes that currently have a voice.
    pub fn active_notes(&self) -> Vec<u8> {
        self.voices.active_notes()
    }

    /// Returns the number of notes in the published cache.
    pub fn processed_notes(&self) -> usize {
        self.cache.load().len()
    }

    pub fn status(&self) -> Status {
        let messages = self.messages.lock();
        Status {
            sample: self.sample.read().as_ref().map(ToString::to_string),
            range: self.range(),
            processed_range: *self.processed_range.read(),
            processed_notes: self.processed_notes(),
            active_notes: self.voices.active_notes(),
            busy_channels: self.output.busy_channels(),
            channel_count: self.output.channel_count(),
            master_volume: self.volume.get(),
            last_midi_event: messages.last_midi_event.clone(),
            last_message: messages.last_message.clone(),
            last_error: messages.last_error.clone(),
        }
    }

    /// Stops every sounding voice.
    pub fn close(&self) {
        let stopped = self.voices.stop_all();
        info!(stopped, "Instrument closed.");
    }

    fn set_message(&self, message: String) {
        self.messages.lock().last_message = Some(message);
    }

    fn set_error(&self, message: String) {
        error!(err = message, "Instrument error.");
        self.messages.lock().last_error = Some(message);
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("output", &self.output.name())
            .field("range", &self.range())
            .field("processed_notes", &self.processed_notes())
            .field("retrigger", &self.voices.retrigger())
            .finish()
    }
}

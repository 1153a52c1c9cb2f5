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
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::{Audio, ConfigError, Midi};
use crate::instrument::RetriggerBehavior;
use crate::notes::{NoteRange, MAX_NOTE};
use crate::samples::Quality;

const DEFAULT_MASTER_VOLUME: u8 = 80;

/// A YAML representation of an instrument.
#[derive(Deserialize, Clone, Debug)]
pub struct Instrument {
    /// The base sample, relative to the config file.
    sample: PathBuf,

    /// The note the sample was recorded at.
    base_note: Option<u8>,
    min_note: Option<u8>,
    max_note: Option<u8>,

    /// Master volume in percent.
    master_volume: Option<u8>,

    /// What to do when a held note is struck again.
    retrigger: Option<RetriggerBehavior>,

    /// Resampling quality used when processing.
    quality: Option<Quality>,

    audio: Option<Audio>,
    midi: Option<Midi>,

    /// The directory of the config file, used to resolve the sample path.
    #[serde(skip)]
    base_path: Option<PathBuf>,
}

impl Instrument {
    /// Parses and validates an instrument from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Instrument, ConfigError> {
        let mut instrument = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Instrument>()?;
        instrument.base_path = path.parent().map(Path::to_path_buf);
        instrument.validate()?;
        Ok(instrument)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.note_range()?;
        if self.master_volume_percent() > 100 {
            return Err(ConfigError::Invalid(format!(
                "master_volume must be between 0 and 100, got {}",
                self.master_volume_percent()
            )));
        }
        let audio = self.audio();
        if audio.channels() == 0 {
            return Err(ConfigError::Invalid(
                "audio channels must be at least 1".to_string(),
            ));
        }
        if audio.sample_rate() == 0 {
            return Err(ConfigError::Invalid(
                "audio sample_rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the sample path, resolved against the config file's directory.
    pub fn sample(&self) -> PathBuf {
        match &self.base_path {
            Some(base_path) if self.sample.is_relative() => base_path.join(&self.sample),
            _ => self.sample.clone(),
        }
    }

    /// Returns the configured note range (default: base 60, 36 to 84).
    pub fn note_range(&self) -> Result<NoteRange, ConfigError> {
        let default = NoteRange::default();
        let base_note = self.base_note.unwrap_or(default.base_note());
        let min_note = self.min_note.unwrap_or(default.min_note());
        let max_note = self.max_note.unwrap_or(default.max_note());
        NoteRange::new(base_note, min_note, max_note).map_err(|e| {
            ConfigError::Invalid(format!(
                "note range (base {}, min {}, max {}, limit {}): {}",
                base_note, min_note, max_note, MAX_NOTE, e
            ))
        })
    }

    /// Returns the master volume in percent (default: 80).
    pub fn master_volume_percent(&self) -> u8 {
        self.master_volume.unwrap_or(DEFAULT_MASTER_VOLUME)
    }

    /// Returns the master volume as a gain in [0, 1].
    pub fn master_volume(&self) -> f32 {
        f32::from(self.master_volume_percent()) / 100.0
    }

    pub fn retrigger(&self) -> RetriggerBehavior {
        self.retrigger.unwrap_or_default()
    }

    pub fn quality(&self) -> Quality {
        self.quality.unwrap_or_default()
    }

    /// Returns the audio configuration (default: the "default" device).
    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    /// Returns the MIDI configuration, if MIDI input is wanted.
    pub fn midi(&self) -> Option<&Midi> {
        self.midi.as_ref()
    }
}

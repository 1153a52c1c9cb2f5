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
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info};

use super::{velocity_gain, MasterVolume, TriggerError, VolumeError};
use crate::audio::{self, ChannelHandle};
use crate::notes::NOTE_COUNT;
use crate::samples::NoteBufferCache;

/// What happens when a note that is already sounding is struck again.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetriggerBehavior {
    /// Start a new voice and let the previous one ring out untracked.
    #[default]
    Overlap,
    /// Stop the previous voice before starting the new one.
    Cut,
}

impl FromStr for RetriggerBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overlap" => Ok(RetriggerBehavior::Overlap),
            "cut" => Ok(RetriggerBehavior::Cut),
            _ => Err(format!(
                "unknown retrigger behavior '{}', expected overlap or cut",
                s
            )),
        }
    }
}

impl fmt::Display for RetriggerBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetriggerBehavior::Overlap => write!(f, "overlap"),
            RetriggerBehavior::Cut => write!(f, "cut"),
        }
    }
}

/// A sounding note bound to one output channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Voice {
    note: u8,
    velocity: u8,
    handle: ChannelHandle,
}

impl Voice {
    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn handle(&self) -> ChannelHandle {
        self.handle
    }
}

/// Maps sounding notes to output channels. At most one voice is tracked per note.
pub struct VoiceAllocator {
    output: Arc<dyn audio::Device>,
    voices: Mutex<[Option<Voice>; NOTE_COUNT]>,
    retrigger: RetriggerBehavior,
}

impl VoiceAllocator {
    pub fn new(output: Arc<dyn audio::Device>, retrigger: RetriggerBehavior) -> VoiceAllocator {
        VoiceAllocator {
            output,
            voices: Mutex::new([None; NOTE_COUNT]),
            retrigger,
        }
    }

    pub fn retrigger(&self) -> RetriggerBehavior {
        self.retrigger
    }

    /// Starts a voice for the note at the master volume in effect while the voice table
    /// is held, so a concurrent volume change either sees this voice or is seen by it.
    ///
    /// On failure no new voice is tracked. With [`RetriggerBehavior::Cut`] the note's
    /// previous voice has already been stopped by then, leaving the note idle.
    pub fn note_on(
        &self,
        cache: &NoteBufferCache,
        note: u8,
        velocity: u8,
        master_volume: &MasterVolume,
    ) -> Result<Voice, TriggerError> {
        let buffer = cache.get(note).ok_or(TriggerError::UnknownNote { note })?;
        let index = usize::from(note);

        let mut voices = self.voices.lock();
        let previous = voices[index];
        if self.retrigger == RetriggerBehavior::Cut {
            if let Some(previous) = previous {
                debug!(note, handle = %previous.handle, "Cutting retriggered voice.");
                self.output.stop(previous.handle);
                voices[index] = None;
            }
        }

        let handle = self
            .output
            .acquire_channel()
            .ok_or(TriggerError::NoChannelAvailable { note })?;

        let gain = velocity_gain(velocity, master_volume.get());
        if let Err(e) = self.output.play(handle, buffer, gain) {
            self.output.stop(handle);
            return Err(e.into());
        }

        let voice = Voice {
            note,
            velocity,
            handle,
        };
        voices[index] = Some(voice);
        debug!(note, velocity, gain, %handle, "Note on.");
        Ok(voice)
    }

    /// Stops the note's voice, if it has one. Returns the stopped voice.
    pub fn note_off(&self, note: u8) -> Option<Voice> {
        let voice = self.voices.lock().get_mut(usize::from(note))?.take()?;
        self.output.stop(voice.handle);
        debug!(note, handle = %voice.handle, "Note off.");
        Some(voice)
    }

    /// Stores a new master volume and re-applies the gain of every sounding voice, both
    /// while the voice table is held. Voices whose buffer has already ended are dropped
    /// from the table. Returns the number of voices updated.
    pub fn set_master_volume(
        &self,
        master_volume: &MasterVolume,
        volume: f32,
    ) -> Result<usize, VolumeError> {
        let mut voices = self.voices.lock();
        master_volume.set(volume)?;

        let mut updated = 0;
        for slot in voices.iter_mut() {
            let Some(voice) = slot else {
                continue;
            };
            if self
                .output
                .set_gain(voice.handle, velocity_gain(voice.velocity, volume))
            {
                updated += 1;
            } else {
                *slot = None;
            }
        }
        Ok(updated)
    }

    /// Stops every voice in the table. Returns the number stopped.
    pub fn stop_all(&self) -> usize {
        let mut voices = self.voices.lock();
        let mut stopped = 0;
        for voice in voices.iter_mut().filter_map(Option::take) {
            self.output.stop(voice.handle);
            stopped += 1;
        }
        if stopped > 0 {
            info!(stopped, "Stopped all voices.");
        }
        stopped
    }

    /// Returns the sounding notes in ascending order.
    pub fn active_notes(&self) -> Vec<u8> {
        let mut voices = self.voices.lock();
        self.prune(&mut voices);
        voices.iter().flatten().map(Voice::note).collect()
    }

    pub fn active_count(&self) -> usize {
        let mut voices = self.voices.lock();
        self.prune(&mut voices);
        voices.iter().flatten().count()
    }

    /// Returns the voice for a note, if it is sounding.
    pub fn voice(&self, note: u8) -> Option<Voice> {
        let mut voices = self.voices.lock();
        self.prune(&mut voices);
        voices.get(usize::from(note)).copied().flatten()
    }

    /// Drops voices whose buffer played to the end.
    fn prune(&self, voices: &mut [Option<Voice>; NOTE_COUNT]) {
        for slot in voices.iter_mut() {
            if slot.is_some_and(|voice| !self.output.is_active(voice.handle)) {
                *slot = None;
            }
        }
    }
}

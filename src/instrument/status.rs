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

use crate::notes::{self, NoteRange};

/// A point-in-time view of the instrument for display.
#[derive(Clone, Debug)]
pub struct Status {
    /// Summary of the loaded sample, if any.
    pub sample: Option<String>,
    /// The range the next processing run will use.
    pub range: NoteRange,
    /// The range of the published cache, if processing has run.
    pub processed_range: Option<NoteRange>,
    pub processed_notes: usize,
    pub active_notes: Vec<u8>,
    pub busy_channels: usize,
    pub channel_count: usize,
    pub master_volume: f32,
    pub last_midi_event: Option<String>,
    pub last_message: Option<String>,
    pub last_error: Option<String>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sample {
            Some(sample) => writeln!(f, "Sample: {}", sample)?,
            None => writeln!(f, "Sample: none loaded")?,
        }
        writeln!(f, "Range: {}", self.range)?;
        match &self.processed_range {
            Some(range) => writeln!(
                f,
                "Processed: {} notes ({})",
                self.processed_notes, range
            )?,
            None => writeln!(f, "Processed: none")?,
        }
        let active: Vec<String> = self.active_notes.iter().map(|n| notes::name(*n)).collect();
        writeln!(
            f,
            "Active notes: [{}] (channels {}/{})",
            active.join(", "),
            self.busy_channels,
            self.channel_count
        )?;
        writeln!(
            f,
            "Master volume: {:.0}%",
            self.master_volume * 100.0
        )?;
        if let Some(event) = &self.last_midi_event {
            writeln!(f, "Last {}", event)?;
        }
        if let Some(message) = &self.last_message {
            writeln!(f, "Status: {}", message)?;
        }
        if let Some(error) = &self.last_error {
            writeln!(f, "Last error: {}", error)?;
        }
        Ok(())
    }
}

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
use thiserror::Error;

use crate::audio::OutputError;

/// Reasons a note could not be started. None of these affect other voices.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("No free channel for note {note}")]
    NoChannelAvailable { note: u8 },

    #[error("No processed sound for note {note}")]
    UnknownNote { note: u8 },

    #[error("Unable to play note: {0}")]
    Output(#[from] OutputError),
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum VolumeError {
    #[error("Master volume {0} is outside 0.0 to 1.0")]
    OutOfRange(f32),

    #[error("Master volume {0}% is outside 0 to 100")]
    PercentOutOfRange(f32),
}

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

/// Errors raised while loading a base sample. Loading never changes instrument state on failure.
#[derive(Debug, thiserror::Error)]
pub enum SampleLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio file error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("No audio track found in {0}")]
    NoAudioTrack(String),

    #[error("Sample rate not specified in {0}")]
    UnknownSampleRate(String),

    #[error("Sample contains no audio frames")]
    Empty,

    #[error("Sample is silent and cannot be normalized")]
    Silent,

    #[error("Sample contains a non-finite value at frame {0}")]
    NonFinite(usize),

    #[error("Resampling failed: {0}Hz -> {1}Hz")]
    Resample(u32, u32),
}

/// Errors raised while deriving per-note buffers from the base sample.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessingError {
    #[error("Please load a sample first")]
    NoSample,

    #[error("Invalid note range: min note {min} is above max note {max}")]
    InvalidRange { min: u8, max: u8 },

    #[error("Note {0} is outside the MIDI range 0-127")]
    NoteOutOfRange(u8),

    #[error("Resampling note {note} would produce an empty buffer")]
    ZeroLength { note: u8 },

    #[error("Error creating sound for note {note}: {reason}")]
    Resample { note: u8, reason: String },
}

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

//! Sample processing.
//!
//! This module provides:
//! - Base sample loading (decode, down-mix, normalize)
//! - Pitch shifting of the base sample across a note range
//! - The per-note buffer cache read by the voice allocator

mod cache;
mod error;
mod loader;
mod pitch;

pub use cache::{NoteBufferCache, ProcessedBuffer, SharedCache};
pub use error::{ProcessingError, SampleLoadError};
pub use loader::{BaseSample, SampleLoader};
pub use pitch::{process, process_note, to_pcm16, ProcessReport, Quality};

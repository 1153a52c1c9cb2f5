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

//! A sample-based MIDI instrument.
//!
//! One recorded sample is pitch shifted across a range of MIDI notes, and the
//! resulting buffers are played in response to live note on/off events.

pub mod audio;
pub mod config;
pub mod controller;
pub mod instrument;
pub mod midi;
pub mod notes;
pub mod samples;
#[cfg(test)]
mod testutil;

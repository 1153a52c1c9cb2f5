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

/// Errors from opening or watching MIDI ports.
#[derive(Debug, Error)]
pub enum MidiPortError {
    #[error("unable to initialize MIDI input: {0}")]
    Init(#[from] midir::InitError),

    #[error("unable to read MIDI port info: {0}")]
    PortInfo(#[from] midir::PortInfoError),

    #[error("unable to connect to MIDI device {0}: {1}")]
    Connect(String, String),

    #[error("no MIDI input device found with name {0}")]
    NotFound(String),

    #[error("found too many MIDI devices that match ({0}), use a less ambiguous device name")]
    Ambiguous(String),

    #[error("already watching events")]
    AlreadyWatching,
}

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

use midly::{live::LiveEvent, MidiMessage};

/// The length of a channel voice message.
const MESSAGE_LEN: usize = 3;

/// A decoded note event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { note: u8, velocity: u8, channel: u8 },
    NoteOff { note: u8, channel: u8 },
}

impl NoteEvent {
    pub fn note(&self) -> u8 {
        match self {
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note, .. } => *note,
        }
    }
}

impl fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteEvent::NoteOn {
                note,
                velocity,
                channel,
            } => write!(
                f,
                "Note on: {} (velocity: {}, channel: {})",
                note, velocity, channel
            ),
            NoteEvent::NoteOff { note, channel } => {
                write!(f, "Note off: {} (channel: {})", note, channel)
            }
        }
    }
}

/// Decodes a raw MIDI message into a note event.
///
/// Note on with a velocity of zero is a note off. Anything that isn't a complete
/// note on/off message yields nothing. Bytes past the first three are ignored.
pub fn decode(raw: &[u8]) -> Option<NoteEvent> {
    let message = raw.get(..MESSAGE_LEN)?;
    if message[1] > 0x7F || message[2] > 0x7F {
        return None;
    }

    match LiveEvent::parse(message) {
        Ok(LiveEvent::Midi { channel, message }) => {
            let channel = u8::from(channel);
            match message {
                MidiMessage::NoteOn { key, vel } if u8::from(vel) > 0 => Some(NoteEvent::NoteOn {
                    note: u8::from(key),
                    velocity: u8::from(vel),
                    channel,
                }),
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    Some(NoteEvent::NoteOff {
                        note: u8::from(key),
                        channel,
                    })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Describes a raw message for status display, whether or not it decodes to a note event.
pub fn summarize(raw: &[u8]) -> String {
    match raw {
        [status, note, velocity, ..] => format!(
            "MIDI event: status={:#04x}, channel={}, note={}, velocity={}",
            status,
            status & 0x0F,
            note,
            velocity
        ),
        _ => format!("MIDI event: malformed ({} bytes)", raw.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on() {
        assert_eq!(
            Some(NoteEvent::NoteOn {
                note: 60,
                velocity: 64,
                channel: 0
            }),
            decode(&[0x90, 60, 64])
        );
        assert_eq!(
            Some(NoteEvent::NoteOn {
                note: 127,
                velocity: 127,
                channel: 15
            }),
            decode(&[0x9F, 127, 127])
        );
    }

    #[test]
    fn test_channel_nine_is_like_any_other() {
        assert_eq!(
            Some(NoteEvent::NoteOn {
                note: 60,
                velocity: 50,
                channel: 8
            }),
            decode(&[0x98, 60, 50])
        );
        assert_eq!(
            Some(NoteEvent::NoteOff {
                note: 60,
                channel: 8
            }),
            decode(&[0x98, 60, 0])
        );
    }

    #[test]
    fn test_note_off() {
        assert_eq!(
            Some(NoteEvent::NoteOff {
                note: 60,
                channel: 0
            }),
            decode(&[0x90, 60, 0])
        );
        assert_eq!(
            Some(NoteEvent::NoteOff {
                note: 60,
                channel: 0
            }),
            decode(&[0x80, 60, 0])
        );
        // Release velocity is irrelevant.
        assert_eq!(
            Some(NoteEvent::NoteOff {
                note: 61,
                channel: 3
            }),
            decode(&[0x83, 61, 100])
        );
    }

    #[test]
    fn test_ignored_messages() {
        // Too short.
        assert_eq!(None, decode(&[]));
        assert_eq!(None, decode(&[0x90]));
        assert_eq!(None, decode(&[0x90, 60]));

        // Other channel messages.
        assert_eq!(None, decode(&[0xB0, 7, 100]));
        assert_eq!(None, decode(&[0xE0, 0, 64]));
        assert_eq!(None, decode(&[0xA0, 60, 10]));

        // System messages and data bytes in the status position.
        assert_eq!(None, decode(&[0xF8, 0, 0]));
        assert_eq!(None, decode(&[0x3C, 60, 64]));

        // Data bytes with the high bit set.
        assert_eq!(None, decode(&[0x90, 200, 64]));
        assert_eq!(None, decode(&[0x90, 60, 0x80]));
    }

    #[test]
    fn test_extra_bytes_ignored() {
        assert_eq!(
            Some(NoteEvent::NoteOn {
                note: 60,
                velocity: 64,
                channel: 0
            }),
            decode(&[0x90, 60, 64, 0x80, 60, 0])
        );
    }

    #[test]
    fn test_summarize() {
        assert_eq!(
            "MIDI event: status=0x98, channel=8, note=60, velocity=50",
            summarize(&[0x98, 60, 50])
        );
        assert_eq!("MIDI event: malformed (2 bytes)", summarize(&[0x90, 60]));
    }
}

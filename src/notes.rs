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

//! MIDI note numbers, equal temperament frequencies and note ranges.

use std::fmt;
use std::ops::RangeInclusive;

use crate::samples::ProcessingError;

/// The highest valid MIDI note number.
pub const MAX_NOTE: u8 = 127;

/// Number of distinct MIDI notes.
pub const NOTE_COUNT: usize = MAX_NOTE as usize + 1;

/// The reference note (A4).
pub const REFERENCE_NOTE: u8 = 69;

/// The reference frequency of A4 in Hz.
pub const REFERENCE_FREQUENCY: f64 = 440.0;

/// Middle C.
pub const MIDDLE_C: u8 = 60;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Returns the 12-TET frequency of a MIDI note, with A4 = 440Hz.
pub fn frequency(note: u8) -> f64 {
    REFERENCE_FREQUENCY * 2f64.powf((f64::from(note) - f64::from(REFERENCE_NOTE)) / 12.0)
}

/// Returns the ratio between the target and base note frequencies.
pub fn pitch_ratio(base_note: u8, target_note: u8) -> f64 {
    frequency(target_note) / frequency(base_note)
}

/// Returns a note name in scientific pitch notation, e.g. 60 -> "C4".
pub fn name(note: u8) -> String {
    let octave = i32::from(note) / 12 - 1;
    format!("{}{}", NOTE_NAMES[usize::from(note % 12)], octave)
}

/// The base note of a sample and the closed range of notes it is stretched across.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteRange {
    base_note: u8,
    min_note: u8,
    max_note: u8,
}

impl NoteRange {
    /// Creates a new note range. All notes must be within 0-127 and min_note <= max_note.
    pub fn new(base_note: u8, min_note: u8, max_note: u8) -> Result<NoteRange, ProcessingError> {
        for note in [base_note, min_note, max_note] {
            if note > MAX_NOTE {
                return Err(ProcessingError::NoteOutOfRange(note));
            }
        }
        if min_note > max_note {
            return Err(ProcessingError::InvalidRange {
                min: min_note,
                max: max_note,
            });
        }

        Ok(NoteRange {
            base_note,
            min_note,
            max_note,
        })
    }

    pub fn base_note(&self) -> u8 {
        self.base_note
    }

    pub fn min_note(&self) -> u8 {
        self.min_note
    }

    pub fn max_note(&self) -> u8 {
        self.max_note
    }

    /// Iterates over every note in the range, inclusive.
    pub fn notes(&self) -> RangeInclusive<u8> {
        self.min_note..=self.max_note
    }

    /// The number of notes in the range.
    pub fn len(&self) -> usize {
        usize::from(self.max_note - self.min_note) + 1
    }

    pub fn contains(&self, note: u8) -> bool {
        self.notes().contains(&note)
    }
}

impl Default for NoteRange {
    fn default() -> Self {
        NoteRange {
            base_note: MIDDLE_C,
            min_note: 36,
            max_note: 84,
        }
    }
}

impl fmt::Display for NoteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {} (base {})",
            self.min_note, self.max_note, self.base_note
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency() {
        assert!((frequency(69) - 440.0).abs() < 1e-9);
        assert!((frequency(81) - 880.0).abs() < 1e-9);
        assert!((frequency(57) - 220.0).abs() < 1e-9);
        assert!((frequency(60) - 261.625_565).abs() < 1e-5);

        // Strictly increasing across the whole MIDI domain.
        for note in 1..=MAX_NOTE {
            assert!(frequency(note) > frequency(note - 1));
        }
    }

    #[test]
    fn test_pitch_ratio() {
        for note in 0..=MAX_NOTE {
            assert_eq!(1.0, pitch_ratio(note, note));
        }
        assert!((pitch_ratio(60, 72) - 2.0).abs() < 1e-9);
        assert!((pitch_ratio(60, 48) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_note_names() {
        assert_eq!("C4", name(60));
        assert_eq!("A4", name(69));
        assert_eq!("C-1", name(0));
        assert_eq!("G9", name(127));
        assert_eq!("A#3", name(58));
    }

    #[test]
    fn test_note_range_validation() {
        let range = NoteRange::new(60, 36, 84).unwrap();
        assert_eq!(49, range.len());
        assert!(range.contains(36));
        assert!(range.contains(84));
        assert!(!range.contains(85));

        let single = NoteRange::new(60, 60, 60).unwrap();
        assert_eq!(1, single.len());

        assert!(matches!(
            NoteRange::new(60, 70, 50),
            Err(ProcessingError::InvalidRange { min: 70, max: 50 })
        ));
        assert!(matches!(
            NoteRange::new(128, 0, 10),
            Err(ProcessingError::NoteOutOfRange(128))
        ));
        assert!(matches!(
            NoteRange::new(60, 0, 200),
            Err(ProcessingError::NoteOutOfRange(200))
        ));
    }

    #[test]
    fn test_default_range() {
        let range = NoteRange::default();
        assert_eq!(60, range.base_note());
        assert_eq!(36, range.min_note());
        assert_eq!(84, range.max_note());
    }
}

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

//! Per-note buffer storage.
//!
//! The cache is never mutated once published. Reprocessing builds a whole new cache
//! and swaps it in, so readers always see a complete set of buffers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::notes::NOTE_COUNT;

/// A pitch-shifted buffer for one note, as 16 bit PCM.
pub struct ProcessedBuffer {
    note: u8,
    samples: Vec<i16>,
    sample_rate: u32,
}

impl ProcessedBuffer {
    pub fn new(note: u8, samples: Vec<i16>, sample_rate: u32) -> ProcessedBuffer {
        ProcessedBuffer {
            note,
            samples,
            sample_rate,
        }
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.samples.len() * std::mem::size_of::<i16>()
    }
}

impl fmt::Debug for ProcessedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessedBuffer")
            .field("note", &self.note)
            .field("len", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Processed buffers indexed by MIDI note number.
pub struct NoteBufferCache {
    buffers: [Option<Arc<ProcessedBuffer>>; NOTE_COUNT],
    sample_rate: u32,
}

impl NoteBufferCache {
    /// Creates an empty cache.
    pub fn new(sample_rate: u32) -> NoteBufferCache {
        NoteBufferCache {
            buffers: std::array::from_fn(|_| None),
            sample_rate,
        }
    }

    /// Inserts a buffer, replacing any buffer already present for its note.
    pub fn insert(&mut self, buffer: ProcessedBuffer) {
        let index = usize::from(buffer.note());
        if let Some(slot) = self.buffers.get_mut(index) {
            *slot = Some(Arc::new(buffer));
        }
    }

    /// Gets the buffer for a note, if one was processed.
    pub fn get(&self, note: u8) -> Option<Arc<ProcessedBuffer>> {
        self.buffers.get(usize::from(note)).and_then(Clone::clone)
    }

    pub fn contains(&self, note: u8) -> bool {
        self.buffers
            .get(usize::from(note))
            .is_some_and(Option::is_some)
    }

    /// The number of notes with a buffer.
    pub fn len(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The notes that have a buffer, in ascending order.
    pub fn notes(&self) -> Vec<u8> {
        self.buffers
            .iter()
            .filter_map(|b| b.as_ref().map(|b| b.note()))
            .collect()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the total memory used by all buffers.
    pub fn memory_size(&self) -> usize {
        self.buffers
            .iter()
            .flatten()
            .map(|b| b.memory_size())
            .sum()
    }
}

impl fmt::Debug for NoteBufferCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteBufferCache")
            .field("notes", &self.len())
            .field("sample_rate", &self.sample_rate)
            .field("memory_kb", &(self.memory_size() / 1024))
            .finish()
    }
}

/// The currently published cache, shared between processing and the MIDI path.
pub struct SharedCache {
    current: RwLock<Arc<NoteBufferCache>>,
}

impl SharedCache {
    /// Creates a shared cache holding an empty cache.
    pub fn new() -> SharedCache {
        SharedCache {
            current: RwLock::new(Arc::new(NoteBufferCache::new(0))),
        }
    }

    /// Returns a snapshot of the current cache. The snapshot stays valid and complete
    /// even if a new cache is published while it is held.
    pub fn load(&self) -> Arc<NoteBufferCache> {
        self.current.read().clone()
    }

    /// Publishes a fully built cache, replacing the current one in one step.
    pub fn publish(&self, cache: NoteBufferCache) -> Arc<NoteBufferCache> {
        std::mem::replace(&mut *self.current.write(), Arc::new(cache))
    }
}

impl Default for SharedCache {
    fn default() -> Self {
        SharedCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(note: u8, len: usize) -> ProcessedBuffer {
        ProcessedBuffer::new(note, vec![0; len], 44100)
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache = NoteBufferCache::new(44100);
        assert!(cache.is_empty());

        cache.insert(buffer(60, 100));
        cache.insert(buffer(127, 10));
        cache.insert(buffer(0, 1000));

        assert_eq!(3, cache.len());
        assert_eq!(vec![0, 60, 127], cache.notes());
        assert_eq!(100, cache.get(60).unwrap().len());
        assert!(cache.contains(127));
        assert!(cache.get(61).is_none());
        assert!(cache.get(200).is_none());
        assert!(!cache.contains(200));
        assert_eq!(1110 * 2, cache.memory_size());

        // Replacing keeps a single entry per note.
        cache.insert(buffer(60, 5));
        assert_eq!(3, cache.len());
        assert_eq!(5, cache.get(60).unwrap().len());
    }

    #[test]
    fn test_shared_cache_snapshot_survives_publish() {
        let shared = SharedCache::new();
        assert!(shared.load().is_empty());

        let mut first = NoteBufferCache::new(44100);
        first.insert(buffer(60, 100));
        shared.publish(first);

        let snapshot = shared.load();

        let mut second = NoteBufferCache::new(44100);
        second.insert(buffer(72, 50));
        let previous = shared.publish(second);

        // Readers holding the old cache keep seeing all of it.
        assert!(snapshot.contains(60));
        assert!(!snapshot.contains(72));
        assert!(previous.contains(60));

        let current = shared.load();
        assert!(current.contains(72));
        assert!(!current.contains(60));
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = buffer(60, 22050);
        assert_eq!(Duration::from_millis(500), buffer.duration());
    }
}

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
// Core mixing logic shared by the cpal output and tests.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::debug;

use super::{ChannelHandle, OutputError};
use crate::samples::ProcessedBuffer;

/// Scales 16 bit PCM into [-1.0, 1.0).
const PCM16_SCALE: f32 = 32768.0;

/// Generation zero marks an idle channel.
const IDLE: u64 = 0;

/// The ownership state of a fixed pool of channels.
pub struct Channels {
    generations: Vec<AtomicU64>,
    next_generation: AtomicU64,
}

impl Channels {
    pub fn new(count: usize) -> Channels {
        Channels {
            generations: (0..count).map(|_| AtomicU64::new(IDLE)).collect(),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Reserves the lowest idle channel.
    pub fn acquire(&self) -> Option<ChannelHandle> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.generations
            .iter()
            .enumerate()
            .find_map(|(index, current)| {
                current
                    .compare_exchange(IDLE, generation, Ordering::AcqRel, Ordering::Relaxed)
                    .ok()
                    .map(|_| ChannelHandle::new(index, generation))
            })
    }

    /// Returns true if the handle still owns its channel.
    pub fn is_current(&self, handle: ChannelHandle) -> bool {
        self.generations
            .get(handle.index())
            .is_some_and(|current| current.load(Ordering::Acquire) == handle.generation())
    }

    /// Gives the channel back if the handle still owns it.
    pub fn release(&self, handle: ChannelHandle) -> bool {
        self.generations.get(handle.index()).is_some_and(|current| {
            current
                .compare_exchange(
                    handle.generation(),
                    IDLE,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                )
                .is_ok()
        })
    }

    pub fn busy(&self) -> usize {
        self.generations
            .iter()
            .filter(|current| current.load(Ordering::Acquire) != IDLE)
            .count()
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }
}

enum Command {
    Play {
        handle: ChannelHandle,
        buffer: Arc<ProcessedBuffer>,
        gain: f32,
    },
    Stop(ChannelHandle),
    SetGain(ChannelHandle, f32),
}

/// The control side of a mixer. Cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct MixerControl {
    channels: Arc<Channels>,
    commands: Sender<Command>,
}

impl MixerControl {
    pub fn acquire(&self) -> Option<ChannelHandle> {
        self.channels.acquire()
    }

    pub fn play(
        &self,
        handle: ChannelHandle,
        buffer: Arc<ProcessedBuffer>,
        gain: f32,
    ) -> Result<(), OutputError> {
        if !self.channels.is_current(handle) {
            return Err(OutputError::StaleChannel(handle));
        }
        self.commands
            .send(Command::Play {
                handle,
                buffer,
                gain,
            })
            .map_err(|_| {
                self.channels.release(handle);
                OutputError::Disconnected
            })
    }

    pub fn stop(&self, handle: ChannelHandle) {
        if self.channels.release(handle) {
            // A closed mixer has nothing left to stop.
            let _ = self.commands.send(Command::Stop(handle));
        }
    }

    pub fn set_gain(&self, handle: ChannelHandle, gain: f32) -> bool {
        self.channels.is_current(handle)
            && self.commands.send(Command::SetGain(handle, gain)).is_ok()
    }

    pub fn is_active(&self, handle: ChannelHandle) -> bool {
        self.channels.is_current(handle)
    }

    pub fn busy(&self) -> usize {
        self.channels.busy()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// A buffer being played on a channel.
struct Playing {
    handle: ChannelHandle,
    buffer: Arc<ProcessedBuffer>,
    position: usize,
    gain: f32,
}

/// The audio thread side of a mixer. Sums every playing channel into the output.
pub struct AudioMixer {
    channels: Arc<Channels>,
    commands: Receiver<Command>,
    playing: Vec<Option<Playing>>,
    num_output_channels: u16,
    disconnected: bool,
}

impl AudioMixer {
    /// Creates a mixer with the given channel pool writing interleaved frames of
    /// num_output_channels samples. Every output channel carries the same mono mix.
    pub fn new(channel_count: usize, num_output_channels: u16) -> (MixerControl, AudioMixer) {
        let channels = Arc::new(Channels::new(channel_count));
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
        (
            MixerControl {
                channels: channels.clone(),
                commands: commands_tx,
            },
            AudioMixer {
                channels,
                commands: commands_rx,
                playing: (0..channel_count).map(|_| None).collect(),
                num_output_channels: num_output_channels.max(1),
                disconnected: false,
            },
        )
    }

    pub fn num_output_channels(&self) -> u16 {
        self.num_output_channels
    }

    /// Returns true once every control has been dropped and all commands are applied.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    fn apply_commands(&mut self) {
        loop {
            let command = match self.commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    return;
                }
            };
            match command {
                Command::Play {
                    handle,
                    buffer,
                    gain,
                } => {
                    // The channel may have been stopped before the command arrived.
                    if !self.channels.is_current(handle) {
                        continue;
                    }
                    if let Some(slot) = self.playing.get_mut(handle.index()) {
                        *slot = Some(Playing {
                            handle,
                            buffer,
                            position: 0,
                            gain,
                        });
                    }
                }
                Command::Stop(handle) => {
                    if let Some(slot) = self.playing.get_mut(handle.index()) {
                        if slot.as_ref().is_some_and(|p| p.handle == handle) {
                            *slot = None;
                        }
                    }
                }
                Command::SetGain(handle, gain) => {
                    if let Some(Some(playing)) = self.playing.get_mut(handle.index()) {
                        if playing.handle == handle {
                            playing.gain = gain;
                        }
                    }
                }
            }
        }
    }

    /// Mixes the next block of audio into the interleaved output, overwriting it.
    pub fn process_into_output(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        self.apply_commands();

        let num_output_channels = usize::from(self.num_output_channels);
        for slot in self.playing.iter_mut() {
            let Some(playing) = slot else {
                continue;
            };

            let samples = playing.buffer.samples();
            for frame in output.chunks_exact_mut(num_output_channels) {
                let Some(sample) = samples.get(playing.position) else {
                    break;
                };
                let value = f32::from(*sample) / PCM16_SCALE * playing.gain;
                frame.iter_mut().for_each(|out| *out += value);
                playing.position += 1;
            }

            if playing.position >= samples.len() {
                debug!(
                    note = playing.buffer.note(),
                    channel = playing.handle.index(),
                    "Buffer finished."
                );
                self.channels.release(playing.handle);
                *slot = None;
            }
        }

        output
            .iter_mut()
            .for_each(|out| *out = out.clamp(-1.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(note: u8, samples: Vec<i16>) -> Arc<ProcessedBuffer> {
        Arc::new(ProcessedBuffer::new(note, samples, 44100))
    }

    #[test]
    fn test_acquire_until_exhausted() {
        let channels = Channels::new(3);
        let handles: Vec<ChannelHandle> = (0..3).filter_map(|_| channels.acquire()).collect();
        assert_eq!(3, handles.len());
        assert_eq!(3, channels.busy());
        assert!(channels.acquire().is_none());

        assert!(channels.release(handles[1]));
        assert!(!channels.release(handles[1]));

        let reused = channels.acquire().unwrap();
        assert_eq!(1, reused.index());
        assert_ne!(handles[1].generation(), reused.generation());
        assert!(!channels.is_current(handles[1]));
        assert!(channels.is_current(reused));
    }

    #[test]
    fn test_basic_mixing() {
        let (control, mut mixer) = AudioMixer::new(4, 2);

        let handle = control.acquire().unwrap();
        control
            .play(handle, buffer(60, vec![16384, -16384]), 1.0)
            .unwrap();

        let mut output = vec![1.0; 6];
        mixer.process_into_output(&mut output);

        assert_eq!(vec![0.5, 0.5, -0.5, -0.5, 0.0, 0.0], output);
        // The finished buffer hands its channel back.
        assert_eq!(0, control.busy());
        assert!(!control.set_gain(handle, 0.5));
    }

    #[test]
    fn test_multiple_channel_mixing() {
        let (control, mut mixer) = AudioMixer::new(4, 1);

        let first = control.acquire().unwrap();
        let second = control.acquire().unwrap();
        control
            .play(first, buffer(60, vec![8192, 8192, 8192]), 1.0)
            .unwrap();
        control
            .play(second, buffer(72, vec![16384, 16384, 16384]), 0.5)
            .unwrap();

        let mut output = vec![0.0; 2];
        mixer.process_into_output(&mut output);
        assert_eq!(vec![0.5, 0.5], output);
        assert_eq!(2, control.busy());

        assert!(control.set_gain(first, 0.0));
        mixer.process_into_output(&mut output);
        assert_eq!(vec![0.25, 0.0], output);
        assert_eq!(0, control.busy());
    }

    #[test]
    fn test_clipping() {
        let (control, mut mixer) = AudioMixer::new(2, 1);
        for _ in 0..2 {
            let handle = control.acquire().unwrap();
            control
                .play(handle, buffer(60, vec![i16::MAX, i16::MIN]), 1.0)
                .unwrap();
        }

        let mut output = vec![0.0; 2];
        mixer.process_into_output(&mut output);
        assert_eq!(vec![1.0, -1.0], output);
    }

    #[test]
    fn test_stale_stop_does_not_affect_new_owner() {
        let (control, mut mixer) = AudioMixer::new(1, 1);

        let old = control.acquire().unwrap();
        control.play(old, buffer(60, vec![100]), 1.0).unwrap();
        let mut output = vec![0.0; 4];
        mixer.process_into_output(&mut output);
        assert_eq!(0, control.busy());

        let new = control.acquire().unwrap();
        assert_eq!(old.index(), new.index());
        control.play(new, buffer(61, vec![16384; 100]), 1.0).unwrap();

        // The previous owner's handle no longer does anything.
        control.stop(old);
        assert!(!control.set_gain(old, 0.0));
        assert!(matches!(
            control.play(old, buffer(60, vec![1]), 1.0),
            Err(OutputError::StaleChannel(_))
        ));

        mixer.process_into_output(&mut output);
        assert_eq!(vec![0.5; 4], output);
        assert_eq!(1, control.busy());

        control.stop(new);
        mixer.process_into_output(&mut output);
        assert_eq!(vec![0.0; 4], output);
        assert_eq!(0, control.busy());
    }

    #[test]
    fn test_disconnected() {
        let (control, mut mixer) = AudioMixer::new(1, 1);
        let mut output = vec![0.0; 1];
        mixer.process_into_output(&mut output);
        assert!(!mixer.is_disconnected());

        let other = control.clone();
        drop(other);
        mixer.process_into_output(&mut output);
        assert!(!mixer.is_disconnected());

        drop(mixer);

        let handle = control.acquire().unwrap();
        assert!(matches!(
            control.play(handle, buffer(60, vec![1]), 1.0),
            Err(OutputError::Disconnected)
        ));
        assert_eq!(0, control.busy());
    }
}

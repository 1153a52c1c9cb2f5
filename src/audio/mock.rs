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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tracing::debug;

use super::{mixer::Channels, ChannelHandle, OutputError};
use crate::samples::ProcessedBuffer;

/// A call made against the mock device.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Play {
        handle: ChannelHandle,
        note: u8,
        gain: f32,
    },
    Stop(ChannelHandle),
    SetGain(ChannelHandle, f32),
}

/// A mock device. Doesn't actually play anything, but tracks channel ownership the
/// same way a real output does.
#[derive(Clone)]
pub struct Device {
    name: String,
    sample_rate: u32,
    channels: Arc<Channels>,
    calls: Arc<Mutex<Vec<Call>>>,
    disconnected: Arc<AtomicBool>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, channel_count: usize, sample_rate: u32) -> Device {
        Device {
            name: name.to_string(),
            sample_rate,
            channels: Arc::new(Channels::new(channel_count)),
            calls: Arc::new(Mutex::new(Vec::new())),
            disconnected: Arc::new(AtomicBool::new(false)),
        }
    }

    #[cfg(test)]
    /// Returns every call made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    #[cfg(test)]
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    #[cfg(test)]
    /// Simulates the buffer on the given channel reaching its end.
    pub fn finish(&self, handle: ChannelHandle) -> bool {
        self.channels.release(handle)
    }

    #[cfg(test)]
    /// Makes every following play fail as if the output had gone away.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Relaxed);
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn acquire_channel(&self) -> Option<ChannelHandle> {
        self.channels.acquire()
    }

    fn play(
        &self,
        handle: ChannelHandle,
        buffer: Arc<ProcessedBuffer>,
        gain: f32,
    ) -> Result<(), OutputError> {
        if self.disconnected.load(Ordering::Relaxed) {
            return Err(OutputError::Disconnected);
        }
        if !self.channels.is_current(handle) {
            return Err(OutputError::StaleChannel(handle));
        }
        debug!(device = self.name, %handle, note = buffer.note(), gain, "Playing buffer.");
        self.calls.lock().push(Call::Play {
            handle,
            note: buffer.note(),
            gain,
        });
        Ok(())
    }

    fn stop(&self, handle: ChannelHandle) {
        if self.channels.release(handle) {
            self.calls.lock().push(Call::Stop(handle));
        }
    }

    fn set_gain(&self, handle: ChannelHandle, gain: f32) -> bool {
        if !self.channels.is_current(handle) {
            return false;
        }
        self.calls.lock().push(Call::SetGain(handle, gain));
        true
    }

    fn is_active(&self, handle: ChannelHandle) -> bool {
        self.channels.is_current(handle)
    }

    fn busy_channels(&self) -> usize {
        self.channels.busy()
    }

    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

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
use std::{fmt, sync::Arc};

use crate::config;
use crate::samples::ProcessedBuffer;

pub mod cpal;
mod error;
pub mod mixer;
pub mod mock;

pub use error::OutputError;

/// Identifies one use of an output channel. The generation changes every time the
/// channel is acquired, so a handle held past the end of its playback no longer
/// refers to anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    index: usize,
    generation: u64,
}

impl ChannelHandle {
    pub(crate) fn new(index: usize, generation: u64) -> ChannelHandle {
        ChannelHandle { index, generation }
    }

    /// The index of the underlying output channel.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {} (generation {})", self.index, self.generation)
    }
}

/// An audio output with a fixed pool of mixing channels.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Reserves a free channel. Returns None if every channel is busy.
    fn acquire_channel(&self) -> Option<ChannelHandle>;

    /// Starts playing a buffer on a reserved channel at the given gain.
    fn play(
        &self,
        handle: ChannelHandle,
        buffer: Arc<ProcessedBuffer>,
        gain: f32,
    ) -> Result<(), OutputError>;

    /// Stops a channel. Does nothing if the handle is stale.
    fn stop(&self, handle: ChannelHandle);

    /// Changes the gain of a playing channel. Returns false if the handle is stale.
    fn set_gain(&self, handle: ChannelHandle, gain: f32) -> bool;

    /// Returns true while the handle still owns its channel.
    fn is_active(&self, handle: ChannelHandle) -> bool;

    /// The number of channels currently reserved or playing.
    fn busy_channels(&self) -> usize;

    /// The size of the channel pool.
    fn channel_count(&self) -> usize;

    /// The output sample rate.
    fn sample_rate(&self) -> u32;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, OutputError> {
    cpal::Device::list()
}

/// Gets the output device described by the given config.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, OutputError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(
            device,
            config.channels(),
            config.sample_rate(),
        )));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}

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
use std::{fmt, sync::Arc, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::{
    mixer::{AudioMixer, MixerControl},
    ChannelHandle, Device as AudioDevice, OutputError,
};
use crate::{config, samples::ProcessedBuffer};

/// A small wrapper around a cpal::Device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of output channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The running output, if the device has been opened.
    output: Option<Output>,
}

/// A running output stream and the control side of its mixer.
struct Output {
    control: MixerControl,
    sample_rate: u32,
    shutdown: crossbeam_channel::Sender<()>,
    output_thread: Option<thread::JoinHandle<()>>,
}

impl Drop for Output {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

fn device_error(e: impl fmt::Display) -> OutputError {
    OutputError::Device(e.to_string())
}

/// f32 callback: mix directly into the cpal buffer.
fn create_f32_callback(
    mut mixer: AudioMixer,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        mixer.process_into_output(data);
    }
}

/// Integer callback: mix into a scratch buffer and convert.
fn create_integer_callback<T: cpal::SizedSample + cpal::FromSample<f32>>(
    mut mixer: AudioMixer,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static {
    let mut scratch: Vec<f32> = Vec::new();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        scratch.resize(data.len(), 0.0);
        mixer.process_into_output(&mut scratch);
        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    mixer: AudioMixer,
) -> Result<cpal::Stream, OutputError> {
    let error_callback = |err: cpal::StreamError| error!("CPAL output stream error: {}", err);
    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_output_stream(
            config,
            create_f32_callback(mixer),
            error_callback,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_output_stream(
            config,
            create_integer_callback::<i16>(mixer),
            error_callback,
            None,
        ),
        cpal::SampleFormat::I32 => device.build_output_stream(
            config,
            create_integer_callback::<i32>(mixer),
            error_callback,
            None,
        ),
        other => {
            return Err(OutputError::Device(format!(
                "unsupported sample format {}",
                other
            )))
        }
    };
    stream.map_err(device_error)
}

impl Output {
    /// Starts the output thread. The stream is created and kept inside the thread.
    fn start(
        device: cpal::Device,
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<Output, OutputError> {
        let default_config = device.default_output_config().map_err(device_error)?;
        let num_output_channels = default_config.channels();
        let sample_format = default_config.sample_format();

        let (control, mixer) = AudioMixer::new(channel_count, num_output_channels);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (started_tx, started_rx) = crossbeam_channel::bounded::<Result<(), OutputError>>(1);

        let output_thread = thread::spawn(move || {
            let config = cpal::StreamConfig {
                channels: num_output_channels,
                sample_rate: sample_rate,
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = match build_stream(&device, &config, sample_format, mixer) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = started_tx.send(Err(e));
                    return;
                }
            };
            if let Err(e) = stream.play() {
                let _ = started_tx.send(Err(device_error(e)));
                return;
            }
            info!(
                channels = num_output_channels,
                sample_rate,
                format = %sample_format,
                "CPAL output stream started successfully"
            );
            let _ = started_tx.send(Ok(()));

            // Keep the stream alive until shutdown.
            let _ = shutdown_rx.recv();
            info!("CPAL output stream stopped");
        });

        let output = Output {
            control,
            sample_rate,
            shutdown: shutdown_tx,
            output_thread: Some(output_thread),
        };
        match started_rx.recv() {
            Ok(Ok(())) => Ok(output),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(OutputError::Disconnected),
        }
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, OutputError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal devices with at least one output channel.
    fn list_cpal_devices() -> Result<Vec<Device>, OutputError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)
                .map_err(device_error)?
                .devices()
            {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|output_config| output_config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name().map_err(device_error)?,
                        max_channels,
                        host_id,
                        device,
                        output: None,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device and starts its output stream.
    pub fn get(config: &config::Audio) -> Result<Device, OutputError> {
        let span = span!(Level::INFO, "open device (cpal)");
        let _enter = span.enter();

        let name = config.device();
        match Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(mut device) => {
                device.output = Some(Output::start(
                    device.device.clone(),
                    config.channels(),
                    config.sample_rate(),
                )?);
                info!(
                    device = device.name,
                    channels = config.channels(),
                    "Opened audio device."
                );
                Ok(device)
            }
            None => Err(OutputError::Device(format!(
                "no device found with name {}",
                name
            ))),
        }
    }
}

impl AudioDevice for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn acquire_channel(&self) -> Option<ChannelHandle> {
        self.output.as_ref()?.control.acquire()
    }

    fn play(
        &self,
        handle: ChannelHandle,
        buffer: Arc<ProcessedBuffer>,
        gain: f32,
    ) -> Result<(), OutputError> {
        match &self.output {
            Some(output) => output.control.play(handle, buffer, gain),
            None => Err(OutputError::Disconnected),
        }
    }

    fn stop(&self, handle: ChannelHandle) {
        if let Some(output) = &self.output {
            output.control.stop(handle);
        }
    }

    fn set_gain(&self, handle: ChannelHandle, gain: f32) -> bool {
        self.output
            .as_ref()
            .is_some_and(|output| output.control.set_gain(handle, gain))
    }

    fn is_active(&self, handle: ChannelHandle) -> bool {
        self.output
            .as_ref()
            .is_some_and(|output| output.control.is_active(handle))
    }

    fn busy_channels(&self) -> usize {
        self.output
            .as_ref()
            .map_or(0, |output| output.control.busy())
    }

    fn channel_count(&self) -> usize {
        self.output
            .as_ref()
            .map_or(0, |output| output.control.channel_count())
    }

    fn sample_rate(&self) -> u32 {
        self.output.as_ref().map_or(0, |output| output.sample_rate)
    }
}

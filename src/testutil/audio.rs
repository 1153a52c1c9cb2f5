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

use std::{any::TypeId, error::Error, f32::consts::PI, fs::File, path::PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Generates a unit amplitude sine wave.
pub fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Counts sign changes, treating zero as positive.
pub fn count_zero_crossings(samples: &[i16]) -> usize {
    samples
        .windows(2)
        .filter(|pair| (pair[0] < 0) != (pair[1] < 0))
        .count()
}

fn spec_for<S: 'static>(channels: u16, sample_rate: u32) -> Result<WavSpec, Box<dyn Error>> {
    let (sample_format, bits_per_sample) = if TypeId::of::<S>() == TypeId::of::<f32>() {
        (SampleFormat::Float, 32)
    } else if TypeId::of::<S>() == TypeId::of::<i32>() {
        (SampleFormat::Int, 32)
    } else if TypeId::of::<S>() == TypeId::of::<i16>() {
        (SampleFormat::Int, 16)
    } else {
        return Err("Unsupported sample format".into());
    };

    Ok(WavSpec {
        channels,
        sample_rate,
        bits_per_sample,
        sample_format,
    })
}

/// Writes one vector per channel to a WAV file. Channels must be the same length.
pub fn write_wav<S: hound::Sample + Copy + 'static>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let frames = samples.first().map_or(0, Vec::len);

    let mut interleaved = Vec::with_capacity(frames * num_channels);
    for frame in 0..frames {
        for channel in &samples {
            interleaved.push(channel[frame]);
        }
    }

    write_interleaved_wav(path, interleaved, num_channels as u16, sample_rate)
}

/// Writes already interleaved samples to a WAV file.
pub fn write_interleaved_wav<S: hound::Sample + Copy + 'static>(
    path: PathBuf,
    samples: Vec<S>,
    channels: u16,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let tempwav = File::create(path)?;
    let mut writer = WavWriter::new(tempwav, spec_for::<S>(channels, sample_rate)?)?;
    for sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(())
}

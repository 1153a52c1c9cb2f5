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

//! Base sample loading.
//!
//! The base sample is decoded entirely into memory, down-mixed to mono and normalized
//! so that its peak amplitude is exactly 1.0.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info, warn};

use super::error::SampleLoadError;
use super::pitch::{resample, Quality};

/// A mono, normalized waveform from which every per-note buffer is derived.
#[derive(Clone)]
pub struct BaseSample {
    /// Normalized samples in [-1.0, 1.0]. Shared so that loading is cheap to clone.
    samples: Arc<[f32]>,
    /// Sample rate in Hz.
    sample_rate: u32,
}

impl BaseSample {
    /// Creates a base sample from mono samples, normalizing them to a peak of 1.0.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<BaseSample, SampleLoadError> {
        if sample_rate == 0 {
            return Err(SampleLoadError::UnknownSampleRate(String::from(
                "in-memory sample",
            )));
        }
        if samples.is_empty() {
            return Err(SampleLoadError::Empty);
        }

        if let Some(index) = samples.iter().position(|sample| !sample.is_finite()) {
            return Err(SampleLoadError::NonFinite(index));
        }

        let peak = samples
            .iter()
            .map(|sample| sample.abs())
            .fold(0.0f32, f32::max);
        if peak == 0.0 {
            return Err(SampleLoadError::Silent);
        }

        let normalized: Vec<f32> = samples.into_iter().map(|sample| sample / peak).collect();
        Ok(BaseSample {
            samples: normalized.into(),
            sample_rate,
        })
    }

    /// Creates a base sample from interleaved multi-channel samples by averaging the channels.
    pub fn from_interleaved(
        interleaved: &[f32],
        channel_count: usize,
        sample_rate: u32,
    ) -> Result<BaseSample, SampleLoadError> {
        if channel_count <= 1 {
            return BaseSample::new(interleaved.to_vec(), sample_rate);
        }

        let mono = interleaved
            .chunks_exact(channel_count)
            .map(|frame| frame.iter().sum::<f32>() / channel_count as f32)
            .collect();
        BaseSample::new(mono, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The number of samples (frames) in the waveform.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Converts the sample to another sample rate so that it keeps its pitch when
    /// played back at that rate.
    pub fn to_sample_rate(
        &self,
        target_rate: u32,
        quality: Quality,
    ) -> Result<BaseSample, SampleLoadError> {
        if target_rate == self.sample_rate {
            return Ok(self.clone());
        }

        let ratio = f64::from(target_rate) / f64::from(self.sample_rate);
        let new_length = (self.samples.len() as f64 * ratio).round() as usize;
        if new_length == 0 {
            return Err(SampleLoadError::Empty);
        }
        let converted = resample(&self.samples, new_length, quality)
            .map_err(|_| SampleLoadError::Resample(self.sample_rate, target_rate))?;

        // Renormalize, as the interpolation can overshoot the original peak.
        BaseSample::new(converted, target_rate)
    }
}

impl fmt::Display for BaseSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sample rate: {}Hz, Length: {} samples",
            self.sample_rate,
            self.samples.len()
        )
    }
}

impl fmt::Debug for BaseSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseSample")
            .field("sample_rate", &self.sample_rate)
            .field("len", &self.samples.len())
            .finish()
    }
}

/// Loads base samples from audio files.
pub struct SampleLoader {
    /// Sample rate of the audio output. Loaded samples are converted to it when set.
    target_sample_rate: Option<u32>,
    /// Quality used for sample rate conversion.
    quality: Quality,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: Option<u32>, quality: Quality) -> SampleLoader {
        SampleLoader {
            target_sample_rate,
            quality,
        }
    }

    /// Loads a sample from any audio file symphonia can decode.
    pub fn load(&self, path: &Path) -> Result<BaseSample, SampleLoadError> {
        info!(path = ?path, "Loading sample into memory");

        let (interleaved, channel_count, sample_rate) = decode_file(path)?;
        let sample = BaseSample::from_interleaved(&interleaved, channel_count, sample_rate)?;

        let sample = match self.target_sample_rate {
            Some(target_rate) if target_rate != sample_rate => {
                info!(
                    source_rate = sample_rate,
                    target_rate, "Transcoding sample"
                );
                sample.to_sample_rate(target_rate, self.quality)?
            }
            _ => sample,
        };

        info!(
            path = ?path,
            channels = channel_count,
            sample_rate = sample.sample_rate(),
            duration_ms = sample.duration().as_millis(),
            "Sample loaded"
        );
        Ok(sample)
    }
}

impl fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleLoader")
            .field("target_sample_rate", &self.target_sample_rate)
            .field("quality", &self.quality)
            .finish()
    }
}

/// Decodes the first audio track of a file into interleaved f32 samples.
/// Returns the samples, the channel count and the sample rate.
fn decode_file(path: &Path) -> Result<(Vec<f32>, usize, u32), SampleLoadError> {
    let path_name = path.display().to_string();
    let file = File::open(path).map_err(|e| {
        SampleLoadError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path_name, e),
        ))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SampleLoadError::NoAudioTrack(path_name.clone()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| SampleLoadError::UnknownSampleRate(path_name.clone()))?;
    let mut channel_count = params.channels.map(|c| c.count()).unwrap_or(0);
    let mut decoder = get_codecs().make(&params, &DecoderOptions::default())?;

    let mut interleaved: Vec<f32> = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // A corrupt packet loses its frames but does not invalidate the rest of the file.
                warn!(path = %path_name, err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        channel_count = spec.channels.count();
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buffer.samples());
    }

    debug!(
        path = %path_name,
        samples = interleaved.len(),
        channel_count,
        "Decoded audio file"
    );

    if interleaved.is_empty() || channel_count == 0 {
        return Err(SampleLoadError::Empty);
    }
    Ok((interleaved, channel_count, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sine, write_wav};

    #[test]
    fn test_new_normalizes() {
        let sample = BaseSample::new(vec![0.0, 0.25, -0.5, 0.1], 44100).unwrap();
        assert_eq!(&[0.0, 0.5, -1.0, 0.2], sample.samples());
        assert_eq!(4, sample.len());
    }

    #[test]
    fn test_new_rejects_empty_and_silent() {
        assert!(matches!(
            BaseSample::new(Vec::new(), 44100),
            Err(SampleLoadError::Empty)
        ));
        assert!(matches!(
            BaseSample::new(vec![0.0; 16], 44100),
            Err(SampleLoadError::Silent)
        ));
        assert!(matches!(
            BaseSample::new(vec![0.5; 16], 0),
            Err(SampleLoadError::UnknownSampleRate(_))
        ));
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert!(matches!(
            BaseSample::new(vec![0.5, f32::NAN, -0.25], 44100),
            Err(SampleLoadError::NonFinite(1))
        ));
        assert!(matches!(
            BaseSample::new(vec![f32::INFINITY, 0.5], 44100),
            Err(SampleLoadError::NonFinite(0))
        ));
        assert!(matches!(
            BaseSample::from_interleaved(&[0.5, 0.5, f32::NEG_INFINITY, 0.0], 2, 44100),
            Err(SampleLoadError::NonFinite(1))
        ));
    }

    #[test]
    fn test_from_interleaved_downmixes() {
        // L=1.0, R=0.0 averages to 0.5, which is then normalized back up to 1.0.
        let sample = BaseSample::from_interleaved(&[1.0, 0.0, 0.5, 0.0, -1.0, 0.0], 2, 48000)
            .unwrap();
        assert_eq!(&[1.0, 0.5, -1.0], sample.samples());
        assert_eq!(48000, sample.sample_rate());
    }

    #[test]
    fn test_load_wav() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("sine.wav");
        let samples: Vec<i16> = sine(440.0, 44100, 4410)
            .into_iter()
            .map(|s| (s * 16384.0) as i16)
            .collect();
        write_wav(path.clone(), vec![samples], 44100).unwrap();

        let sample = SampleLoader::new(None, Quality::Fast).load(&path).unwrap();
        assert_eq!(44100, sample.sample_rate());
        assert_eq!(4410, sample.len());
        let peak = sample.samples().iter().map(|s| s.abs()).fold(0.0, f32::max);
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_stereo_wav_with_transcoding() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("stereo.wav");
        let left: Vec<f32> = sine(440.0, 44100, 4410);
        let mut interleaved = Vec::with_capacity(left.len() * 2);
        for s in left {
            interleaved.push(s * 0.5);
            interleaved.push(s * 0.5);
        }
        crate::testutil::write_interleaved_wav(path.clone(), interleaved, 2, 44100).unwrap();

        let sample = SampleLoader::new(Some(48000), Quality::Fast)
            .load(&path)
            .unwrap();
        assert_eq!(48000, sample.sample_rate());
        assert_eq!(4800, sample.len());
    }

    #[test]
    fn test_load_missing_file() {
        let result = SampleLoader::new(None, Quality::Fast).load(Path::new("/nonexistent.wav"));
        assert!(matches!(result, Err(SampleLoadError::Io(_))));
    }

    #[test]
    fn test_load_garbage_file() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("garbage.wav");
        std::fs::write(&path, b"this is not audio").unwrap();

        assert!(SampleLoader::new(None, Quality::Fast).load(&path).is_err());
    }
}

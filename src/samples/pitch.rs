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

//! Pitch shifting by resampling.
//!
//! Every note in a range is derived from the base sample by resampling it to
//! `len / pitch_ratio` samples. Raising the pitch shortens the buffer and lowering it
//! lengthens it, so pitch and duration are coupled.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::cache::{NoteBufferCache, ProcessedBuffer};
use super::error::ProcessingError;
use super::loader::BaseSample;
use crate::notes::{self, NoteRange};

/// Full scale of a 16 bit PCM sample.
const PCM16_FULL_SCALE: f32 = 32767.0;

/// Resampling quality presets for the band-limited sinc resampler.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Short filters, suitable for tests and quick previews.
    Fast,
    #[default]
    Balanced,
    /// The same filter used for song transcoding.
    Best,
}

impl Quality {
    fn parameters(&self) -> SincInterpolationParameters {
        match self {
            Quality::Fast => SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.91,
                oversampling_factor: 64,
                interpolation: SincInterpolationType::Linear,
                window: WindowFunction::Blackman2,
            },
            Quality::Balanced => SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.925,
                oversampling_factor: 128,
                interpolation: SincInterpolationType::Linear,
                window: WindowFunction::BlackmanHarris2,
            },
            Quality::Best => SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                oversampling_factor: 256,
                interpolation: SincInterpolationType::Cubic,
                window: WindowFunction::BlackmanHarris2,
            },
        }
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Quality::Fast),
            "balanced" => Ok(Quality::Balanced),
            "best" => Ok(Quality::Best),
            _ => Err(format!(
                "unknown quality '{}', expected fast, balanced or best",
                s
            )),
        }
    }
}

/// The outcome of processing a note range.
#[derive(Debug)]
pub struct ProcessReport {
    /// The freshly built cache. Only notes that processed successfully are present.
    pub cache: NoteBufferCache,
    /// Notes that were skipped, with the reason.
    pub skipped: Vec<(u8, ProcessingError)>,
    /// The total number of notes in the range.
    pub total: usize,
}

impl ProcessReport {
    /// The number of notes that have a buffer.
    pub fn processed(&self) -> usize {
        self.cache.len()
    }
}

/// Builds a buffer for every note in the range.
///
/// Notes are processed in parallel. Failures are per note: the note is skipped and
/// recorded in the report while the rest of the range carries on. `progress` is called
/// with (notes completed, total notes) after each note, successful or not.
pub fn process<F>(
    sample: &BaseSample,
    range: NoteRange,
    quality: Quality,
    progress: F,
) -> ProcessReport
where
    F: Fn(usize, usize) + Sync,
{
    let total = range.len();
    let completed = AtomicUsize::new(0);

    let results: Vec<(u8, Result<ProcessedBuffer, ProcessingError>)> = range
        .notes()
        .into_par_iter()
        .map(|note| {
            let result = process_note(sample, range.base_note(), note, quality);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done, total);
            (note, result)
        })
        .collect();

    let mut cache = NoteBufferCache::new(sample.sample_rate());
    let mut skipped = Vec::new();
    for (note, result) in results {
        match result {
            Ok(buffer) => cache.insert(buffer),
            Err(e) => {
                warn!(note, err = %e, "Skipping note");
                skipped.push((note, e));
            }
        }
    }

    info!(
        processed = cache.len(),
        skipped = skipped.len(),
        total,
        range = %range,
        "Processed sample"
    );

    ProcessReport {
        cache,
        skipped,
        total,
    }
}

/// Derives the buffer for a single target note.
pub fn process_note(
    sample: &BaseSample,
    base_note: u8,
    note: u8,
    quality: Quality,
) -> Result<ProcessedBuffer, ProcessingError> {
    if note > notes::MAX_NOTE {
        return Err(ProcessingError::NoteOutOfRange(note));
    }

    let ratio = notes::pitch_ratio(base_note, note);
    let new_length = (sample.len() as f64 / ratio).floor() as usize;
    if new_length == 0 {
        return Err(ProcessingError::ZeroLength { note });
    }

    let resampled = resample(sample.samples(), new_length, quality)
        .map_err(|reason| ProcessingError::Resample { note, reason })?;

    debug!(
        note,
        ratio,
        original_length = sample.len(),
        new_length,
        "Resampled note"
    );

    Ok(ProcessedBuffer::new(
        note,
        to_pcm16(&resampled),
        sample.sample_rate(),
    ))
}

/// Resamples a mono waveform to exactly `new_length` samples with a band-limited
/// sinc resampler. The resampler starts half a filter length into its own history,
/// so its output is already aligned with the input.
pub(crate) fn resample(
    input: &[f32],
    new_length: usize,
    quality: Quality,
) -> Result<Vec<f32>, String> {
    if input.is_empty() || new_length == 0 {
        return Ok(vec![0.0; new_length]);
    }
    if new_length == input.len() {
        return Ok(input.to_vec());
    }

    let resample_ratio = new_length as f64 / input.len() as f64;
    let mut resampler =
        SincFixedIn::<f32>::new(resample_ratio, 1.0, quality.parameters(), input.len(), 1)
            .map_err(|e| e.to_string())?;

    let mut output: Vec<f32> = Vec::with_capacity(new_length);
    let waves_in = [input];
    let first = resampler
        .process(&waves_in[..], None)
        .map_err(|e| e.to_string())?;
    output.extend_from_slice(&first[0]);

    // Flush the filter with silence until the end of the input has come out.
    while output.len() < new_length {
        let tail = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| e.to_string())?;
        if tail[0].is_empty() {
            break;
        }
        output.extend_from_slice(&tail[0]);
    }

    output.resize(new_length, 0.0);
    Ok(output)
}

/// Converts normalized samples to 16 bit PCM, saturating at +/-32767.
pub fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|sample| (sample * PCM16_FULL_SCALE).clamp(-PCM16_FULL_SCALE, PCM16_FULL_SCALE) as i16)
        .collect()
}

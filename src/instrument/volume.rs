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
use std::sync::atomic::{AtomicU32, Ordering};

use super::VolumeError;

/// The master volume used until one is set.
pub const DEFAULT_MASTER_VOLUME: f32 = 0.8;

/// Process-wide master volume in [0.0, 1.0], readable from any thread without locking.
pub struct MasterVolume {
    bits: AtomicU32,
}

impl MasterVolume {
    pub fn new(volume: f32) -> Result<MasterVolume, VolumeError> {
        check(volume)?;
        Ok(MasterVolume {
            bits: AtomicU32::new(volume.to_bits()),
        })
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Sets the volume. Values outside [0.0, 1.0] are rejected and the volume is unchanged.
    pub fn set(&self, volume: f32) -> Result<(), VolumeError> {
        check(volume)?;
        self.bits.store(volume.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Sets the volume from a percentage in [0, 100].
    pub fn set_percent(&self, percent: f32) -> Result<f32, VolumeError> {
        let volume = from_percent(percent)?;
        self.set(volume)?;
        Ok(volume)
    }
}

impl Default for MasterVolume {
    fn default() -> Self {
        MasterVolume {
            bits: AtomicU32::new(DEFAULT_MASTER_VOLUME.to_bits()),
        }
    }
}

fn check(volume: f32) -> Result<(), VolumeError> {
    // NaN fails the range check as well.
    if (0.0..=1.0).contains(&volume) {
        Ok(())
    } else {
        Err(VolumeError::OutOfRange(volume))
    }
}

/// Maps a percentage in [0, 100] to a volume in [0.0, 1.0].
pub fn from_percent(percent: f32) -> Result<f32, VolumeError> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(VolumeError::PercentOutOfRange(percent));
    }
    Ok(percent / 100.0)
}

/// The playback gain for a note struck at the given velocity.
pub fn velocity_gain(velocity: u8, master_volume: f32) -> f32 {
    f32::from(velocity.min(127)) / 127.0 * master_volume
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let volume = MasterVolume::default();
        assert_eq!(DEFAULT_MASTER_VOLUME, volume.get());

        volume.set(0.25).unwrap();
        assert_eq!(0.25, volume.get());

        assert_eq!(0.5, volume.set_percent(50.0).unwrap());
        assert_eq!(0.5, volume.get());
        volume.set(0.0).unwrap();
        volume.set(1.0).unwrap();
        assert_eq!(1.0, volume.get());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let volume = MasterVolume::new(0.3).unwrap();
        assert_eq!(Err(VolumeError::OutOfRange(1.5)), volume.set(1.5));
        assert_eq!(Err(VolumeError::OutOfRange(-0.1)), volume.set(-0.1));
        assert!(volume.set(f32::NAN).is_err());
        assert_eq!(
            Err(VolumeError::PercentOutOfRange(101.0)),
            volume.set_percent(101.0)
        );
        assert_eq!(0.3, volume.get());
        assert!(MasterVolume::new(2.0).is_err());

        assert_eq!(Ok(0.25), from_percent(25.0));
        assert!(from_percent(-1.0).is_err());
        assert!(from_percent(f32::NAN).is_err());
    }

    #[test]
    fn test_velocity_gain() {
        assert_eq!(0.8, velocity_gain(127, 0.8));
        assert_eq!(0.0, velocity_gain(0, 1.0));
        assert!((velocity_gain(64, 1.0) - 64.0 / 127.0).abs() < f32::EPSILON);
    }
}

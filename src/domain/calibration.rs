//! Gyro bias and gravity-length calibration.
//!
//! The controller must rest on a surface for the duration of the window.

use glam::Vec3;
use tracing::{info, warn};

/// Outcome of a finished calibration window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    /// Mean raw gyro, rad/s
    pub gyro_offset: Vec3,
    /// Mean accelerometer magnitude, g
    pub accel_magnitude: f32,
    pub samples: u32,
}

#[derive(Debug, Clone, Default)]
pub struct GyroCalibrator {
    is_calibrating: bool,
    duration: f32,
    elapsed: f32,
    gyro_sum: Vec3,
    accel_magnitude_sum: f32,
    samples: u32,
}

impl GyroCalibrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start gyro calibration - controller should be still
    pub fn start(&mut self, duration_seconds: f32) {
        *self = Self {
            is_calibrating: true,
            duration: duration_seconds.max(0.0),
            ..Self::default()
        };
        info!(
            "Gyro calibration started ({:.1}s) - keep controller still",
            self.duration
        );
    }

    pub fn cancel(&mut self) {
        if self.is_calibrating {
            warn!("Gyro calibration cancelled after {} samples", self.samples);
        }
        *self = Self::default();
    }

    pub fn is_calibrating(&self) -> bool {
        self.is_calibrating
    }

    /// Get calibration progress (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        if !self.is_calibrating {
            return 0.0;
        }
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Feeds one tick. Returns the result once the window has elapsed.
    ///
    /// Ticks without a fresh gyro sample advance time but add nothing.
    pub fn update(
        &mut self,
        raw_gyro: Vec3,
        accel_magnitude: f32,
        fresh_gyro: bool,
        dt: f32,
    ) -> Option<CalibrationResult> {
        if !self.is_calibrating {
            return None;
        }
        if fresh_gyro {
            self.gyro_sum += raw_gyro;
            self.accel_magnitude_sum += accel_magnitude;
            self.samples += 1;
        }
        self.elapsed += dt;
        if self.elapsed < self.duration {
            return None;
        }
        self.finish()
    }

    fn finish(&mut self) -> Option<CalibrationResult> {
        let samples = self.samples;
        let result = (samples > 0).then(|| CalibrationResult {
            gyro_offset: self.gyro_sum / samples as f32,
            accel_magnitude: self.accel_magnitude_sum / samples as f32,
            samples,
        });
        *self = Self::default();

        match &result {
            Some(r) => info!(
                "Gyro calibration complete. Offsets: ({:.4}, {:.4}, {:.4}), gravity {:.4}g over {} samples",
                r.gyro_offset.x, r.gyro_offset.y, r.gyro_offset.z, r.accel_magnitude, r.samples
            ),
            None => warn!("Gyro calibration saw no samples, keeping previous calibration"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages_over_window() {
        let mut cal = GyroCalibrator::new();
        cal.start(0.1);
        assert!(cal.is_calibrating());
        let bias = Vec3::new(0.01, -0.02, 0.03);
        let mut result = None;
        for i in 0..10 {
            let wobble = if i % 2 == 0 { 0.001 } else { -0.001 };
            result = cal.update(bias + Vec3::splat(wobble), 1.01, true, 0.0105);
            if result.is_some() {
                break;
            }
        }
        let result = result.expect("window should finish");
        assert!((result.gyro_offset - bias).length() < 1e-3);
        assert!((result.accel_magnitude - 1.01).abs() < 1e-6);
        assert!(!cal.is_calibrating());
    }

    #[test]
    fn test_progress_by_time() {
        let mut cal = GyroCalibrator::new();
        assert_eq!(cal.progress(), 0.0);
        cal.start(1.0);
        cal.update(Vec3::ZERO, 1.0, true, 0.25);
        assert!((cal.progress() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_no_samples_keeps_previous() {
        let mut cal = GyroCalibrator::new();
        cal.start(0.05);
        assert!(cal.update(Vec3::ONE, 1.0, false, 0.1).is_none());
        assert!(!cal.is_calibrating());
    }

    #[test]
    fn test_cancel() {
        let mut cal = GyroCalibrator::new();
        cal.start(1.0);
        cal.update(Vec3::ONE, 1.0, true, 0.1);
        cal.cancel();
        assert!(!cal.is_calibrating());
        assert!(cal.update(Vec3::ONE, 1.0, true, 2.0).is_none());
    }
}

//! Sensor sample accumulation.
//!
//! Sensors report at their own rate, usually faster (sometimes slower) than
//! the processing tick. Samples are summed until the tick consumes them.

use crate::domain::models::SensorEvent;
use glam::Vec3;

/// Accelerometer magnitude reported when no sample arrived, in g
pub const DEFAULT_ACCEL_MAGNITUDE: f32 = 1.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct SampleAccumulator {
    accel_sum: Vec3,
    accel_count: u32,
    gyro_sum: Vec3,
    gyro_count: u32,
}

impl SampleAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate_accel(&mut self, sample: Vec3) {
        if self.accel_count == 0 {
            self.accel_sum = Vec3::ZERO;
        }
        self.accel_sum += sample;
        self.accel_count += 1;
    }

    pub fn accumulate_gyro(&mut self, sample: Vec3) {
        if self.gyro_count == 0 {
            self.gyro_sum = Vec3::ZERO;
        }
        self.gyro_sum += sample;
        self.gyro_count += 1;
    }

    pub fn accumulate(&mut self, event: SensorEvent) {
        match event {
            SensorEvent::Accel(sample) => self.accumulate_accel(sample),
            SensorEvent::Gyro(sample) => self.accumulate_gyro(sample),
        }
    }

    pub fn accel_count(&self) -> u32 {
        self.accel_count
    }

    pub fn gyro_count(&self) -> u32 {
        self.gyro_count
    }

    /// Mean accelerometer sample, or `None` if the window is empty.
    pub fn average_accel(&self) -> Option<Vec3> {
        (self.accel_count > 0).then(|| self.accel_sum / self.accel_count as f32)
    }

    /// Magnitude of the mean accelerometer sample; 1g when the window is empty.
    pub fn average_accel_magnitude(&self) -> f32 {
        self.average_accel()
            .map_or(DEFAULT_ACCEL_MAGNITUDE, |accel| accel.length())
    }

    /// Mean gyro sample, zero when the window is empty.
    ///
    /// Calibration offset is not removed here.
    pub fn average_gyro(&self) -> Vec3 {
        if self.gyro_count == 0 {
            return Vec3::ZERO;
        }
        self.gyro_sum / self.gyro_count as f32
    }

    pub fn has_gyro(&self) -> bool {
        self.gyro_count > 0
    }

    pub fn reset_samples(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_window_defaults() {
        let acc = SampleAccumulator::new();
        assert_eq!(acc.average_accel_magnitude(), 1.0);
        assert_eq!(acc.average_gyro(), Vec3::ZERO);
        assert!(acc.average_accel().is_none());
    }

    #[test]
    fn test_average_of_three() {
        let mut acc = SampleAccumulator::new();
        acc.accumulate_gyro(Vec3::new(1.0, 2.0, 3.0));
        acc.accumulate_gyro(Vec3::new(2.0, 4.0, 6.0));
        acc.accumulate(SensorEvent::Gyro(Vec3::new(3.0, 0.0, -3.0)));
        assert_eq!(acc.average_gyro(), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(acc.gyro_count(), 3);
    }

    #[test]
    fn test_accel_magnitude_of_mean() {
        let mut acc = SampleAccumulator::new();
        acc.accumulate_accel(Vec3::new(0.0, 0.0, 2.0));
        acc.accumulate_accel(Vec3::new(0.0, 0.0, -1.0));
        assert!((acc.average_accel_magnitude() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_reset_clears_both_windows() {
        let mut acc = SampleAccumulator::new();
        acc.accumulate_accel(Vec3::X);
        acc.accumulate_gyro(Vec3::Y);
        acc.reset_samples();
        assert_eq!(acc.accel_count(), 0);
        assert_eq!(acc.average_accel_magnitude(), 1.0);
        assert_eq!(acc.average_gyro(), Vec3::ZERO);
    }

    proptest! {
        #[test]
        fn prop_average_is_componentwise_mean(
            samples in prop::collection::vec(
                (any::<bool>(), -100.0f32..100.0, -100.0f32..100.0, -100.0f32..100.0), 1..32)
        ) {
            // Accel and gyro samples interleaved within one window.
            let mut acc = SampleAccumulator::new();
            let (mut accel_sum, mut accel_n) = (Vec3::ZERO, 0);
            let (mut gyro_sum, mut gyro_n) = (Vec3::ZERO, 0);
            for &(is_accel, x, y, z) in &samples {
                let v = Vec3::new(x, y, z);
                if is_accel {
                    acc.accumulate(SensorEvent::Accel(v));
                    accel_sum += v;
                    accel_n += 1;
                } else {
                    acc.accumulate(SensorEvent::Gyro(v));
                    gyro_sum += v;
                    gyro_n += 1;
                }
            }

            if accel_n > 0 {
                let expected = accel_sum / accel_n as f32;
                let got = acc.average_accel();
                prop_assert!(got.is_some());
                prop_assert!((got.unwrap_or_default() - expected).abs().max_element() < 1e-3);
            } else {
                prop_assert!(acc.average_accel().is_none());
            }
            if gyro_n > 0 {
                let expected = gyro_sum / gyro_n as f32;
                prop_assert!((acc.average_gyro() - expected).abs().max_element() < 1e-3);
            }
        }
    }
}

//! Gyro response shaping: smoothing, tightening, sensitivity/acceleration.
//!
//! Stage order matters and is fixed: smoothing, then tightening, then
//! sensitivity. All thresholds here are rad/s.

use crate::domain::models::{linear_step, GyroOutput, EPSILON};
use crate::domain::ring_buffer::RingBuffer;
use crate::domain::settings::GyroSettings;
use glam::Vec2;

/// Capacity of the smoothing window in samples
pub const MAX_SMOOTH_SAMPLES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseConfig {
    pub smooth_window_seconds: f32,
    pub lower_smooth_thresh: f32,
    pub upper_smooth_thresh: f32,
    pub tightening_enabled: bool,
    pub tightening_threshold: f32,
    pub use_acceleration: bool,
    pub lower_accel_thresh: f32,
    pub upper_accel_thresh: f32,
    pub min_pitch_sens: f32,
    pub max_pitch_sens: f32,
    pub min_yaw_sens: f32,
    pub max_yaw_sens: f32,
}

impl ResponseConfig {
    /// Converts user-facing degree settings into pipeline units.
    pub fn from_settings(gyro: &GyroSettings) -> Self {
        let upper_smooth = gyro.smoothing_threshold.to_radians();
        let multiplier = gyro.acceleration_multiplier;
        let use_acceleration = gyro.acceleration && multiplier > 1.0 + EPSILON;
        Self {
            smooth_window_seconds: gyro.smoothing_window,
            lower_smooth_thresh: upper_smooth / 2.0,
            upper_smooth_thresh: upper_smooth,
            tightening_enabled: gyro.tightening_threshold > 0.0,
            tightening_threshold: gyro.tightening_threshold.to_radians(),
            use_acceleration,
            lower_accel_thresh: gyro.acceleration_lower_threshold.to_radians(),
            upper_accel_thresh: gyro.acceleration_upper_threshold.to_radians(),
            min_pitch_sens: gyro.pitch_sensitivity,
            max_pitch_sens: gyro.pitch_sensitivity * multiplier,
            min_yaw_sens: gyro.yaw_sensitivity,
            max_yaw_sens: gyro.yaw_sensitivity * multiplier,
        }
    }

    pub fn smoothing_enabled(&self) -> bool {
        self.smooth_window_seconds > 0.0 && self.upper_smooth_thresh > 0.0
    }
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self::from_settings(&GyroSettings::default())
    }
}

#[derive(Debug, Clone)]
pub struct ResponseShaper {
    pub config: ResponseConfig,
    history: RingBuffer<Vec2, MAX_SMOOTH_SAMPLES>,
}

impl ResponseShaper {
    pub fn new(config: ResponseConfig) -> Self {
        Self {
            config,
            history: RingBuffer::new(),
        }
    }

    pub fn shape(&mut self, input: GyroOutput, dt: f32) -> GyroOutput {
        let smoothed = if self.config.smoothing_enabled() {
            self.smooth(input, dt)
        } else {
            input
        };
        let tightened = if self.config.tightening_enabled {
            tighten(smoothed, self.config.tightening_threshold)
        } else {
            smoothed
        };
        self.apply_sensitivity(tightened)
    }

    /// Drops the smoothing history so stale slow motion cannot bleed in.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn smooth(&mut self, input: GyroOutput, dt: f32) -> GyroOutput {
        let raw_factor = linear_step(
            input.magnitude(),
            self.config.lower_smooth_thresh,
            self.config.upper_smooth_thresh,
        );
        let window = smoothing_window_samples(self.config.smooth_window_seconds, dt);
        let value = input.as_vec2();
        self.history.push(value * (1.0 - raw_factor));
        let smoothed = self.history.mean_of_recent(window);
        GyroOutput::from_vec2(value * raw_factor + smoothed)
    }

    fn apply_sensitivity(&self, input: GyroOutput) -> GyroOutput {
        let cfg = &self.config;
        if !cfg.use_acceleration {
            return GyroOutput::new(input.pitch * cfg.min_pitch_sens, input.yaw * cfg.min_yaw_sens);
        }
        let factor = acceleration_factor(
            input.magnitude(),
            cfg.lower_accel_thresh,
            cfg.upper_accel_thresh,
        );
        let pitch_sens = cfg.min_pitch_sens + (cfg.max_pitch_sens - cfg.min_pitch_sens) * factor;
        let yaw_sens = cfg.min_yaw_sens + (cfg.max_yaw_sens - cfg.min_yaw_sens) * factor;
        GyroOutput::new(input.pitch * pitch_sens, input.yaw * yaw_sens)
    }
}

impl Default for ResponseShaper {
    fn default() -> Self {
        Self::new(ResponseConfig::default())
    }
}

/// Where `magnitude` sits between the acceleration thresholds.
///
/// A zero-width range means any motion at all gets full acceleration.
pub fn acceleration_factor(magnitude: f32, lower: f32, upper: f32) -> f32 {
    if upper - lower < EPSILON {
        return if magnitude > 0.0 { 1.0 } else { 0.0 };
    }
    linear_step(magnitude, lower, upper)
}

/// Slack so a window that is a whole-and-a-half ticks long rounds up even
/// when `1/hz` is not exact in f32.
const WINDOW_ROUNDING_SLACK: f32 = 1e-3;

/// Number of samples spanning `window_seconds` at the current tick rate.
pub fn smoothing_window_samples(window_seconds: f32, dt: f32) -> usize {
    if dt < EPSILON {
        return 1;
    }
    let samples = (window_seconds / dt + WINDOW_ROUNDING_SLACK).round();
    (samples.max(1.0) as usize).min(MAX_SMOOTH_SAMPLES)
}

/// Linear attenuation factor below the tightening threshold.
pub fn tightening_scale(magnitude: f32, threshold: f32) -> f32 {
    if threshold < EPSILON || magnitude >= threshold {
        1.0
    } else {
        magnitude / threshold
    }
}

pub fn tighten(input: GyroOutput, threshold: f32) -> GyroOutput {
    let scale = tightening_scale(input.magnitude(), threshold);
    GyroOutput::from_vec2(input.as_vec2() * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn plain_config() -> ResponseConfig {
        ResponseConfig {
            smooth_window_seconds: 0.0,
            lower_smooth_thresh: 0.0,
            upper_smooth_thresh: 0.0,
            tightening_enabled: false,
            tightening_threshold: 0.0,
            use_acceleration: false,
            lower_accel_thresh: 0.0,
            upper_accel_thresh: 0.0,
            min_pitch_sens: 1.0,
            max_pitch_sens: 1.0,
            min_yaw_sens: 1.0,
            max_yaw_sens: 1.0,
        }
    }

    #[test]
    fn test_tightening_boundaries() {
        assert_eq!(tightening_scale(2.0, 2.0), 1.0);
        assert!((tightening_scale(1.0, 2.0) - 0.5).abs() < 1e-6);
        assert_eq!(tightening_scale(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_window_samples_clamped() {
        // 7.5 ticks at 60 Hz
        assert_eq!(smoothing_window_samples(0.125, DT), 8);
        assert_eq!(smoothing_window_samples(0.125, 0.03125), 4);
        assert_eq!(smoothing_window_samples(0.1, DT), 6);
        assert_eq!(smoothing_window_samples(0.0, DT), 1);
        assert_eq!(smoothing_window_samples(10.0, DT), MAX_SMOOTH_SAMPLES);
        assert_eq!(smoothing_window_samples(0.125, 0.0), 1);
    }

    #[test]
    fn test_fast_motion_bypasses_smoothing() {
        let mut cfg = plain_config();
        cfg.smooth_window_seconds = 0.125;
        cfg.lower_smooth_thresh = 0.5;
        cfg.upper_smooth_thresh = 1.0;
        let mut shaper = ResponseShaper::new(cfg);
        let out = shaper.shape(GyroOutput::new(0.0, 5.0), DT);
        assert!((out.yaw - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_slow_motion_is_averaged() {
        let mut cfg = plain_config();
        cfg.smooth_window_seconds = 4.0 * DT;
        cfg.lower_smooth_thresh = 0.5;
        cfg.upper_smooth_thresh = 1.0;
        let mut shaper = ResponseShaper::new(cfg);
        // Below the lower threshold: fully smoothed over a 4-sample window.
        let out = shaper.shape(GyroOutput::new(0.0, 0.2), DT);
        assert!((out.yaw - 0.05).abs() < 1e-6);
        for _ in 0..3 {
            shaper.shape(GyroOutput::new(0.0, 0.2), DT);
        }
        let settled = shaper.shape(GyroOutput::new(0.0, 0.2), DT);
        assert!((settled.yaw - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_clear_history() {
        let mut cfg = plain_config();
        cfg.smooth_window_seconds = 4.0 * DT;
        cfg.lower_smooth_thresh = 0.5;
        cfg.upper_smooth_thresh = 1.0;
        let mut shaper = ResponseShaper::new(cfg);
        for _ in 0..4 {
            shaper.shape(GyroOutput::new(0.0, 0.2), DT);
        }
        shaper.clear_history();
        let out = shaper.shape(GyroOutput::ZERO, DT);
        assert_eq!(out, GyroOutput::ZERO);
    }

    #[test]
    fn test_acceleration_interpolates_sensitivity() {
        let mut cfg = plain_config();
        cfg.use_acceleration = true;
        cfg.lower_accel_thresh = 0.0;
        cfg.upper_accel_thresh = 2.0;
        cfg.min_yaw_sens = 1.0;
        cfg.max_yaw_sens = 3.0;
        cfg.min_pitch_sens = 2.0;
        cfg.max_pitch_sens = 2.0;
        let mut shaper = ResponseShaper::new(cfg);
        let out = shaper.shape(GyroOutput::new(0.0, 1.0), DT);
        assert!((out.yaw - 2.0).abs() < 1e-6);
        let fast = shaper.shape(GyroOutput::new(0.0, 4.0), DT);
        assert!((fast.yaw - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_acceleration_zero_width_range() {
        let mut cfg = plain_config();
        cfg.use_acceleration = true;
        cfg.min_yaw_sens = 1.0;
        cfg.max_yaw_sens = 2.0;
        let mut shaper = ResponseShaper::new(cfg);
        let out = shaper.shape(GyroOutput::new(0.0, 0.5), DT);
        assert!((out.yaw - 1.0).abs() < 1e-6);
        let still = shaper.shape(GyroOutput::ZERO, DT);
        assert_eq!(still, GyroOutput::ZERO);
    }

    #[test]
    fn test_acceleration_equal_nonzero_thresholds() {
        let mut cfg = plain_config();
        cfg.use_acceleration = true;
        cfg.lower_accel_thresh = 1.0;
        cfg.upper_accel_thresh = 1.0;
        cfg.min_yaw_sens = 1.0;
        cfg.max_yaw_sens = 2.0;
        let mut shaper = ResponseShaper::new(cfg);
        // Below the shared threshold, still fully accelerated.
        let slow = shaper.shape(GyroOutput::new(0.0, 0.5), DT);
        assert!((slow.yaw - 1.0).abs() < 1e-6);
        let fast = shaper.shape(GyroOutput::new(0.0, 3.0), DT);
        assert!((fast.yaw - 6.0).abs() < 1e-5);
        assert_eq!(acceleration_factor(0.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn test_independent_axis_sensitivity() {
        let mut cfg = plain_config();
        cfg.min_pitch_sens = 0.5;
        cfg.min_yaw_sens = 3.0;
        let mut shaper = ResponseShaper::new(cfg);
        let out = shaper.shape(GyroOutput::new(1.0, 1.0), DT);
        assert!((out.pitch - 0.5).abs() < 1e-6);
        assert!((out.yaw - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_settings_units() {
        let cfg = ResponseConfig::from_settings(&GyroSettings::default());
        assert!((cfg.upper_smooth_thresh - 2.5f32.to_radians()).abs() < 1e-6);
        assert!((cfg.tightening_threshold - 3.5f32.to_radians()).abs() < 1e-6);
        assert!(!cfg.use_acceleration);
        assert_eq!(cfg.min_yaw_sens, 2.5);
    }
}

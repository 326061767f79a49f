//! Per-controller gyro pipeline state.
//!
//! Owns everything between the sample accumulator and the pitch/yaw rates
//! handed to the view: calibration, gravity estimate, space transform and
//! response shaping.

use crate::domain::gravity::{GravityEstimator, GravityTuning};
use crate::domain::gyro_space::{GyroSpaceTransformer, MotionFrame};
use crate::domain::models::{GyroOutput, GyroSpace};
use crate::domain::response::{ResponseConfig, ResponseShaper};
use crate::domain::samples::SampleAccumulator;
use crate::domain::settings::Settings;
use glam::Vec3;
use tracing::{debug, info, trace};

/// Result of draining the accumulator for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedSamples {
    /// Mean accelerometer sample, g
    pub accel: Vec3,
    /// Mean gyro sample before calibration, rad/s
    pub raw_gyro: Vec3,
    /// Magnitude of the window's mean accel, 1g when no accel arrived
    pub accel_magnitude: f32,
    /// Whether any gyro sample arrived this window
    pub fresh_gyro: bool,
}

#[derive(Debug, Clone)]
pub struct MotionState {
    accel: Vec3,
    raw_gyro: Vec3,
    /// Calibrated gyro, rad/s
    gyro: Vec3,
    gyro_offset: Vec3,
    accel_magnitude: f32,
    gravity: GravityEstimator,
    transformer: GyroSpaceTransformer,
    shaper: ResponseShaper,
    tuning: GravityTuning,
}

impl MotionState {
    pub fn new(settings: &Settings) -> Self {
        let mut state = Self {
            accel: Vec3::ZERO,
            raw_gyro: Vec3::ZERO,
            gyro: Vec3::ZERO,
            gyro_offset: Vec3::ZERO,
            accel_magnitude: 1.0,
            gravity: GravityEstimator::new(),
            transformer: GyroSpaceTransformer::default(),
            shaper: ResponseShaper::default(),
            tuning: GravityTuning::default(),
        };
        state.apply_settings(settings);
        state
    }

    /// Takes new settings without touching motion history.
    pub fn apply_settings(&mut self, settings: &Settings) {
        let gyro = &settings.gyro;
        if gyro.space != self.transformer.space {
            debug!("Gyro space {:?} -> {:?}", self.transformer.space, gyro.space);
        }
        self.transformer = GyroSpaceTransformer::new(gyro.space, gyro.local_roll);
        self.shaper.config = ResponseConfig::from_settings(gyro);
        self.tuning = settings.gravity;
        self.set_calibration(
            settings.calibration.gyro_offset,
            settings.calibration.accel_magnitude,
        );
    }

    pub fn set_calibration(&mut self, gyro_offset: Vec3, accel_magnitude: f32) {
        self.gyro_offset = gyro_offset;
        self.accel_magnitude = accel_magnitude;
        self.gyro = self.raw_gyro - self.gyro_offset;
    }

    /// Drains the accumulator into the current sample.
    ///
    /// An empty window keeps the previous sample so motion does not freeze
    /// when sensors report slower than the tick rate.
    pub fn prepare_samples(&mut self, samples: &mut SampleAccumulator) -> PreparedSamples {
        if let Some(accel) = samples.average_accel() {
            self.accel = accel;
        }
        let fresh_gyro = samples.has_gyro();
        if fresh_gyro {
            self.raw_gyro = samples.average_gyro();
            self.gyro = self.raw_gyro - self.gyro_offset;
        }
        let prepared = PreparedSamples {
            accel: self.accel,
            raw_gyro: self.raw_gyro,
            accel_magnitude: samples.average_accel_magnitude(),
            fresh_gyro,
        };
        samples.reset_samples();
        prepared
    }

    /// Runs the full gyro pipeline for one tick.
    pub fn process(&mut self, dt: f32) -> GyroOutput {
        let frame = self.frame(dt);
        let transformed = self.transformer.transform(&frame, &mut self.gravity, &self.tuning);
        let shaped = self.shaper.shape(transformed, dt);
        trace!(
            pitch = shaped.pitch,
            yaw = shaped.yaw,
            shakiness = self.gravity.shakiness(),
            "gyro tick"
        );
        shaped
    }

    /// Keeps the gravity estimate current while the gyro is not aiming.
    pub fn track(&mut self, dt: f32) {
        if self.transformer.space != GyroSpace::Local {
            let frame = self.frame(dt);
            self.gravity
                .update(frame.gyro, frame.accel, frame.accel_magnitude, dt, &self.tuning);
        }
        self.shaper.clear_history();
    }

    /// Zeroes motion history; settings and calibration survive.
    pub fn reset_state(&mut self) {
        self.accel = Vec3::ZERO;
        self.raw_gyro = Vec3::ZERO;
        self.gyro = Vec3::ZERO;
        self.gravity.reset();
        self.shaper.clear_history();
        info!("Motion state reset");
    }

    fn frame(&self, dt: f32) -> MotionFrame {
        MotionFrame {
            gyro: self.gyro,
            accel: self.accel,
            accel_magnitude: self.accel_magnitude,
            dt,
        }
    }

    pub fn accel(&self) -> Vec3 {
        self.accel
    }

    pub fn gyro(&self) -> Vec3 {
        self.gyro
    }

    pub fn gyro_offset(&self) -> Vec3 {
        self.gyro_offset
    }

    pub fn accel_magnitude(&self) -> f32 {
        self.accel_magnitude
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity.gravity()
    }

    pub fn smooth_accel(&self) -> Vec3 {
        self.gravity.smooth_accel()
    }

    pub fn shakiness(&self) -> f32 {
        self.gravity.shakiness()
    }

    pub fn space(&self) -> GyroSpace {
        self.transformer.space
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn world_settings() -> Settings {
        let mut settings = Settings::default();
        settings.gyro.space = GyroSpace::World;
        settings
    }

    #[test]
    fn test_reset_then_process_is_zero() {
        let mut settings = world_settings();
        settings.calibration.gyro_offset = Vec3::new(0.02, -0.01, 0.0);
        let mut motion = MotionState::new(&settings);
        let mut samples = SampleAccumulator::new();
        samples.accumulate_accel(Vec3::Y);
        samples.accumulate_gyro(Vec3::new(0.5, 1.0, 0.0));
        motion.prepare_samples(&mut samples);
        for _ in 0..30 {
            motion.process(DT);
        }

        motion.reset_state();
        motion.prepare_samples(&mut samples);
        let out = motion.process(DT);
        assert_eq!(out, GyroOutput::ZERO);
        assert_eq!(motion.gravity(), Vec3::ZERO);
        assert_eq!(motion.shakiness(), 0.0);
        assert_eq!(motion.gyro_offset(), Vec3::new(0.02, -0.01, 0.0));
    }

    #[test]
    fn test_empty_window_reuses_previous_sample() {
        let mut motion = MotionState::new(&Settings::default());
        let mut samples = SampleAccumulator::new();
        samples.accumulate_gyro(Vec3::new(0.0, 1.0, 0.0));
        let first = motion.prepare_samples(&mut samples);
        assert!(first.fresh_gyro);

        let second = motion.prepare_samples(&mut samples);
        assert!(!second.fresh_gyro);
        assert_eq!(second.raw_gyro, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(motion.gyro(), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(second.accel_magnitude, 1.0);
    }

    #[test]
    fn test_calibration_offset_is_removed() {
        let mut motion = MotionState::new(&Settings::default());
        motion.set_calibration(Vec3::new(0.1, 0.1, 0.1), 1.0);
        let mut samples = SampleAccumulator::new();
        samples.accumulate_gyro(Vec3::new(0.1, 1.1, 0.1));
        motion.prepare_samples(&mut samples);
        assert!((motion.gyro() - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_world_space_gravity_converges_through_process() {
        let mut motion = MotionState::new(&world_settings());
        let mut samples = SampleAccumulator::new();
        samples.accumulate_accel(Vec3::new(0.0, 1.0, 0.0));
        motion.prepare_samples(&mut samples);
        for _ in 0..1800 {
            motion.process(DT);
        }
        assert!((motion.gravity() - Vec3::NEG_Y).length() < 1e-4);
    }

    #[test]
    fn test_local_yaw_scaled_by_sensitivity() {
        let mut settings = Settings::default();
        settings.gyro.smoothing_threshold = 0.0;
        settings.gyro.tightening_threshold = 0.0;
        settings.gyro.yaw_sensitivity = 2.0;
        let mut motion = MotionState::new(&settings);
        let mut samples = SampleAccumulator::new();
        samples.accumulate_gyro(Vec3::new(0.0, 1.0, 0.0));
        motion.prepare_samples(&mut samples);
        let out = motion.process(DT);
        assert!((out.yaw - 2.0).abs() < 1e-6);
        assert_eq!(out.pitch, 0.0);
    }
}

//! Gravity direction estimate in sensor space.
//!
//! A rate-limited, shakiness-adaptive complementary filter: the gyro
//! predicts how gravity moved, the accelerometer pulls the estimate back.
//! There is no covariance tracking; the gain schedule is purely heuristic.

use crate::domain::models::{linear_step, EPSILON};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Tuned constants of the gravity correction.
///
/// These are feel parameters. Changing them is a product decision rather
/// than a bug fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityTuning {
    /// Decay rate of shakiness and smoothed accel, in halvings per second
    pub smooth_half_rate: f32,
    pub shakiness_min_thresh: f32,
    pub shakiness_max_thresh: f32,
    /// Correction rate while still, per second
    pub still_rate: f32,
    /// Correction rate while shaky, per second
    pub shaky_rate: f32,
    /// Fraction of the angular speed the correction may reach
    pub gyro_factor: f32,
    pub gyro_min_thresh: f32,
    pub gyro_max_thresh: f32,
    pub minimum_rate: f32,
}

impl Default for GravityTuning {
    fn default() -> Self {
        Self {
            smooth_half_rate: 4.0,
            shakiness_min_thresh: 0.01,
            shakiness_max_thresh: 0.4,
            still_rate: 1.0,
            shaky_rate: 0.1,
            gyro_factor: 0.1,
            gyro_min_thresh: 0.05,
            gyro_max_thresh: 0.25,
            minimum_rate: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GravityEstimator {
    gravity: Vec3,
    smooth_accel: Vec3,
    shakiness: f32,
}

impl GravityEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Unit gravity, or zero before the first correction.
    pub fn gravity_normalized(&self) -> Vec3 {
        self.gravity.normalize_or_zero()
    }

    pub fn smooth_accel(&self) -> Vec3 {
        self.smooth_accel
    }

    pub fn shakiness(&self) -> f32 {
        self.shakiness
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advances the estimate by one tick.
    ///
    /// `gyro` is in rad/s, `accel` in g, `accel_magnitude` is the
    /// calibrated length of gravity (1g uncalibrated).
    pub fn update(
        &mut self,
        gyro: Vec3,
        accel: Vec3,
        accel_magnitude: f32,
        dt: f32,
        tuning: &GravityTuning,
    ) {
        let angle_speed = gyro.length();
        let reverse = reverse_rotation(gyro, angle_speed, dt);

        self.gravity = reverse * self.gravity;

        let accel_length = accel.length();
        if accel_length < EPSILON {
            return;
        }

        let decay = (-dt * tuning.smooth_half_rate).exp2();
        self.smooth_accel = reverse * self.smooth_accel;
        self.shakiness = (self.shakiness * decay).max((accel - self.smooth_accel).length());
        self.smooth_accel = accel.lerp(self.smooth_accel, decay);

        let new_gravity = accel / accel_length * -accel_magnitude;
        let gravity_delta = new_gravity - self.gravity;
        let delta_length = gravity_delta.length();
        if delta_length < EPSILON {
            self.gravity = new_gravity;
            return;
        }
        let direction = gravity_delta / delta_length;

        let still_to_shaky = linear_step(
            self.shakiness,
            tuning.shakiness_min_thresh,
            tuning.shakiness_max_thresh,
        );
        let mut rate = tuning.still_rate + (tuning.shaky_rate - tuning.still_rate) * still_to_shaky;

        let limit = (angle_speed * tuning.gyro_factor).max(tuning.minimum_rate);
        if rate > limit {
            let far_enough =
                linear_step(delta_length, tuning.gyro_min_thresh, tuning.gyro_max_thresh);
            rate = limit + (rate - limit) * far_enough;
        }

        let correction = direction * (rate * dt);
        if correction.length_squared() < gravity_delta.length_squared() {
            self.gravity += correction;
        } else {
            self.gravity = new_gravity;
        }
    }
}

/// Rotation undoing the controller's own motion over `dt`.
///
/// The controller turned by `gyro * dt`, so a world-fixed vector appears to
/// turn the opposite way in sensor space.
fn reverse_rotation(gyro: Vec3, angle_speed: f32, dt: f32) -> Quat {
    if angle_speed < EPSILON {
        return Quat::IDENTITY;
    }
    let axis = -gyro / angle_speed;
    Quat::from_axis_angle(axis, angle_speed * dt)
}

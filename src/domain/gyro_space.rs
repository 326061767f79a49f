//! Maps sensor-space angular rates to pitch/yaw.
//!
//! Vectors are ordered (pitch, yaw, roll). Player and World space need the
//! gravity estimate, so the transformer advances it before projecting.

use crate::domain::gravity::{GravityEstimator, GravityTuning};
use crate::domain::models::{GyroOutput, GyroSpace, LocalRoll, EPSILON};
use glam::{Vec2, Vec3};

/// How far player-space yaw may exceed the world-yaw share (60 degree relax)
pub const RELAX_FACTOR_60: f32 = 2.094_395_2;

/// Flatness/upness below which world-space pitch fades out
pub const SIDE_THRESH: f32 = 0.125;

/// One tick worth of prepared sensor data
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionFrame {
    /// Calibrated gyro rate, rad/s
    pub gyro: Vec3,
    /// Accelerometer, g
    pub accel: Vec3,
    /// Calibrated gravity length, g
    pub accel_magnitude: f32,
    pub dt: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GyroSpaceTransformer {
    pub space: GyroSpace,
    pub local_roll: LocalRoll,
}

impl GyroSpaceTransformer {
    pub fn new(space: GyroSpace, local_roll: LocalRoll) -> Self {
        Self { space, local_roll }
    }

    pub fn transform(
        &self,
        frame: &MotionFrame,
        gravity: &mut GravityEstimator,
        tuning: &GravityTuning,
    ) -> GyroOutput {
        match self.space {
            GyroSpace::Local => local_space(frame.gyro, self.local_roll),
            GyroSpace::Player => {
                gravity.update(frame.gyro, frame.accel, frame.accel_magnitude, frame.dt, tuning);
                player_space(frame.gyro, gravity.gravity_normalized())
            }
            GyroSpace::World => {
                gravity.update(frame.gyro, frame.accel, frame.accel_magnitude, frame.dt, tuning);
                world_space(frame.gyro, gravity.gravity_normalized())
            }
        }
    }
}

pub fn local_space(gyro: Vec3, local_roll: LocalRoll) -> GyroOutput {
    let yaw = match local_roll {
        LocalRoll::Off => gyro.y,
        LocalRoll::On => gyro.y - gyro.z,
        LocalRoll::Invert => gyro.y + gyro.z,
    };
    GyroOutput::new(gyro.x, yaw)
}

/// Yaw follows gravity, but is never faster than the raw yaw/roll rate.
pub fn player_space(gyro: Vec3, grav_norm: Vec3) -> GyroOutput {
    let world_yaw = gyro.y * grav_norm.y + gyro.z * grav_norm.z;
    let world_part = world_yaw.abs() * RELAX_FACTOR_60;
    let gyro_part = Vec2::new(gyro.y, gyro.z).length();
    let yaw = -sign(world_yaw) * world_part.min(gyro_part);
    GyroOutput::new(gyro.x, yaw)
}

pub fn world_space(gyro: Vec3, grav_norm: Vec3) -> GyroOutput {
    let flatness = grav_norm.y.abs();
    let upness = grav_norm.z.abs();
    let side_reduction = ((flatness.max(upness) - SIDE_THRESH) / SIDE_THRESH).clamp(0.0, 1.0);

    let yaw = -gyro.dot(grav_norm);

    let pitch_axis = Vec3::X - grav_norm * grav_norm.x;
    let pitch = if pitch_axis.length_squared() > EPSILON {
        side_reduction * gyro.dot(pitch_axis.normalize())
    } else {
        0.0
    };
    GyroOutput::new(pitch, yaw)
}

// f32::signum maps 0.0 to 1.0; a zero world yaw must stay zero.
fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

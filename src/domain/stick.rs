//! Analog stick deadzones and response curve.

use crate::domain::models::{StickAxis, EPSILON};
use crate::domain::settings::StickSettings;

/// Removes a circular deadzone and rescales the remainder to [0, 1].
pub fn radial_deadzone(stick: StickAxis, deadzone: f32) -> StickAxis {
    radial_deadzone_outer(stick, deadzone, 1.0)
}

/// Radial deadzone that also saturates at `outer_threshold`.
///
/// Magnitudes in `[deadzone, outer_threshold]` map linearly onto `[0, 1]`;
/// anything beyond is full deflection, so worn sticks still reach max speed.
pub fn radial_deadzone_outer(stick: StickAxis, deadzone: f32, outer_threshold: f32) -> StickAxis {
    let magnitude = stick.magnitude();
    if magnitude <= deadzone {
        return StickAxis::ZERO;
    }
    let range = outer_threshold - deadzone;
    let rescaled = if range < EPSILON {
        1.0
    } else {
        ((magnitude - deadzone) / range).min(1.0)
    };
    StickAxis::from_vec2(stick.as_vec2() * (rescaled / magnitude))
}

/// Per-axis deadzone sized by the other axis.
///
/// Both deadzones come from the unmodified input, so pushing mostly along
/// one axis snaps to it while diagonals keep full precision.
pub fn sloped_axial_deadzone(stick: StickAxis, deadzone: f32) -> StickAxis {
    let deadzone_x = deadzone * stick.y.abs();
    let deadzone_y = deadzone * stick.x.abs();
    StickAxis::new(
        axial_rescale(stick.x, deadzone_x),
        axial_rescale(stick.y, deadzone_y),
    )
}

fn axial_rescale(value: f32, deadzone: f32) -> f32 {
    let magnitude = value.abs();
    if magnitude <= deadzone {
        return 0.0;
    }
    let range = 1.0 - deadzone;
    if range < EPSILON {
        return value.signum();
    }
    value.signum() * (magnitude - deadzone) / range
}

/// Rescales the magnitude by `|input|^exponent`, keeping the direction.
pub fn apply_expo(stick: StickAxis, exponent: f32) -> StickAxis {
    let magnitude = stick.magnitude();
    if magnitude < EPSILON {
        return stick;
    }
    let scale = magnitude.powf(exponent) / magnitude;
    StickAxis::from_vec2(stick.as_vec2() * scale)
}

/// Shaping parameters for one physical stick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickShaper {
    pub deadzone: f32,
    pub snap_axis: f32,
    pub expo: f32,
    pub outer_threshold: f32,
}

impl StickShaper {
    pub fn left(settings: &StickSettings) -> Self {
        Self {
            deadzone: settings.left_deadzone,
            snap_axis: settings.left_snap_axis,
            expo: settings.left_expo,
            outer_threshold: settings.left_outer_threshold,
        }
    }

    pub fn right(settings: &StickSettings) -> Self {
        Self {
            deadzone: settings.right_deadzone,
            snap_axis: settings.right_snap_axis,
            expo: settings.right_expo,
            outer_threshold: settings.right_outer_threshold,
        }
    }

    fn radial(&self, stick: StickAxis) -> StickAxis {
        radial_deadzone_outer(stick, self.deadzone, self.outer_threshold)
    }

    /// Camera stick: deadzones, then the expo curve.
    pub fn look(&self, stick: StickAxis) -> StickAxis {
        apply_expo(sloped_axial_deadzone(self.radial(stick), self.snap_axis), self.expo)
    }

    /// Movement stick: deadzones only, movement stays linear.
    pub fn movement(&self, stick: StickAxis) -> StickAxis {
        sloped_axial_deadzone(self.radial(stick), self.snap_axis)
    }

    /// Flick stick input keeps its angle, so only the radial deadzone applies.
    pub fn flick(&self, stick: StickAxis) -> StickAxis {
        self.radial(stick)
    }
}

/// Look rates in rad/s from a shaped stick; speeds are deg/s.
///
/// Right deflection turns right (negative yaw), down deflection looks down.
pub fn look_rates(shaped: StickAxis, yaw_speed: f32, pitch_speed: f32) -> (f32, f32) {
    let pitch_rate = shaped.y * pitch_speed.to_radians();
    let yaw_rate = -shaped.x * yaw_speed.to_radians();
    (pitch_rate, yaw_rate)
}

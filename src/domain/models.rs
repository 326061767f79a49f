use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Guard used by every division in the motion pipeline.
pub const EPSILON: f32 = 1e-6;

/// One raw reading delivered by a motion source.
///
/// All vectors use the sensor axis order (pitch, yaw, roll).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    /// Accelerometer sample in g
    Accel(Vec3),
    /// Gyroscope sample in rad/s
    Gyro(Vec3),
}

/// Reference frame used to interpret gyro rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GyroSpace {
    /// Sensor-fixed axes
    #[default]
    Local,
    /// Yaw around gravity, pitch around the sensor axis
    Player,
    /// Yaw and pitch fully reprojected against gravity
    World,
}

impl GyroSpace {
    /// Maps the 0-2 integer form used by settings front-ends.
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::Player,
            2 => Self::World,
            _ => Self::Local,
        }
    }
}

/// How roll contributes to yaw in local space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalRoll {
    #[default]
    Off,
    On,
    Invert,
}

impl LocalRoll {
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => Self::On,
            2 => Self::Invert,
            _ => Self::Off,
        }
    }
}

/// When the gyro contributes to aiming
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GyroMode {
    Off,
    /// Gyro only while the gyro button is held
    HoldToEnable,
    /// Gyro except while the gyro button is held
    HoldToDisable,
    #[default]
    AlwaysOn,
}

impl GyroMode {
    pub fn is_active(self, button_held: bool) -> bool {
        match self {
            Self::Off => false,
            Self::HoldToEnable => button_held,
            Self::HoldToDisable => !button_held,
            Self::AlwaysOn => true,
        }
    }
}

/// Role assignment of the two analog sticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickLayout {
    /// Left moves, right looks
    #[default]
    Default,
    /// Left looks, right moves
    Southpaw,
    /// Left moves, right flicks
    FlickStick,
    /// Left flicks, right moves
    FlickStickSouthpaw,
}

/// Which physical stick an axis reading belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickSide {
    Left,
    Right,
}

/// Normalized analog stick position, both axes in [-1, 1].
///
/// Screen convention: +x is right, +y is down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickAxis {
    pub x: f32,
    pub y: f32,
}

impl StickAxis {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Normalizes a raw signed 16-bit device reading.
    pub fn from_raw(x: i16, y: i16) -> Self {
        Self {
            x: normalize_raw_axis(x),
            y: normalize_raw_axis(y),
        }
    }

    pub fn magnitude(self) -> f32 {
        self.as_vec2().length()
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn from_vec2(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Maps the full `i16` range onto [-1, 1]; `i16::MIN` lands exactly on -1.
pub fn normalize_raw_axis(raw: i16) -> f32 {
    if raw < 0 {
        raw as f32 / 32768.0
    } else {
        raw as f32 / 32767.0
    }
}

/// Everything the controller needs for one processing tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Wall time since the previous tick
    pub dt_seconds: f32,
    /// Monotonic clock used by the flick animation
    pub now_ms: u64,
    pub left: StickAxis,
    pub right: StickAxis,
    pub gyro_button: bool,
}

/// Per-tick output handed to the view integrator.
///
/// Rates are radians per second; the flick delta is an immediate yaw
/// offset in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickOutput {
    pub gyro_pitch_rate: f32,
    pub gyro_yaw_rate: f32,
    pub stick_pitch_rate: f32,
    pub stick_yaw_rate: f32,
    pub flick_yaw_degrees: f32,
    /// Shaped movement stick, forward is -y
    pub movement: Vec2,
}

impl TickOutput {
    pub fn pitch_rate(&self) -> f32 {
        self.gyro_pitch_rate + self.stick_pitch_rate
    }

    pub fn yaw_rate(&self) -> f32 {
        self.gyro_yaw_rate + self.stick_yaw_rate
    }
}

/// Pitch/yaw rate pair produced by the gyro pipeline, in rad/s
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GyroOutput {
    pub pitch: f32,
    pub yaw: f32,
}

impl GyroOutput {
    pub const ZERO: Self = Self {
        pitch: 0.0,
        yaw: 0.0,
    };

    pub fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.pitch, self.yaw)
    }

    pub fn from_vec2(v: Vec2) -> Self {
        Self {
            pitch: v.x,
            yaw: v.y,
        }
    }

    pub fn magnitude(self) -> f32 {
        self.as_vec2().length()
    }
}

/// Clamped linear position of `value` inside `[low, high]`.
///
/// A zero-width range yields 1.0 above `low` and 0.0 otherwise.
pub fn linear_step(value: f32, low: f32, high: f32) -> f32 {
    let width = high - low;
    if width.abs() < EPSILON {
        return if value > low { 1.0 } else { 0.0 };
    }
    ((value - low) / width).clamp(0.0, 1.0)
}

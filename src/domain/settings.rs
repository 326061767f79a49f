use crate::domain::gravity::GravityTuning;
use crate::domain::models::{GyroMode, GyroSpace, LocalRoll, StickLayout};
use crate::error::SettingsError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "gyro_aim".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Gyro aiming. Thresholds are deg/s, sensitivities are RWS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GyroSettings {
    pub space: GyroSpace,
    pub local_roll: LocalRoll,
    pub mode: GyroMode,
    pub yaw_sensitivity: f32,
    pub pitch_sensitivity: f32,
    pub tightening_threshold: f32,
    pub smoothing_threshold: f32,
    /// Seconds
    pub smoothing_window: f32,
    pub acceleration: bool,
    pub acceleration_multiplier: f32,
    pub acceleration_lower_threshold: f32,
    pub acceleration_upper_threshold: f32,
}

impl Default for GyroSettings {
    fn default() -> Self {
        Self {
            space: GyroSpace::Local,
            local_roll: LocalRoll::Off,
            mode: GyroMode::AlwaysOn,
            yaw_sensitivity: 2.5,
            pitch_sensitivity: 2.5,
            tightening_threshold: 3.5,
            smoothing_threshold: 2.5,
            smoothing_window: 0.125,
            acceleration: false,
            acceleration_multiplier: 2.0,
            acceleration_lower_threshold: 0.0,
            acceleration_upper_threshold: 75.0,
        }
    }
}

impl GyroSettings {
    fn sanitize(&mut self) -> usize {
        let mut clamped = 0;
        clamped += clamp_setting("gyro.yaw_sensitivity", &mut self.yaw_sensitivity, 0.0..=20.0);
        clamped += clamp_setting("gyro.pitch_sensitivity", &mut self.pitch_sensitivity, 0.0..=20.0);
        clamped += clamp_setting(
            "gyro.tightening_threshold",
            &mut self.tightening_threshold,
            0.0..=50.0,
        );
        clamped += clamp_setting(
            "gyro.smoothing_threshold",
            &mut self.smoothing_threshold,
            0.0..=50.0,
        );
        clamped += clamp_setting("gyro.smoothing_window", &mut self.smoothing_window, 0.0..=0.5);
        clamped += clamp_setting(
            "gyro.acceleration_multiplier",
            &mut self.acceleration_multiplier,
            1.0..=20.0,
        );
        clamped += clamp_setting(
            "gyro.acceleration_lower_threshold",
            &mut self.acceleration_lower_threshold,
            0.0..=300.0,
        );
        clamped += clamp_setting(
            "gyro.acceleration_upper_threshold",
            &mut self.acceleration_upper_threshold,
            0.0..=300.0,
        );
        if self.acceleration_upper_threshold < self.acceleration_lower_threshold {
            warn!(
                "gyro.acceleration_upper_threshold {} below lower threshold, raised to {}",
                self.acceleration_upper_threshold, self.acceleration_lower_threshold
            );
            self.acceleration_upper_threshold = self.acceleration_lower_threshold;
            clamped += 1;
        }
        clamped
    }
}

/// Analog stick shaping. Deadzones are fractions of full deflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickSettings {
    pub layout: StickLayout,
    pub left_deadzone: f32,
    pub right_deadzone: f32,
    pub left_snap_axis: f32,
    pub right_snap_axis: f32,
    pub left_expo: f32,
    pub right_expo: f32,
    /// Magnitude at which the stick already counts as fully deflected
    pub left_outer_threshold: f32,
    pub right_outer_threshold: f32,
    /// Look speed at full deflection, deg/s
    pub yaw_speed: f32,
    pub pitch_speed: f32,
}

impl Default for StickSettings {
    fn default() -> Self {
        Self {
            layout: StickLayout::Default,
            left_deadzone: 0.16,
            right_deadzone: 0.16,
            left_snap_axis: 0.15,
            right_snap_axis: 0.15,
            left_expo: 2.0,
            right_expo: 2.0,
            left_outer_threshold: 0.98,
            right_outer_threshold: 0.98,
            yaw_speed: 160.0,
            pitch_speed: 130.0,
        }
    }
}

impl StickSettings {
    fn sanitize(&mut self) -> usize {
        let mut clamped = 0;
        clamped += clamp_setting("stick.left_deadzone", &mut self.left_deadzone, 0.0..=0.5);
        clamped += clamp_setting("stick.right_deadzone", &mut self.right_deadzone, 0.0..=0.5);
        clamped += clamp_setting("stick.left_snap_axis", &mut self.left_snap_axis, 0.0..=0.5);
        clamped += clamp_setting("stick.right_snap_axis", &mut self.right_snap_axis, 0.0..=0.5);
        clamped += clamp_setting("stick.left_expo", &mut self.left_expo, 1.0..=5.0);
        clamped += clamp_setting("stick.right_expo", &mut self.right_expo, 1.0..=5.0);
        clamped += clamp_setting(
            "stick.left_outer_threshold",
            &mut self.left_outer_threshold,
            0.5..=1.0,
        );
        clamped += clamp_setting(
            "stick.right_outer_threshold",
            &mut self.right_outer_threshold,
            0.5..=1.0,
        );
        clamped += clamp_setting("stick.yaw_speed", &mut self.yaw_speed, 0.0..=720.0);
        clamped += clamp_setting("stick.pitch_speed", &mut self.pitch_speed, 0.0..=720.0);
        clamped
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickSettings {
    /// Stick magnitude that starts a flick
    pub threshold: f32,
    /// Upper tier of the rotation smoothing, degrees per tick
    pub smoothing: f32,
}

impl Default for FlickSettings {
    fn default() -> Self {
        Self {
            threshold: 0.65,
            smoothing: 16.0,
        }
    }
}

impl FlickSettings {
    fn sanitize(&mut self) -> usize {
        clamp_setting("flick.threshold", &mut self.threshold, 0.0..=1.0)
            + clamp_setting("flick.smoothing", &mut self.smoothing, 0.0..=45.0)
    }
}

/// Persisted result of the last gyro calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Gyro bias, rad/s
    pub gyro_offset: Vec3,
    /// Measured gravity length, g
    pub accel_magnitude: f32,
    /// Length of a calibration window, seconds
    pub duration: f32,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            gyro_offset: Vec3::ZERO,
            accel_magnitude: 1.0,
            duration: 3.0,
        }
    }
}

impl CalibrationSettings {
    fn sanitize(&mut self) -> usize {
        let mut clamped = 0;
        if !self.gyro_offset.is_finite() {
            warn!("calibration.gyro_offset is not finite, reset to zero");
            self.gyro_offset = Vec3::ZERO;
            clamped += 1;
        }
        clamped += clamp_setting(
            "calibration.accel_magnitude",
            &mut self.accel_magnitude,
            0.5..=2.0,
        );
        clamped += clamp_setting("calibration.duration", &mut self.duration, 0.5..=10.0);
        clamped
    }
}

impl GravityTuning {
    fn sanitize(&mut self) -> usize {
        let mut clamped = 0;
        clamped += clamp_setting(
            "gravity.smooth_half_rate",
            &mut self.smooth_half_rate,
            0.1..=60.0,
        );
        clamped += clamp_setting(
            "gravity.shakiness_min_thresh",
            &mut self.shakiness_min_thresh,
            0.0..=10.0,
        );
        clamped += clamp_setting(
            "gravity.shakiness_max_thresh",
            &mut self.shakiness_max_thresh,
            self.shakiness_min_thresh..=10.0,
        );
        clamped += clamp_setting("gravity.still_rate", &mut self.still_rate, 0.0..=100.0);
        clamped += clamp_setting("gravity.shaky_rate", &mut self.shaky_rate, 0.0..=100.0);
        clamped += clamp_setting("gravity.gyro_factor", &mut self.gyro_factor, 0.0..=10.0);
        clamped += clamp_setting(
            "gravity.gyro_min_thresh",
            &mut self.gyro_min_thresh,
            0.0..=10.0,
        );
        clamped += clamp_setting(
            "gravity.gyro_max_thresh",
            &mut self.gyro_max_thresh,
            self.gyro_min_thresh..=10.0,
        );
        clamped += clamp_setting("gravity.minimum_rate", &mut self.minimum_rate, 0.0..=100.0);
        clamped
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub gyro: GyroSettings,
    #[serde(default)]
    pub stick: StickSettings,
    #[serde(default)]
    pub flick: FlickSettings,
    #[serde(default)]
    pub calibration: CalibrationSettings,
    #[serde(default)]
    pub gravity: GravityTuning,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Settings {
    /// Clamps every value into its valid range. Returns how many were changed.
    pub fn sanitize(&mut self) -> usize {
        self.gyro.sanitize()
            + self.stick.sanitize()
            + self.flick.sanitize()
            + self.calibration.sanitize()
            + self.gravity.sanitize()
    }
}

/// Clamps one setting, logging the key when the stored value was out of range.
fn clamp_setting(name: &str, value: &mut f32, range: RangeInclusive<f32>) -> usize {
    let original = *value;
    let clamped = if original.is_finite() {
        original.clamp(*range.start(), *range.end())
    } else {
        *range.start()
    };
    if clamped == original {
        return 0;
    }
    warn!("{} = {} outside {:?}, clamped to {}", name, original, range, clamped);
    *value = clamped;
    1
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    /// Loads from the per-user config directory, defaults when absent.
    pub fn new() -> Result<Self, SettingsError> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Loads from an explicit file, defaults when absent or unreadable.
    pub fn with_path(settings_path: PathBuf) -> Self {
        let mut settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => {
                info!("Loaded settings from {}", settings_path.display());
                settings
            }
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", settings_path.display());
                Settings::default()
            }
            Err(e) => {
                warn!("Ignoring settings at {}: {}", settings_path.display(), e);
                Settings::default()
            }
        };
        settings.sanitize();

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> Result<PathBuf, SettingsError> {
        let mut path = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        path.push("GyroAim");
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> Result<Settings, SettingsError> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        info!("Saved settings to {}", self.settings_path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Applies a change and clamps the result before anyone can observe it.
    pub fn update<F: FnOnce(&mut Settings)>(&mut self, change: F) -> &Settings {
        change(&mut self.settings);
        self.settings.sanitize();
        &self.settings
    }

    pub fn update_calibration(
        &mut self,
        gyro_offset: Vec3,
        accel_magnitude: f32,
    ) -> Result<(), SettingsError> {
        self.update(|s| {
            s.calibration.gyro_offset = gyro_offset;
            s.calibration.accel_magnitude = accel_magnitude;
        });
        self.save()
    }
}

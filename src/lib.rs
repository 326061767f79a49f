//! Gyro and analog stick aiming for game controllers.
//!
//! Raw accelerometer/gyro samples and stick axes go in, pitch/yaw rates and
//! flick-stick yaw steps come out. See [`domain::controller::Controller`].

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use domain::controller::Controller;
pub use domain::models::{SensorEvent, StickAxis, TickInput, TickOutput};
pub use domain::settings::{Settings, SettingsService};

//! Input processing core. Pure computation, single-threaded, no I/O
//! except the settings file.

pub mod calibration;
pub mod controller;
pub mod flick;
pub mod gravity;
pub mod gyro_space;
pub mod models;
pub mod motion;
pub mod response;
pub mod ring_buffer;
pub mod samples;
pub mod settings;
pub mod stick;

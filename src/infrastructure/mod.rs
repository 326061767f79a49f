pub mod capture;
pub mod logging;
pub mod motion_source;

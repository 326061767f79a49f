//! Motion sources
//!
//! Pads deliver motion either as separate accelerometer and gyro sensor
//! events, or as combined IMU packets from a secondary joystick device.
//! Both are fed through an unbounded channel from whatever thread or task
//! captures them; the channel is the only synchronization point and the
//! tick drains it without blocking.
//!
//! Output axes are always (pitch, yaw, roll).

use crate::domain::models::SensorEvent;
use crate::domain::samples::SampleAccumulator;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{info, trace};

/// Standard gravity, m/s^2 per g
pub const STANDARD_GRAVITY: f32 = 9.80665;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionSourceKind {
    /// Platform sensor API, one event per sensor
    NativeSensor,
    /// IMU packets from a companion joystick interface
    SecondaryJoystickImu,
}

pub trait MotionSource {
    fn kind(&self) -> MotionSourceKind;

    /// Moves every pending sample into `samples`. Returns how many arrived.
    fn poll_samples(&mut self, samples: &mut SampleAccumulator) -> usize;

    /// False once the capture side has gone away and nothing is pending.
    fn is_connected(&self) -> bool;
}

/// Event as reported by a native sensor API
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeSensorEvent {
    /// m/s^2
    Accel([f32; 3]),
    /// rad/s
    Gyro([f32; 3]),
}

impl NativeSensorEvent {
    pub fn to_sensor_event(self) -> SensorEvent {
        match self {
            Self::Accel(a) => SensorEvent::Accel(Vec3::from(a) / STANDARD_GRAVITY),
            Self::Gyro(g) => SensorEvent::Gyro(Vec3::from(g)),
        }
    }
}

pub struct NativeSensor {
    receiver: mpsc::UnboundedReceiver<NativeSensorEvent>,
    connected: bool,
}

impl NativeSensor {
    pub fn channel() -> (mpsc::UnboundedSender<NativeSensorEvent>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            sender,
            Self {
                receiver,
                connected: true,
            },
        )
    }
}

impl MotionSource for NativeSensor {
    fn kind(&self) -> MotionSourceKind {
        MotionSourceKind::NativeSensor
    }

    fn poll_samples(&mut self, samples: &mut SampleAccumulator) -> usize {
        drain(&mut self.receiver, &mut self.connected, |event| {
            samples.accumulate(event.to_sensor_event());
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Combined packet from a joystick-side IMU
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuPacket {
    /// g
    pub accel: [f32; 3],
    /// deg/s
    pub gyro: [f32; 3],
}

impl ImuPacket {
    pub fn to_sensor_events(self) -> [SensorEvent; 2] {
        [
            SensorEvent::Accel(Vec3::from(self.accel)),
            SensorEvent::Gyro(Vec3::from(self.gyro) * std::f32::consts::PI / 180.0),
        ]
    }
}

pub struct SecondaryJoystickImu {
    receiver: mpsc::UnboundedReceiver<ImuPacket>,
    connected: bool,
}

impl SecondaryJoystickImu {
    pub fn channel() -> (mpsc::UnboundedSender<ImuPacket>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            sender,
            Self {
                receiver,
                connected: true,
            },
        )
    }
}

impl MotionSource for SecondaryJoystickImu {
    fn kind(&self) -> MotionSourceKind {
        MotionSourceKind::SecondaryJoystickImu
    }

    fn poll_samples(&mut self, samples: &mut SampleAccumulator) -> usize {
        drain(&mut self.receiver, &mut self.connected, |packet| {
            for event in packet.to_sensor_events() {
                samples.accumulate(event);
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn drain<T>(
    receiver: &mut mpsc::UnboundedReceiver<T>,
    connected: &mut bool,
    mut sink: impl FnMut(T),
) -> usize {
    let mut count = 0;
    loop {
        match receiver.try_recv() {
            Ok(item) => {
                sink(item);
                count += 1;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                if *connected {
                    info!("Motion source disconnected");
                }
                *connected = false;
                break;
            }
        }
    }
    if count > 0 {
        trace!("Polled {} motion samples", count);
    }
    count
}

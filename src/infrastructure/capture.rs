//! Recorded controller input, one JSON object per line.
//!
//! ```text
//! {"type":"accel","t_ms":0,"x":0.0,"y":9.8,"z":0.0}      m/s^2
//! {"type":"gyro","t_ms":1,"x":0.0,"y":0.5,"z":0.0}       rad/s
//! {"type":"imu","t_ms":2,"accel":[0,1,0],"gyro":[0,30,0]} g, deg/s
//! {"type":"stick","t_ms":3,"side":"right","x":32767,"y":0}
//! {"type":"button","t_ms":4,"gyro_held":true}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use crate::domain::models::{StickAxis, StickSide};
use crate::error::CaptureError;
use crate::infrastructure::motion_source::{ImuPacket, MotionSourceKind, NativeSensorEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureEvent {
    Accel { t_ms: u64, x: f32, y: f32, z: f32 },
    Gyro { t_ms: u64, x: f32, y: f32, z: f32 },
    Imu { t_ms: u64, accel: [f32; 3], gyro: [f32; 3] },
    Stick { t_ms: u64, side: StickSide, x: i16, y: i16 },
    Button { t_ms: u64, gyro_held: bool },
}

impl CaptureEvent {
    pub fn t_ms(&self) -> u64 {
        match self {
            Self::Accel { t_ms, .. }
            | Self::Gyro { t_ms, .. }
            | Self::Imu { t_ms, .. }
            | Self::Stick { t_ms, .. }
            | Self::Button { t_ms, .. } => *t_ms,
        }
    }
}

/// Non-motion pad state changes forwarded to the tick loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadEvent {
    Stick { side: StickSide, axis: StickAxis },
    GyroButton(bool),
}

pub fn parse_capture(text: &str) -> Result<Vec<CaptureEvent>, CaptureError> {
    let mut events = Vec::new();
    let mut last_t_ms = 0;
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: CaptureEvent = serde_json::from_str(line).map_err(|source| {
            CaptureError::Malformed {
                line: index + 1,
                source,
            }
        })?;
        if event.t_ms() < last_t_ms {
            return Err(CaptureError::OutOfOrder {
                line: index + 1,
                t_ms: event.t_ms(),
            });
        }
        last_t_ms = event.t_ms();
        events.push(event);
    }
    Ok(events)
}

pub async fn load_capture(path: &Path) -> Result<Vec<CaptureEvent>, CaptureError> {
    let text = tokio::fs::read_to_string(path).await?;
    let events = parse_capture(&text)?;
    info!("Loaded {} capture events from {}", events.len(), path.display());
    Ok(events)
}

/// Senders the player dispatches into
pub struct CaptureFeeds {
    pub source: MotionSourceKind,
    pub native: mpsc::UnboundedSender<NativeSensorEvent>,
    pub imu: mpsc::UnboundedSender<ImuPacket>,
    pub pad: mpsc::UnboundedSender<PadEvent>,
}

/// Sends every event at its recorded offset from now.
///
/// Motion lines that do not belong to the selected source are skipped.
/// Returns the number of events delivered; stops early if the receiving
/// side hangs up. Dropping `feeds` on return disconnects the sources.
pub async fn play(events: Vec<CaptureEvent>, feeds: CaptureFeeds) -> usize {
    let start = Instant::now();
    let first_t_ms = events.first().map_or(0, CaptureEvent::t_ms);
    let mut delivered = 0;
    let mut skipped = 0;

    for event in events {
        let offset = Duration::from_millis(event.t_ms() - first_t_ms);
        tokio::time::sleep_until(start + offset).await;

        let sent = match event {
            CaptureEvent::Accel { x, y, z, .. } if feeds.source == MotionSourceKind::NativeSensor => {
                feeds.native.send(NativeSensorEvent::Accel([x, y, z])).is_ok()
            }
            CaptureEvent::Gyro { x, y, z, .. } if feeds.source == MotionSourceKind::NativeSensor => {
                feeds.native.send(NativeSensorEvent::Gyro([x, y, z])).is_ok()
            }
            CaptureEvent::Imu { accel, gyro, .. }
                if feeds.source == MotionSourceKind::SecondaryJoystickImu =>
            {
                feeds.imu.send(ImuPacket { accel, gyro }).is_ok()
            }
            CaptureEvent::Stick { side, x, y, .. } => feeds
                .pad
                .send(PadEvent::Stick {
                    side,
                    axis: StickAxis::from_raw(x, y),
                })
                .is_ok(),
            CaptureEvent::Button { gyro_held, .. } => {
                feeds.pad.send(PadEvent::GyroButton(gyro_held)).is_ok()
            }
            _ => {
                skipped += 1;
                continue;
            }
        };
        if !sent {
            debug!("Replay receiver closed, stopping playback");
            break;
        }
        delivered += 1;
    }

    if skipped > 0 {
        info!("Skipped {} events for other motion sources", skipped);
    }
    delivered
}

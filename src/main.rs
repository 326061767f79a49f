use anyhow::Result;
use clap::{Parser, ValueEnum};
use gyro_aim::domain::models::{StickAxis, StickSide, TickInput, TickOutput};
use gyro_aim::infrastructure::capture::{self, CaptureFeeds, PadEvent};
use gyro_aim::infrastructure::logging::init_logger;
use gyro_aim::infrastructure::motion_source::{
    MotionSource, MotionSourceKind, NativeSensor, SecondaryJoystickImu,
};
use gyro_aim::{Controller, SettingsService};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, trace};

/// Replays a recorded controller capture through the aiming pipeline.
#[derive(Debug, Parser)]
#[command(name = "motion-replay", version)]
struct Args {
    /// JSON-lines capture file
    #[arg(long)]
    capture: PathBuf,

    /// Settings file (defaults to the per-user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Processing ticks per second
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u32).range(1..=1000))]
    tick_hz: u32,

    /// Which motion lines of the capture drive the gyro
    #[arg(long, value_enum, default_value_t = SourceArg::Native)]
    source: SourceArg,

    /// Calibrate from the first seconds of the capture and save the result
    #[arg(long)]
    calibrate: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Native,
    Joystick,
}

impl From<SourceArg> for MotionSourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Native => MotionSourceKind::NativeSensor,
            SourceArg::Joystick => MotionSourceKind::SecondaryJoystickImu,
        }
    }
}

/// Latest stick and button state seen from the pad
#[derive(Debug, Default)]
struct PadState {
    left: StickAxis,
    right: StickAxis,
    gyro_held: bool,
}

impl PadState {
    fn apply(&mut self, event: PadEvent) {
        match event {
            PadEvent::Stick {
                side: StickSide::Left,
                axis,
            } => self.left = axis,
            PadEvent::Stick {
                side: StickSide::Right,
                axis,
            } => self.right = axis,
            PadEvent::GyroButton(held) => self.gyro_held = held,
        }
    }
}

/// Stand-in for the game's camera: integrates rates into angles, degrees.
#[derive(Debug, Default)]
struct ViewAngles {
    pitch: f32,
    yaw: f32,
}

impl ViewAngles {
    fn apply(&mut self, output: &TickOutput, dt: f32) {
        self.pitch = (self.pitch + (output.pitch_rate() * dt).to_degrees()).clamp(-89.0, 89.0);
        let yaw = self.yaw + (output.yaw_rate() * dt).to_degrees() + output.flick_yaw_degrees;
        self.yaw = (yaw + 180.0).rem_euclid(360.0) - 180.0;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings_service = match &args.settings {
        Some(path) => SettingsService::with_path(path.clone()),
        None => SettingsService::new()?,
    };
    let _logging_guard = init_logger(&settings_service.get().log_settings)?;
    info!("Starting motion replay of {}", args.capture.display());

    let events = capture::load_capture(&args.capture).await?;

    let source_kind = MotionSourceKind::from(args.source);
    let (native_tx, native) = NativeSensor::channel();
    let (imu_tx, imu) = SecondaryJoystickImu::channel();
    let (pad_tx, mut pad_rx) = mpsc::unbounded_channel();
    let mut source: Box<dyn MotionSource> = match source_kind {
        MotionSourceKind::NativeSensor => Box::new(native),
        MotionSourceKind::SecondaryJoystickImu => Box::new(imu),
    };
    info!("Motion source: {:?}", source.kind());

    let player = tokio::spawn(capture::play(
        events,
        CaptureFeeds {
            source: source_kind,
            native: native_tx,
            imu: imu_tx,
            pad: pad_tx,
        },
    ));

    let mut controller = Controller::new(settings_service.get());
    if args.calibrate {
        controller.start_calibration();
    }

    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(args.tick_hz)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let start = Instant::now();
    let mut last = start;
    let mut pad = PadState::default();
    let mut view = ViewAngles::default();
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }

        let now = Instant::now();
        let dt = (now - last).as_secs_f32();
        last = now;

        while let Ok(event) = pad_rx.try_recv() {
            pad.apply(event);
        }
        source.poll_samples(controller.samples_mut());

        let output = controller.tick(&TickInput {
            dt_seconds: dt,
            now_ms: (now - start).as_millis() as u64,
            left: pad.left,
            right: pad.right,
            gyro_button: pad.gyro_held,
        });
        view.apply(&output, dt);
        trace!(pitch = view.pitch, yaw = view.yaw, "view");
        ticks += 1;

        if let Some(result) = controller.take_calibration() {
            settings_service.update_calibration(result.gyro_offset, result.accel_magnitude)?;
        }

        if !source.is_connected() && player.is_finished() {
            break;
        }
    }

    player.abort();
    info!(
        "Replay finished after {} ticks: pitch {:.2} deg, yaw {:.2} deg, gravity {:?}",
        ticks,
        view.pitch,
        view.yaw,
        controller.motion().gravity()
    );
    Ok(())
}

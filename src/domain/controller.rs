use crate::domain::calibration::{CalibrationResult, GyroCalibrator};
use crate::domain::flick::FlickStick;
use crate::domain::models::{
    GyroOutput, SensorEvent, StickAxis, StickLayout, StickSide, TickInput, TickOutput,
};
use crate::domain::motion::MotionState;
use crate::domain::samples::SampleAccumulator;
use crate::domain::settings::Settings;
use crate::domain::stick::{look_rates, StickShaper};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StickRole {
    Move,
    Look,
    Flick,
}

/// Roles of the (left, right) sticks
fn stick_roles(layout: StickLayout) -> (StickRole, StickRole) {
    match layout {
        StickLayout::Default => (StickRole::Move, StickRole::Look),
        StickLayout::Southpaw => (StickRole::Look, StickRole::Move),
        StickLayout::FlickStick => (StickRole::Move, StickRole::Flick),
        StickLayout::FlickStickSouthpaw => (StickRole::Flick, StickRole::Move),
    }
}

fn flick_side(layout: StickLayout) -> StickSide {
    match layout {
        StickLayout::FlickStickSouthpaw => StickSide::Left,
        _ => StickSide::Right,
    }
}

/// One physical gamepad: owns its motion pipeline and stick state.
pub struct Controller {
    settings: Settings,
    samples: SampleAccumulator,
    motion: MotionState,
    calibrator: GyroCalibrator,
    flick: FlickStick,
    left: StickShaper,
    right: StickShaper,
    gyro_was_active: bool,
    pending_calibration: Option<CalibrationResult>,
}

impl Controller {
    pub fn new(settings: &Settings) -> Self {
        let snap = flick_snap_axis(settings);
        Self {
            settings: settings.clone(),
            samples: SampleAccumulator::new(),
            motion: MotionState::new(settings),
            calibrator: GyroCalibrator::new(),
            flick: FlickStick::new(&settings.flick, snap),
            left: StickShaper::left(&settings.stick),
            right: StickShaper::right(&settings.stick),
            gyro_was_active: false,
            pending_calibration: None,
        }
    }

    /// Swaps in new settings; motion history is kept.
    pub fn apply_settings(&mut self, settings: &Settings) {
        if settings.stick.layout != self.settings.stick.layout {
            debug!(
                "Stick layout {:?} -> {:?}",
                self.settings.stick.layout, settings.stick.layout
            );
            self.flick.reset();
        }
        self.settings = settings.clone();
        self.motion.apply_settings(settings);
        self.flick.apply_settings(&settings.flick, flick_snap_axis(settings));
        self.left = StickShaper::left(&settings.stick);
        self.right = StickShaper::right(&settings.stick);
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn motion(&self) -> &MotionState {
        &self.motion
    }

    pub fn flick(&self) -> &FlickStick {
        &self.flick
    }

    /// Sensor samples land here between ticks.
    pub fn samples_mut(&mut self) -> &mut SampleAccumulator {
        &mut self.samples
    }

    pub fn accumulate(&mut self, event: SensorEvent) {
        self.samples.accumulate(event);
    }

    pub fn start_calibration(&mut self) {
        self.calibrator.start(self.settings.calibration.duration);
    }

    pub fn cancel_calibration(&mut self) {
        self.calibrator.cancel();
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_calibrating()
    }

    pub fn calibration_progress(&self) -> f32 {
        self.calibrator.progress()
    }

    /// Result of the last finished calibration, for persisting.
    pub fn take_calibration(&mut self) -> Option<CalibrationResult> {
        self.pending_calibration.take()
    }

    /// Clears motion and flick history, e.g. on reconnect.
    pub fn reset(&mut self) {
        self.samples.reset_samples();
        self.motion.reset_state();
        self.flick.reset();
        self.gyro_was_active = false;
    }

    pub fn tick(&mut self, input: &TickInput) -> TickOutput {
        let dt = input.dt_seconds.max(0.0);
        let gyro = self.tick_gyro(input, dt);

        let mut output = TickOutput {
            gyro_pitch_rate: gyro.pitch,
            gyro_yaw_rate: gyro.yaw,
            ..TickOutput::default()
        };

        let (left_role, right_role) = stick_roles(self.settings.stick.layout);
        self.tick_stick(left_role, self.left, input.left, input.now_ms, &mut output);
        self.tick_stick(right_role, self.right, input.right, input.now_ms, &mut output);
        output
    }

    fn tick_gyro(&mut self, input: &TickInput, dt: f32) -> GyroOutput {
        let prepared = self.motion.prepare_samples(&mut self.samples);

        if self.calibrator.is_calibrating() {
            if let Some(result) = self.calibrator.update(
                prepared.raw_gyro,
                prepared.accel_magnitude,
                prepared.fresh_gyro,
                dt,
            ) {
                self.finish_calibration(result);
            }
            return GyroOutput::ZERO;
        }

        let active = self.settings.gyro.mode.is_active(input.gyro_button);
        if active != self.gyro_was_active {
            debug!("Gyro {}", if active { "enabled" } else { "disabled" });
            self.gyro_was_active = active;
        }
        if active {
            self.motion.process(dt)
        } else {
            self.motion.track(dt);
            GyroOutput::ZERO
        }
    }

    fn finish_calibration(&mut self, result: CalibrationResult) {
        self.settings.calibration.gyro_offset = result.gyro_offset;
        self.settings.calibration.accel_magnitude = result.accel_magnitude;
        self.settings.sanitize();

        let calibration = &self.settings.calibration;
        self.motion
            .set_calibration(calibration.gyro_offset, calibration.accel_magnitude);
        self.motion.reset_state();
        info!("Applied gyro calibration");

        self.pending_calibration = Some(CalibrationResult {
            gyro_offset: calibration.gyro_offset,
            accel_magnitude: calibration.accel_magnitude,
            samples: result.samples,
        });
    }

    fn tick_stick(
        &mut self,
        role: StickRole,
        shaper: StickShaper,
        stick: StickAxis,
        now_ms: u64,
        output: &mut TickOutput,
    ) {
        match role {
            StickRole::Move => output.movement = shaper.movement(stick).as_vec2(),
            StickRole::Look => {
                let (pitch, yaw) = look_rates(
                    shaper.look(stick),
                    self.settings.stick.yaw_speed,
                    self.settings.stick.pitch_speed,
                );
                output.stick_pitch_rate = pitch;
                output.stick_yaw_rate = yaw;
            }
            StickRole::Flick => {
                output.flick_yaw_degrees = self.flick.update(shaper.flick(stick), now_ms);
            }
        }
    }
}

fn flick_snap_axis(settings: &Settings) -> f32 {
    match flick_side(settings.stick.layout) {
        StickSide::Left => settings.stick.left_snap_axis,
        StickSide::Right => settings.stick.right_snap_axis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::GyroMode;
    use glam::Vec3;

    const DT: f32 = 1.0 / 60.0;

    fn tick_at(ms: u64) -> TickInput {
        TickInput {
            dt_seconds: DT,
            now_ms: ms,
            ..TickInput::default()
        }
    }

    #[test]
    fn test_layout_roles() {
        assert_eq!(
            stick_roles(StickLayout::FlickStickSouthpaw),
            (StickRole::Flick, StickRole::Move)
        );
        assert_eq!(
            stick_roles(StickLayout::Southpaw),
            (StickRole::Look, StickRole::Move)
        );
    }

    #[test]
    fn test_default_layout_look_and_move() {
        let mut controller = Controller::new(&Settings::default());
        let mut input = tick_at(0);
        input.left = StickAxis::new(0.0, -1.0);
        input.right = StickAxis::new(1.0, 0.0);
        let out = controller.tick(&input);
        assert!(out.movement.y < -0.99);
        assert!((out.stick_yaw_rate + 160f32.to_radians()).abs() < 1e-4);
        assert_eq!(out.flick_yaw_degrees, 0.0);
    }

    #[test]
    fn test_gyro_hold_to_enable() {
        let mut settings = Settings::default();
        settings.gyro.mode = GyroMode::HoldToEnable;
        settings.gyro.smoothing_threshold = 0.0;
        settings.gyro.tightening_threshold = 0.0;
        let mut controller = Controller::new(&settings);

        controller.accumulate(SensorEvent::Gyro(Vec3::new(0.0, 1.0, 0.0)));
        let idle = controller.tick(&tick_at(0));
        assert_eq!(idle.gyro_yaw_rate, 0.0);

        let mut held = tick_at(16);
        held.gyro_button = true;
        let out = controller.tick(&held);
        assert!((out.gyro_yaw_rate - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_calibration_applies_and_reports() {
        let mut settings = Settings::default();
        settings.calibration.duration = 0.5;
        let mut controller = Controller::new(&settings);
        controller.start_calibration();

        let bias = Vec3::new(0.02, -0.01, 0.005);
        let mut ms = 0;
        while controller.is_calibrating() {
            controller.accumulate(SensorEvent::Gyro(bias));
            controller.accumulate(SensorEvent::Accel(Vec3::new(0.0, 1.0, 0.0)));
            let out = controller.tick(&tick_at(ms));
            assert_eq!(out.gyro_yaw_rate, 0.0);
            ms += 16;
        }

        let result = controller.take_calibration().expect("calibration result");
        assert!((result.gyro_offset - bias).length() < 1e-6);
        assert!((controller.motion().gyro_offset() - bias).length() < 1e-6);
        assert!(controller.take_calibration().is_none());
    }

    #[test]
    fn test_flick_layout_turns() {
        let mut settings = Settings::default();
        settings.stick.layout = StickLayout::FlickStick;
        let mut controller = Controller::new(&settings);
        let mut total = 0.0;
        for i in 0..12 {
            let mut input = tick_at(i * 10);
            input.right = StickAxis::new(-1.0, 0.0);
            total += controller.tick(&input).flick_yaw_degrees;
        }
        assert!((total - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut settings = Settings::default();
        settings.gyro.space = crate::domain::models::GyroSpace::World;
        let mut controller = Controller::new(&settings);
        controller.accumulate(SensorEvent::Accel(Vec3::Y));
        controller.accumulate(SensorEvent::Gyro(Vec3::new(0.3, 0.2, 0.1)));
        controller.tick(&tick_at(0));
        controller.reset();
        let out = controller.tick(&tick_at(16));
        assert_eq!(out.gyro_pitch_rate, 0.0);
        assert_eq!(out.gyro_yaw_rate, 0.0);
        assert_eq!(controller.motion().gravity(), Vec3::ZERO);
    }
}

//! Flick Stick: point the stick to snap-turn towards that direction, then
//! rotate the stick to keep turning.
//!
//! Angles are degrees in screen convention: 0 is stick-up (forward),
//! positive turns left, matching view yaw.

use crate::domain::models::StickAxis;
use crate::domain::ring_buffer::RingBuffer;
use crate::domain::settings::FlickSettings;
use crate::domain::stick::sloped_axial_deadzone;
use tracing::{debug, trace};

/// Duration of the snap-turn animation
pub const FLICK_TIME_MS: f32 = 100.0;

pub const FLICK_SMOOTH_SAMPLES: usize = 8;

/// Soft-tiered smoothing over a short ring buffer.
///
/// Values below half the top threshold are fully smoothed, values above
/// the top threshold pass straight through, with a linear blend between.
#[derive(Debug, Clone, Default)]
pub struct TieredSmoother {
    samples: RingBuffer<f32, FLICK_SMOOTH_SAMPLES>,
}

impl TieredSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn smooth(&mut self, value: f32, top_threshold: f32) -> f32 {
        if top_threshold <= 0.0 {
            return value;
        }
        let bottom_threshold = top_threshold / 2.0;
        let immediate_weight =
            ((value.abs() - bottom_threshold) / (top_threshold - bottom_threshold)).clamp(0.0, 1.0);
        self.samples.push(value * (1.0 - immediate_weight));
        self.samples.mean_of_recent(FLICK_SMOOTH_SAMPLES) + value * immediate_weight
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

/// Shortest signed difference between two angles, in [-180, 180).
pub fn wrap_angle_delta(delta_degrees: f32) -> f32 {
    (delta_degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Ease-out curve of the snap-turn animation
pub fn flick_ease(progress: f32) -> f32 {
    1.0 - (1.0 - progress).powi(2)
}

/// Screen-space direction of the stick, 0 = up, +90 = left.
pub fn stick_angle(stick: StickAxis) -> f32 {
    (-stick.x).atan2(-stick.y).to_degrees()
}

#[derive(Debug, Clone)]
pub struct FlickStick {
    pub threshold: f32,
    pub smoothing: f32,
    pub snap_axis: f32,
    is_flicking: bool,
    last_stick_angle: f32,
    target_angle: f32,
    /// 1.0 means no snap-turn in progress
    flick_progress: f32,
    flick_start_ms: u64,
    smoother: TieredSmoother,
}

impl FlickStick {
    pub fn new(settings: &FlickSettings, snap_axis: f32) -> Self {
        Self {
            threshold: settings.threshold,
            smoothing: settings.smoothing,
            snap_axis,
            is_flicking: false,
            last_stick_angle: 0.0,
            target_angle: 0.0,
            flick_progress: 1.0,
            flick_start_ms: 0,
            smoother: TieredSmoother::new(),
        }
    }

    pub fn apply_settings(&mut self, settings: &FlickSettings, snap_axis: f32) {
        self.threshold = settings.threshold;
        self.smoothing = settings.smoothing;
        self.snap_axis = snap_axis;
    }

    pub fn is_flicking(&self) -> bool {
        self.is_flicking
    }

    pub fn flick_progress(&self) -> f32 {
        self.flick_progress
    }

    pub fn target_angle(&self) -> f32 {
        self.target_angle
    }

    /// Yaw change in degrees for this tick: stick rotation plus the
    /// running snap-turn animation.
    pub fn update(&mut self, stick: StickAxis, now_ms: u64) -> f32 {
        let rotation = self.rotate(stick, now_ms);
        rotation + self.resolve(now_ms)
    }

    /// Flick state machine. Returns continuous rotation in degrees.
    pub fn rotate(&mut self, stick: StickAxis, now_ms: u64) -> f32 {
        if stick.magnitude() <= self.threshold.min(1.0) {
            if self.is_flicking {
                trace!("Flick released");
            }
            self.is_flicking = false;
            return 0.0;
        }

        let angle = stick_angle(stick);
        if !self.is_flicking {
            // The target snaps to the nearest axis; rotation tracking stays
            // on the raw angle so releasing the snap adds no jump.
            self.target_angle = stick_angle(sloped_axial_deadzone(stick, self.snap_axis));
            self.is_flicking = true;
            self.flick_progress = 0.0;
            self.flick_start_ms = now_ms;
            self.last_stick_angle = angle;
            self.smoother.reset();
            debug!("Flick started, target {:.1} deg", self.target_angle);
            return 0.0;
        }

        let change = wrap_angle_delta(angle - self.last_stick_angle);
        self.last_stick_angle = angle;
        self.smoother.smooth(change, self.smoothing)
    }

    /// Advances the snap-turn animation. Returns the yaw step in degrees.
    pub fn resolve(&mut self, now_ms: u64) -> f32 {
        if self.flick_progress >= 1.0 {
            return 0.0;
        }
        let elapsed = now_ms.saturating_sub(self.flick_start_ms) as f32;
        let progress = (elapsed / FLICK_TIME_MS).clamp(0.0, 1.0);
        let step = (flick_ease(progress) - flick_ease(self.flick_progress)) * self.target_angle;
        self.flick_progress = progress;
        step
    }

    pub fn reset(&mut self) {
        self.is_flicking = false;
        self.last_stick_angle = 0.0;
        self.target_angle = 0.0;
        self.flick_progress = 1.0;
        self.smoother.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn flick_stick() -> FlickStick {
        FlickStick::new(&FlickSettings::default(), 0.15)
    }

    #[test]
    fn test_angle_wrap_takes_short_way() {
        assert!(close(wrap_angle_delta(-179.0 - 179.0), 2.0));
        assert!(close(wrap_angle_delta(179.0 - -179.0), -2.0));
        assert!(close(wrap_angle_delta(90.0), 90.0));
    }

    #[test]
    fn test_stick_angle_convention() {
        assert!(close(stick_angle(StickAxis::new(0.0, -1.0)), 0.0));
        assert!(close(stick_angle(StickAxis::new(-1.0, 0.0)), 90.0));
        assert!(close(stick_angle(StickAxis::new(1.0, 0.0)), -90.0));
        assert!(close(stick_angle(StickAxis::new(0.0, 1.0)).abs(), 180.0));
    }

    #[test]
    fn test_smoother_passthrough_when_disabled() {
        let mut smoother = TieredSmoother::new();
        for value in [0.1, -3.0, 40.0] {
            assert_eq!(smoother.smooth(value, 0.0), value);
        }
        // Nothing was recorded: the first smoothed sample averages with zeros.
        assert!(close(smoother.smooth(4.0, 16.0), 0.5));
    }

    #[test]
    fn test_smoother_tiers() {
        let mut smoother = TieredSmoother::new();
        // Above the top tier: immediate.
        assert!(close(smoother.smooth(20.0, 16.0), 20.0));
        // Below the bottom tier: averaged over 8 slots.
        assert!(close(smoother.smooth(4.0, 16.0), 0.5));
    }

    #[test]
    fn test_flick_snap_turn_completes_over_flick_time() {
        let mut flick = flick_stick();
        let right = StickAxis::new(1.0, 0.0);
        let mut total = 0.0;
        for ms in (0..=200).step_by(10) {
            total += flick.update(right, 1000 + ms);
        }
        assert!(close(total, -90.0));
        assert_eq!(flick.flick_progress(), 1.0);
        assert!(flick.is_flicking());
    }

    #[test]
    fn test_flick_target_snaps_to_axis() {
        let mut flick = flick_stick();
        flick.update(StickAxis::new(0.95, 0.05), 0);
        assert!(close(flick.target_angle(), -90.0));
    }

    #[test]
    fn test_ease_out_front_loads_turn() {
        let mut flick = flick_stick();
        let back = StickAxis::new(0.0, 1.0);
        flick.update(back, 0);
        let first_half = flick.update(back, 50);
        // ease(0.5) = 0.75 of the 180 degree target
        assert!(close(first_half.abs(), 135.0));
    }

    #[test]
    fn test_rotation_while_held() {
        let mut flick = flick_stick();
        flick.update(StickAxis::new(0.0, -1.0), 0);
        flick.update(StickAxis::new(0.0, -1.0), 200);
        let a = 30f32.to_radians();
        let turned = flick.update(StickAxis::new(-a.sin(), -a.cos()), 210);
        // Above the 16 degree tier: passes through unsmoothed.
        assert!(close(turned, 30.0));
    }

    #[test]
    fn test_release_returns_to_idle() {
        let mut flick = flick_stick();
        flick.update(StickAxis::new(0.0, -1.0), 0);
        assert!(flick.is_flicking());
        flick.update(StickAxis::new(0.0, -0.3), 16);
        assert!(!flick.is_flicking());
    }

    #[test]
    fn test_resolve_continues_after_release() {
        let mut flick = flick_stick();
        let mut total = flick.update(StickAxis::new(-1.0, 0.0), 0);
        for ms in [20, 40, 60, 80, 100, 120] {
            total += flick.update(StickAxis::ZERO, ms);
        }
        assert!(close(total, 90.0));
    }
}

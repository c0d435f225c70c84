use std::collections::BTreeMap;

use helm_proto::{FixStatus, GpsFeedback, Led, PilotInfo};
use tracing::{debug, info, warn};

use super::heading::{heading_error, within_bound};
use crate::config::PilotConfig;
use crate::pid::Pid;
use crate::steering::SteeringMessage;

/// Everything the pilot owns. Mutated only from the pilot task.
///
/// The alarm is a latch: once raised while enabled it stays raised until
/// `disable`. Condition LEDs follow the same rule while enabled; while
/// disabled they are recomputed from each sample.
#[derive(Debug)]
pub struct Autopilot {
    bounds: f64,
    minimum_speed: f64,
    pid: Pid,

    enabled: bool,
    heading_set: bool,
    set_point: f64,
    heading_offset: f64,

    course: f64,
    speed: f64,

    alarm: bool,
    leds: BTreeMap<Led, bool>,
}

impl Autopilot {
    pub fn new(cfg: &PilotConfig) -> Self {
        let (min, max) = cfg.pid_output_limits();
        Self {
            bounds: cfg.bounds,
            minimum_speed: cfg.minimum_speed_knots,
            pid: Pid::new(cfg.pid, min, max),
            enabled: false,
            heading_set: false,
            set_point: 0.0,
            heading_offset: 0.0,
            course: 0.0,
            speed: 0.0,
            alarm: false,
            leds: Led::ALL.into_iter().map(|l| (l, false)).collect(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn heading_set(&self) -> bool {
        self.heading_set
    }

    pub fn set_point(&self) -> f64 {
        self.set_point
    }

    pub fn alarm(&self) -> bool {
        self.alarm
    }

    pub fn led(&self, led: Led) -> bool {
        self.leds.get(&led).copied().unwrap_or(false)
    }

    pub fn leds(&self) -> &BTreeMap<Led, bool> {
        &self.leds
    }

    pub fn info(&self) -> PilotInfo {
        PilotInfo {
            course: self.course,
            set_point: self.set_point,
            heading_offset: self.heading_offset,
            speed: self.speed,
            enabled: self.enabled,
        }
    }

    pub fn enable(&mut self) {
        info!("pilot enabled, waiting for a valid course");
        self.enabled = true;
        self.heading_set = false;
    }

    pub fn disable(&mut self) {
        info!("pilot disabled");
        self.enabled = false;
        self.alarm = false;
    }

    pub fn set_offset(&mut self, degrees: f64) {
        if !degrees.is_finite() {
            warn!(offset = degrees, "ignoring non-finite heading offset");
            return;
        }
        info!(offset = degrees, "heading offset");
        self.heading_offset = degrees;
    }

    pub fn on_fix_status(&mut self, fix: FixStatus) {
        let no_fix = !fix.has_fix();
        if no_fix {
            self.raise("no GPS fix");
        }
        self.leds.insert(Led::NoGpsFix, no_fix);
    }

    pub fn on_feedback(&mut self, fb: &GpsFeedback) -> SteeringMessage {
        // NaN or inf would stay in the PID state for good: keep the last
        // course and speed and treat the sample as invalid.
        let finite = fb.heading.is_finite() && fb.speed.is_finite();
        if finite {
            self.course = fb.heading;
            self.speed = fb.speed;
        } else {
            warn!(heading = fb.heading, speed = fb.speed, "non-finite gps sample");
        }
        let valid = fb.validity && finite;

        if self.enabled && !self.heading_set && valid {
            info!(heading = self.course, "set point captured");
            self.set_point = self.course;
            self.pid.set(0.0);
            self.heading_set = true;
        }

        let validity_alarm = !valid;
        let speed_alarm = self.speed < self.minimum_speed;
        let error = heading_error(self.course + self.heading_offset, self.set_point);
        let heading_alarm = !validity_alarm && !speed_alarm && !within_bound(self.bounds, error);

        if !self.enabled {
            self.alarm = false;
            self.leds.insert(Led::HeadingErrorOutOfBounds, false);
            self.leds.insert(Led::CorrectionAtLimit, false);
            self.leds.insert(Led::InvalidGpsData, validity_alarm);
            self.leds.insert(Led::SpeedTooLow, speed_alarm);
            return SteeringMessage::released();
        }

        for (fired, led, reason) in [
            (heading_alarm, Led::HeadingErrorOutOfBounds, "heading error out of bounds"),
            (validity_alarm, Led::InvalidGpsData, "invalid GPS data"),
            (speed_alarm, Led::SpeedTooLow, "speed too low"),
        ] {
            if fired {
                self.raise(reason);
                self.leds.insert(led, true);
            }
        }

        let correction = self.pid.update(error);
        debug!(error, correction, alarm = self.alarm, "feedback");

        if self.alarm {
            return SteeringMessage::released();
        }
        let (min, max) = self.pid.output_limits();
        if correction <= min || correction >= max {
            warn!(correction, "correction at limit");
            self.leds.insert(Led::CorrectionAtLimit, true);
        }
        SteeringMessage::engaged(correction)
    }

    /// Unexpected input from the GPS side. Disengages if enabled.
    pub fn on_error(&mut self) -> Option<SteeringMessage> {
        if !self.enabled {
            return None;
        }
        self.raise("GPS error");
        Some(SteeringMessage::released())
    }

    /// Nothing reached the mailbox within the watchdog period.
    pub fn on_watchdog(&mut self) -> Option<SteeringMessage> {
        if !self.enabled {
            return None;
        }
        self.raise("no input before watchdog timeout");
        self.leds.insert(Led::NoGpsFix, true);
        Some(SteeringMessage::released())
    }

    pub fn on_shutdown(&mut self) {
        self.enabled = false;
        self.heading_set = false;
    }

    fn raise(&mut self, reason: &str) {
        if !self.alarm {
            warn!(reason, "alarm raised");
        }
        self.alarm = true;
    }
}

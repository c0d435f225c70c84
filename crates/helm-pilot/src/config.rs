use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use helm_proto::Led;

use crate::pid::PidGains;

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.104659039843542,
            ki: 8.06799673280568e-05,
            kd: 27.8353089535829,
            n: 2.23108985822891,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    /// Heading error bound in degrees
    pub bounds: f64,
    /// Reduction between the stepper and the steering wheel
    pub steering_reduction_ratio: f64,
    pub pid: PidGains,
    /// Watchdog: longest silence tolerated on the pilot mailbox
    pub no_input_message_timeout_s: u64,
    pub minimum_speed_knots: f64,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            bounds: 25.0,
            steering_reduction_ratio: 15.0,
            pid: PidGains::default(),
            no_input_message_timeout_s: 10,
            minimum_speed_knots: 3.0,
        }
    }
}

impl PilotConfig {
    /// Correction clamp in degrees, `±bounds * steering_reduction_ratio`.
    pub fn pid_output_limits(&self) -> (f64, f64) {
        let max = self.bounds * self.steering_reduction_ratio;
        (-max, max)
    }

    pub fn watchdog(&self) -> Duration {
        Duration::from_secs(self.no_input_message_timeout_s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sim,
    Sysfs,
}

/// Pin wiring, assembled once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub backend: Backend,
    pub gpio_root: PathBuf,
    pub alarm_pin: u32,
    pub switch_pin: u32,
    pub motor_sleep_pin: u32,
    pub motor_dir_pin: u32,
    /// Dashboard condition name -> pin
    pub leds: BTreeMap<String, u32>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        let leds = [
            (Led::NoGpsFix, 43),
            (Led::InvalidGpsData, 48),
            (Led::SpeedTooLow, 40),
            (Led::HeadingErrorOutOfBounds, 82),
            (Led::CorrectionAtLimit, 83),
        ]
        .into_iter()
        .map(|(led, pin)| (led.name().to_string(), pin))
        .collect();
        Self {
            backend: Backend::Sim,
            gpio_root: PathBuf::from("/sys/class/gpio"),
            alarm_pin: 183,
            switch_pin: 46,
            motor_sleep_pin: 12,
            motor_dir_pin: 165,
            leds,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    pub max_points: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self { max_points: 1000 }
    }
}

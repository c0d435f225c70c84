use anyhow::Result;
use std::collections::BTreeMap;

use helm_proto::Led;

use crate::config::{Backend, HardwareConfig, PilotConfig};

pub fn check_pilot(cfg: &PilotConfig) -> Result<()> {
    anyhow::ensure!(cfg.bounds > 0.0 && cfg.bounds < 180.0, "pilot.bounds must be in (0,180)");
    anyhow::ensure!(cfg.steering_reduction_ratio > 0.0, "pilot.steering_reduction_ratio must be > 0");
    let g = &cfg.pid;
    for (name, v) in [("kp", g.kp), ("ki", g.ki), ("kd", g.kd), ("n", g.n)] {
        anyhow::ensure!(v.is_finite() && v >= 0.0, "pilot.pid.{} must be a finite, non-negative number", name);
    }
    anyhow::ensure!(cfg.no_input_message_timeout_s >= 1, "pilot.no_input_message_timeout_s should be >= 1");
    anyhow::ensure!(cfg.minimum_speed_knots >= 0.0, "pilot.minimum_speed_knots must be >= 0");
    Ok(())
}

pub fn check_hardware(hw: &HardwareConfig) -> Result<()> {
    for name in hw.leds.keys() {
        anyhow::ensure!(Led::from_name(name).is_some(), "hardware.leds: unknown condition {:?}", name);
    }

    let mut used: BTreeMap<u32, String> = BTreeMap::new();
    let fixed = [
        ("alarm_pin", hw.alarm_pin),
        ("switch_pin", hw.switch_pin),
        ("motor_sleep_pin", hw.motor_sleep_pin),
        ("motor_dir_pin", hw.motor_dir_pin),
    ];
    let leds = hw.leds.iter().map(|(name, pin)| (name.as_str(), *pin));
    for (what, pin) in fixed.into_iter().chain(leds) {
        if let Some(other) = used.insert(pin, what.to_string()) {
            anyhow::bail!("hardware: pin {} used by both {} and {}", pin, other, what);
        }
    }

    if hw.backend == Backend::Sysfs {
        anyhow::ensure!(hw.gpio_root.is_dir(), "hardware.gpio_root {} is not a directory", hw.gpio_root.display());
    }
    Ok(())
}

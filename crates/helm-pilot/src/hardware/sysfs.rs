use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{Direction, Output, Stepper, Switch};

/// A GPIO line through the legacy sysfs interface (`<root>/gpio<N>/value`).
#[derive(Debug, Clone)]
pub struct SysfsPin {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsPin {
    pub fn output(root: &Path, pin: u32) -> Result<Self> {
        Self::open(root, pin, "out")
    }

    pub fn input(root: &Path, pin: u32) -> Result<Self> {
        Self::open(root, pin, "in")
    }

    fn open(root: &Path, pin: u32, direction: &str) -> Result<Self> {
        let dir = root.join(format!("gpio{}", pin));
        if !dir.exists() {
            std::fs::write(root.join("export"), pin.to_string())
                .with_context(|| format!("export gpio {}", pin))?;
        }
        std::fs::write(dir.join("direction"), direction)
            .with_context(|| format!("set gpio {} direction {}", pin, direction))?;
        Ok(Self { pin, value_path: dir.join("value") })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn write(&self, level: &str) -> Result<()> {
        std::fs::write(&self.value_path, level).with_context(|| format!("write gpio {} = {}", self.pin, level))
    }
}

impl Output for SysfsPin {
    fn enable(&mut self) -> Result<()> {
        self.write("1")
    }

    fn disable(&mut self) -> Result<()> {
        self.write("0")
    }
}

impl Switch for SysfsPin {
    fn value(&mut self) -> Result<bool> {
        let content = std::fs::read_to_string(&self.value_path)
            .with_context(|| format!("read gpio {}", self.pin))?;
        match content.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => bail!("gpio {}: unexpected value {:?}", self.pin, other),
        }
    }
}

/// Step/direction driver. The sleep line gates the coils; the step pulse
/// train comes from a PWM channel outside this crate, so a move only sets the
/// direction and holds for its duration.
#[derive(Debug, Clone)]
pub struct SysfsStepper {
    sleep: SysfsPin,
    dir: SysfsPin,
}

impl SysfsStepper {
    pub fn new(root: &Path, sleep_pin: u32, dir_pin: u32) -> Result<Self> {
        Ok(Self { sleep: SysfsPin::output(root, sleep_pin)?, dir: SysfsPin::output(root, dir_pin)? })
    }

    /// The coil power line alone.
    pub fn torque(&self) -> SysfsPin {
        self.sleep.clone()
    }
}

impl Output for SysfsStepper {
    fn enable(&mut self) -> Result<()> {
        self.sleep.enable()
    }

    fn disable(&mut self) -> Result<()> {
        self.sleep.disable()
    }
}

impl Stepper for SysfsStepper {
    async fn rotate(&mut self, direction: Direction, steps_per_second: u32, duration: Duration) -> Result<()> {
        self.dir.set(direction == Direction::Clockwise)?;
        debug!(?direction, steps_per_second, ?duration, "stepper move");
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

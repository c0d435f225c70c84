//! In-memory hardware. Handles are cheap clones sharing the same state, so a
//! test (or the `sim` backend of the binary) keeps one to observe what the
//! actor did with the other.

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use super::{Direction, Output, Stepper, Switch};

#[derive(Debug, Clone, Default)]
pub struct SimOutput {
    label: String,
    on: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl SimOutput {
    pub fn new() -> Self {
        Self::named("output")
    }

    pub fn named(label: &str) -> Self {
        Self { label: label.to_string(), ..Default::default() }
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    /// Makes every following call fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn apply(&self, on: bool) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("{}: simulated driver failure", self.label);
        }
        debug!(output = self.label.as_str(), on, "sim output");
        self.on.store(on, Ordering::SeqCst);
        Ok(())
    }
}

impl Output for SimOutput {
    fn enable(&mut self) -> Result<()> {
        self.apply(true)
    }

    fn disable(&mut self) -> Result<()> {
        self.apply(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimSwitch {
    value: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
}

impl SimSwitch {
    pub fn new(value: bool) -> Self {
        let s = Self::default();
        s.set(value);
        s
    }

    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Switch for SimSwitch {
    fn value(&mut self) -> Result<bool> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("switch: simulated read failure");
        }
        Ok(self.value.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    pub direction: Direction,
    pub steps_per_second: u32,
    pub duration: Duration,
}

/// Records moves instead of stepping. With `paced`, a move also takes its
/// real duration.
#[derive(Debug, Clone)]
pub struct SimStepper {
    torque: SimOutput,
    moves: Arc<Mutex<Vec<Move>>>,
    paced: bool,
}

impl SimStepper {
    pub fn new() -> Self {
        Self { torque: SimOutput::named("stepper"), moves: Arc::default(), paced: false }
    }

    pub fn paced() -> Self {
        Self { paced: true, ..Self::new() }
    }

    pub fn energized(&self) -> bool {
        self.torque.is_on()
    }

    /// Handle on the coil power, e.g. for the supervisor.
    pub fn torque(&self) -> SimOutput {
        self.torque.clone()
    }

    pub fn moves(&self) -> Vec<Move> {
        self.moves.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.torque.set_failing(failing);
    }
}

impl Default for SimStepper {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for SimStepper {
    fn enable(&mut self) -> Result<()> {
        self.torque.enable()
    }

    fn disable(&mut self) -> Result<()> {
        self.torque.disable()
    }
}

impl Stepper for SimStepper {
    async fn rotate(&mut self, direction: Direction, steps_per_second: u32, duration: Duration) -> Result<()> {
        if self.torque.failing.load(Ordering::SeqCst) {
            bail!("stepper: simulated move failure");
        }
        if !self.energized() {
            bail!("stepper: move requested while coils are released");
        }
        debug!(?direction, steps_per_second, ?duration, "sim stepper move");
        self.moves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Move { direction, steps_per_second, duration });
        if self.paced {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}

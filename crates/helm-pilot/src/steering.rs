use std::time::Duration;

use anyhow::anyhow;
use tracing::debug;

use crate::actor::Actor;
use crate::fault::Fault;
use crate::hardware::{Direction, Stepper};

/// Full steps per motor revolution.
pub const STEPS_PER_REVOLUTION: u32 = 200;
/// Fixed rate: one revolution per second.
pub const STEPS_PER_SECOND: u32 = STEPS_PER_REVOLUTION;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringMessage {
    pub correction_degrees: f64,
    /// Keep the coils energized after the move.
    pub stay_engaged: bool,
}

impl SteeringMessage {
    pub fn engaged(correction_degrees: f64) -> Self {
        Self { correction_degrees, stay_engaged: true }
    }

    pub fn released() -> Self {
        Self { correction_degrees: 0.0, stay_engaged: false }
    }
}

/// Direction, rate and duration of the move for a correction in degrees.
pub fn correction_to_move(correction_degrees: f64) -> anyhow::Result<(Direction, u32, Duration)> {
    let direction = if correction_degrees > 0.0 {
        Direction::Clockwise
    } else {
        Direction::CounterClockwise
    };
    let seconds = (correction_degrees / 360.0 * f64::from(STEPS_PER_REVOLUTION) / f64::from(STEPS_PER_SECOND)).abs();
    let duration = Duration::try_from_secs_f64(seconds)
        .map_err(|e| anyhow!("correction {} deg: {}", correction_degrees, e))?;
    Ok((direction, STEPS_PER_SECOND, duration))
}

/// Turns the steering stepper by the requested correction.
pub struct Steering<S> {
    stepper: S,
    energized: bool,
}

impl<S: Stepper> Steering<S> {
    pub fn new(stepper: S) -> Self {
        Self { stepper, energized: false }
    }

    fn energize(&mut self) -> Result<(), Fault> {
        if !self.energized {
            self.stepper.enable().map_err(|e| Fault::actuator(Self::NAME, e))?;
            self.energized = true;
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), Fault> {
        if self.energized {
            self.stepper.disable().map_err(|e| Fault::actuator(Self::NAME, e))?;
            self.energized = false;
        }
        Ok(())
    }
}

impl<S: Stepper> Actor for Steering<S> {
    type Message = SteeringMessage;
    const NAME: &'static str = "steering";

    async fn handle(&mut self, msg: SteeringMessage) -> Result<(), Fault> {
        if msg.correction_degrees != 0.0 {
            let (direction, rate, duration) =
                correction_to_move(msg.correction_degrees).map_err(|e| Fault::actuator(Self::NAME, e))?;
            debug!(correction = msg.correction_degrees, ?direction, ?duration, "steering move");
            self.energize()?;
            self.stepper
                .rotate(direction, rate, duration)
                .await
                .map_err(|e| Fault::actuator(Self::NAME, e))?;
        }
        if !msg.stay_engaged {
            self.release()?;
        }
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<(), Fault> {
        self.stepper.disable().map_err(|e| Fault::actuator(Self::NAME, e))?;
        self.energized = false;
        Ok(())
    }
}

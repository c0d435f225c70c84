//! Capabilities the actors drive. Implementations are thin wrappers over
//! pins and drivers; every call may fail and callers treat failure as a fault.

pub mod sim;
pub mod sysfs;

use anyhow::Result;
use std::future::Future;
use std::time::Duration;

/// Something that can be switched on and off: an LED, the alarm buzzer,
/// the stepper driver's torque.
pub trait Output: Send {
    fn enable(&mut self) -> Result<()>;
    fn disable(&mut self) -> Result<()>;

    fn set(&mut self, on: bool) -> Result<()> {
        if on {
            self.enable()
        } else {
            self.disable()
        }
    }
}

impl<T: Output + ?Sized> Output for Box<T> {
    fn enable(&mut self) -> Result<()> {
        (**self).enable()
    }

    fn disable(&mut self) -> Result<()> {
        (**self).disable()
    }
}

/// A readable two-state input, e.g. the engage switch.
pub trait Switch: Send {
    fn value(&mut self) -> Result<bool>;
}

impl<T: Switch + ?Sized> Switch for Box<T> {
    fn value(&mut self) -> Result<bool> {
        (**self).value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// Stepper motor: `Output` energizes/releases the coils.
pub trait Stepper: Output + 'static {
    /// Turns at `steps_per_second` for `duration`; resolves once the move is done.
    fn rotate(
        &mut self,
        direction: Direction,
        steps_per_second: u32,
        duration: Duration,
    ) -> impl Future<Output = Result<()>> + Send;
}

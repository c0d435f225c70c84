use std::any::Any;

use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::actor::ActorError;
use crate::hardware::Output;

/// An unrecoverable runtime failure, reported once at an actor's task
/// boundary. Validation alarms never travel this path.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error("{actor}: actuator failure: {cause:#}")]
    Actuator { actor: &'static str, cause: anyhow::Error },
    #[error("{actor}: sensor failure: {cause:#}")]
    Sensor { actor: &'static str, cause: anyhow::Error },
    #[error("{actor}: {source}")]
    Downstream {
        actor: &'static str,
        #[source]
        source: ActorError,
    },
    #[error("{actor} panicked: {message}")]
    Panicked { actor: &'static str, message: String },
}

impl Fault {
    pub fn actuator(actor: &'static str, cause: anyhow::Error) -> Self {
        Fault::Actuator { actor, cause }
    }

    pub fn sensor(actor: &'static str, cause: anyhow::Error) -> Self {
        Fault::Sensor { actor, cause }
    }

    pub fn downstream(actor: &'static str, source: ActorError) -> Self {
        Fault::Downstream { actor, source }
    }

    pub(crate) fn panicked(actor: &'static str, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Fault::Panicked { actor, message }
    }

    pub fn actor(&self) -> &'static str {
        match self {
            Fault::Actuator { actor, .. }
            | Fault::Sensor { actor, .. }
            | Fault::Downstream { actor, .. }
            | Fault::Panicked { actor, .. } => *actor,
        }
    }
}

/// Sending half of the fault queue, cloned into every actor.
#[derive(Debug, Clone)]
pub struct FaultSink {
    tx: mpsc::UnboundedSender<Fault>,
}

impl FaultSink {
    pub fn report(&self, fault: Fault) {
        error!(actor = fault.actor(), "fault: {}", fault);
        if self.tx.send(fault).is_err() {
            error!("fault queue closed: no supervisor is listening");
        }
    }
}

pub struct FaultQueue {
    rx: mpsc::UnboundedReceiver<Fault>,
}

impl FaultQueue {
    pub async fn recv(&mut self) -> Option<Fault> {
        self.rx.recv().await
    }
}

pub fn fault_channel() -> (FaultSink, FaultQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FaultSink { tx }, FaultQueue { rx })
}

/// Reads the fault queue and forces the boat into a safe state:
/// alarm on, steering torque off.
pub struct Supervisor {
    faults: FaultQueue,
    alarm: Box<dyn Output>,
    torque: Box<dyn Output>,
}

impl Supervisor {
    pub fn new(faults: FaultQueue, alarm: Box<dyn Output>, torque: Box<dyn Output>) -> Self {
        Self { faults, alarm, torque }
    }

    /// Waits for the first fault, applies the fail-safe and hands the fault
    /// back so the caller can terminate. `None` once every sink is gone.
    pub async fn watch(&mut self) -> Option<Fault> {
        let fault = self.faults.recv().await?;
        error!(actor = fault.actor(), "supervisor: unrecoverable fault, forcing fail-safe");
        self.failsafe();
        Some(fault)
    }

    /// Best effort: an actuation error here is logged, there is nothing left to escalate to.
    pub fn failsafe(&mut self) {
        if let Err(e) = self.alarm.enable() {
            warn!("failsafe: could not raise the alarm: {:#}", e);
        }
        if let Err(e) = self.torque.disable() {
            warn!("failsafe: could not release steering torque: {:#}", e);
        }
    }
}

pub mod actor;
pub mod alarm;
pub mod config;
pub mod control;
pub mod dashboard;
pub mod doctor;
pub mod fault;
pub mod hardware;
pub mod pid;
pub mod pilot;
pub mod steering;
pub mod tracer;

pub use actor::{spawn, Actor, ActorError, Mailbox};
pub use fault::{fault_channel, Fault, FaultQueue, FaultSink, Supervisor};
pub use pilot::{Pilot, PilotHandle, PilotMessage};

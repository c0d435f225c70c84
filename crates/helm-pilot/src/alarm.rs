use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::actor::Actor;
use crate::fault::Fault;
use crate::hardware::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmMessage {
    pub alarm: bool,
}

/// Read side of the latched alarm state, usable from any thread.
#[derive(Debug, Clone, Default)]
pub struct AlarmStatus {
    state: Arc<RwLock<bool>>,
}

impl AlarmStatus {
    pub fn enabled(&self) -> bool {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives the alarm output from the pilot's alarm latch.
pub struct Alarm<O> {
    output: O,
    status: AlarmStatus,
}

impl<O: Output + 'static> Alarm<O> {
    pub fn new(output: O) -> Self {
        Self { output, status: AlarmStatus::default() }
    }

    pub fn status(&self) -> AlarmStatus {
        self.status.clone()
    }

    fn drive(&mut self, raised: bool) -> Result<(), Fault> {
        *self.status.state.write().unwrap_or_else(PoisonError::into_inner) = raised;
        self.output.set(raised).map_err(|e| Fault::actuator(Self::NAME, e))
    }
}

impl<O: Output + 'static> Actor for Alarm<O> {
    type Message = AlarmMessage;
    const NAME: &'static str = "alarm";

    async fn handle(&mut self, msg: AlarmMessage) -> Result<(), Fault> {
        if msg.alarm != self.status.enabled() {
            info!(alarm = msg.alarm, "alarm state change");
        }
        self.drive(msg.alarm)
    }

    async fn on_shutdown(&mut self) -> Result<(), Fault> {
        self.drive(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::spawn;
    use crate::fault::fault_channel;
    use crate::hardware::sim::SimOutput;
    use crate::testing::eventually;

    #[tokio::test]
    async fn follows_alarm_messages() {
        let (sink, _queue) = fault_channel();
        let output = SimOutput::new();
        let alarm = Alarm::new(output.clone());
        let status = alarm.status();
        let mb = spawn(alarm, sink);
        assert!(!output.is_on());

        mb.send(AlarmMessage { alarm: true }).await.unwrap();
        assert!(eventually(|| output.is_on()).await);
        assert!(status.enabled());

        mb.send(AlarmMessage { alarm: false }).await.unwrap();
        assert!(eventually(|| !output.is_on()).await);
        assert!(!status.enabled());
    }

    #[tokio::test]
    async fn shutdown_silences_the_alarm() {
        let (sink, _queue) = fault_channel();
        let output = SimOutput::new();
        let alarm = Alarm::new(output.clone());
        let status = alarm.status();
        let mb = spawn(alarm, sink);

        mb.send(AlarmMessage { alarm: true }).await.unwrap();
        mb.shutdown().await;
        assert!(!output.is_on());
        assert!(!status.enabled());
        assert!(mb.send(AlarmMessage { alarm: true }).await.is_err());
    }

    #[tokio::test]
    async fn driver_failure_is_a_fault() {
        let (sink, mut queue) = fault_channel();
        let output = SimOutput::new();
        output.set_failing(true);
        let mb = spawn(Alarm::new(output), sink);

        mb.send(AlarmMessage { alarm: true }).await.unwrap();
        let fault = queue.recv().await.unwrap();
        assert!(matches!(fault, Fault::Actuator { actor: "alarm", .. }));
    }
}

use std::collections::BTreeMap;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::actor::Actor;
use crate::fault::Fault;
use crate::hardware::Output;

pub type Leds = BTreeMap<String, bool>;

#[derive(Debug)]
pub enum DashboardMessage {
    /// Partial update, merged into the current state.
    Update(Leds),
    Leds(oneshot::Sender<Leds>),
}

impl DashboardMessage {
    pub fn update<K: Into<String>>(leds: impl IntoIterator<Item = (K, bool)>) -> Self {
        DashboardMessage::Update(leds.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Condition indicators. Each condition name may be bound to one output.
pub struct Dashboard {
    leds: Leds,
    outputs: BTreeMap<String, Box<dyn Output>>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self { leds: Leds::new(), outputs: BTreeMap::new() }
    }

    /// Binds `output` to `name`, replacing any previous binding.
    pub fn register_handler(&mut self, name: impl Into<String>, output: Box<dyn Output>) {
        let name = name.into();
        if self.outputs.insert(name.clone(), output).is_some() {
            warn!(led = %name, "dashboard: handler replaced");
        }
    }

    fn merge(&mut self, update: Leds) {
        for (name, on) in update {
            if !self.outputs.contains_key(&name) {
                warn!(led = %name, "dashboard: no handler registered");
            }
            self.leds.insert(name, on);
        }
    }

    fn refresh(&mut self) -> Result<(), Fault> {
        for (name, output) in self.outputs.iter_mut() {
            let on = self.leds.get(name).copied().unwrap_or(false);
            output
                .set(on)
                .map_err(|e| Fault::actuator(Self::NAME, e.context(format!("led {}", name))))?;
        }
        debug!(leds = ?self.leds, "dashboard refreshed");
        Ok(())
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for Dashboard {
    type Message = DashboardMessage;
    const NAME: &'static str = "dashboard";

    async fn handle(&mut self, msg: DashboardMessage) -> Result<(), Fault> {
        match msg {
            DashboardMessage::Update(update) => {
                self.merge(update);
                self.refresh()
            }
            DashboardMessage::Leds(reply) => {
                let _ = reply.send(self.leds.clone());
                Ok(())
            }
        }
    }

    async fn on_shutdown(&mut self) -> Result<(), Fault> {
        for on in self.leds.values_mut() {
            *on = false;
        }
        self.refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{spawn, Mailbox};
    use crate::fault::fault_channel;
    use crate::hardware::sim::SimOutput;

    fn dashboard() -> (Mailbox<DashboardMessage>, SimOutput, SimOutput) {
        let (sink, _queue) = fault_channel();
        let aaa = SimOutput::named("AAA");
        let bbb = SimOutput::named("BBB");
        let mut d = Dashboard::new();
        d.register_handler("AAA", Box::new(aaa.clone()));
        d.register_handler("BBB", Box::new(bbb.clone()));
        (spawn(d, sink), aaa, bbb)
    }

    #[tokio::test]
    async fn updates_are_merged() {
        let (mb, aaa, bbb) = dashboard();
        assert!(!aaa.is_on() && !bbb.is_on());

        mb.send(DashboardMessage::update([("AAA", true)])).await.unwrap();
        mb.ask(DashboardMessage::Leds).await.unwrap();
        assert!(aaa.is_on());
        assert!(!bbb.is_on());

        mb.send(DashboardMessage::update([("BBB", true)])).await.unwrap();
        let leds = mb.ask(DashboardMessage::Leds).await.unwrap();
        assert!(aaa.is_on(), "AAA must survive an update that does not mention it");
        assert!(bbb.is_on());
        assert_eq!(leds.get("AAA"), Some(&true));

        mb.send(DashboardMessage::update([("BBB", false)])).await.unwrap();
        mb.ask(DashboardMessage::Leds).await.unwrap();
        assert!(aaa.is_on());
        assert!(!bbb.is_on());

        mb.send(DashboardMessage::update([("BBB", false), ("AAA", false)])).await.unwrap();
        mb.ask(DashboardMessage::Leds).await.unwrap();
        assert!(!aaa.is_on());
        assert!(!bbb.is_on());
    }

    #[tokio::test]
    async fn unregistered_conditions_are_kept_but_not_driven() {
        let (mb, aaa, _bbb) = dashboard();
        mb.send(DashboardMessage::update([("CCC", true)])).await.unwrap();
        let leds = mb.ask(DashboardMessage::Leds).await.unwrap();
        assert_eq!(leds.get("CCC"), Some(&true));
        assert!(!aaa.is_on());
    }

    #[tokio::test]
    async fn shutdown_turns_everything_off() {
        let (mb, aaa, bbb) = dashboard();
        mb.send(DashboardMessage::update([("AAA", true), ("BBB", true)])).await.unwrap();
        mb.ask(DashboardMessage::Leds).await.unwrap();
        assert!(aaa.is_on() && bbb.is_on());

        mb.shutdown().await;
        assert!(!aaa.is_on());
        assert!(!bbb.is_on());
        assert!(mb.ask(DashboardMessage::Leds).await.is_err());
    }

    #[tokio::test]
    async fn led_driver_failure_is_a_fault() {
        let (sink, mut queue) = fault_channel();
        let led = SimOutput::named("AAA");
        led.set_failing(true);
        let mut d = Dashboard::new();
        d.register_handler("AAA", Box::new(led));
        let mb = spawn(d, sink);

        mb.send(DashboardMessage::update([("AAA", true)])).await.unwrap();
        let fault = queue.recv().await.unwrap();
        assert!(matches!(fault, Fault::Actuator { actor: "dashboard", .. }));
    }
}

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::actor::{Actor, ActorError};
use crate::fault::Fault;
use crate::hardware::Switch;

pub const POLL_PERIOD: Duration = Duration::from_millis(100);

/// What the engage switch toggles.
pub trait Engageable: Send + Sync + 'static {
    fn enable(&self) -> impl Future<Output = Result<(), ActorError>> + Send;
    fn disable(&self) -> impl Future<Output = Result<(), ActorError>> + Send;
}

/// Polls the engage switch and forwards changes to the target.
/// The switch must always be readable: a read error is a fault.
pub struct Control<R, T> {
    switch: R,
    target: T,
    state: bool,
}

impl<R: Switch + 'static, T: Engageable> Control<R, T> {
    pub fn new(switch: R, target: T) -> Self {
        Self { switch, target, state: false }
    }

    async fn poll(&mut self) -> Result<(), Fault> {
        let value = self.switch.value().map_err(|e| Fault::sensor(Self::NAME, e))?;
        if value == self.state {
            return Ok(());
        }
        let result = if value {
            warn!("engaging the pilot");
            self.target.enable().await
        } else {
            warn!("disengaging the pilot");
            self.target.disable().await
        };
        result.map_err(|e| Fault::downstream(Self::NAME, e))?;
        self.state = value;
        Ok(())
    }
}

impl<R: Switch + 'static, T: Engageable> Actor for Control<R, T> {
    type Message = Infallible;
    const NAME: &'static str = "control";

    fn idle_timeout(&self) -> Option<Duration> {
        Some(POLL_PERIOD)
    }

    async fn handle(&mut self, msg: Infallible) -> Result<(), Fault> {
        match msg {}
    }

    async fn on_idle(&mut self) -> Result<(), Fault> {
        self.poll().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::spawn;
    use crate::fault::fault_channel;
    use crate::hardware::sim::SimSwitch;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Target {
        on: Arc<AtomicBool>,
        calls: Arc<AtomicU32>,
    }

    impl Engageable for Target {
        async fn enable(&self) -> Result<(), ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.on.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn disable(&self) -> Result<(), ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.on.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn follows_the_switch() {
        let (sink, _queue) = fault_channel();
        let switch = SimSwitch::new(false);
        let target = Target::default();
        let mb = spawn(Control::new(switch.clone(), target.clone()), sink);

        switch.set(true);
        tokio::time::sleep(POLL_PERIOD * 3).await;
        assert!(target.on.load(Ordering::SeqCst));

        switch.set(false);
        tokio::time::sleep(POLL_PERIOD * 3).await;
        assert!(!target.on.load(Ordering::SeqCst));
        // one call per edge, not per poll
        assert_eq!(target.calls.load(Ordering::SeqCst), 2);
        mb.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_leaves_the_target_alone() {
        let (sink, _queue) = fault_channel();
        let switch = SimSwitch::new(true);
        let target = Target::default();
        let mb = spawn(Control::new(switch.clone(), target.clone()), sink);
        tokio::time::sleep(POLL_PERIOD * 3).await;
        assert!(target.on.load(Ordering::SeqCst));

        mb.shutdown().await;
        switch.set(false);
        tokio::time::sleep(POLL_PERIOD * 5).await;
        assert!(target.on.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn unreadable_switch_is_a_fault() {
        let (sink, mut queue) = fault_channel();
        let switch = SimSwitch::new(false);
        switch.set_failing(true);
        let _mb = spawn(Control::new(switch, Target::default()), sink);
        let fault = queue.recv().await.unwrap();
        assert!(matches!(fault, Fault::Sensor { actor: "control", .. }));
    }
}

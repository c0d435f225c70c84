//! Mailbox actors.
//!
//! Every stateful component runs as one task draining a private, bounded
//! mailbox one message at a time. Senders wait until the mailbox has room,
//! so a stalled receiver back-pressures whoever feeds it.
//!
//! Shutdown is a handshake: [`Mailbox::shutdown`] queues a shutdown request
//! behind every message already sent and waits until the actor has run
//! [`Actor::on_shutdown`] (its safe-state actuation) and closed its mailbox.
//! Once it returns the actor accepts nothing more.
//!
//! An error returned by a handler, or a panic, ends the task and is reported
//! on the shared [`FaultSink`].

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::fault::{Fault, FaultSink};

/// Closest thing to a rendezvous channel tokio offers.
const MAILBOX_CAPACITY: usize = 1;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ActorError {
    #[error("{0} is stopped")]
    Stopped(&'static str),
    #[error("{0} dropped the reply")]
    NoReply(&'static str),
}

pub trait Actor: Send + 'static {
    type Message: Send + 'static;

    const NAME: &'static str;

    /// How long to wait for a message before `on_idle` runs; `None` waits forever.
    fn idle_timeout(&self) -> Option<Duration> {
        None
    }

    fn handle(&mut self, msg: Self::Message) -> impl Future<Output = Result<(), Fault>> + Send;

    fn on_idle(&mut self) -> impl Future<Output = Result<(), Fault>> + Send {
        async { Ok(()) }
    }

    /// Final safe-state actuation, run before the shutdown is acknowledged.
    fn on_shutdown(&mut self) -> impl Future<Output = Result<(), Fault>> + Send {
        async { Ok(()) }
    }
}

enum Envelope<M> {
    Message(M),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running actor.
pub struct Mailbox<M> {
    name: &'static str,
    tx: mpsc::Sender<Envelope<M>>,
}

impl<M> Clone for Mailbox<M> {
    fn clone(&self) -> Self {
        Self { name: self.name, tx: self.tx.clone() }
    }
}

impl<M> std::fmt::Debug for Mailbox<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("name", &self.name)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<M: Send + 'static> Mailbox<M> {
    /// Waits until the actor's mailbox accepts `msg`.
    pub async fn send(&self, msg: M) -> Result<(), ActorError> {
        self.tx
            .send(Envelope::Message(msg))
            .await
            .map_err(|_| ActorError::Stopped(self.name))
    }

    /// Round trip: `make` wraps the reply sender into a message.
    pub async fn ask<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> M) -> Result<R, ActorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| ActorError::NoReply(self.name))
    }

    /// Asks the actor to stop and waits for the acknowledgement.
    /// Returns immediately if it is already stopped.
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Envelope::Shutdown(ack_tx)).await.is_err() {
            debug!(actor = self.name, "shutdown requested on a stopped actor");
            return;
        }
        // A dropped sender means the actor faulted while shutting down;
        // the fault went to the supervisor.
        let _ = ack_rx.await;
    }
}

/// Starts `actor` on its own task. Its failures go to `faults`.
pub fn spawn<A: Actor>(actor: A, faults: FaultSink) -> Mailbox<A::Message> {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let task = tokio::spawn(run(actor, rx));
    tokio::spawn(async move {
        match task.await {
            Ok(Ok(())) => debug!(actor = A::NAME, "task finished"),
            Ok(Err(fault)) => faults.report(fault),
            Err(e) if e.is_panic() => faults.report(Fault::panicked(A::NAME, e.into_panic())),
            Err(_) => debug!(actor = A::NAME, "task cancelled"),
        }
    });
    Mailbox { name: A::NAME, tx }
}

async fn run<A: Actor>(mut actor: A, mut rx: mpsc::Receiver<Envelope<A::Message>>) -> Result<(), Fault> {
    info!(actor = A::NAME, "started");
    loop {
        let next = match actor.idle_timeout() {
            Some(period) => match tokio::time::timeout(period, rx.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    actor.on_idle().await?;
                    continue;
                }
            },
            None => rx.recv().await,
        };

        match next {
            Some(Envelope::Message(msg)) => actor.handle(msg).await?,
            Some(Envelope::Shutdown(ack)) => {
                actor.on_shutdown().await?;
                rx.close();
                let _ = ack.send(());
                info!(actor = A::NAME, "shut down");
                return Ok(());
            }
            None => {
                // Every handle is gone: nobody can ask for a shutdown any more.
                info!(actor = A::NAME, "all handles dropped, shutting down");
                actor.on_shutdown().await?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::fault_channel;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    enum Msg {
        Push(u32),
        Get(oneshot::Sender<Vec<u32>>),
        Boom,
        Fail,
    }

    struct Recorder {
        seen: Vec<u32>,
        stopped: Arc<Mutex<bool>>,
        idles: Arc<Mutex<u32>>,
        idle: Option<Duration>,
    }

    impl Actor for Recorder {
        type Message = Msg;
        const NAME: &'static str = "recorder";

        fn idle_timeout(&self) -> Option<Duration> {
            self.idle
        }

        async fn handle(&mut self, msg: Msg) -> Result<(), Fault> {
            match msg {
                Msg::Push(v) => self.seen.push(v),
                Msg::Get(reply) => {
                    let _ = reply.send(self.seen.clone());
                }
                Msg::Boom => panic!("boom"),
                Msg::Fail => return Err(Fault::actuator(Self::NAME, anyhow::anyhow!("driver gone"))),
            }
            Ok(())
        }

        async fn on_idle(&mut self) -> Result<(), Fault> {
            *self.idles.lock().unwrap() += 1;
            Ok(())
        }

        async fn on_shutdown(&mut self) -> Result<(), Fault> {
            *self.stopped.lock().unwrap() = true;
            Ok(())
        }
    }

    fn recorder(idle: Option<Duration>) -> (Recorder, Arc<Mutex<bool>>, Arc<Mutex<u32>>) {
        let stopped = Arc::new(Mutex::new(false));
        let idles = Arc::new(Mutex::new(0));
        let r = Recorder { seen: vec![], stopped: stopped.clone(), idles: idles.clone(), idle };
        (r, stopped, idles)
    }

    #[tokio::test]
    async fn messages_are_processed_in_order() {
        let (sink, _queue) = fault_channel();
        let (r, _, _) = recorder(None);
        let mb = spawn(r, sink);
        for v in 0..20 {
            mb.send(Msg::Push(v)).await.unwrap();
        }
        let seen = mb.ask(Msg::Get).await.unwrap();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn shutdown_is_acknowledged_and_final() {
        let (sink, _queue) = fault_channel();
        let (r, stopped, _) = recorder(None);
        let mb = spawn(r, sink);
        mb.send(Msg::Push(1)).await.unwrap();
        mb.shutdown().await;
        assert!(*stopped.lock().unwrap());
        assert!(matches!(mb.send(Msg::Push(2)).await, Err(ActorError::Stopped("recorder"))));
        // second shutdown is a no-op
        mb.shutdown().await;
    }

    #[tokio::test]
    async fn handler_errors_are_reported_as_faults() {
        let (sink, mut queue) = fault_channel();
        let (r, _, _) = recorder(None);
        let mb = spawn(r, sink);
        mb.send(Msg::Fail).await.unwrap();
        let fault = queue.recv().await.unwrap();
        assert!(matches!(fault, Fault::Actuator { actor: "recorder", .. }));
        // the task is gone, shutdown must not hang
        mb.shutdown().await;
    }

    #[tokio::test]
    async fn panics_are_reported_as_faults() {
        let (sink, mut queue) = fault_channel();
        let (r, _, _) = recorder(None);
        let mb = spawn(r, sink);
        mb.send(Msg::Boom).await.unwrap();
        let fault = queue.recv().await.unwrap();
        assert!(matches!(fault, Fault::Panicked { actor: "recorder", .. }));
        assert!(mb.ask(Msg::Get).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_fires_without_messages() {
        let (sink, _queue) = fault_channel();
        let (r, _, idles) = recorder(Some(Duration::from_millis(100)));
        let mb = spawn(r, sink);
        tokio::time::sleep(Duration::from_millis(350)).await;
        let n = *idles.lock().unwrap();
        assert!(n >= 3, "idle ran {n} times");
        mb.shutdown().await;
    }

    #[tokio::test]
    async fn dropping_every_handle_runs_shutdown() {
        let (sink, _queue) = fault_channel();
        let (r, stopped, _) = recorder(None);
        let mb = spawn(r, sink);
        mb.send(Msg::Push(1)).await.unwrap();
        drop(mb);
        for _ in 0..100 {
            if *stopped.lock().unwrap() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("actor never shut down");
    }
}

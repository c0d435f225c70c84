//! The pilot: holds the heading, runs the PID and decides whether the
//! steering may act on its output.
//!
//! Every processed message ends with the pilot telling the world about its
//! state: first the alarm, then the dashboard. If something downstream
//! stalls, the alarm has already been delivered.

pub mod heading;
mod state;

pub use state::Autopilot;

use std::time::Duration;

use helm_proto::{FixStatus, GpsFeedback, PilotInfo};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::actor::{self, Actor, ActorError, Mailbox};
use crate::alarm::AlarmMessage;
use crate::config::PilotConfig;
use crate::control::Engageable;
use crate::dashboard::{DashboardMessage, Leds};
use crate::fault::{Fault, FaultSink};
use crate::steering::SteeringMessage;

#[derive(Debug)]
pub enum PilotMessage {
    Enable,
    Disable,
    SetOffset(f64),
    Feedback(GpsFeedback),
    FixStatus(FixStatus),
    /// Something went wrong upstream (undecodable GPS input, ...).
    Error(String),
    GetInfo(oneshot::Sender<PilotInfo>),
}

pub struct Pilot {
    state: Autopilot,
    watchdog: Duration,

    alarm: Mailbox<AlarmMessage>,
    dashboard: Mailbox<DashboardMessage>,
    steering: Mailbox<SteeringMessage>,
}

impl Pilot {
    pub fn new(
        cfg: &PilotConfig,
        alarm: Mailbox<AlarmMessage>,
        dashboard: Mailbox<DashboardMessage>,
        steering: Mailbox<SteeringMessage>,
    ) -> Self {
        Self { state: Autopilot::new(cfg), watchdog: cfg.watchdog(), alarm, dashboard, steering }
    }

    pub fn start(self, faults: FaultSink) -> PilotHandle {
        PilotHandle { mailbox: actor::spawn(self, faults) }
    }

    async fn steer(&self, msg: SteeringMessage) -> Result<(), Fault> {
        self.steering.send(msg).await.map_err(|e| Fault::downstream(Self::NAME, e))
    }

    async fn tell_the_world(&self) -> Result<(), Fault> {
        self.alarm
            .send(AlarmMessage { alarm: self.state.alarm() })
            .await
            .map_err(|e| Fault::downstream(Self::NAME, e))?;
        let leds: Leds = self.state.leds().iter().map(|(led, on)| (led.name().to_string(), *on)).collect();
        self.dashboard
            .send(DashboardMessage::Update(leds))
            .await
            .map_err(|e| Fault::downstream(Self::NAME, e))
    }
}

impl Actor for Pilot {
    type Message = PilotMessage;
    const NAME: &'static str = "pilot";

    fn idle_timeout(&self) -> Option<Duration> {
        Some(self.watchdog)
    }

    async fn handle(&mut self, msg: PilotMessage) -> Result<(), Fault> {
        match msg {
            PilotMessage::Enable => self.state.enable(),
            PilotMessage::Disable => self.state.disable(),
            PilotMessage::SetOffset(degrees) => self.state.set_offset(degrees),
            PilotMessage::Feedback(fb) => {
                let steer = self.state.on_feedback(&fb);
                self.steer(steer).await?;
            }
            PilotMessage::FixStatus(fix) => self.state.on_fix_status(fix),
            PilotMessage::Error(err) => {
                warn!(error = %err, "upstream error");
                if let Some(steer) = self.state.on_error() {
                    self.steer(steer).await?;
                }
            }
            PilotMessage::GetInfo(reply) => {
                let _ = reply.send(self.state.info());
            }
        }
        self.tell_the_world().await
    }

    async fn on_idle(&mut self) -> Result<(), Fault> {
        debug!(timeout = ?self.watchdog, "watchdog expired");
        if let Some(steer) = self.state.on_watchdog() {
            self.steer(steer).await?;
            self.tell_the_world().await?;
        }
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<(), Fault> {
        self.state.on_shutdown();
        self.tell_the_world().await
    }
}

/// Entry points of a running pilot.
#[derive(Debug, Clone)]
pub struct PilotHandle {
    mailbox: Mailbox<PilotMessage>,
}

impl PilotHandle {
    pub async fn enable(&self) -> Result<(), ActorError> {
        self.mailbox.send(PilotMessage::Enable).await
    }

    pub async fn disable(&self) -> Result<(), ActorError> {
        self.mailbox.send(PilotMessage::Disable).await
    }

    pub async fn set_offset(&self, degrees: f64) -> Result<(), ActorError> {
        self.mailbox.send(PilotMessage::SetOffset(degrees)).await
    }

    pub async fn feedback(&self, fb: GpsFeedback) -> Result<(), ActorError> {
        self.mailbox.send(PilotMessage::Feedback(fb)).await
    }

    pub async fn fix_status(&self, fix: FixStatus) -> Result<(), ActorError> {
        self.mailbox.send(PilotMessage::FixStatus(fix)).await
    }

    pub async fn report_error(&self, err: impl Into<String>) -> Result<(), ActorError> {
        self.mailbox.send(PilotMessage::Error(err.into())).await
    }

    pub async fn info(&self) -> Result<PilotInfo, ActorError> {
        self.mailbox.ask(PilotMessage::GetInfo).await
    }

    pub async fn shutdown(&self) {
        self.mailbox.shutdown().await
    }
}

impl Engageable for PilotHandle {
    async fn enable(&self) -> Result<(), ActorError> {
        PilotHandle::enable(self).await
    }

    async fn disable(&self) -> Result<(), ActorError> {
        PilotHandle::disable(self).await
    }
}

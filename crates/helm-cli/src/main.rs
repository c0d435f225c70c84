use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::{error, info, warn};

use helm_gps::{GnssSource, GpsConfig, GpsEvent};
use helm_pilot::alarm::{Alarm, AlarmMessage};
use helm_pilot::config::{Backend, HardwareConfig, PilotConfig, TracerConfig};
use helm_pilot::control::Control;
use helm_pilot::dashboard::Dashboard;
use helm_pilot::hardware::sim::{SimOutput, SimStepper, SimSwitch};
use helm_pilot::hardware::sysfs::{SysfsPin, SysfsStepper};
use helm_pilot::hardware::{Output, Stepper, Switch};
use helm_pilot::steering::{Steering, SteeringMessage};
use helm_pilot::tracer::{Tracer, TracerMessage};
use helm_pilot::{doctor as pilot_doctor, fault_channel, spawn, Mailbox, Pilot, PilotHandle, Supervisor};
use helm_proto::Point;

#[derive(Debug, Parser)]
#[command(name = "helm", version, about = "helm - GPS-course autopilot for small boats")]
struct Cli {
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration and the wiring.
    Doctor,
    /// Hold the course until Ctrl-C or a fault.
    Run,
    /// Turn the steering by a fixed amount, for calibration.
    Steer {
        #[arg(allow_negative_numbers = true)]
        degrees: f64,
    },
    /// Drive the alarm output, for wiring checks.
    Alarm { level: Level },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Level {
    On,
    Off,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    pilot: PilotConfig,
    gps: GpsConfig,
    hardware: HardwareConfig,
    tracer: TracerConfig,
}

fn load_config(path: &Path) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run => match cfg.hardware.backend {
            Backend::Sim => autopilot(&cfg, sim_rig(&cfg.hardware)).await?,
            Backend::Sysfs => autopilot(&cfg, sysfs_rig(&cfg.hardware)?).await?,
        },
        Command::Steer { degrees } => {
            let (_, max) = cfg.pilot.pid_output_limits();
            anyhow::ensure!(degrees.abs() <= max, "steer: {} deg is beyond the {} deg limit", degrees, max);
            match cfg.hardware.backend {
                Backend::Sim => steer(sim_rig(&cfg.hardware), degrees).await?,
                Backend::Sysfs => steer(sysfs_rig(&cfg.hardware)?, degrees).await?,
            }
        }
        Command::Alarm { level } => {
            let output: Box<dyn Output> = match cfg.hardware.backend {
                Backend::Sim => Box::new(SimOutput::named("alarm")),
                Backend::Sysfs => Box::new(SysfsPin::output(&cfg.hardware.gpio_root, cfg.hardware.alarm_pin)?),
            };
            alarm(output, level).await?;
        }
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    pilot_doctor::check_pilot(&cfg.pilot)?;
    pilot_doctor::check_hardware(&cfg.hardware)?;
    helm_gps::config::check_gps(&cfg.gps)?;
    if cfg.tracer.max_points == 0 {
        warn!("tracer.max_points = 0, no track will be kept");
    }
    info!("doctor: OK");
    Ok(())
}

/// Everything the actors drive, for one backend.
struct Rig<S> {
    alarm: Box<dyn Output>,
    /// Second handle on the alarm line, owned by the supervisor.
    failsafe_alarm: Box<dyn Output>,
    switch: Box<dyn Switch>,
    stepper: S,
    torque: Box<dyn Output>,
    leds: Vec<(String, Box<dyn Output>)>,
}

fn sim_rig(hw: &HardwareConfig) -> Rig<SimStepper> {
    info!("hardware: sim backend, engage switch is on");
    let alarm = SimOutput::named("alarm");
    let stepper = SimStepper::paced();
    let leds = hw
        .leds
        .keys()
        .map(|name| {
            let out: Box<dyn Output> = Box::new(SimOutput::named(name));
            (name.clone(), out)
        })
        .collect();
    Rig {
        failsafe_alarm: Box::new(alarm.clone()),
        alarm: Box::new(alarm),
        switch: Box::new(SimSwitch::new(true)),
        torque: Box::new(stepper.torque()),
        stepper,
        leds,
    }
}

fn sysfs_rig(hw: &HardwareConfig) -> Result<Rig<SysfsStepper>> {
    let root = hw.gpio_root.as_path();
    let alarm = SysfsPin::output(root, hw.alarm_pin).context("alarm pin")?;
    let stepper = SysfsStepper::new(root, hw.motor_sleep_pin, hw.motor_dir_pin).context("stepper pins")?;
    let mut leds = Vec::with_capacity(hw.leds.len());
    for (name, pin) in &hw.leds {
        let out = SysfsPin::output(root, *pin).with_context(|| format!("led {} pin", name))?;
        leds.push((name.clone(), Box::new(out) as Box<dyn Output>));
    }
    Ok(Rig {
        failsafe_alarm: Box::new(alarm.clone()),
        alarm: Box::new(alarm),
        switch: Box::new(SysfsPin::input(root, hw.switch_pin).context("switch pin")?),
        torque: Box::new(stepper.torque()),
        stepper,
        leds,
    })
}

async fn autopilot<S: Stepper>(cfg: &Config, rig: Rig<S>) -> Result<()> {
    info!("run: starting");
    let (sink, queue) = fault_channel();

    let alarm = spawn(Alarm::new(rig.alarm), sink.clone());
    let mut dashboard = Dashboard::new();
    for (name, out) in rig.leds {
        dashboard.register_handler(name, out);
    }
    let dashboard = spawn(dashboard, sink.clone());
    let steering = spawn(Steering::new(rig.stepper), sink.clone());
    let tracer = spawn(Tracer::new(cfg.tracer.max_points), sink.clone());
    let pilot = Pilot::new(&cfg.pilot, alarm.clone(), dashboard.clone(), steering.clone()).start(sink.clone());
    let control = spawn(Control::new(rig.switch, pilot.clone()), sink);
    let mut supervisor = Supervisor::new(queue, rig.failsafe_alarm, rig.torque);

    let src = GnssSource::from_config(&cfg.gps)?;
    let mut gps = tokio::spawn(forward_gps(src, pilot.clone(), tracer.clone()));

    tokio::select! {
        fault = supervisor.watch() => {
            // Leave the fail-safe state in place: no orderly shutdown.
            gps.abort();
            return match fault {
                Some(fault) => Err(anyhow::Error::new(fault).context("autopilot stopped")),
                None => Err(anyhow::anyhow!("fault queue closed unexpectedly")),
            };
        }
        res = &mut gps => {
            let err = match res {
                Ok(Ok(())) => anyhow::anyhow!("gps reader stopped"),
                Ok(Err(e)) => e.context("gps reader"),
                Err(e) => anyhow::Error::new(e).context("gps reader task"),
            };
            error!("{:#}", err);
            supervisor.failsafe();
            return Err(err);
        }
        res = tokio::signal::ctrl_c() => {
            res.context("wait for ctrl-c")?;
            info!("ctrl-c: shutting down");
        }
    }

    control.shutdown().await;
    gps.abort();
    if let Ok(info) = pilot.info().await {
        info!(?info, "pilot state at shutdown");
    }
    pilot.shutdown().await;
    tracer.shutdown().await;
    steering.shutdown().await;
    dashboard.shutdown().await;
    alarm.shutdown().await;
    info!("run: stopped");
    Ok(())
}

/// Feeds decoded GPS events to the pilot, and valid positions to the tracer.
async fn forward_gps(mut src: GnssSource, pilot: PilotHandle, tracer: Mailbox<TracerMessage>) -> Result<()> {
    loop {
        match src.next_event().await? {
            GpsEvent::Feedback(fb) => {
                let point = fb.validity.then(|| Point {
                    latitude: fb.latitude,
                    longitude: fb.longitude,
                    ts_unix_ms: (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64,
                });
                pilot.feedback(fb).await?;
                if let Some(point) = point {
                    tracer.send(TracerMessage::Add(point)).await?;
                }
            }
            GpsEvent::Fix(fix) => pilot.fix_status(fix).await?,
            GpsEvent::Error(err) => {
                warn!(error = %err, "undecodable gps input");
                pilot.report_error(err).await?;
            }
        }
    }
}

async fn steer<S: Stepper>(rig: Rig<S>, degrees: f64) -> Result<()> {
    let (sink, mut queue) = fault_channel();
    let steering = spawn(Steering::new(rig.stepper), sink);
    steering
        .send(SteeringMessage { correction_degrees: degrees, stay_engaged: false })
        .await?;
    steering.shutdown().await;
    drop(steering);
    if let Some(fault) = queue.recv().await {
        return Err(anyhow::Error::new(fault).context("steer"));
    }
    info!(degrees, "steer: done");
    Ok(())
}

async fn alarm(output: Box<dyn Output>, level: Level) -> Result<()> {
    let (sink, mut queue) = fault_channel();
    let alarm = spawn(Alarm::new(output), sink);
    let on = matches!(level, Level::On);
    alarm.send(AlarmMessage { alarm: on }).await?;
    if on {
        info!("alarm: on, Ctrl-C to stop");
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("wait for ctrl-c")?,
            Some(fault) = queue.recv() => return Err(anyhow::Error::new(fault).context("alarm")),
        }
    }
    alarm.shutdown().await;
    drop(alarm);
    if let Some(fault) = queue.recv().await {
        return Err(anyhow::Error::new(fault).context("alarm"));
    }
    Ok(())
}

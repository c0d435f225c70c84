use std::time::Duration;

use helm_pilot::alarm::Alarm;
use helm_pilot::config::PilotConfig;
use helm_pilot::control::{Control, POLL_PERIOD};
use helm_pilot::dashboard::{Dashboard, DashboardMessage};
use helm_pilot::hardware::sim::{SimOutput, SimStepper, SimSwitch};
use helm_pilot::steering::Steering;
use helm_pilot::{fault_channel, spawn, Fault, Pilot, Supervisor};
use helm_proto::{FixStatus, GpsFeedback, Led};

fn sample(heading: f64) -> GpsFeedback {
    GpsFeedback {
        heading,
        validity: true,
        speed: 5.5,
        latitude: 48.39,
        longitude: -4.48,
        date: "181026".into(),
        time: "101500".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn switch_engages_and_disengages_the_pilot() {
    let (sink, _queue) = fault_channel();

    let alarm_out = SimOutput::named("alarm");
    let alarm = Alarm::new(alarm_out.clone());
    let alarm_status = alarm.status();
    let alarm = spawn(alarm, sink.clone());

    let mut dashboard = Dashboard::new();
    let leds: Vec<(Led, SimOutput)> = Led::ALL.into_iter().map(|l| (l, SimOutput::named(l.name()))).collect();
    for (led, out) in &leds {
        dashboard.register_handler(led.name(), Box::new(out.clone()));
    }
    let dashboard = spawn(dashboard, sink.clone());

    let stepper = SimStepper::new();
    let steering = spawn(Steering::new(stepper.clone()), sink.clone());

    let cfg = PilotConfig::default();
    let pilot = Pilot::new(&cfg, alarm, dashboard.clone(), steering).start(sink.clone());

    let switch = SimSwitch::new(false);
    let control = spawn(Control::new(switch.clone(), pilot.clone()), sink.clone());

    pilot.fix_status(FixStatus::Fix).await.unwrap();
    switch.set(true);
    tokio::time::sleep(POLL_PERIOD * 2).await;
    assert!(pilot.info().await.unwrap().enabled);

    pilot.feedback(sample(200.0)).await.unwrap();
    pilot.feedback(sample(203.0)).await.unwrap();
    let info = pilot.info().await.unwrap();
    assert_eq!(info.set_point, 200.0);
    assert!(!alarm_status.enabled());

    // a drifting boat gets steered while the alarm stays quiet
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!stepper.moves().is_empty());

    // way off course: latch the alarm
    pilot.feedback(sample(300.0)).await.unwrap();
    pilot.info().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(alarm_status.enabled());
    assert!(alarm_out.is_on());
    let lit = dashboard.ask(DashboardMessage::Leds).await.unwrap();
    assert_eq!(lit.get(Led::HeadingErrorOutOfBounds.name()), Some(&true));
    assert!(!stepper.energized());

    // switch off: alarm resets
    switch.set(false);
    tokio::time::sleep(POLL_PERIOD * 2).await;
    let info = pilot.info().await.unwrap();
    assert!(!info.enabled);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!alarm_status.enabled());

    // orderly shutdown, upstream first
    control.shutdown().await;
    pilot.shutdown().await;
    dashboard.shutdown().await;
    for (led, out) in &leds {
        assert!(!out.is_on(), "{led} still lit after shutdown");
    }
    assert!(pilot.info().await.is_err());
}

#[tokio::test]
async fn actuator_fault_reaches_the_supervisor() {
    let (sink, queue) = fault_channel();

    let alarm_out = SimOutput::named("alarm");
    let alarm = spawn(Alarm::new(alarm_out.clone()), sink.clone());
    let dashboard = spawn(Dashboard::new(), sink.clone());
    let stepper = SimStepper::new();
    let steering = spawn(Steering::new(stepper.clone()), sink.clone());
    let pilot = Pilot::new(&PilotConfig::default(), alarm, dashboard, steering).start(sink);

    let mut supervisor = Supervisor::new(queue, Box::new(alarm_out.clone()), Box::new(stepper.torque()));

    pilot.enable().await.unwrap();
    pilot.feedback(sample(10.0)).await.unwrap();
    stepper.set_failing(true);
    pilot.feedback(sample(14.0)).await.unwrap();

    let fault = tokio::time::timeout(Duration::from_secs(5), supervisor.watch())
        .await
        .expect("supervisor saw nothing")
        .expect("fault queue closed");
    assert!(matches!(fault, Fault::Actuator { actor: "steering", .. }));
    assert!(alarm_out.is_on());
    assert!(!stepper.energized());
}

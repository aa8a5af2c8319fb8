//! WasherService end-to-end runs against the mock hardware.

use std::time::Duration;

use endowasher::adapters::history::JsonHistoryStore;
use endowasher::adapters::time::ManualClock;
use endowasher::app::commands::RunRequest;
use endowasher::app::events::WashEvent;
use endowasher::app::ports::{Clock, Confirmation, RunPorts};
use endowasher::app::record::{PhaseOutcome, RunStatus};
use endowasher::config::WasherConfig;
use endowasher::error::ValidationError;
use endowasher::fsm::PhaseState;
use endowasher::phase::Phase;
use endowasher::pins::PinRole;

use crate::mock_hw::{FixedGate, Hook, MockIo, OfferLog, run_with, service};

fn phases_of(record: &endowasher::app::record::RunRecord) -> Vec<(Phase, PhaseOutcome)> {
    record.phases.iter().map(|e| (e.name, e.outcome)).collect()
}

#[test]
fn wash_and_rinse_succeed() {
    let io = MockIo::full_tanks();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());
    let request = RunRequest::new("OP-0001", "SC-0042")
        .with_phase(Phase::DetergentWash, 5)
        .with_phase(Phase::Rinsing, 5);

    let mut events = Vec::new();
    let (out, sinks) = run_with(&mut svc, &request, Confirmation::Proceed, |e| {
        events.push(e.clone());
    });
    let record = out.unwrap();

    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(
        phases_of(&record),
        [
            (Phase::DetergentWash, PhaseOutcome::Success),
            (Phase::Rinsing, PhaseOutcome::Success)
        ]
    );
    assert!(record.error.is_none());
    assert!(record.is_finished());
    assert_eq!(sinks.stored.len(), 1);
    assert_eq!(sinks.offered.len(), 1);

    assert!(io.all_power_off());
    assert!(!io.output(PinRole::StatusLed));
    assert!(!io.output(PinRole::ErrorLed));
    // Completion pattern: three buzzer pulses.
    let beeps = io
        .writes()
        .iter()
        .filter(|w| w.role == PinRole::Buzzer && w.high)
        .count();
    assert_eq!(beeps, 3);
    assert_eq!(events.last(), Some(&WashEvent::RunFinished(RunStatus::Success)));
}

#[test]
fn stop_during_disinfection_treat() {
    let io = MockIo::full_tanks();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());
    let cancel = svc.cancel_flag();
    let request = RunRequest::new("OP", "SC").with_phase(Phase::Disinfecting, 10);

    let mut treat_started = None;
    let (out, sinks) = run_with(&mut svc, &request, Confirmation::Proceed, |e| match e {
        WashEvent::StepEntered {
            state: PhaseState::Treating,
            ..
        } => treat_started = Some(clock.now()),
        WashEvent::TreatCountdown { .. } => {
            if let Some(t0) = treat_started {
                if clock.now() - t0 >= Duration::from_secs(2) {
                    cancel.request();
                }
            }
        }
        _ => {}
    });
    let record = out.unwrap();

    assert_eq!(record.status, RunStatus::StoppedByUser);
    assert_eq!(phases_of(&record), [(Phase::Disinfecting, PhaseOutcome::Aborted)]);
    assert!(record.error.is_none());
    for role in [
        PinRole::DisinfectInlet,
        PinRole::DisinfectDrain,
        PinRole::DisinfectPump,
    ] {
        assert!(!io.output(role), "{role} left on");
    }
    assert!(io.all_power_off());
    // No error signalling and no report for a user stop.
    assert!(!io.output(PinRole::ErrorLed));
    assert!(!io.was_driven_high(PinRole::Buzzer));
    assert!(sinks.offered.is_empty());
    assert_eq!(sinks.stored.len(), 1);
    assert!(!svc.cancel_flag().is_requested());
}

#[test]
fn stuck_water_sensor_only_warns() {
    let io = MockIo::new();
    io.set_level(PinRole::WaterLevelSensor, false);
    let clock = ManualClock::new();
    let mut config = WasherConfig::default();
    config.level_sensor.fill_timeout_secs = 2;
    let mut svc = service(&io, &clock, &config);
    let request = RunRequest::new("OP", "SC").with_phase(Phase::DetergentWash, 5);

    let mut warnings = Vec::new();
    let mut fill_done_at = None;
    let (out, _) = run_with(&mut svc, &request, Confirmation::Proceed, |e| {
        if e.is_warning() {
            warnings.push(e.to_string());
        }
        if let WashEvent::StepEntered {
            state: PhaseState::ReadyForAdditive,
            ..
        } = e
        {
            fill_done_at = Some(clock.now());
        }
    });
    let record = out.unwrap();

    assert_eq!(record.status, RunStatus::Success);
    assert_eq!(phases_of(&record), [(Phase::DetergentWash, PhaseOutcome::Success)]);
    assert_eq!(record.phases[0].warnings, 1);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Water level not reached"));
    let waited = fill_done_at.unwrap();
    assert!(waited >= Duration::from_secs(2) && waited <= Duration::from_millis(2100));
}

#[test]
fn phases_run_in_canonical_order() {
    let io = MockIo::full_tanks();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());
    let request = RunRequest::new("OP", "SC")
        .with_phase(Phase::AirFlush, 5)
        .with_phase(Phase::FinalRinse, 5)
        .with_phase(Phase::Rinsing, 5)
        .with_phase(Phase::Disinfecting, 5)
        .with_phase(Phase::DetergentWash, 5);

    let mut started = Vec::new();
    let (out, _) = run_with(&mut svc, &request, Confirmation::Proceed, |e| {
        if let WashEvent::PhaseStarted(p) = e {
            started.push(*p);
        }
    });
    let record = out.unwrap();
    assert_eq!(started, Phase::ALL);
    let names: Vec<Phase> = record.phases.iter().map(|e| e.name).collect();
    assert_eq!(names, Phase::ALL);
    assert_eq!(record.status, RunStatus::Success);
}

#[test]
fn stop_between_phases_skips_the_rest() {
    let io = MockIo::full_tanks();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());
    let cancel = svc.cancel_flag();
    let request = RunRequest::new("OP", "SC")
        .with_phase(Phase::Rinsing, 5)
        .with_phase(Phase::AirFlush, 5);

    let (out, _) = run_with(&mut svc, &request, Confirmation::Proceed, |e| {
        if let WashEvent::PhaseFinished {
            phase: Phase::Rinsing,
            ..
        } = e
        {
            cancel.request();
        }
    });
    let record = out.unwrap();
    assert_eq!(record.status, RunStatus::StoppedByUser);
    assert_eq!(phases_of(&record), [(Phase::Rinsing, PhaseOutcome::Success)]);
    assert!(!io.was_driven_high(PinRole::AirPump));
}

#[test]
fn hardware_fault_is_a_system_error() {
    let io = MockIo::full_tanks();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());
    let request = RunRequest::new("OP", "SC")
        .with_phase(Phase::Rinsing, 5)
        .with_phase(Phase::FinalRinse, 5);

    let fault_io = io.clone();
    let (out, sinks) = run_with(&mut svc, &request, Confirmation::Proceed, |e| {
        if let WashEvent::DrainCountdown { remaining_secs: 10, .. } = e {
            fault_io.fail_next_write();
        }
    });
    let record = out.unwrap();

    assert_eq!(record.status, RunStatus::SystemError);
    assert_eq!(phases_of(&record), [(Phase::Rinsing, PhaseOutcome::Error)]);
    assert_eq!(
        record.error.as_deref(),
        Some("pin write failed (drain valve)")
    );
    assert!(io.all_power_off());
    assert!(!io.output(PinRole::StatusLed));
    assert!(io.output(PinRole::ErrorLed));
    assert!(io.was_driven_high(PinRole::Buzzer));
    assert!(sinks.offered.is_empty());
    assert_eq!(sinks.stored[0].status, RunStatus::SystemError);
}

#[test]
fn failed_init_is_recorded() {
    let io = MockIo::full_tanks();
    io.fail_init();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());
    let request = RunRequest::new("OP", "SC").with_phase(Phase::Rinsing, 5);
    let (out, sinks) = run_with(&mut svc, &request, Confirmation::Proceed, |_| {});
    let record = out.unwrap();
    assert_eq!(record.status, RunStatus::SystemError);
    assert!(record.phases.is_empty());
    assert!(io.writes().is_empty());
    assert_eq!(sinks.stored.len(), 1);
}

#[test]
fn validation_errors_touch_no_pins() {
    let io = MockIo::full_tanks();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());

    let (out, sinks) = run_with(
        &mut svc,
        &RunRequest::new("OP", "SC"),
        Confirmation::Proceed,
        |_| {},
    );
    assert_eq!(out, Err(ValidationError::NoPhaseSelected));
    let (out, _) = run_with(
        &mut svc,
        &RunRequest::new("OP", "").with_phase(Phase::Rinsing, 5),
        Confirmation::Proceed,
        |_| {},
    );
    assert_eq!(out, Err(ValidationError::MissingScopeId));
    assert!(io.writes().is_empty());
    assert!(sinks.stored.is_empty());
}

#[test]
fn declined_detergent_fails_the_run() {
    let io = MockIo::full_tanks();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());
    let request = RunRequest::new("OP", "SC")
        .with_phase(Phase::DetergentWash, 5)
        .with_phase(Phase::Rinsing, 5);
    let (out, _) = run_with(&mut svc, &request, Confirmation::Declined, |_| {});
    let record = out.unwrap();
    assert_eq!(record.status, RunStatus::Error);
    assert_eq!(phases_of(&record), [(Phase::DetergentWash, PhaseOutcome::Error)]);
    assert!(io.output(PinRole::ErrorLed));
    assert!(io.all_power_off());
}

#[test]
fn records_land_in_the_history_store() {
    let dir = std::env::temp_dir().join(format!("endowasher-it-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let io = MockIo::full_tanks();
    let clock = ManualClock::new();
    let mut svc = service(&io, &clock, &WasherConfig::default());
    let mut store = JsonHistoryStore::new(&dir);
    let mut offered = Vec::new();
    let request = RunRequest::new("OP-9", "SC-9").with_phase(Phase::AirFlush, 5);
    let record = svc
        .run(
            &request,
            &mut RunPorts {
                events: &mut Hook(|_: &WashEvent| {}),
                gate: &mut FixedGate(Confirmation::Proceed),
                records: &mut store,
                reports: &mut OfferLog(&mut offered),
            },
        )
        .unwrap();

    let history = store.load().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].scope_id, "SC-9");
    assert_eq!(history[0].status, RunStatus::Success);
    assert!(dir.join(JsonHistoryStore::text_log_name(&record)).exists());
    assert_eq!(offered.len(), 1);

    std::fs::remove_dir_all(&dir).unwrap();
}

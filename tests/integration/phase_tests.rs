//! PhaseRunner tests: per-phase pin sequencing and the release-on-exit
//! guarantee under cancellation and injected faults.

use std::time::Duration;

use endowasher::adapters::time::ManualClock;
use endowasher::app::cancel::CancelFlag;
use endowasher::app::events::WashEvent;
use endowasher::app::ports::{Clock, Confirmation};
use endowasher::config::{FillTimeoutPolicy, WasherConfig};
use endowasher::error::HardwareFault;
use endowasher::fsm::{PhaseResult, PhaseRunner, PhaseState};
use endowasher::phase::{Phase, PhaseSetting};
use endowasher::pins::PinRole;

use crate::mock_hw::{FixedGate, Hook, MockIo};

struct Rig {
    io: MockIo,
    clock: ManualClock,
    cancel: CancelFlag,
    runner: PhaseRunner<MockIo, ManualClock>,
}

fn rig_with(io: MockIo, config: &WasherConfig) -> Rig {
    let clock = ManualClock::new();
    let cancel = CancelFlag::new();
    let mut runner = PhaseRunner::new(io.clone(), clock.clone(), cancel.clone(), config);
    runner.actuators_mut().initialize().unwrap();
    Rig {
        io,
        clock,
        cancel,
        runner,
    }
}

fn rig() -> Rig {
    rig_with(MockIo::full_tanks(), &WasherConfig::default())
}

fn assert_released(rig: &Rig, phase: Phase) {
    assert!(rig.io.all_power_off(), "valve or pump left on");
    assert!(!rig.io.output(PinRole::PhaseIndicator(phase)));
}

// ── Sequencing ────────────────────────────────────────────────

#[test]
fn rinsing_fills_then_treats_then_drains() {
    let mut rig = rig();
    let mut states = Vec::new();
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::Rinsing, 5),
            &mut Hook(|e: &WashEvent| {
                if let WashEvent::StepEntered { state, .. } = e {
                    states.push(*state);
                }
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();

    assert_eq!(report.result, PhaseResult::Completed);
    assert_eq!(report.warnings, 0);
    assert_eq!(
        states,
        [
            PhaseState::Filling,
            PhaseState::Treating,
            PhaseState::Draining,
            PhaseState::Done
        ]
    );
    assert_eq!(rig.runner.state(), PhaseState::Done);

    let io = &rig.io;
    let inlet_on = io.first_write(PinRole::InletValve, true).unwrap();
    let drain_closed = io.first_write(PinRole::DrainValve, false).unwrap();
    let pump_on = io.first_write(PinRole::WaterPump, true).unwrap();
    let inlet_off = io.first_write(PinRole::InletValve, false).unwrap();
    let pump_off = io.first_write(PinRole::WaterPump, false).unwrap();
    let drain_open = io.first_write(PinRole::DrainValve, true).unwrap();
    assert!(inlet_on < drain_closed && drain_closed < pump_on);
    assert!(pump_on < inlet_off && inlet_off < drain_open);
    assert!(pump_off < drain_open);

    // 0.4 s fill + 300 s treat + 60 s drain.
    assert_eq!(rig.clock.now(), Duration::from_millis(360_400));
    assert_released(&rig, Phase::Rinsing);
}

#[test]
fn final_rinse_circulates_during_treat() {
    let mut rig = rig();
    let probe = rig.io.clone();
    let mut pump_during_treat = Vec::new();
    rig.runner
        .run_phase(
            PhaseSetting::new(Phase::FinalRinse, 5),
            &mut Hook(|e: &WashEvent| {
                if matches!(e, WashEvent::TreatCountdown { .. }) {
                    pump_during_treat.push(probe.output(PinRole::WaterPump));
                }
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert_eq!(pump_during_treat.len(), 300);
    assert!(pump_during_treat.iter().all(|on| *on));
    assert_released(&rig, Phase::FinalRinse);
}

#[test]
fn other_phases_treat_with_pump_off() {
    let mut rig = rig();
    let probe = rig.io.clone();
    let mut pump_seen = false;
    rig.runner
        .run_phase(
            PhaseSetting::new(Phase::Rinsing, 5),
            &mut Hook(|e: &WashEvent| {
                if matches!(e, WashEvent::TreatCountdown { .. }) {
                    pump_seen |= probe.output(PinRole::WaterPump);
                }
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert!(!pump_seen);
}

#[test]
fn disinfecting_returns_through_its_own_drain() {
    let mut rig = rig();
    let probe = rig.io.clone();
    let mut during_return = Vec::new();
    let mut labels = Vec::new();
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::Disinfecting, 5),
            &mut Hook(|e: &WashEvent| match e {
                WashEvent::DrainCountdown { returning, .. } => {
                    assert!(*returning);
                    during_return.push((
                        probe.output(PinRole::DisinfectDrain),
                        probe.output(PinRole::DisinfectPump),
                        probe.output(PinRole::DrainValve),
                    ));
                    labels.push(e.to_string());
                }
                WashEvent::FillCountdown { .. } => labels.push(e.to_string()),
                _ => {}
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();

    assert!(report.succeeded());
    assert!(!during_return.is_empty());
    assert!(during_return.iter().all(|s| *s == (true, true, false)));
    assert!(labels.iter().any(|l| l.starts_with("D-FILL")));
    assert!(labels.contains(&"D-RETURN 60s".to_owned()));
    assert!(!rig.io.was_driven_high(PinRole::InletValve));
    assert!(!rig.io.was_driven_high(PinRole::DrainValve));
    assert_released(&rig, Phase::Disinfecting);
}

#[test]
fn air_flush_runs_only_the_air_pump() {
    let mut rig = rig();
    let probe = rig.io.clone();
    let mut ok = true;
    rig.runner
        .run_phase(
            PhaseSetting::new(Phase::AirFlush, 5),
            &mut Hook(|e: &WashEvent| {
                if matches!(e, WashEvent::TreatCountdown { .. }) {
                    ok &= probe.output(PinRole::AirPump);
                    ok &= PinRole::POWER
                        .iter()
                        .filter(|r| **r != PinRole::AirPump)
                        .all(|r| !probe.output(*r));
                }
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert!(ok);
    assert_eq!(rig.io.reads(), 0, "air flush never samples a level switch");
    assert_released(&rig, Phase::AirFlush);
}

#[test]
fn detergent_wash_waits_for_the_operator() {
    let mut rig = rig();
    let mut states = Vec::new();
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::DetergentWash, 5),
            &mut Hook(|e: &WashEvent| {
                if let WashEvent::StepEntered { state, .. } = e {
                    states.push(*state);
                }
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert!(report.succeeded());
    assert_eq!(states[1], PhaseState::ReadyForAdditive);
}

// ── Fill timeouts ─────────────────────────────────────────────

#[test]
fn fill_timeout_warns_and_continues() {
    let mut config = WasherConfig::default();
    config.level_sensor.fill_timeout_secs = 2;
    let mut rig = rig_with(MockIo::new(), &config);
    let mut timeouts = 0;
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::Rinsing, 5),
            &mut Hook(|e: &WashEvent| {
                if e.is_warning() {
                    timeouts += 1;
                }
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert_eq!(timeouts, 1);
    assert_eq!(report.result, PhaseResult::Completed);
    assert_eq!(report.warnings, 1);
    // Inlet and pump closed even though the tank never reported full.
    assert!(rig.io.first_write(PinRole::InletValve, false).is_some());
    assert!(rig.io.first_write(PinRole::WaterPump, false).is_some());
}

#[test]
fn fill_timeout_fails_under_strict_policy() {
    let mut config = WasherConfig::default();
    config.level_sensor.fill_timeout_secs = 2;
    config.fill_timeout_policy = FillTimeoutPolicy::Fail;
    let mut rig = rig_with(MockIo::new(), &config);
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::Disinfecting, 5),
            &mut Hook(|_: &WashEvent| {}),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert!(matches!(report.result, PhaseResult::Failed(_)));
    assert_eq!(rig.runner.state(), PhaseState::Aborted);
    assert_released(&rig, Phase::Disinfecting);
}

// ── Shutdown ─────────────────────────────────────────────────

#[test]
fn cancel_before_fill_touches_no_valve() {
    let mut rig = rig();
    rig.cancel.request();
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::DetergentWash, 5),
            &mut Hook(|_: &WashEvent| {}),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert_eq!(report.result, PhaseResult::Aborted);
    assert_eq!(rig.runner.state(), PhaseState::Aborted);
    assert!(!rig.io.was_driven_high(PinRole::InletValve));
    assert_released(&rig, Phase::DetergentWash);
}

#[test]
fn cancel_during_treat_aborts_within_one_tick() {
    let mut rig = rig();
    let trigger = rig.cancel.clone();
    let clock = rig.clock.clone();
    let mut requested_at = None;
    let mut aborted_at = None;
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::FinalRinse, 10),
            &mut Hook(|e: &WashEvent| match e {
                WashEvent::TreatCountdown { remaining_secs, .. } if *remaining_secs == 590 => {
                    trigger.request();
                    requested_at = Some(clock.now());
                }
                WashEvent::StepEntered {
                    state: PhaseState::Aborted,
                    ..
                } => aborted_at = Some(clock.now()),
                _ => {}
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert_eq!(report.result, PhaseResult::Aborted);
    let latency = aborted_at.unwrap() - requested_at.unwrap();
    assert!(latency <= Duration::from_secs(1), "latency {latency:?}");
    assert!(!rig.io.was_driven_high(PinRole::DrainValve));
    assert_released(&rig, Phase::FinalRinse);
}

#[test]
fn cancel_during_drain_aborts_within_one_tick() {
    let mut rig = rig();
    let trigger = rig.cancel.clone();
    let mut ticks_after = 0;
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::Rinsing, 5),
            &mut Hook(|e: &WashEvent| {
                if let WashEvent::DrainCountdown { .. } = e {
                    if trigger.is_requested() {
                        ticks_after += 1;
                    }
                    trigger.request();
                }
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();
    assert_eq!(report.result, PhaseResult::Aborted);
    assert_eq!(ticks_after, 0);
    assert_released(&rig, Phase::Rinsing);
}

#[test]
fn cancel_during_fill_wait_aborts_within_one_poll() {
    // Tank never reports full, so the fill keeps polling.
    let mut rig = rig_with(MockIo::new(), &WasherConfig::default());
    let trigger = rig.cancel.clone();
    let clock = rig.clock.clone();
    let poll = Duration::from_millis(u64::from(
        WasherConfig::default().level_sensor.check_interval_ms,
    ));
    let mut polls = 0;
    let mut requested_at = None;
    let mut aborted_at = None;
    let mut polls_after = 0;
    let mut states = Vec::new();
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::Rinsing, 5),
            &mut Hook(|e: &WashEvent| match e {
                WashEvent::FillCountdown { .. } => {
                    polls += 1;
                    if trigger.is_requested() {
                        polls_after += 1;
                    } else if polls == 3 {
                        trigger.request();
                        requested_at = Some(clock.now());
                    }
                }
                WashEvent::StepEntered { state, .. } => {
                    states.push(*state);
                    if *state == PhaseState::Aborted {
                        aborted_at = Some(clock.now());
                    }
                }
                _ => {}
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap();

    assert_eq!(report.result, PhaseResult::Aborted);
    assert_eq!(report.warnings, 0);
    assert_eq!(states, [PhaseState::Filling, PhaseState::Aborted]);
    assert_eq!(polls_after, 0);
    let latency = aborted_at.unwrap() - requested_at.unwrap();
    assert!(latency <= poll, "latency {latency:?}");
    assert!(rig.io.first_write(PinRole::InletValve, false).is_some());
    assert!(!rig.io.was_driven_high(PinRole::DrainValve));
    assert_released(&rig, Phase::Rinsing);
}

#[test]
fn fault_mid_drain_still_releases_everything() {
    let mut rig = rig();
    let io = rig.io.clone();
    let err = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::Rinsing, 5),
            &mut Hook(|e: &WashEvent| {
                if let WashEvent::DrainCountdown { remaining_secs: 30, .. } = e {
                    io.fail_next_write();
                }
            }),
            &mut FixedGate(Confirmation::Proceed),
        )
        .unwrap_err();
    assert_eq!(err, HardwareFault::write(PinRole::DrainValve));
    assert_eq!(rig.runner.state(), PhaseState::Aborted);
    assert_released(&rig, Phase::Rinsing);
}

#[test]
fn cancelled_detergent_prompt_raises_the_stop_flag() {
    let mut rig = rig();
    let report = rig
        .runner
        .run_phase(
            PhaseSetting::new(Phase::DetergentWash, 5),
            &mut Hook(|_: &WashEvent| {}),
            &mut FixedGate(Confirmation::Cancelled),
        )
        .unwrap();
    assert_eq!(report.result, PhaseResult::Aborted);
    assert!(rig.cancel.is_requested());
    assert_released(&rig, Phase::DetergentWash);
}

mod common;

use std::time::Duration;

use clawpick_core::{
    ApproachController, ApproachOutcome, ApproachState, ClassProfile, MovementSchedule, ObjectClass,
    PickError, SerialCommandLink,
};
use common::{ScriptedSerial, virtual_pacer};
use rstest::rstest;

#[rstest]
#[case(2.4, 100)]
#[case(2.5, 100)]
#[case(2.6, 150)]
#[case(6.0, 200)]
#[case(20.0, 800)]
#[case(84.9, 3800)]
#[case(90.0, 3800)]
#[case(f64::INFINITY, 3800)]
fn schedule_lookup(#[case] cm: f64, #[case] expected: u64) {
    assert_eq!(MovementSchedule::default().duration_for(cm), expected);
}

#[test]
fn horn_far_tier_uses_adjusted_gap() {
    let ctl = ApproachController::default();
    let horn = ClassProfile::builtin(ObjectClass::Horn);
    // 20 > 1.3 * 15, adjusted = 20 * 0.6 = 12 lands exactly on the 12cm bound
    assert_eq!(ctl.movement_duration_ms(20.0, &horn), 500);
    // 21 * 0.6 = 12.6 -> 14cm bound
    assert_eq!(ctl.movement_duration_ms(21.0, &horn), 600);
    // 19.5 is not strictly above the far cutoff and above the tier threshold
    assert_eq!(ctl.movement_duration_ms(19.5, &horn), 150);
}

#[rstest]
#[case(14.0, 450)] // far: 14 * 0.65 = 9.1 -> 10cm bound
#[case(13.0, 150)] // between tiers: not far, not mid -> near duration
#[case(10.0, 250)] // mid
#[case(5.1, 250)]
#[case(5.0, 150)] // near
#[case(0.5, 150)]
fn tiers_for_default_class(#[case] diff: f64, #[case] expected: u64) {
    let ctl = ApproachController::default();
    let bottle = ClassProfile::builtin(ObjectClass::Bottle);
    assert_eq!(ctl.movement_duration_ms(diff, &bottle), expected);
}

#[test]
fn within_reach_sends_nothing() {
    let (pacer, _clock, _stop) = virtual_pacer();
    let serial = ScriptedSerial::with_replies([Some("Distance (mm): 100")]);
    let mut link = SerialCommandLink::new(serial.clone());
    let ctl = ApproachController::default();
    let cup = ClassProfile::builtin(ObjectClass::Cup);
    let mut st = ApproachState {
        step_count: 0,
        previous_distance_cm: None,
    };
    let out = ctl.step(&mut st, &cup, &mut link, &pacer).unwrap();
    assert_eq!(out, ApproachOutcome::WithinReach { distance_cm: 10.0 });
    assert_eq!(serial.commands(), Vec::<String>::new());
    assert_eq!(st.step_count, 0);
}

#[test]
fn gate_wins_regardless_of_step_count() {
    let (pacer, _clock, _stop) = virtual_pacer();
    let serial = ScriptedSerial::with_replies([Some("Distance (mm): 70")]);
    let mut link = SerialCommandLink::new(serial);
    let ctl = ApproachController::default();
    let boxp = ClassProfile::builtin(ObjectClass::Box);
    let mut st = ApproachState {
        step_count: 1,
        previous_distance_cm: Some(20.0),
    };
    let out = ctl.step(&mut st, &boxp, &mut link, &pacer).unwrap();
    assert!(matches!(out, ApproachOutcome::WithinReach { .. }));
    assert_eq!(st.step_count, 0);
}

#[test]
fn forward_step_waits_for_its_duration() {
    let (pacer, clock, _stop) = virtual_pacer();
    // cup: 20cm - 10.5cm = 9.5cm -> mid tier
    let serial = ScriptedSerial::with_replies([Some("Distance (mm): 200")]);
    let mut link = SerialCommandLink::new(serial.clone());
    let ctl = ApproachController::default();
    let cup = ClassProfile::builtin(ObjectClass::Cup);
    let mut st = ApproachState::default();
    let out = ctl.step(&mut st, &cup, &mut link, &pacer).unwrap();
    assert_eq!(out, ApproachOutcome::Realign { duration_ms: 250 });
    assert_eq!(serial.commands(), vec!["forward 250"]);
    assert_eq!(clock.elapsed(), Duration::from_millis(250));
    assert_eq!(st.step_count, 0);
    assert_eq!(st.previous_distance_cm, Some(20.0));
}

#[test]
fn box_takes_two_steps_per_alignment() {
    let (pacer, _clock, _stop) = virtual_pacer();
    let serial = ScriptedSerial::with_replies([Some("Distance (mm): 500"), Some("Distance (mm): 300")]);
    let mut link = SerialCommandLink::new(serial.clone());
    let ctl = ApproachController::default();
    let boxp = ClassProfile::builtin(ObjectClass::Box);
    let mut st = ApproachState::default();

    let first = ctl.step(&mut st, &boxp, &mut link, &pacer).unwrap();
    assert!(matches!(first, ApproachOutcome::Advanced { step_count: 1, .. }));
    assert_eq!(st.step_count, 1);
    let second = ctl.step(&mut st, &boxp, &mut link, &pacer).unwrap();
    assert!(matches!(second, ApproachOutcome::Realign { .. }));
    assert_eq!(st.step_count, 0);
    // 50 - 7.5 = 42.5 -> 27.625 -> 30cm bound; 30 - 7.5 = 22.5 -> 14.625 -> 16cm bound
    assert_eq!(serial.commands(), vec!["forward 1200", "forward 700"]);
}

#[test]
fn out_of_range_drives_longest_step() {
    let (pacer, _clock, _stop) = virtual_pacer();
    let serial = ScriptedSerial::with_replies([Some("Distance: Out of range")]);
    let mut link = SerialCommandLink::new(serial.clone());
    let ctl = ApproachController::default();
    let mut st = ApproachState::default();
    let out = ctl
        .step(&mut st, &ClassProfile::builtin(ObjectClass::Bottle), &mut link, &pacer)
        .unwrap();
    assert_eq!(out, ApproachOutcome::Realign { duration_ms: 3800 });
}

#[test]
fn ranging_error_is_fatal() {
    let (pacer, _clock, _stop) = virtual_pacer();
    let serial = ScriptedSerial::with_replies([Some("Error: VL53L0X sensor not initialized")]);
    let mut link = SerialCommandLink::new(serial.clone());
    let ctl = ApproachController::default();
    let mut st = ApproachState::default();
    let err = ctl
        .step(&mut st, &ClassProfile::builtin(ObjectClass::Cup), &mut link, &pacer)
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<PickError>(),
        Some(&PickError::RangingFailed { attempts: 3 })
    );
    assert!(serial.commands().is_empty());
}

#[test]
fn previous_distance_is_seeded_then_tracked() {
    let (pacer, _clock, _stop) = virtual_pacer();
    let serial = ScriptedSerial::with_replies([Some("Distance (mm): 900")]);
    let mut link = SerialCommandLink::new(serial);
    let ctl = ApproachController::default();
    let mut st = ApproachState::default();
    ctl.step(&mut st, &ClassProfile::builtin(ObjectClass::Box), &mut link, &pacer)
        .unwrap();
    assert_eq!(st.previous_distance_cm, Some(90.0));
}

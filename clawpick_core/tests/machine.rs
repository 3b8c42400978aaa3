mod common;

use std::sync::Arc;
use std::time::Duration;

use clawpick_config::PickQueue;
use clawpick_core::{CameraPolicy, PickError, PickState, PickStateMachine, StopSignal, Tick};
use clawpick_hardware::{SimObject, SimParams, SimWorld, VirtualClock};
use common::{ScriptedCamera, ScriptedDetector, ScriptedSerial};

const CUP: u8 = 2;

fn queue(names: &[&str]) -> PickQueue {
    PickQueue::new(names.iter().map(|s| (*s).to_string()).collect())
}

fn frame_every(ms: u64) -> CameraPolicy {
    CameraPolicy {
        frame_wait: Duration::from_millis(ms),
        ..CameraPolicy::default()
    }
}

#[test]
fn cup_end_to_end() {
    let clock = VirtualClock::new();
    let serial = ScriptedSerial::with_replies([Some("Distance (mm): 200"), Some("Distance (mm): 100")]);
    let camera = ScriptedCamera::default();
    let detector = ScriptedDetector::new(CUP, [Some(40.0), Some(3.0)]);
    let mut machine = PickStateMachine::builder()
        .with_link(serial.clone())
        .with_frames(camera.clone())
        .with_detector(detector)
        .with_clock(Arc::new(clock.clone()))
        .with_camera(frame_every(100))
        .build()
        .unwrap();

    let summary = machine.run(&queue(&["cup"])).unwrap();

    assert_eq!(
        serial.lines(),
        vec![
            "right 55",
            "stop 0",
            "distance",
            "forward 250",
            "stop 0",
            "distance",
            "right 250",
            "down 1250",
            "catch 2500",
            "catch 3500",
            "up 2500",
            "stop 0",
        ]
    );
    let report = &summary.objects[0];
    assert_eq!(report.target, "cup");
    assert_eq!(report.corrections, 1);
    assert_eq!(report.forward_steps, 1);
    assert_eq!(report.realignments, 1);
    assert_eq!(report.actuation_sent, 5);
    assert!(!camera.open.get());
    assert!(serial.closed.get());
}

#[test]
fn cup_run_survives_late_stop_replies() {
    let serial = ScriptedSerial::with_replies([Some("Distance (mm): 200"), Some("Distance (mm): 100")]).lagging();
    let detector = ScriptedDetector::new(CUP, [Some(40.0), Some(40.0), Some(3.0)]);
    let mut machine = PickStateMachine::builder()
        .with_link(serial.clone())
        .with_frames(ScriptedCamera::default())
        .with_detector(detector)
        .with_clock(Arc::new(VirtualClock::new()))
        .with_camera(frame_every(100))
        .build()
        .unwrap();

    let summary = machine.run(&queue(&["cup"])).unwrap();

    assert_eq!(summary.picked(), 1);
    assert_eq!(summary.objects[0].forward_steps, 1);
    assert_eq!(
        serial.commands(),
        vec![
            "right 55",
            "right 55",
            "stop 0",
            "forward 250",
            "stop 0",
            "right 250",
            "down 1250",
            "catch 2500",
            "catch 3500",
            "up 2500",
            "stop 0",
        ]
    );
}

#[test]
fn first_detection_in_dead_band_does_not_advance() {
    let clock = VirtualClock::new();
    let serial = ScriptedSerial::default();
    let detector = ScriptedDetector::new(CUP, [Some(3.0)]);
    let mut machine = PickStateMachine::builder()
        .with_link(serial.clone())
        .with_frames(ScriptedCamera::default())
        .with_detector(detector)
        .with_clock(Arc::new(clock))
        .with_camera(frame_every(100))
        .build()
        .unwrap();

    machine.open_camera().unwrap();
    let mut ctx = machine.begin_object("cup");
    for _ in 0..3 {
        assert_eq!(machine.tick(&mut ctx).unwrap(), Tick::Continue);
    }
    assert_eq!(ctx.state, PickState::Aligning);
    assert_eq!(serial.lines(), vec!["stop 0", "stop 0", "stop 0"]);
}

#[test]
fn missing_target_stops_and_keeps_aligning() {
    let clock = VirtualClock::new();
    let serial = ScriptedSerial::default();
    let detector = ScriptedDetector::new(CUP, [None, Some(-30.0)]);
    let mut machine = PickStateMachine::builder()
        .with_link(serial.clone())
        .with_frames(ScriptedCamera::default())
        .with_detector(detector)
        .with_clock(Arc::new(clock))
        .build()
        .unwrap();

    machine.open_camera().unwrap();
    let mut ctx = machine.begin_object("cup");
    assert_eq!(machine.tick(&mut ctx).unwrap(), Tick::Continue);
    assert_eq!(machine.tick(&mut ctx).unwrap(), Tick::Continue);
    assert_eq!(serial.lines(), vec!["stop 0", "left 55"]);
    assert_eq!(ctx.alignment.original_offset, Some(30.0));
}

#[test]
fn ranging_error_ends_the_run_and_cleans_up() {
    let clock = VirtualClock::new();
    let serial = ScriptedSerial::with_replies([Some("Error: VL53L0X sensor not initialized")]);
    let camera = ScriptedCamera::default();
    let mut machine = PickStateMachine::builder()
        .with_link(serial.clone())
        .with_frames(camera.clone())
        .with_detector(ScriptedDetector::new(CUP, [Some(40.0), Some(2.0)]))
        .with_clock(Arc::new(clock))
        .with_camera(frame_every(100))
        .build()
        .unwrap();

    let err = machine.run(&queue(&["cup", "box"])).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PickError>(),
        Some(&PickError::RangingFailed { attempts: 3 })
    );
    assert_eq!(serial.lines().last().map(String::as_str), Some("stop 0"));
    assert!(serial.closed.get());
    assert!(!camera.open.get());
}

#[test]
fn camera_retries_then_gives_up() {
    let clock = VirtualClock::new();
    let camera = ScriptedCamera::failing(10);
    let mut machine = PickStateMachine::builder()
        .with_link(ScriptedSerial::default())
        .with_frames(camera.clone())
        .with_detector(ScriptedDetector::new(CUP, []))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();

    let err = machine.run(&queue(&["cup"])).unwrap_err();
    assert_eq!(
        err.downcast_ref::<PickError>(),
        Some(&PickError::CameraUnavailable { attempts: 5 })
    );
    assert_eq!(camera.opens.get(), 5);
    // four 1s backoffs between five attempts
    assert_eq!(clock.elapsed(), Duration::from_secs(4));
}

#[test]
fn camera_recovers_within_budget() {
    let camera = ScriptedCamera::failing(2);
    let mut machine = PickStateMachine::builder()
        .with_link(ScriptedSerial::default())
        .with_frames(camera.clone())
        .with_detector(ScriptedDetector::new(CUP, []))
        .with_clock(Arc::new(VirtualClock::new()))
        .build()
        .unwrap();
    machine.open_camera().unwrap();
    assert_eq!(camera.opens.get(), 3);
    assert!(camera.open.get());
}

#[test]
fn empty_queue_is_a_clean_no_op() {
    let serial = ScriptedSerial::default();
    let mut machine = PickStateMachine::builder()
        .with_link(serial.clone())
        .with_frames(ScriptedCamera::default())
        .with_detector(ScriptedDetector::new(CUP, []))
        .with_clock(Arc::new(VirtualClock::new()))
        .build()
        .unwrap();
    let summary = machine.run(&PickQueue::default()).unwrap();
    assert_eq!(summary.picked(), 0);
    assert!(serial.closed.get());
}

#[test]
fn closed_link_is_fatal_at_start() {
    let serial = ScriptedSerial::default();
    serial.closed.set(true);
    let mut machine = PickStateMachine::builder()
        .with_link(serial)
        .with_frames(ScriptedCamera::default())
        .with_detector(ScriptedDetector::new(CUP, []))
        .build()
        .unwrap();
    let err = machine.run(&queue(&["cup"])).unwrap_err();
    assert_eq!(err.downcast_ref::<PickError>(), Some(&PickError::LinkClosed));
}

#[test]
fn simulated_world_picks_every_queued_object() {
    let world = SimWorld::new(
        vec![
            SimObject {
                class_id: 2,
                offset_px: 60.0,
                distance_mm: 450.0,
                width_px: 120.0,
            },
            SimObject {
                class_id: 1,
                offset_px: -200.0,
                distance_mm: 700.0,
                width_px: 200.0,
            },
        ],
        SimParams::default(),
    );
    let mut machine = PickStateMachine::builder()
        .with_link(world.serial())
        .with_frames(world.camera())
        .with_detector(world.detector())
        .with_clock(Arc::new(VirtualClock::new()))
        .build()
        .unwrap();

    let summary = machine.run(&queue(&["cup", "box"])).unwrap();
    assert_eq!(summary.picked(), 2);
    assert!(summary.objects.iter().all(|o| o.corrections > 0 && o.forward_steps > 0));
    assert!(world.received().iter().any(|l| l == "release 2500"));
    assert!(!world.camera_is_open());
}

#[test]
fn stop_signal_mid_alignment_shuts_down() {
    let clock = VirtualClock::new();
    let stop = StopSignal::new();
    let serial = ScriptedSerial::default();
    let camera = ScriptedCamera::default();
    let mut detector = ScriptedDetector::new(CUP, [Some(200.0)]);
    detector.stop_after = Some((3, stop.clone()));
    let mut machine = PickStateMachine::builder()
        .with_link(serial.clone())
        .with_frames(camera.clone())
        .with_detector(detector.clone())
        .with_clock(Arc::new(clock))
        .with_stop_signal(stop)
        .build()
        .unwrap();

    let err = machine.run(&queue(&["cup"])).unwrap_err();
    assert_eq!(err.downcast_ref::<PickError>(), Some(&PickError::Cancelled));
    assert_eq!(detector.calls.get(), 3);
    assert_eq!(serial.lines().last().map(String::as_str), Some("stop 0"));
    assert!(serial.closed.get());
    assert!(!camera.open.get());
}

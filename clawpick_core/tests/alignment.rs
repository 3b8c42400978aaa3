use std::time::{Duration, Instant};

use clawpick_core::{
    AlignAction, AlignmentCfg, AlignmentController, AlignmentState, CommandSink, Direction, RobotCommand,
};
use rstest::rstest;

#[derive(Default)]
struct Recorder(Vec<String>);

impl CommandSink for Recorder {
    fn send(&mut self, cmd: RobotCommand) -> bool {
        self.0.push(cmd.to_string());
        true
    }
}

#[rstest]
#[case(0.0, Direction::Straight)]
#[case(7.9, Direction::Straight)]
#[case(-7.9, Direction::Straight)]
#[case(8.0, Direction::Right)]
#[case(40.0, Direction::Right)]
#[case(-8.0, Direction::Left)]
#[case(-300.0, Direction::Left)]
fn direction_from_offset(#[case] offset: f32, #[case] expected: Direction) {
    let ctl = AlignmentController::default();
    assert_eq!(ctl.decide_direction(offset), expected);
}

#[test]
fn first_correction_records_offsets_once() {
    let ctl = AlignmentController::default();
    let mut st = AlignmentState::default();
    let mut sink = Recorder::default();
    let t0 = Instant::now();

    let a = ctl.align_robot(&mut st, Direction::Right, 40.0, &mut sink, t0);
    assert_eq!(a, AlignAction::Corrected(Direction::Right));
    assert_eq!(st.original_offset, Some(40.0));
    assert_eq!(st.required_offset, Some(32.0));

    let a = ctl.align_robot(&mut st, Direction::Right, 25.0, &mut sink, t0 + Duration::from_millis(100));
    assert_eq!(a, AlignAction::Corrected(Direction::Right));
    assert_eq!(st.original_offset, Some(40.0));
    assert_eq!(st.required_offset, Some(32.0));
    assert_eq!(sink.0, vec!["right 55", "right 55"]);
}

#[test]
fn corrections_are_rate_limited() {
    let ctl = AlignmentController::default();
    let mut st = AlignmentState::default();
    let mut sink = Recorder::default();
    let t0 = Instant::now();

    ctl.align_robot(&mut st, Direction::Left, -50.0, &mut sink, t0);
    for ms in [1, 20, 99] {
        let a = ctl.align_robot(&mut st, Direction::Left, -50.0, &mut sink, t0 + Duration::from_millis(ms));
        assert_eq!(a, AlignAction::Throttled);
    }
    // straight is throttled as well
    let a = ctl.align_robot(&mut st, Direction::Straight, 1.0, &mut sink, t0 + Duration::from_millis(50));
    assert_eq!(a, AlignAction::Throttled);
    assert_eq!(sink.0, vec!["left 55"]);
}

#[test]
fn straight_stops_without_capturing_state() {
    let ctl = AlignmentController::default();
    let mut st = AlignmentState::default();
    let mut sink = Recorder::default();
    let t0 = Instant::now();

    let a = ctl.align_robot(&mut st, Direction::Straight, 3.0, &mut sink, t0);
    assert_eq!(a, AlignAction::Stopped);
    assert_eq!(st.original_offset, None);
    assert_eq!(st.last_movement, None);
    // stops do not restart the interval
    let a = ctl.align_robot(&mut st, Direction::Straight, 3.0, &mut sink, t0);
    assert_eq!(a, AlignAction::Stopped);
    assert_eq!(sink.0, vec!["stop 0", "stop 0"]);
}

#[test]
fn aligned_only_after_a_recorded_correction() {
    let ctl = AlignmentController::default();
    let mut st = AlignmentState::default();
    assert!(!ctl.is_aligned(&st, 3.0));
    st.original_offset = Some(40.0);
    assert!(ctl.is_aligned(&st, 3.0));
    assert!(ctl.is_aligned(&st, -8.0));
    assert!(!ctl.is_aligned(&st, 9.0));
}

#[test]
fn custom_duration_and_dead_band() {
    let ctl = AlignmentController::new(AlignmentCfg {
        min_pixel_distance: 20.0,
        movement_duration_ms: 80,
        ..AlignmentCfg::default()
    });
    let mut st = AlignmentState::default();
    let mut sink = Recorder::default();
    assert_eq!(ctl.decide_direction(15.0), Direction::Straight);
    ctl.align_robot(&mut st, ctl.decide_direction(-25.0), -25.0, &mut sink, Instant::now());
    assert_eq!(sink.0, vec!["left 80"]);
    assert_eq!(st.original_offset, Some(25.0));
}

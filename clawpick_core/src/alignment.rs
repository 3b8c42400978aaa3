//! Lateral alignment: rotate toward the target in short, rate-limited
//! bursts until its horizontal offset falls inside the dead band.

use std::time::{Duration, Instant};

use crate::command::{RobotCommand, Verb};
use crate::link::CommandSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Left,
    Right,
    #[default]
    Straight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentCfg {
    /// Dead band half-width (px).
    pub min_pixel_distance: f32,
    /// Minimum spacing between lateral corrections.
    pub movement_interval: Duration,
    /// Duration of each lateral correction (ms).
    pub movement_duration_ms: u64,
    /// Fraction of the first offset that counts as aligned; recorded only.
    pub required_ratio: f32,
}

impl Default for AlignmentCfg {
    fn default() -> Self {
        Self {
            min_pixel_distance: 8.0,
            movement_interval: Duration::from_millis(100),
            movement_duration_ms: 55,
            required_ratio: 0.8,
        }
    }
}

/// Per-object alignment bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignmentState {
    pub direction: Direction,
    pub last_movement: Option<Instant>,
    /// |offset| of the first correction; set at most once per object.
    pub original_offset: Option<f32>,
    pub required_offset: Option<f32>,
}

/// What `align_robot` did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignAction {
    /// Inside the movement interval; nothing sent.
    Throttled,
    Corrected(Direction),
    Stopped,
}

/// Direction for a horizontal offset: `Straight` inside the dead band,
/// otherwise toward the side the target is on.
pub fn decide_direction(offset: f32, min_pixel_distance: f32) -> Direction {
    if offset.abs() < min_pixel_distance {
        Direction::Straight
    } else if offset > 0.0 {
        Direction::Right
    } else {
        Direction::Left
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlignmentController {
    cfg: AlignmentCfg,
}

impl AlignmentController {
    pub fn new(cfg: AlignmentCfg) -> Self {
        Self { cfg }
    }

    pub fn cfg(&self) -> &AlignmentCfg {
        &self.cfg
    }

    pub fn decide_direction(&self, offset: f32) -> Direction {
        decide_direction(offset, self.cfg.min_pixel_distance)
    }

    /// Act on `direction`, at most once per movement interval.
    ///
    /// The first lateral correction for an object records the original and
    /// required offsets. Only lateral corrections restart the interval.
    pub fn align_robot(
        &self,
        state: &mut AlignmentState,
        direction: Direction,
        offset: f32,
        sink: &mut impl CommandSink,
        now: Instant,
    ) -> AlignAction {
        if let Some(last) = state.last_movement
            && now.saturating_duration_since(last) < self.cfg.movement_interval
        {
            return AlignAction::Throttled;
        }
        state.direction = direction;
        let verb = match direction {
            Direction::Straight => {
                sink.send(RobotCommand::stop());
                return AlignAction::Stopped;
            }
            Direction::Left => Verb::Left,
            Direction::Right => Verb::Right,
        };
        if state.original_offset.is_none() {
            let original = offset.abs();
            state.original_offset = Some(original);
            state.required_offset = Some(original * self.cfg.required_ratio);
            tracing::debug!(original_offset = original, "recorded initial alignment offset");
        }
        sink.send(RobotCommand::new(verb, self.cfg.movement_duration_ms));
        state.last_movement = Some(now);
        AlignAction::Corrected(direction)
    }

    /// Inside the dead band, and at least one correction has happened.
    pub fn is_aligned(&self, state: &AlignmentState, offset: f32) -> bool {
        state.original_offset.is_some() && offset.abs() <= self.cfg.min_pixel_distance
    }
}

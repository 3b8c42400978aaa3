//! Forward approach gated by the range sensor.
//!
//! Each step measures the distance, compares it with the class threshold
//! and, if still too far, drives forward for a duration picked by a
//! three-tier policy:
//! - far (`diff > far_multiplier × tier_threshold`): scale the gap by the
//!   class adjustment factor and look it up in the movement schedule
//! - mid (`near_cutoff < diff <= tier_threshold`): fixed mid duration
//! - otherwise: fixed near duration

use std::time::Duration;

use crate::command::RobotCommand;
use crate::error::{PickError, Result};
use crate::link::CommandSink;
use crate::pacing::Pacer;
use crate::profile::ClassProfile;
use crate::ranging::{DistanceQuery, DistanceReading, RangeProbe, RangingPolicy};
use crate::util::mm_to_cm;

/// Built-in `(max_cm, duration_ms)` table.
pub const DEFAULT_SCHEDULE: [(f64, u64); 23] = [
    (2.5, 100),
    (3.0, 150),
    (6.0, 200),
    (10.0, 450),
    (12.0, 500),
    (14.0, 600),
    (16.0, 700),
    (20.0, 800),
    (22.0, 900),
    (24.0, 1000),
    (27.0, 1100),
    (30.0, 1200),
    (33.0, 1300),
    (36.0, 1400),
    (37.0, 1500),
    (40.0, 1600),
    (42.0, 1700),
    (44.0, 1800),
    (46.0, 1900),
    (55.0, 2000),
    (65.0, 2800),
    (75.0, 3300),
    (85.0, 3800),
];

/// Ordered distance→duration table; the smallest bound that covers the
/// input wins, anything past the last bound gets the longest duration.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementSchedule {
    steps: Vec<(f64, u64)>,
}

impl Default for MovementSchedule {
    fn default() -> Self {
        Self {
            steps: DEFAULT_SCHEDULE.to_vec(),
        }
    }
}

impl MovementSchedule {
    /// Bounds must be finite, positive and strictly increasing, durations
    /// non-decreasing.
    pub fn new(steps: Vec<(f64, u64)>) -> Result<Self> {
        clawpick_config::validate_schedule(&steps)
            .map_err(|e| eyre::Report::new(PickError::Config(e.to_string())))?;
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[(f64, u64)] {
        &self.steps
    }

    pub fn max_duration_ms(&self) -> u64 {
        self.steps.iter().map(|&(_, ms)| ms).max().unwrap_or(0)
    }

    pub fn duration_for(&self, cm: f64) -> u64 {
        self.steps
            .iter()
            .find(|&&(bound, _)| cm <= bound)
            .map_or_else(|| self.max_duration_ms(), |&(_, ms)| ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApproachCfg {
    pub far_multiplier: f64,
    pub near_cutoff_cm: f64,
    pub mid_duration_ms: u64,
    pub near_duration_ms: u64,
    /// Seed for `previous_distance_cm` on the first step of an approach.
    pub initial_previous_distance_cm: f64,
    pub schedule: MovementSchedule,
}

impl Default for ApproachCfg {
    fn default() -> Self {
        Self {
            far_multiplier: 1.3,
            near_cutoff_cm: 5.0,
            mid_duration_ms: 250,
            near_duration_ms: 150,
            initial_previous_distance_cm: 1000.0,
            schedule: MovementSchedule::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApproachState {
    pub step_count: u32,
    /// Last measured distance; diagnostic only.
    pub previous_distance_cm: Option<f64>,
}

impl ApproachState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApproachOutcome {
    /// Distance gate satisfied; nothing was sent.
    WithinReach { distance_cm: f64 },
    /// Moved forward and stays in the approach.
    Advanced { duration_ms: u64, step_count: u32 },
    /// Moved forward and used up the step budget; realign next.
    Realign { duration_ms: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct ApproachController {
    cfg: ApproachCfg,
    ranging: RangingPolicy,
}

impl ApproachController {
    pub fn new(cfg: ApproachCfg, ranging: RangingPolicy) -> Self {
        Self { cfg, ranging }
    }

    pub fn cfg(&self) -> &ApproachCfg {
        &self.cfg
    }

    pub fn ranging(&self) -> &RangingPolicy {
        &self.ranging
    }

    /// Forward duration for a remaining gap of `diff_cm`.
    pub fn movement_duration_ms(&self, diff_cm: f64, profile: &ClassProfile) -> u64 {
        let threshold = profile.tier_threshold_cm;
        if diff_cm > self.cfg.far_multiplier * threshold {
            let adjusted = diff_cm * profile.adjustment_factor;
            self.cfg.schedule.duration_for(adjusted)
        } else if diff_cm > self.cfg.near_cutoff_cm && diff_cm <= threshold {
            self.cfg.mid_duration_ms
        } else {
            self.cfg.near_duration_ms
        }
    }

    /// One approach step: measure, then either report the object within
    /// reach or drive forward and wait out the move.
    ///
    /// A ranging `Error` is fatal and surfaces as `PickError::RangingFailed`.
    pub fn step<L>(&self, state: &mut ApproachState, profile: &ClassProfile, link: &mut L, pacer: &Pacer) -> Result<ApproachOutcome>
    where
        L: CommandSink + RangeProbe,
    {
        let reading = DistanceQuery::new(&mut *link, &self.ranging, pacer).query_distance()?;
        let Some(distance_cm) = reading.to_cm() else {
            tracing::error!("no usable distance reading; aborting run");
            return Err(eyre::Report::new(PickError::RangingFailed {
                attempts: self.ranging.attempts,
            }));
        };
        if reading == DistanceReading::OutOfRange {
            tracing::warn!("target beyond sensor range; driving the longest step");
        }

        let previous = *state
            .previous_distance_cm
            .get_or_insert(self.cfg.initial_previous_distance_cm);

        let threshold_cm = mm_to_cm(profile.distance_threshold_mm);
        let diff = distance_cm - threshold_cm;
        if diff <= 0.0 {
            tracing::info!(distance_cm, threshold_cm, "object within reach");
            state.step_count = 0;
            return Ok(ApproachOutcome::WithinReach { distance_cm });
        }

        let duration_ms = self.movement_duration_ms(diff, profile);
        tracing::info!(
            distance_cm,
            previous_cm = previous,
            diff_cm = diff,
            duration_ms,
            "moving forward"
        );
        link.send(RobotCommand::forward(duration_ms));
        pacer.wait(Duration::from_millis(duration_ms))?;

        state.step_count += 1;
        state.previous_distance_cm = Some(distance_cm);
        if state.step_count >= profile.steps_per_alignment {
            tracing::debug!(steps = state.step_count, "step budget used; realigning");
            state.step_count = 0;
            Ok(ApproachOutcome::Realign { duration_ms })
        } else {
            Ok(ApproachOutcome::Advanced {
                duration_ms,
                step_count: state.step_count,
            })
        }
    }
}

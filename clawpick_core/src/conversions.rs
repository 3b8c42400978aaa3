//! Conversions from `clawpick_config` schemas to the runtime types.

use std::time::Duration;

use crate::actuation::{ActuationSequence, ActuationStep};
use crate::alignment::AlignmentCfg;
use crate::approach::{ApproachCfg, MovementSchedule};
use crate::class::ObjectClass;
use crate::command::Verb;
use crate::detection::DetectionFilter;
use crate::error::{PickError, Report};
use crate::link::LinkPolicy;
use crate::machine::CameraPolicy;
use crate::profile::{ClassProfile, ClassTable};
use crate::ranging::RangingPolicy;

fn config_err(msg: String) -> Report {
    Report::new(PickError::Config(msg))
}

// ── Alignment ────────────────────────────────────────────────────────────────

impl From<&clawpick_config::AlignmentCfg> for AlignmentCfg {
    fn from(c: &clawpick_config::AlignmentCfg) -> Self {
        Self {
            min_pixel_distance: c.min_pixel_distance,
            movement_interval: Duration::from_millis(c.movement_interval_ms),
            movement_duration_ms: c.movement_duration_ms,
            required_ratio: c.required_ratio,
        }
    }
}

// ── Link / ranging / camera / detection ──────────────────────────────────────

impl From<&clawpick_config::SerialCfg> for LinkPolicy {
    fn from(c: &clawpick_config::SerialCfg) -> Self {
        Self {
            command_settle: Duration::from_millis(c.command_settle_ms),
        }
    }
}

impl From<&clawpick_config::RangingCfg> for RangingPolicy {
    fn from(c: &clawpick_config::RangingCfg) -> Self {
        Self {
            attempts: c.attempts,
            retry_delay: Duration::from_millis(c.retry_delay_ms),
            response_timeout: Duration::from_millis(c.response_timeout_ms),
            request: c.request.trim().to_string(),
        }
    }
}

impl From<&clawpick_config::CameraCfg> for CameraPolicy {
    fn from(c: &clawpick_config::CameraCfg) -> Self {
        Self {
            open_attempts: c.open_attempts,
            retry_delay: Duration::from_millis(c.retry_delay_ms),
            frame_wait: Duration::from_millis(c.frame_wait_ms),
        }
    }
}

impl From<&clawpick_config::DetectionCfg> for DetectionFilter {
    fn from(c: &clawpick_config::DetectionCfg) -> Self {
        Self {
            confidence_threshold: c.confidence_threshold,
            center_offset_px: c.center_offset_px,
        }
    }
}

// ── Approach ─────────────────────────────────────────────────────────────────

impl TryFrom<&clawpick_config::ApproachCfg> for ApproachCfg {
    type Error = Report;

    /// Reads `schedule_csv` when set; an empty inline schedule means the
    /// built-in table.
    fn try_from(c: &clawpick_config::ApproachCfg) -> Result<Self, Self::Error> {
        let schedule = if let Some(path) = &c.schedule_csv {
            let rows = clawpick_config::load_schedule_csv(path)
                .map_err(|e| config_err(format!("approach.schedule_csv: {e}")))?;
            MovementSchedule::new(rows)?
        } else if c.schedule.is_empty() {
            MovementSchedule::default()
        } else {
            MovementSchedule::new(c.schedule.clone())?
        };
        Ok(Self {
            far_multiplier: c.far_multiplier,
            near_cutoff_cm: c.near_cutoff_cm,
            mid_duration_ms: c.mid_duration_ms,
            near_duration_ms: c.near_duration_ms,
            initial_previous_distance_cm: c.initial_previous_distance_cm,
            schedule,
        })
    }
}

// ── Class table ──────────────────────────────────────────────────────────────

impl TryFrom<&clawpick_config::ActuationStepCfg> for ActuationStep {
    type Error = Report;

    fn try_from(c: &clawpick_config::ActuationStepCfg) -> Result<Self, Self::Error> {
        let verb: Verb = c.verb.parse().map_err(|e| config_err(format!("{e}")))?;
        if verb == Verb::Stop {
            return Ok(ActuationStep::with_wait(verb, 0, c.post_wait_ms.unwrap_or(0)));
        }
        Ok(ActuationStep::with_wait(
            verb,
            c.duration_ms,
            c.post_wait_ms.unwrap_or(c.duration_ms),
        ))
    }
}

/// Built-in profiles with `[classes.<name>]` overrides applied.
impl TryFrom<&clawpick_config::Config> for ClassTable {
    type Error = Report;

    fn try_from(cfg: &clawpick_config::Config) -> Result<Self, Self::Error> {
        let mut table =
            ClassTable::builtin().with_default_threshold_mm(cfg.approach.default_distance_threshold_mm);
        for (name, ov) in &cfg.classes {
            let class: ObjectClass = name
                .parse()
                .map_err(|e| config_err(format!("classes.{name}: {e}")))?;
            let mut profile = table
                .get(class)
                .cloned()
                .unwrap_or_else(|| ClassProfile::builtin(class));
            if let Some(mm) = ov.distance_threshold_mm {
                profile.distance_threshold_mm = mm;
            }
            if let Some(n) = ov.steps_per_alignment {
                profile.steps_per_alignment = n;
            }
            if let Some(cm) = ov.tier_threshold_cm {
                profile.tier_threshold_cm = cm;
            }
            if let Some(f) = ov.adjustment_factor {
                profile.adjustment_factor = f;
            }
            if let Some(steps) = &ov.actuation {
                let steps = steps
                    .iter()
                    .enumerate()
                    .map(|(i, s)| {
                        ActuationStep::try_from(s)
                            .map_err(|e| config_err(format!("classes.{name}.actuation[{i}]: {e}")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                profile.actuation = ActuationSequence::new(steps);
            }
            table.insert(class, profile);
        }
        Ok(table)
    }
}

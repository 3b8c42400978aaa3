//! The per-object pick loop: ALIGNING → MOVING_FORWARD → CATCHING_CLAW.
//!
//! `PickStateMachine` owns the serial link, the frame source and the
//! detector for the whole run. All per-object bookkeeping lives in a
//! `PickContext` that is created fresh for every queue entry and passed by
//! mutable borrow into each controller call.

use std::time::Duration;

use clawpick_config::PickQueue;
use clawpick_traits::{Detector, FrameSource, SerialLink};

use crate::actuation::ActuationSequencer;
use crate::alignment::{AlignAction, AlignmentController, AlignmentState};
use crate::approach::{ApproachController, ApproachOutcome, ApproachState};
use crate::command::RobotCommand;
use crate::detection::DetectionFilter;
use crate::error::{PickError, Result};
use crate::link::{CommandSink, SerialCommandLink};
use crate::pacing::Pacer;
use crate::profile::{ClassProfile, ClassTable};
use crate::status::{ObjectReport, PickState, RunSummary, Tick};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraPolicy {
    pub open_attempts: u32,
    pub retry_delay: Duration,
    /// Pause after each processed frame while aligning.
    pub frame_wait: Duration,
}

impl Default for CameraPolicy {
    fn default() -> Self {
        Self {
            open_attempts: 5,
            retry_delay: Duration::from_secs(1),
            frame_wait: Duration::from_millis(1),
        }
    }
}

/// Everything that belongs to the object currently being picked.
#[derive(Debug, Clone)]
pub struct PickContext {
    pub target: String,
    pub profile: ClassProfile,
    pub state: PickState,
    pub alignment: AlignmentState,
    pub approach: ApproachState,
    pub report: ObjectReport,
}

impl PickContext {
    pub fn new(target: &str, profile: ClassProfile) -> Self {
        Self {
            target: target.to_string(),
            profile,
            state: PickState::Aligning,
            alignment: AlignmentState::default(),
            approach: ApproachState::default(),
            report: ObjectReport {
                target: target.to_string(),
                ..ObjectReport::default()
            },
        }
    }

    /// Move to `next`. The approach step count restarts on every transition.
    fn enter(&mut self, next: PickState) -> Tick {
        let from = self.state;
        tracing::info!(object = %self.target, from = %from, to = %next, "state transition");
        self.approach.step_count = 0;
        if next == PickState::MovingForward {
            self.approach.previous_distance_cm = None;
        }
        self.state = next;
        Tick::Transitioned { from, to: next }
    }
}

pub struct PickStateMachine {
    pub(crate) link: SerialCommandLink<Box<dyn SerialLink>>,
    pub(crate) frames: Box<dyn FrameSource>,
    pub(crate) detector: Box<dyn Detector>,
    pub(crate) alignment: AlignmentController,
    pub(crate) approach: ApproachController,
    pub(crate) actuation: ActuationSequencer,
    pub(crate) detection: DetectionFilter,
    pub(crate) classes: ClassTable,
    pub(crate) camera: CameraPolicy,
    pub(crate) pacer: Pacer,
}

impl std::fmt::Debug for PickStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickStateMachine")
            .field("link_open", &self.link.is_open())
            .field("camera_open", &self.frames.is_open())
            .field("pacer", &self.pacer)
            .finish_non_exhaustive()
    }
}

impl PickStateMachine {
    /// Fresh per-object context with the resolved class profile.
    pub fn begin_object(&self, target: &str) -> PickContext {
        PickContext::new(target, self.classes.profile_for(target))
    }

    pub fn link(&self) -> &SerialCommandLink<Box<dyn SerialLink>> {
        &self.link
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    /// Open the frame source, retrying with a fixed delay.
    pub fn open_camera(&mut self) -> Result<()> {
        let attempts = self.camera.open_attempts.max(1);
        for attempt in 1..=attempts {
            self.pacer.check()?;
            match self.frames.open() {
                Ok(()) if self.frames.is_open() => {
                    tracing::info!(attempt, "camera initialized");
                    return Ok(());
                }
                Ok(()) => {
                    tracing::warn!(attempt, max_attempts = attempts, "camera reported open but is not usable");
                }
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = attempts, error = %e, "camera initialization failed");
                }
            }
            self.frames.release();
            if attempt < attempts {
                self.pacer.wait(self.camera.retry_delay)?;
            }
        }
        tracing::error!(attempts, "could not open camera");
        Err(eyre::Report::new(PickError::CameraUnavailable { attempts }))
    }

    /// One control-loop iteration for the object in `ctx`.
    pub fn tick(&mut self, ctx: &mut PickContext) -> Result<Tick> {
        self.pacer.check()?;
        match ctx.state {
            PickState::Aligning => self.tick_aligning(ctx),
            PickState::MovingForward => self.tick_moving(ctx),
            PickState::CatchingClaw => {
                let script = self.classes.actuation_for(&ctx.target);
                let report = self
                    .actuation
                    .run(&ctx.target, script, &mut self.link, &self.pacer)?;
                ctx.report.actuation_sent = report.sent;
                ctx.report.actuation_failed = report.failed;
                Ok(Tick::ObjectDone)
            }
        }
    }

    fn tick_aligning(&mut self, ctx: &mut PickContext) -> Result<Tick> {
        let frame = match self.frames.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::warn!("failed to capture frame; retrying");
                self.pacer.wait(self.camera.retry_delay)?;
                return Ok(Tick::Continue);
            }
            Err(e) => {
                tracing::warn!(error = %e, "frame read error; retrying");
                self.pacer.wait(self.camera.retry_delay)?;
                return Ok(Tick::Continue);
            }
        };
        let raw = self.detector.detect(&frame).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "detector failed; treating frame as empty");
            Vec::new()
        });

        let tick = match self.detection.best_match(&frame, &raw, &ctx.target) {
            None => {
                tracing::debug!(object = %ctx.target, frame = frame.index, "target not detected");
                self.link.send(RobotCommand::stop());
                Tick::Continue
            }
            Some(obj) => {
                let offset = obj.horizontal_offset;
                let direction = self.alignment.decide_direction(offset);
                let action = self.alignment.align_robot(
                    &mut ctx.alignment,
                    direction,
                    offset,
                    &mut self.link,
                    self.pacer.now(),
                );
                if let AlignAction::Corrected(d) = action {
                    ctx.report.corrections += 1;
                    tracing::debug!(offset, direction = ?d, "lateral correction");
                }
                if self.alignment.is_aligned(&ctx.alignment, offset) {
                    ctx.enter(PickState::MovingForward)
                } else {
                    Tick::Continue
                }
            }
        };
        self.pacer.wait(self.camera.frame_wait)?;
        Ok(tick)
    }

    fn tick_moving(&mut self, ctx: &mut PickContext) -> Result<Tick> {
        let outcome = self
            .approach
            .step(&mut ctx.approach, &ctx.profile, &mut self.link, &self.pacer)?;
        Ok(match outcome {
            ApproachOutcome::WithinReach { .. } => ctx.enter(PickState::CatchingClaw),
            ApproachOutcome::Advanced { .. } => {
                ctx.report.forward_steps += 1;
                Tick::Continue
            }
            ApproachOutcome::Realign { .. } => {
                ctx.report.forward_steps += 1;
                ctx.report.realignments += 1;
                ctx.enter(PickState::Aligning)
            }
        })
    }

    /// Align, approach and actuate for one target. The camera is opened for
    /// this object and released afterwards, also on error.
    pub fn pick(&mut self, target: &str) -> Result<ObjectReport> {
        let mut ctx = self.begin_object(target);
        if target.parse::<crate::class::ObjectClass>().is_err() {
            tracing::warn!(object = target, "target is not a class the detector reports");
        }
        tracing::info!(object = target, "starting pick");
        let started = self.pacer.now();
        self.open_camera()?;
        let result = loop {
            match self.tick(&mut ctx) {
                Ok(Tick::ObjectDone) => break Ok(()),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
        };
        self.frames.release();
        result?;
        ctx.report.elapsed = self.pacer.now().saturating_duration_since(started);
        tracing::info!(
            object = target,
            corrections = ctx.report.corrections,
            forward_steps = ctx.report.forward_steps,
            elapsed_ms = crate::util::duration_ms(ctx.report.elapsed),
            "object complete"
        );
        Ok(ctx.report)
    }

    /// Process every queued target in order, then shut down. On any error
    /// (cancellation included) the robot is stopped and resources released
    /// before the error is returned.
    pub fn run(&mut self, queue: &PickQueue) -> Result<RunSummary> {
        let started = self.pacer.now();
        let mut summary = RunSummary::default();
        if queue.is_empty() {
            tracing::error!("no objects to pick");
            self.shutdown();
            return Ok(summary);
        }
        if !self.link.is_open() {
            self.shutdown();
            return Err(eyre::Report::new(PickError::LinkClosed));
        }
        tracing::info!(objects = queue.len(), "starting run");
        for target in queue {
            match self.pick(target) {
                Ok(report) => summary.objects.push(report),
                Err(e) => {
                    self.shutdown();
                    return Err(e);
                }
            }
        }
        self.shutdown();
        summary.elapsed = self.pacer.now().saturating_duration_since(started);
        tracing::info!(picked = summary.picked(), "all objects processed");
        Ok(summary)
    }

    /// Stop the robot, release the camera and close the link. Safe to call
    /// more than once.
    pub fn shutdown(&mut self) {
        if self.link.is_open() {
            self.link.send(RobotCommand::stop());
        }
        self.frames.release();
        if let Err(e) = self.link.close() {
            tracing::warn!(error = %e, "error closing serial link");
        }
    }
}

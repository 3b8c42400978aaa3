//! Type-state builder for `PickStateMachine`.
//!
//! `build()` only exists once the serial link, frame source and detector are
//! provided. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use clawpick_traits::clock::Clock;
use clawpick_traits::{Detector, FrameSource, SerialLink};

use crate::actuation::ActuationSequencer;
use crate::alignment::{AlignmentCfg, AlignmentController};
use crate::approach::{ApproachCfg, ApproachController};
use crate::detection::DetectionFilter;
use crate::error::{BuildError, Result};
use crate::link::{LinkPolicy, SerialCommandLink};
use crate::machine::{CameraPolicy, PickStateMachine};
use crate::pacing::{Pacer, StopSignal};
use crate::profile::ClassTable;
use crate::ranging::RangingPolicy;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

#[derive(Default)]
struct Settings {
    alignment: Option<AlignmentCfg>,
    approach: Option<ApproachCfg>,
    ranging: Option<RangingPolicy>,
    link: Option<LinkPolicy>,
    camera: Option<CameraPolicy>,
    detection: Option<DetectionFilter>,
    classes: Option<ClassTable>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    stop: Option<StopSignal>,
}

pub struct PickerBuilder<L, F, D> {
    link: Option<Box<dyn SerialLink>>,
    frames: Option<Box<dyn FrameSource>>,
    detector: Option<Box<dyn Detector>>,
    settings: Settings,
    _l: PhantomData<L>,
    _f: PhantomData<F>,
    _d: PhantomData<D>,
}

impl Default for PickerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            link: None,
            frames: None,
            detector: None,
            settings: Settings::default(),
            _l: PhantomData,
            _f: PhantomData,
            _d: PhantomData,
        }
    }
}

impl PickStateMachine {
    pub fn builder() -> PickerBuilder<Missing, Missing, Missing> {
        PickerBuilder::default()
    }
}

fn invalid(msg: &'static str) -> Result<()> {
    Err(eyre::Report::new(BuildError::InvalidConfig(msg)))
}

fn validate(s: &Settings) -> Result<()> {
    if let Some(a) = &s.alignment {
        if !(a.min_pixel_distance > 0.0) {
            return invalid("alignment min_pixel_distance must be > 0");
        }
        if a.movement_duration_ms == 0 {
            return invalid("alignment movement_duration_ms must be >= 1");
        }
    }
    if let Some(r) = &s.ranging {
        if r.attempts == 0 {
            return invalid("ranging attempts must be >= 1");
        }
        if r.request.trim().is_empty() {
            return invalid("ranging request must not be empty");
        }
    }
    if let Some(c) = &s.camera
        && c.open_attempts == 0
    {
        return invalid("camera open_attempts must be >= 1");
    }
    if let Some(a) = &s.approach
        && !(a.far_multiplier >= 1.0)
    {
        return invalid("approach far_multiplier must be >= 1.0");
    }
    Ok(())
}

impl<L, F, D> PickerBuilder<L, F, D> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<PickStateMachine> {
        let link = self
            .link
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLink))?;
        let frames = self
            .frames
            .ok_or_else(|| eyre::Report::new(BuildError::MissingFrames))?;
        let detector = self
            .detector
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDetector))?;
        validate(&self.settings)?;

        let s = self.settings;
        let stop = s.stop.unwrap_or_default();
        let pacer = match s.clock {
            Some(clock) => Pacer::new(clock, stop),
            None => Pacer::realtime(stop),
        };
        Ok(PickStateMachine {
            link: SerialCommandLink::new(link).with_policy(s.link.unwrap_or_default(), pacer.clone()),
            frames,
            detector,
            alignment: AlignmentController::new(s.alignment.unwrap_or_default()),
            approach: ApproachController::new(
                s.approach.unwrap_or_default(),
                s.ranging.unwrap_or_default(),
            ),
            actuation: ActuationSequencer,
            detection: s.detection.unwrap_or_default(),
            classes: s.classes.unwrap_or_default(),
            camera: s.camera.unwrap_or_default(),
            pacer,
        })
    }

    fn retype<L2, F2, D2>(self) -> PickerBuilder<L2, F2, D2> {
        PickerBuilder {
            link: self.link,
            frames: self.frames,
            detector: self.detector,
            settings: self.settings,
            _l: PhantomData,
            _f: PhantomData,
            _d: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<L, F, D> PickerBuilder<L, F, D> {
    pub fn with_alignment(mut self, cfg: AlignmentCfg) -> Self {
        self.settings.alignment = Some(cfg);
        self
    }
    pub fn with_approach(mut self, cfg: ApproachCfg) -> Self {
        self.settings.approach = Some(cfg);
        self
    }
    pub fn with_ranging(mut self, policy: RangingPolicy) -> Self {
        self.settings.ranging = Some(policy);
        self
    }
    pub fn with_link_policy(mut self, policy: LinkPolicy) -> Self {
        self.settings.link = Some(policy);
        self
    }
    pub fn with_camera(mut self, policy: CameraPolicy) -> Self {
        self.settings.camera = Some(policy);
        self
    }
    pub fn with_detection(mut self, filter: DetectionFilter) -> Self {
        self.settings.detection = Some(filter);
        self
    }
    pub fn with_classes(mut self, classes: ClassTable) -> Self {
        self.settings.classes = Some(classes);
        self
    }
    /// Inject a clock (e.g., a virtual clock in tests and fast simulation).
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.settings.clock = Some(clock);
        self
    }
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.settings.stop = Some(stop);
        self
    }
}

// Setters that advance type-state
impl<F, D> PickerBuilder<Missing, F, D> {
    pub fn with_link(mut self, link: impl SerialLink + 'static) -> PickerBuilder<Set, F, D> {
        self.link = Some(Box::new(link));
        self.retype()
    }
}

impl<L, D> PickerBuilder<L, Missing, D> {
    pub fn with_frames(mut self, frames: impl FrameSource + 'static) -> PickerBuilder<L, Set, D> {
        self.frames = Some(Box::new(frames));
        self.retype()
    }
}

impl<L, F> PickerBuilder<L, F, Missing> {
    pub fn with_detector(mut self, detector: impl Detector + 'static) -> PickerBuilder<L, F, Set> {
        self.detector = Some(Box::new(detector));
        self.retype()
    }
}

impl PickerBuilder<Set, Set, Set> {
    /// Validate and build. Only available once link, frames and detector are set.
    pub fn build(self) -> Result<PickStateMachine> {
        self.try_build()
    }
}

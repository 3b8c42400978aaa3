//! Config-driven entry point used by the CLI.

use std::sync::Arc;

use clawpick_config::{Config, PickQueue};
use clawpick_traits::clock::Clock;
use clawpick_traits::{Detector, FrameSource, SerialLink};

use crate::alignment::AlignmentCfg;
use crate::approach::ApproachCfg;
use crate::detection::DetectionFilter;
use crate::error::{PickError, Result};
use crate::link::LinkPolicy;
use crate::machine::{CameraPolicy, PickStateMachine};
use crate::pacing::StopSignal;
use crate::profile::ClassTable;
use crate::ranging::RangingPolicy;
use crate::status::RunSummary;

/// Runtime settings resolved from a validated `Config`.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub alignment: AlignmentCfg,
    pub approach: ApproachCfg,
    pub ranging: RangingPolicy,
    pub link: LinkPolicy,
    pub camera: CameraPolicy,
    pub detection: DetectionFilter,
    pub classes: ClassTable,
}

impl RunParams {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        cfg.validate()
            .map_err(|e| eyre::Report::new(PickError::Config(e.to_string())))?;
        Ok(Self {
            alignment: (&cfg.alignment).into(),
            approach: ApproachCfg::try_from(&cfg.approach)?,
            ranging: (&cfg.ranging).into(),
            link: (&cfg.serial).into(),
            camera: (&cfg.camera).into(),
            detection: (&cfg.detection).into(),
            classes: ClassTable::try_from(cfg)?,
        })
    }
}

/// Hardware and clock for one run.
pub struct Backend {
    pub link: Box<dyn SerialLink>,
    pub frames: Box<dyn FrameSource>,
    pub detector: Box<dyn Detector>,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

/// Build the state machine and process `queue` to completion.
pub fn run(backend: Backend, params: RunParams, stop: StopSignal, queue: &PickQueue) -> Result<RunSummary> {
    let mut machine = PickStateMachine::builder()
        .with_link(backend.link)
        .with_frames(backend.frames)
        .with_detector(backend.detector)
        .with_clock(backend.clock)
        .with_stop_signal(stop)
        .with_alignment(params.alignment)
        .with_approach(params.approach)
        .with_ranging(params.ranging)
        .with_link_policy(params.link)
        .with_camera(params.camera)
        .with_detection(params.detection)
        .with_classes(params.classes)
        .build()?;
    machine.run(queue)
}

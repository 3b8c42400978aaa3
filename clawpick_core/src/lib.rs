#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core pick logic (hardware-agnostic).
//!
//! Drives a wheeled robot with a claw through one align → approach → catch
//! cycle per queued object. All hardware goes through the
//! `clawpick_traits::{SerialLink, FrameSource, Detector}` traits.
//!
//! ## Architecture
//!
//! - **Alignment**: rate-limited lateral corrections from pixel offsets (`alignment`)
//! - **Ranging**: distance request/response with a retrying decorator (`ranging`)
//! - **Approach**: three-tier forward-step policy gated by distance (`approach`)
//! - **Actuation**: per-class timed claw scripts (`actuation`, `profile`)
//! - **State machine**: per-object context and the run loop (`machine`)
//! - **Pacing**: every wait is cancellable through a `StopSignal` (`pacing`)
//!
//! Distances are carried in `f64` centimetres once they leave the sensor.

pub mod actuation;
pub mod alignment;
pub mod approach;
pub mod builder;
pub mod class;
pub mod command;
pub mod conversions;
pub mod detection;
pub mod error;
pub mod hw_error;
pub mod link;
pub mod machine;
pub mod pacing;
pub mod profile;
pub mod ranging;
pub mod runner;
pub mod status;
pub mod util;

pub use actuation::{ActuationReport, ActuationSequence, ActuationSequencer, ActuationStep};
pub use alignment::{
    AlignAction, AlignmentCfg, AlignmentController, AlignmentState, Direction, decide_direction,
};
pub use approach::{
    ApproachCfg, ApproachController, ApproachOutcome, ApproachState, DEFAULT_SCHEDULE,
    MovementSchedule,
};
pub use builder::PickerBuilder;
pub use class::ObjectClass;
pub use command::{RobotCommand, Verb};
pub use detection::{DetectedObject, DetectionFilter, center_offsets};
pub use error::{BuildError, PickError, Report, Result};
pub use link::{CommandSink, LinkPolicy, SerialCommandLink};
pub use machine::{CameraPolicy, PickContext, PickStateMachine};
pub use pacing::{Pacer, StopSignal};
pub use profile::{ClassProfile, ClassTable};
pub use ranging::{
    DistanceQuery, DistanceReading, ProbeOutcome, RangeProbe, RangingPolicy, classify_response,
    is_command_reply,
};
pub use runner::{Backend, RunParams, run};
pub use status::{ObjectReport, PickState, RunSummary, Tick};

//! Scripted grasp-and-stow sequences.

use std::time::Duration;

use crate::command::{RobotCommand, Verb};
use crate::error::Result;
use crate::link::CommandSink;
use crate::pacing::Pacer;

/// Send `verb duration_ms`, then wait `post_wait_ms` before the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationStep {
    pub verb: Verb,
    pub duration_ms: u64,
    pub post_wait_ms: u64,
}

impl ActuationStep {
    /// Step whose wait equals its own duration.
    pub const fn timed(verb: Verb, duration_ms: u64) -> Self {
        Self {
            verb,
            duration_ms,
            post_wait_ms: duration_ms,
        }
    }

    pub const fn with_wait(verb: Verb, duration_ms: u64, post_wait_ms: u64) -> Self {
        Self {
            verb,
            duration_ms,
            post_wait_ms,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActuationSequence {
    steps: Vec<ActuationStep>,
}

impl ActuationSequence {
    pub fn new(steps: Vec<ActuationStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[ActuationStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Sum of all post-step waits.
    pub fn total_wait(&self) -> Duration {
        Duration::from_millis(self.steps.iter().map(|s| s.post_wait_ms).sum())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuationReport {
    pub sent: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActuationSequencer;

impl ActuationSequencer {
    /// Run the script for `class_name`, strictly one step after another.
    ///
    /// A missing script is logged and sends nothing. Link failures are
    /// counted and the remaining steps still run; only cancellation stops
    /// the sequence early.
    pub fn run(
        &self,
        class_name: &str,
        sequence: Option<&ActuationSequence>,
        sink: &mut impl CommandSink,
        pacer: &Pacer,
    ) -> Result<ActuationReport> {
        let mut report = ActuationReport::default();
        let Some(sequence) = sequence.filter(|s| !s.is_empty()) else {
            tracing::error!(class = class_name, "no actuation sequence defined for class");
            return Ok(report);
        };
        tracing::info!(
            class = class_name,
            steps = sequence.len(),
            total_wait_ms = sequence.total_wait().as_millis() as u64,
            "running actuation sequence"
        );
        for step in sequence.steps() {
            if sink.send(RobotCommand::new(step.verb, step.duration_ms)) {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
            pacer.wait(Duration::from_millis(step.post_wait_ms))?;
        }
        Ok(report)
    }
}

//! Per-tick status and run reports returned by the state machine.

use std::fmt;
use std::time::Duration;

/// Phase of the current pick. `Aligning` is the entry state; `CatchingClaw`
/// finishes the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickState {
    Aligning,
    MovingForward,
    CatchingClaw,
}

impl PickState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aligning => "aligning",
            Self::MovingForward => "moving_forward",
            Self::CatchingClaw => "catching_claw",
        }
    }
}

impl fmt::Display for PickState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single control-loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Stayed in the same state.
    Continue,
    Transitioned { from: PickState, to: PickState },
    /// Actuation finished; the object is done.
    ObjectDone,
}

/// What happened while picking one queued object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectReport {
    pub target: String,
    pub corrections: u32,
    pub forward_steps: u32,
    pub realignments: u32,
    pub actuation_sent: usize,
    pub actuation_failed: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub objects: Vec<ObjectReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn picked(&self) -> usize {
        self.objects.len()
    }
}

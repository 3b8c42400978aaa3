//! Per-class policy table: distance gate, step budget, tier parameters and
//! the actuation script, looked up by class instead of branching on names.

use std::collections::BTreeMap;

use crate::actuation::{ActuationSequence, ActuationStep};
use crate::class::ObjectClass;
use crate::command::Verb;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassProfile {
    pub distance_threshold_mm: f64,
    pub steps_per_alignment: u32,
    pub tier_threshold_cm: f64,
    pub adjustment_factor: f64,
    pub actuation: ActuationSequence,
}

impl ClassProfile {
    pub const DEFAULT_TIER_THRESHOLD_CM: f64 = 10.0;
    pub const DEFAULT_ADJUSTMENT_FACTOR: f64 = 0.65;

    /// Profile for a name with no configuration: default gate and tiers, a
    /// single step per alignment and no script.
    pub fn fallback(distance_threshold_mm: f64) -> Self {
        Self {
            distance_threshold_mm,
            steps_per_alignment: 1,
            tier_threshold_cm: Self::DEFAULT_TIER_THRESHOLD_CM,
            adjustment_factor: Self::DEFAULT_ADJUSTMENT_FACTOR,
            actuation: ActuationSequence::default(),
        }
    }

    pub fn builtin(class: ObjectClass) -> Self {
        use Verb::{Catch, Down, Release, Right, Up};
        let t = ActuationStep::timed;
        let (threshold, steps, tier, factor, script) = match class {
            ObjectClass::Bottle => (
                80.0,
                1,
                10.0,
                0.65,
                vec![t(Catch, 2000), t(Catch, 3000), t(Up, 2000)],
            ),
            ObjectClass::Box => (75.0, 2, 10.0, 0.65, vec![t(Down, 1200), t(Release, 2500)]),
            ObjectClass::Cup => (
                105.0,
                1,
                10.0,
                0.65,
                vec![
                    ActuationStep::with_wait(Right, 250, 600),
                    ActuationStep::with_wait(Down, 1250, 1700),
                    t(Catch, 2500),
                    t(Catch, 3500),
                    t(Up, 2500),
                ],
            ),
            ObjectClass::Horn => (
                165.0,
                1,
                15.0,
                0.6,
                vec![
                    ActuationStep::with_wait(Down, 750, 1000),
                    t(Catch, 2000),
                    t(Catch, 3000),
                    t(Catch, 1000),
                    t(Up, 2300),
                ],
            ),
            ObjectClass::SmallBottle => (
                100.0,
                1,
                15.0,
                0.45,
                vec![t(Catch, 3000), t(Catch, 3000), t(Catch, 1000), t(Up, 3000)],
            ),
        };
        Self {
            distance_threshold_mm: threshold,
            steps_per_alignment: steps,
            tier_threshold_cm: tier,
            adjustment_factor: factor,
            actuation: ActuationSequence::new(script),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassTable {
    profiles: BTreeMap<ObjectClass, ClassProfile>,
    default_threshold_mm: f64,
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ClassTable {
    pub const DEFAULT_THRESHOLD_MM: f64 = 80.0;

    pub fn builtin() -> Self {
        Self {
            profiles: ObjectClass::ALL
                .into_iter()
                .map(|c| (c, ClassProfile::builtin(c)))
                .collect(),
            default_threshold_mm: Self::DEFAULT_THRESHOLD_MM,
        }
    }

    pub fn with_default_threshold_mm(mut self, mm: f64) -> Self {
        self.default_threshold_mm = mm;
        self
    }

    pub fn default_threshold_mm(&self) -> f64 {
        self.default_threshold_mm
    }

    pub fn get(&self, class: ObjectClass) -> Option<&ClassProfile> {
        self.profiles.get(&class)
    }

    pub fn get_mut(&mut self, class: ObjectClass) -> Option<&mut ClassProfile> {
        self.profiles.get_mut(&class)
    }

    pub fn insert(&mut self, class: ObjectClass, profile: ClassProfile) {
        self.profiles.insert(class, profile);
    }

    fn lookup(&self, name: &str) -> Option<&ClassProfile> {
        name.parse::<ObjectClass>().ok().and_then(|c| self.get(c))
    }

    /// Profile for a queue entry, falling back to defaults with a warning
    /// when the name has no configured profile.
    pub fn profile_for(&self, name: &str) -> ClassProfile {
        if let Some(p) = self.lookup(name) {
            return p.clone();
        }
        tracing::warn!(
            class = name,
            threshold_mm = self.default_threshold_mm,
            "no profile configured for class; using defaults"
        );
        ClassProfile::fallback(self.default_threshold_mm)
    }

    /// The configured script, if any, for a queue entry.
    pub fn actuation_for(&self, name: &str) -> Option<&ActuationSequence> {
        self.lookup(name).map(|p| &p.actuation).filter(|s| !s.is_empty())
    }
}

//! Object classes the detector reports, keyed by the model's class id.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectClass {
    Bottle,
    Box,
    Cup,
    Horn,
    SmallBottle,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown object class '{0}'")]
pub struct UnknownClass(pub String);

impl ObjectClass {
    pub const ALL: [Self; 5] = [
        Self::Bottle,
        Self::Box,
        Self::Cup,
        Self::Horn,
        Self::SmallBottle,
    ];

    /// Class id as emitted by the detection model.
    pub fn id(self) -> u8 {
        match self {
            Self::Bottle => 0,
            Self::Box => 1,
            Self::Cup => 2,
            Self::Horn => 3,
            Self::SmallBottle => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bottle => "bottle",
            Self::Box => "box",
            Self::Cup => "cup",
            Self::Horn => "horn",
            Self::SmallBottle => "small_bottle",
        }
    }
}

impl FromStr for ObjectClass {
    type Err = UnknownClass;

    /// Case-insensitive; surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownClass(s.to_string()))
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

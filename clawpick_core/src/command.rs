//! Motion commands understood by the robot firmware.
//!
//! Wire format: `<verb> <duration_ms>\n`, one command per line. `stop` always
//! carries a duration of 0.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Forward,
    Left,
    Right,
    Up,
    Down,
    Catch,
    Release,
    Stop,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown command verb '{0}'")]
pub struct UnknownVerb(pub String);

impl Verb {
    pub const ALL: [Self; 8] = [
        Self::Forward,
        Self::Left,
        Self::Right,
        Self::Up,
        Self::Down,
        Self::Catch,
        Self::Release,
        Self::Stop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::Catch => "catch",
            Self::Release => "release",
            Self::Stop => "stop",
        }
    }
}

impl FromStr for Verb {
    type Err = UnknownVerb;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownVerb(s.to_string()))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotCommand {
    verb: Verb,
    duration_ms: u64,
}

impl RobotCommand {
    pub fn new(verb: Verb, duration_ms: u64) -> Self {
        let duration_ms = if verb == Verb::Stop { 0 } else { duration_ms };
        Self { verb, duration_ms }
    }

    pub fn stop() -> Self {
        Self::new(Verb::Stop, 0)
    }

    pub fn forward(duration_ms: u64) -> Self {
        Self::new(Verb::Forward, duration_ms)
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Newline-terminated line as written to the serial link.
    pub fn wire_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb, self.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format() {
        assert_eq!(RobotCommand::forward(450).wire_line(), "forward 450\n");
        assert_eq!(RobotCommand::new(Verb::Left, 55).wire_line(), "left 55\n");
    }

    #[test]
    fn stop_always_carries_zero() {
        assert_eq!(RobotCommand::new(Verb::Stop, 900).wire_line(), "stop 0\n");
        assert_eq!(RobotCommand::stop().duration_ms(), 0);
    }

    #[test]
    fn verbs_parse() {
        assert_eq!("Catch".parse::<Verb>(), Ok(Verb::Catch));
        assert!("jump".parse::<Verb>().is_err());
    }
}

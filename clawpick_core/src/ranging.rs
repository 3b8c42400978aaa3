//! Distance queries over the shared serial link.
//!
//! A query clears both buffers, sends the request token and reads the
//! response line. Replies to earlier motion commands that arrive late
//! (`Error: Unknown command received.` for `stop`) are skipped. The
//! firmware answers a request with one of:
//! - `Distance (mm): <number>`
//! - `Distance: Out of range`
//! - anything containing `Error` (sensor fault)
//!
//! `DistanceQuery` retries transient failures (silence, garbage, link
//! faults) and collapses the outcome into a `DistanceReading`.

use std::time::Duration;

use clawpick_traits::{BoxError, SerialLink};

use crate::error::PickError;
use crate::link::SerialCommandLink;
use crate::pacing::Pacer;

/// Final result of a distance query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceReading {
    Millimeters(f64),
    /// Nothing within the sensor's range; treated as infinitely far.
    OutOfRange,
    /// Sensor fault or retries exhausted.
    Error,
}

impl DistanceReading {
    /// Centimetres, with out-of-range as +inf. `None` for `Error`.
    pub fn to_cm(self) -> Option<f64> {
        match self {
            Self::Millimeters(mm) => Some(crate::util::mm_to_cm(mm)),
            Self::OutOfRange => Some(f64::INFINITY),
            Self::Error => None,
        }
    }
}

/// What a single request/response exchange produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Millimeters(f64),
    OutOfRange,
    SensorError(String),
    Unrecognized(String),
    NoResponse,
}

const DISTANCE_PREFIX: &str = "Distance (mm):";
const OUT_OF_RANGE: &str = "Distance: Out of range";
const COMMAND_REPLIES: [&str; 2] = ["Error: Unknown command received.", "Error: Invalid command format."];
/// Late command replies skipped per exchange before the line is taken as the answer.
const MAX_STALE_REPLIES: usize = 4;

/// Classify one response line from the firmware. Any line mentioning
/// `Error` is a sensor fault, whatever prefix it carries.
pub fn classify_response(line: &str) -> ProbeOutcome {
    let line = line.trim();
    if line.contains("Error") {
        return ProbeOutcome::SensorError(line.to_string());
    }
    if let Some(rest) = line.strip_prefix(DISTANCE_PREFIX) {
        return match rest.trim().parse::<f64>() {
            Ok(mm) if mm.is_finite() && mm >= 0.0 => ProbeOutcome::Millimeters(mm),
            _ => ProbeOutcome::Unrecognized(line.to_string()),
        };
    }
    if line.starts_with(OUT_OF_RANGE) {
        return ProbeOutcome::OutOfRange;
    }
    ProbeOutcome::Unrecognized(line.to_string())
}

/// True for the firmware's answers to motion commands, which never answer
/// a distance request.
pub fn is_command_reply(line: &str) -> bool {
    let line = line.trim();
    COMMAND_REPLIES.iter().any(|r| line.starts_with(r))
}

/// One raw request/response exchange with the range sensor.
pub trait RangeProbe {
    fn probe(&mut self, request: &str, timeout: Duration) -> Result<ProbeOutcome, BoxError>;
}

impl<T: RangeProbe + ?Sized> RangeProbe for &mut T {
    fn probe(&mut self, request: &str, timeout: Duration) -> Result<ProbeOutcome, BoxError> {
        (**self).probe(request, timeout)
    }
}

impl<P: SerialLink> RangeProbe for SerialCommandLink<P> {
    fn probe(&mut self, request: &str, timeout: Duration) -> Result<ProbeOutcome, BoxError> {
        if !self.port.is_open() {
            return Err(Box::new(PickError::LinkClosed));
        }
        self.port.clear_buffers()?;
        self.port.write_all(format!("{request}\n").as_bytes())?;
        let mut skipped = 0;
        loop {
            let Some(line) = self.port.read_line(timeout)? else {
                return Ok(ProbeOutcome::NoResponse);
            };
            if is_command_reply(&line) {
                if skipped == MAX_STALE_REPLIES {
                    return Ok(ProbeOutcome::Unrecognized(line));
                }
                skipped += 1;
                tracing::debug!(line = %line, "skipping late command reply");
                continue;
            }
            tracing::debug!(response = %line, "range sensor response");
            return Ok(classify_response(&line));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangingPolicy {
    pub attempts: u32,
    pub retry_delay: Duration,
    pub response_timeout: Duration,
    pub request: String,
}

impl Default for RangingPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            retry_delay: Duration::from_millis(500),
            response_timeout: Duration::from_millis(2000),
            request: "distance".to_string(),
        }
    }
}

/// Retrying decorator around a `RangeProbe`.
pub struct DistanceQuery<'a, R: RangeProbe> {
    probe: R,
    policy: &'a RangingPolicy,
    pacer: &'a Pacer,
}

impl<'a, R: RangeProbe> DistanceQuery<'a, R> {
    pub fn new(probe: R, policy: &'a RangingPolicy, pacer: &'a Pacer) -> Self {
        Self {
            probe,
            policy,
            pacer,
        }
    }

    /// Query until a definite answer or the attempts run out.
    ///
    /// Only cancellation is an `Err`; every sensor-side failure ends in
    /// `DistanceReading::Error`.
    pub fn query_distance(&mut self) -> Result<DistanceReading, PickError> {
        let attempts = self.policy.attempts.max(1);
        for attempt in 1..=attempts {
            self.pacer.check()?;
            let outcome = match self
                .probe
                .probe(&self.policy.request, self.policy.response_timeout)
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(attempt, max_attempts = attempts, error = %e, "ranging request failed");
                    ProbeOutcome::NoResponse
                }
            };
            match outcome {
                ProbeOutcome::Millimeters(mm) => {
                    tracing::info!(distance_mm = mm, "distance measured");
                    return Ok(DistanceReading::Millimeters(mm));
                }
                ProbeOutcome::OutOfRange => {
                    tracing::warn!("distance sensor reports out of range");
                    return Ok(DistanceReading::OutOfRange);
                }
                ProbeOutcome::SensorError(msg) => {
                    tracing::error!(response = %msg, "distance sensor reported an error");
                    return Ok(DistanceReading::Error);
                }
                ProbeOutcome::Unrecognized(line) => {
                    tracing::warn!(attempt, max_attempts = attempts, response = %line, "unexpected ranging response");
                }
                ProbeOutcome::NoResponse => {
                    tracing::warn!(attempt, max_attempts = attempts, "no valid ranging response");
                }
            }
            if attempt < attempts {
                self.pacer.wait(self.policy.retry_delay)?;
            }
        }
        tracing::error!(attempts, "failed to get a valid distance reading");
        Ok(DistanceReading::Error)
    }
}

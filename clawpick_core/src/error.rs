use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PickError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("serial link could not be opened: {0}")]
    LinkOpen(String),
    #[error("serial link is not open")]
    LinkClosed,
    #[error("distance sensor gave no usable reading after {attempts} attempt(s)")]
    RangingFailed { attempts: u32 },
    #[error("camera could not be opened after {attempts} attempt(s)")]
    CameraUnavailable { attempts: u32 },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("run cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing serial link")]
    MissingLink,
    #[error("missing frame source")]
    MissingFrames,
    #[error("missing detector")]
    MissingDetector,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

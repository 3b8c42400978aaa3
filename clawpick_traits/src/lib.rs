//! Hardware seams shared by the controller and its backends.
//!
//! Everything the pick controller touches in the outside world goes through
//! one of these traits: the serial link to the microcontroller, the video
//! source, and the object detector. Errors crossing the boundary are boxed so
//! backends can surface their own typed errors.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Line-oriented serial transport to the robot's microcontroller.
pub trait SerialLink {
    /// Whether the underlying device is open and usable.
    fn is_open(&self) -> bool;

    /// Write all bytes, giving up after the backend's write timeout.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError>;

    /// Discard anything buffered in either direction.
    fn clear_buffers(&mut self) -> Result<(), BoxError>;

    /// Read one newline-terminated line (terminator and surrounding
    /// whitespace stripped). `Ok(None)` when nothing arrived before `timeout`.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, BoxError>;

    fn close(&mut self) -> Result<(), BoxError>;
}

/// One captured video frame. `data` is opaque to the controller; only the
/// detector interprets it.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

pub trait FrameSource {
    /// Try to open the device. Callers retry on failure.
    fn open(&mut self) -> Result<(), BoxError>;
    fn is_open(&self) -> bool;
    /// `Ok(None)` means the read failed transiently and may be retried.
    fn read_frame(&mut self) -> Result<Option<Frame>, BoxError>;
    fn release(&mut self);
}

/// Raw detector output, in pixel coordinates `[x1, y1, x2, y2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_id: u8,
    pub bbox: [f32; 4],
    pub confidence: f32,
}

pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, BoxError>;
}

impl<T: SerialLink + ?Sized> SerialLink for Box<T> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        (**self).write_all(bytes)
    }
    fn clear_buffers(&mut self) -> Result<(), BoxError> {
        (**self).clear_buffers()
    }
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, BoxError> {
        (**self).read_line(timeout)
    }
    fn close(&mut self) -> Result<(), BoxError> {
        (**self).close()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn open(&mut self) -> Result<(), BoxError> {
        (**self).open()
    }
    fn is_open(&self) -> bool {
        (**self).is_open()
    }
    fn read_frame(&mut self) -> Result<Option<Frame>, BoxError> {
        (**self).read_frame()
    }
    fn release(&mut self) {
        (**self).release()
    }
}

impl<T: Detector + ?Sized> Detector for Box<T> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, BoxError> {
        (**self).detect(frame)
    }
}

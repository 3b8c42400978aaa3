#![allow(dead_code)]
//! Scripted fakes shared by the integration tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use clawpick_core::{StopSignal, Pacer};
use clawpick_hardware::VirtualClock;
use clawpick_traits::{BoxError, Detector, Frame, FrameSource, RawDetection, SerialLink};

pub const WIDTH: u32 = 1920;
pub const HEIGHT: u32 = 1080;

/// Serial port that records every line written and answers `distance`
/// requests from a script. When the script runs dry the last reply repeats.
#[derive(Clone, Default)]
pub struct ScriptedSerial {
    pub lines: Rc<RefCell<Vec<String>>>,
    pub distance_replies: Rc<RefCell<VecDeque<Option<String>>>>,
    last_reply: Rc<RefCell<Option<String>>>,
    pending: Rc<RefCell<VecDeque<String>>>,
    in_flight: Rc<RefCell<VecDeque<String>>>,
    lagging: bool,
    pub closed: Rc<Cell<bool>>,
    pub fail_writes: Rc<Cell<bool>>,
}

impl ScriptedSerial {
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let s = Self::default();
        s.distance_replies
            .borrow_mut()
            .extend(replies.into_iter().map(|r| r.map(Into::into)));
        s
    }

    /// Behave like the board over a slow cable: `stop` is answered with
    /// `Error: Unknown command received.`, and every reply is still on the
    /// wire when the buffers are cleared, arriving at the next read.
    pub fn lagging(mut self) -> Self {
        self.lagging = true;
        self
    }

    fn reply(&self, line: String) {
        if self.lagging {
            self.in_flight.borrow_mut().push_back(line);
        } else {
            self.pending.borrow_mut().push_back(line);
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Lines other than ranging requests.
    pub fn commands(&self) -> Vec<String> {
        self.lines
            .borrow()
            .iter()
            .filter(|l| l.as_str() != "distance")
            .cloned()
            .collect()
    }
}

impl SerialLink for ScriptedSerial {
    fn is_open(&self) -> bool {
        !self.closed.get()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        if self.fail_writes.get() {
            return Err("write failed".into());
        }
        let text = String::from_utf8_lossy(bytes);
        for line in text.lines() {
            self.lines.borrow_mut().push(line.to_string());
            if line == "distance" {
                let next = self.distance_replies.borrow_mut().pop_front();
                let reply = match next {
                    Some(r) => {
                        *self.last_reply.borrow_mut() = r.clone();
                        r
                    }
                    None => self.last_reply.borrow().clone(),
                };
                if let Some(r) = reply {
                    self.reply(r);
                }
            } else if self.lagging && line.starts_with("stop") {
                self.reply("Error: Unknown command received.".to_string());
            }
        }
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), BoxError> {
        self.pending.borrow_mut().clear();
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>, BoxError> {
        let arrived: Vec<String> = self.in_flight.borrow_mut().drain(..).collect();
        self.pending.borrow_mut().extend(arrived);
        Ok(self.pending.borrow_mut().pop_front())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.closed.set(true);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct ScriptedCamera {
    pub open: Rc<Cell<bool>>,
    pub failures_left: Rc<Cell<u32>>,
    pub opens: Rc<Cell<u32>>,
    frames: Rc<Cell<u64>>,
}

impl ScriptedCamera {
    pub fn failing(times: u32) -> Self {
        let c = Self::default();
        c.failures_left.set(times);
        c
    }
}

impl FrameSource for ScriptedCamera {
    fn open(&mut self) -> Result<(), BoxError> {
        self.opens.set(self.opens.get() + 1);
        if self.failures_left.get() > 0 {
            self.failures_left.set(self.failures_left.get() - 1);
            return Err("camera busy".into());
        }
        self.open.set(true);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.get()
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, BoxError> {
        self.frames.set(self.frames.get() + 1);
        Ok(Some(Frame {
            index: self.frames.get(),
            width: WIDTH,
            height: HEIGHT,
            data: Vec::new(),
        }))
    }

    fn release(&mut self) {
        self.open.set(false);
    }
}

/// Reports one object of `class_id` per frame at the scripted horizontal
/// offsets (`None` = not detected). The last entry repeats.
#[derive(Clone)]
pub struct ScriptedDetector {
    pub class_id: u8,
    offsets: Rc<RefCell<VecDeque<Option<f32>>>>,
    last: Rc<Cell<Option<f32>>>,
    pub calls: Rc<Cell<u32>>,
    /// Raised after this many calls, if set.
    pub stop_after: Option<(u32, StopSignal)>,
}

impl ScriptedDetector {
    pub fn new(class_id: u8, offsets: impl IntoIterator<Item = Option<f32>>) -> Self {
        Self {
            class_id,
            offsets: Rc::new(RefCell::new(offsets.into_iter().collect())),
            last: Rc::new(Cell::new(None)),
            calls: Rc::new(Cell::new(0)),
            stop_after: None,
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, BoxError> {
        self.calls.set(self.calls.get() + 1);
        if let Some((n, stop)) = &self.stop_after
            && self.calls.get() >= *n
        {
            stop.raise();
        }
        let offset = match self.offsets.borrow_mut().pop_front() {
            Some(o) => {
                self.last.set(o);
                o
            }
            None => self.last.get(),
        };
        Ok(offset
            .map(|o| {
                let cx = frame.width as f32 / 2.0 + o;
                let cy = frame.height as f32 / 2.0;
                vec![RawDetection {
                    class_id: self.class_id,
                    bbox: [cx - 60.0, cy - 60.0, cx + 60.0, cy + 60.0],
                    confidence: 0.9,
                }]
            })
            .unwrap_or_default())
    }
}

pub fn virtual_pacer() -> (Pacer, VirtualClock, StopSignal) {
    let clock = VirtualClock::new();
    let stop = StopSignal::new();
    (Pacer::new(Arc::new(clock.clone()), stop.clone()), clock, stop)
}

//! Simulated robot: one shared world behind a serial link, a camera and a
//! detector, so commands sent over the link move what the camera sees.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clawpick_traits::{BoxError, Clock, Detector, Frame, FrameSource, RawDetection, SerialLink};

use crate::error::HwError;

/// How the simulated range sensor answers a `distance` request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangingMode {
    #[default]
    Normal,
    OutOfRange,
    Error,
    Silent,
}

impl std::str::FromStr for RangingMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "out_of_range" => Ok(Self::OutOfRange),
            "error" => Ok(Self::Error),
            "silent" => Ok(Self::Silent),
            other => Err(format!("unknown ranging mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimObject {
    pub class_id: u8,
    /// Horizontal offset of the object center from the frame center (px).
    pub offset_px: f32,
    pub distance_mm: f32,
    pub width_px: f32,
}

#[derive(Debug, Clone)]
pub struct SimParams {
    /// Lateral image shift per millisecond of left/right rotation.
    pub px_per_ms: f32,
    /// Forward travel per millisecond of `forward`.
    pub mm_per_ms: f32,
    /// Readings beyond this report "out of range".
    pub max_range_mm: f32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub ranging: RangingMode,
    /// Number of initial camera open attempts that fail.
    pub camera_open_failures: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            px_per_ms: 0.2,
            mm_per_ms: 0.1,
            max_range_mm: 2000.0,
            frame_width: 1920,
            frame_height: 1080,
            ranging: RangingMode::Normal,
            camera_open_failures: 0,
        }
    }
}

#[derive(Debug)]
struct WorldState {
    objects: Vec<SimObject>,
    params: SimParams,
    gripping: bool,
    replies: VecDeque<String>,
    received: Vec<String>,
    serial_open: bool,
    camera_open: bool,
    camera_failures_left: u32,
    frames: u64,
}

impl WorldState {
    fn most_centered(&self) -> Option<usize> {
        self.objects
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.offset_px.abs().total_cmp(&b.offset_px.abs()))
            .map(|(i, _)| i)
    }

    fn apply_line(&mut self, line: &str) {
        self.received.push(line.to_string());
        let mut parts = line.splitn(2, ' ');
        let verb = parts.next().unwrap_or_default();
        let Some(arg) = parts.next() else {
            if verb.eq_ignore_ascii_case("distance") {
                self.answer_distance();
            } else {
                self.replies
                    .push_back("Error: Invalid command format.".to_string());
            }
            return;
        };
        let ms = arg.trim().parse::<f32>().unwrap_or(0.0);
        let px = self.params.px_per_ms * ms;
        match verb {
            "left" => self.objects.iter_mut().for_each(|o| o.offset_px += px),
            "right" => self.objects.iter_mut().for_each(|o| o.offset_px -= px),
            "forward" => {
                let mm = self.params.mm_per_ms * ms;
                self.objects
                    .iter_mut()
                    .for_each(|o| o.distance_mm = (o.distance_mm - mm).max(0.0));
            }
            "catch" => self.gripping = true,
            "release" => self.gripping = false,
            "up" if self.gripping => {
                if let Some(i) = self.most_centered() {
                    let picked = self.objects.remove(i);
                    tracing::debug!(class_id = picked.class_id, "sim: object lifted");
                }
                self.gripping = false;
            }
            "up" | "down" => {}
            _ => self
                .replies
                .push_back("Error: Unknown command received.".to_string()),
        }
    }

    fn answer_distance(&mut self) {
        let reply = match self.params.ranging {
            RangingMode::Silent => return,
            RangingMode::Error => "Error: VL53L0X sensor not initialized".to_string(),
            RangingMode::OutOfRange => "Distance: Out of range".to_string(),
            RangingMode::Normal => match self.most_centered().map(|i| self.objects[i].distance_mm) {
                Some(mm) if mm <= self.params.max_range_mm => format!("Distance (mm): {}", mm.round()),
                _ => "Distance: Out of range".to_string(),
            },
        };
        self.replies.push_back(reply);
    }
}

/// Handle to the shared simulated world. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct SimWorld {
    inner: Rc<RefCell<WorldState>>,
}

impl SimWorld {
    pub fn new(objects: Vec<SimObject>, params: SimParams) -> Self {
        let camera_failures_left = params.camera_open_failures;
        Self {
            inner: Rc::new(RefCell::new(WorldState {
                objects,
                params,
                gripping: false,
                replies: VecDeque::new(),
                received: Vec::new(),
                serial_open: true,
                camera_open: false,
                camera_failures_left,
                frames: 0,
            })),
        }
    }

    pub fn serial(&self) -> SimulatedSerial {
        SimulatedSerial {
            world: self.clone(),
            pending: Vec::new(),
        }
    }

    pub fn camera(&self) -> SimulatedCamera {
        SimulatedCamera { world: self.clone() }
    }

    pub fn detector(&self) -> SimulatedDetector {
        SimulatedDetector { world: self.clone() }
    }

    /// Every line the simulated microcontroller received, in order.
    pub fn received(&self) -> Vec<String> {
        self.inner.borrow().received.clone()
    }

    pub fn objects(&self) -> Vec<SimObject> {
        self.inner.borrow().objects.clone()
    }

    pub fn camera_is_open(&self) -> bool {
        self.inner.borrow().camera_open
    }
}

pub struct SimulatedSerial {
    world: SimWorld,
    pending: Vec<u8>,
}

impl SerialLink for SimulatedSerial {
    fn is_open(&self) -> bool {
        self.world.inner.borrow().serial_open
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        if !self.is_open() {
            return Err(Box::new(HwError::NotOpen));
        }
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            self.world.inner.borrow_mut().apply_line(&line);
        }
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), BoxError> {
        self.pending.clear();
        self.world.inner.borrow_mut().replies.clear();
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>, BoxError> {
        if !self.is_open() {
            return Err(Box::new(HwError::NotOpen));
        }
        Ok(self.world.inner.borrow_mut().replies.pop_front())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.world.inner.borrow_mut().serial_open = false;
        Ok(())
    }
}

pub struct SimulatedCamera {
    world: SimWorld,
}

impl FrameSource for SimulatedCamera {
    fn open(&mut self) -> Result<(), BoxError> {
        let mut w = self.world.inner.borrow_mut();
        if w.camera_failures_left > 0 {
            w.camera_failures_left -= 1;
            return Err(Box::new(HwError::Camera("simulated open failure".into())));
        }
        w.camera_open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.world.inner.borrow().camera_open
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, BoxError> {
        let mut w = self.world.inner.borrow_mut();
        if !w.camera_open {
            return Err(Box::new(HwError::Camera("read on released camera".into())));
        }
        w.frames += 1;
        Ok(Some(Frame {
            index: w.frames,
            width: w.params.frame_width,
            height: w.params.frame_height,
            data: Vec::new(),
        }))
    }

    fn release(&mut self) {
        self.world.inner.borrow_mut().camera_open = false;
    }
}

pub struct SimulatedDetector {
    world: SimWorld,
}

impl Detector for SimulatedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, BoxError> {
        let w = self.world.inner.borrow();
        let half_w = frame.width as f32 / 2.0;
        let half_h = frame.height as f32 / 2.0;
        Ok(w.objects
            .iter()
            .filter(|o| o.offset_px.abs() < half_w)
            .map(|o| {
                let cx = half_w + o.offset_px;
                let half_box = o.width_px / 2.0;
                RawDetection {
                    class_id: o.class_id,
                    bbox: [cx - half_box, half_h - half_box, cx + half_box, half_h + half_box],
                    confidence: 0.9,
                }
            })
            .collect())
    }
}

/// Clock whose sleep advances simulated time instead of blocking.
///
/// now() = origin + offset
#[derive(Debug, Clone)]
pub struct VirtualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Total simulated time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }

    fn is_virtual(&self) -> bool {
        true
    }
}

//! Detection feed: frames and detections read as JSON lines from an
//! external detector process, standing in for the camera and the model.
//!
//! One line per frame:
//! `{"width":1920,"height":1080,"detections":[{"class_id":2,"bbox":[x1,y1,x2,y2],"confidence":0.9}]}`

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::rc::Rc;

use clawpick_core::StopSignal;
use clawpick_core::error::{PickError, Result};
use clawpick_traits::{BoxError, Detector, Frame, FrameSource, RawDetection};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FeedLine {
    width: u32,
    height: u32,
    #[serde(default)]
    detections: Vec<FeedDetection>,
}

#[derive(Debug, Deserialize)]
struct FeedDetection {
    class_id: u8,
    bbox: [f32; 4],
    confidence: f32,
}

impl From<FeedDetection> for RawDetection {
    fn from(d: FeedDetection) -> Self {
        RawDetection {
            class_id: d.class_id,
            bbox: d.bbox,
            confidence: d.confidence,
        }
    }
}

struct FeedState {
    reader: Box<dyn BufRead>,
    open: bool,
    ended: bool,
    index: u64,
    latest: Vec<RawDetection>,
    stop: StopSignal,
}

/// Shared handle; `frames()` and `detector()` read from the same stream.
#[derive(Clone)]
pub struct DetectionFeed {
    inner: Rc<RefCell<FeedState>>,
}

impl DetectionFeed {
    /// When the stream ends the stop signal is raised, which winds the run
    /// down like ctrl-c.
    pub fn from_reader(reader: impl BufRead + 'static, stop: StopSignal) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FeedState {
                reader: Box::new(reader),
                open: false,
                ended: false,
                index: 0,
                latest: Vec::new(),
                stop,
            })),
        }
    }

    /// `-` reads stdin.
    pub fn open_path(path: &Path, stop: StopSignal) -> Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Self::from_reader(std::io::stdin().lock(), stop));
        }
        let file = File::open(path).map_err(|e| {
            eyre::Report::new(PickError::Io(format!(
                "opening detection feed {}: {e}",
                path.display()
            )))
        })?;
        Ok(Self::from_reader(BufReader::new(file), stop))
    }

    pub fn frames(&self) -> FeedFrames {
        FeedFrames { feed: self.clone() }
    }

    pub fn detector(&self) -> FeedDetector {
        FeedDetector { feed: self.clone() }
    }
}

pub struct FeedFrames {
    feed: DetectionFeed,
}

impl FrameSource for FeedFrames {
    fn open(&mut self) -> std::result::Result<(), BoxError> {
        self.feed.inner.borrow_mut().open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.feed.inner.borrow().open
    }

    fn read_frame(&mut self) -> std::result::Result<Option<Frame>, BoxError> {
        let mut st = self.feed.inner.borrow_mut();
        if !st.open {
            return Err("detection feed is released".into());
        }
        if st.ended {
            return Ok(None);
        }
        let mut line = String::new();
        loop {
            line.clear();
            if st.reader.read_line(&mut line)? == 0 {
                st.ended = true;
                tracing::warn!(frames = st.index, "detection feed ended; stopping");
                st.stop.raise();
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }
        let parsed: FeedLine = serde_json::from_str(line.trim())?;
        st.index += 1;
        st.latest = parsed.detections.into_iter().map(RawDetection::from).collect();
        Ok(Some(Frame {
            index: st.index,
            width: parsed.width,
            height: parsed.height,
            data: Vec::new(),
        }))
    }

    fn release(&mut self) {
        self.feed.inner.borrow_mut().open = false;
    }
}

pub struct FeedDetector {
    feed: DetectionFeed,
}

impl Detector for FeedDetector {
    fn detect(&mut self, frame: &Frame) -> std::result::Result<Vec<RawDetection>, BoxError> {
        let st = self.feed.inner.borrow();
        if frame.index == st.index {
            Ok(st.latest.clone())
        } else {
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn feed(text: &str) -> (DetectionFeed, StopSignal) {
        let stop = StopSignal::new();
        (DetectionFeed::from_reader(Cursor::new(text.to_string()), stop.clone()), stop)
    }

    #[test]
    fn frames_carry_their_detections() {
        let (feed, _stop) = feed(concat!(
            r#"{"width":640,"height":480,"detections":[{"class_id":2,"bbox":[300,200,340,260],"confidence":0.8}]}"#,
            "\n\n",
            r#"{"width":640,"height":480}"#,
            "\n"
        ));
        let mut frames = feed.frames();
        let mut det = feed.detector();
        frames.open().unwrap();

        let f1 = frames.read_frame().unwrap().unwrap();
        assert_eq!((f1.index, f1.width, f1.height), (1, 640, 480));
        let d1 = det.detect(&f1).unwrap();
        assert_eq!(d1.len(), 1);
        assert_eq!(d1[0].class_id, 2);

        let f2 = frames.read_frame().unwrap().unwrap();
        assert!(det.detect(&f2).unwrap().is_empty());
        // A stale frame gets nothing.
        assert!(det.detect(&f1).unwrap().is_empty());
    }

    #[test]
    fn end_of_stream_raises_stop() {
        let (feed, stop) = feed("");
        let mut frames = feed.frames();
        frames.open().unwrap();
        assert!(frames.read_frame().unwrap().is_none());
        assert!(stop.is_raised());
    }

    #[test]
    fn malformed_line_is_an_error_and_skipped() {
        let (feed, _stop) = feed("not json\n{\"width\":10,\"height\":10}\n");
        let mut frames = feed.frames();
        frames.open().unwrap();
        assert!(frames.read_frame().is_err());
        assert_eq!(frames.read_frame().unwrap().unwrap().index, 1);
    }

    #[test]
    fn released_feed_refuses_reads() {
        let (feed, _stop) = feed("{\"width\":10,\"height\":10}\n");
        let mut frames = feed.frames();
        assert!(frames.read_frame().is_err());
        frames.open().unwrap();
        frames.release();
        assert!(!frames.is_open());
    }
}

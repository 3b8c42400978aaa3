//! Turning raw detector output into targets with pixel offsets.

use clawpick_traits::{Frame, RawDetection};

use crate::class::ObjectClass;

/// A detection of a known class with its offset from the reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedObject {
    pub class: ObjectClass,
    pub bbox: [f32; 4],
    pub confidence: f32,
    /// Box center x minus reference x. Positive means right of center.
    pub horizontal_offset: f32,
    /// Box center y minus reference y. Positive means below center.
    pub vertical_offset: f32,
}

/// Offsets of a box center from `(width / 2 + center_offset_px, height / 2)`.
pub fn center_offsets(bbox: [f32; 4], width: u32, height: u32, center_offset_px: f32) -> (f32, f32) {
    let [x1, y1, x2, y2] = bbox;
    let cx = (x1 + x2) / 2.0;
    let cy = (y1 + y2) / 2.0;
    let ref_x = width as f32 / 2.0 + center_offset_px;
    let ref_y = height as f32 / 2.0;
    (cx - ref_x, cy - ref_y)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionFilter {
    pub confidence_threshold: f32,
    pub center_offset_px: f32,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            center_offset_px: 0.0,
        }
    }
}

impl DetectionFilter {
    /// Detections above the confidence threshold whose class id is known.
    pub fn objects(&self, frame: &Frame, raw: &[RawDetection]) -> Vec<DetectedObject> {
        raw.iter()
            .filter(|d| d.confidence > self.confidence_threshold)
            .filter_map(|d| {
                let class = ObjectClass::from_id(d.class_id)?;
                let (h, v) = center_offsets(d.bbox, frame.width, frame.height, self.center_offset_px);
                Some(DetectedObject {
                    class,
                    bbox: d.bbox,
                    confidence: d.confidence,
                    horizontal_offset: h,
                    vertical_offset: v,
                })
            })
            .collect()
    }

    /// Highest-confidence detection whose class name matches `target`
    /// (case-insensitive).
    pub fn best_match(&self, frame: &Frame, raw: &[RawDetection], target: &str) -> Option<DetectedObject> {
        let target = target.trim();
        self.objects(frame, raw)
            .into_iter()
            .filter(|o| o.class.name().eq_ignore_ascii_case(target))
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame {
            index: 1,
            width: 1920,
            height: 1080,
            data: Vec::new(),
        }
    }

    fn det(class_id: u8, cx: f32, confidence: f32) -> RawDetection {
        RawDetection {
            class_id,
            bbox: [cx - 50.0, 490.0, cx + 50.0, 590.0],
            confidence,
        }
    }

    #[test]
    fn offsets_are_measured_from_shifted_center() {
        assert_eq!(center_offsets([1000.0, 500.0, 1040.0, 580.0], 1920, 1080, 0.0), (60.0, 0.0));
        assert_eq!(center_offsets([1000.0, 500.0, 1040.0, 580.0], 1920, 1080, 20.0), (40.0, 0.0));
    }

    #[test]
    fn filters_by_confidence_and_class() {
        let f = DetectionFilter::default();
        let raw = [det(2, 1000.0, 0.9), det(2, 900.0, 0.4), det(9, 960.0, 0.99)];
        let objs = f.objects(&frame(), &raw);
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0].class, ObjectClass::Cup);
        assert_eq!(objs[0].horizontal_offset, 40.0);
    }

    #[test]
    fn best_match_prefers_highest_confidence() {
        let f = DetectionFilter::default();
        let raw = [det(2, 1000.0, 0.7), det(2, 900.0, 0.95), det(0, 960.0, 0.99)];
        let best = f.best_match(&frame(), &raw, "CUP").unwrap();
        assert_eq!(best.horizontal_offset, -60.0);
        assert!(f.best_match(&frame(), &raw, "horn").is_none());
    }
}

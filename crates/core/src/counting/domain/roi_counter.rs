use crate::detection::domain::detection::Detection;
use crate::shared::roi::Roi;

use super::frame_result::{CountStatus, FrameResult, RetainedDetection};
use super::target_class::TargetClass;

/// Keeps target-class survivors whose center lies strictly inside the ROI.
///
/// Containment is tested on the center point only; how much of the box
/// sticks out of the ROI does not matter. Every frame is counted on its
/// own, with no identity carried between frames.
#[derive(Clone, Debug)]
pub struct RoiCounter {
    roi: Roi,
    target: TargetClass,
}

impl RoiCounter {
    pub fn new(roi: Roi, target: TargetClass) -> Self {
        Self { roi, target }
    }

    pub fn roi(&self) -> &Roi {
        &self.roi
    }

    pub fn target(&self) -> &TargetClass {
        &self.target
    }

    /// `survivors` are indices into `candidates`, in the order to report.
    pub fn count(
        &self,
        frame_index: usize,
        candidates: &[Detection],
        survivors: &[usize],
    ) -> FrameResult {
        if !self.target.is_known() {
            return FrameResult::empty(frame_index, CountStatus::UnknownTargetClass);
        }
        if survivors.is_empty() {
            return FrameResult::empty(frame_index, CountStatus::NoSurvivors);
        }

        let retained: Vec<RetainedDetection> = survivors
            .iter()
            .filter_map(|&i| candidates.get(i))
            .filter(|d| self.target.matches(d.class_id))
            .filter(|d| self.roi.contains_strict(d.center_x, d.center_y))
            .map(|d| RetainedDetection {
                bbox: d.bounding_box(),
                center: d.center(),
                class_id: d.class_id,
                confidence: d.confidence,
            })
            .collect();

        FrameResult {
            frame_index,
            count: retained.len(),
            retained,
            status: CountStatus::Counted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::label_vocabulary::LabelVocabulary;
    use rstest::rstest;

    const PERSON: usize = 0;
    const CAR: usize = 2;

    fn coco() -> LabelVocabulary {
        LabelVocabulary::parse("person\nbicycle\ncar\n").unwrap()
    }

    fn counter(roi: Roi, target: &str) -> RoiCounter {
        RoiCounter::new(roi, TargetClass::resolve(target, &coco()))
    }

    fn det(cx: f64, cy: f64, class_id: usize, confidence: f64) -> Detection {
        Detection {
            center_x: cx,
            center_y: cy,
            width: 20.0,
            height: 40.0,
            class_id,
            confidence,
        }
    }

    fn all(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn test_counts_target_inside_roi() {
        let roi = Roi::new(100, 100, 200, 200).unwrap();
        let dets = vec![
            det(150.0, 150.0, PERSON, 0.9),
            det(250.0, 250.0, PERSON, 0.8),
            det(50.0, 50.0, PERSON, 0.95),
        ];
        let result = counter(roi, "person").count(7, &dets, &all(3));
        assert_eq!(result.count, 2);
        assert_eq!(result.frame_index, 7);
        assert_eq!(result.status, CountStatus::Counted);
        assert_eq!(result.retained[0].center, (150.0, 150.0));
        assert_eq!(result.retained[1].center, (250.0, 250.0));
    }

    #[test]
    fn test_other_classes_ignored() {
        let roi = Roi::full_frame(640, 480).unwrap();
        let dets = vec![det(320.0, 240.0, CAR, 0.9), det(100.0, 100.0, PERSON, 0.9)];
        let result = counter(roi, "car").count(0, &dets, &all(2));
        assert_eq!(result.count, 1);
        assert_eq!(result.retained[0].class_id, CAR);
    }

    #[test]
    fn test_only_survivors_are_considered() {
        let roi = Roi::full_frame(640, 480).unwrap();
        let dets = vec![det(100.0, 100.0, PERSON, 0.9), det(102.0, 101.0, PERSON, 0.7)];
        let result = counter(roi, "person").count(0, &dets, &[0]);
        assert_eq!(result.count, 1);
        assert_eq!(result.retained[0].confidence, 0.9);
    }

    #[test]
    fn test_retained_follow_survivor_order() {
        let roi = Roi::full_frame(640, 480).unwrap();
        let dets = vec![det(100.0, 100.0, PERSON, 0.6), det(300.0, 300.0, PERSON, 0.9)];
        let result = counter(roi, "person").count(0, &dets, &[1, 0]);
        assert_eq!(result.retained[0].confidence, 0.9);
        assert_eq!(result.retained[1].confidence, 0.6);
    }

    #[test]
    fn test_no_survivors_is_distinguishable_zero() {
        let roi = Roi::full_frame(640, 480).unwrap();
        let result = counter(roi, "person").count(3, &[], &[]);
        assert_eq!(result, FrameResult::empty(3, CountStatus::NoSurvivors));
    }

    #[test]
    fn test_unknown_target_is_distinguishable_zero() {
        let roi = Roi::full_frame(640, 480).unwrap();
        let dets = vec![det(320.0, 240.0, PERSON, 0.9)];
        let result = counter(roi, "Person").count(0, &dets, &[0]);
        assert_eq!(result.count, 0);
        assert_eq!(result.status, CountStatus::UnknownTargetClass);
    }

    #[test]
    fn test_zero_count_with_survivors_is_counted() {
        let roi = Roi::new(0, 0, 10, 10).unwrap();
        let dets = vec![det(320.0, 240.0, PERSON, 0.9)];
        let result = counter(roi, "person").count(0, &dets, &[0]);
        assert_eq!(result.count, 0);
        assert_eq!(result.status, CountStatus::Counted);
    }

    #[rstest]
    #[case::top_left_corner(100.0, 100.0)]
    #[case::left_edge(100.0, 150.0)]
    #[case::top_edge(150.0, 100.0)]
    #[case::right_edge(300.0, 150.0)]
    #[case::bottom_edge(150.0, 300.0)]
    fn test_center_on_roi_boundary_excluded(#[case] cx: f64, #[case] cy: f64) {
        let roi = Roi::new(100, 100, 200, 200).unwrap();
        let result = counter(roi, "person").count(0, &[det(cx, cy, PERSON, 0.9)], &[0]);
        assert_eq!(result.count, 0);
    }

    #[test]
    fn test_box_sticking_out_still_counts() {
        // center inside, box much wider than the ROI
        let roi = Roi::new(100, 100, 20, 20).unwrap();
        let mut d = det(110.0, 110.0, PERSON, 0.9);
        d.width = 400.0;
        d.height = 400.0;
        let result = counter(roi, "person").count(0, &[d], &[0]);
        assert_eq!(result.count, 1);
    }

    #[test]
    fn test_count_never_exceeds_target_survivors() {
        let roi = Roi::full_frame(640, 480).unwrap();
        let dets: Vec<Detection> = (0..12)
            .map(|i| det(10.0 + i as f64 * 50.0, 240.0, i % 3, 0.9))
            .collect();
        let survivors = all(dets.len());
        let result = counter(roi, "person").count(0, &dets, &survivors);
        let target_survivors = survivors
            .iter()
            .filter(|&&i| dets[i].class_id == PERSON)
            .count();
        assert!(result.count <= target_survivors);
        assert_eq!(result.count, result.retained.len());
    }

    #[test]
    fn test_out_of_range_survivor_index_ignored() {
        let roi = Roi::full_frame(640, 480).unwrap();
        let dets = vec![det(320.0, 240.0, PERSON, 0.9)];
        let result = counter(roi, "person").count(0, &dets, &[0, 5]);
        assert_eq!(result.count, 1);
    }
}

use crate::counting::domain::frame_result::FrameResult;
use crate::shared::frame::Frame;
use crate::shared::roi::Roi;

/// Domain interface for drawing a frame's counting result onto the frame.
///
/// Implementations modify the frame in-place (`&mut Frame`) and must leave
/// pixels outside the drawn shapes untouched.
pub trait FrameAnnotator: Send {
    fn annotate(
        &self,
        frame: &mut Frame,
        roi: &Roi,
        result: &FrameResult,
        target_class: &str,
    ) -> Result<(), Box<dyn std::error::Error>>;
}

/// Text drawn above each retained box.
pub fn detection_label(class_name: &str, confidence: f64) -> String {
    format!("{class_name}: {confidence:.4}")
}

/// Text drawn in the top-left corner of every annotated frame.
pub fn summary_text(class_name: &str, count: usize) -> String {
    format!("Total no. of {class_name} in ROI: {count}")
}

/// Stable box color for a class id, the same for every frame and run.
pub fn class_color(class_id: usize) -> [u8; 3] {
    // splitmix64 finalizer
    let mut z = (class_id as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    [(z >> 16) as u8, (z >> 8) as u8, z as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_label_four_decimals() {
        assert_eq!(detection_label("person", 0.87654), "person: 0.8765");
        assert_eq!(detection_label("car", 1.0), "car: 1.0000");
    }

    #[test]
    fn test_summary_text() {
        assert_eq!(summary_text("person", 3), "Total no. of person in ROI: 3");
        assert_eq!(summary_text("car", 0), "Total no. of car in ROI: 0");
    }

    #[test]
    fn test_class_color_is_deterministic() {
        assert_eq!(class_color(0), class_color(0));
        assert_eq!(class_color(79), class_color(79));
    }

    #[test]
    fn test_class_colors_differ_between_classes() {
        let colors: Vec<[u8; 3]> = (0..80).map(class_color).collect();
        let distinct = colors
            .iter()
            .enumerate()
            .filter(|(i, c)| !colors[..*i].contains(c))
            .count();
        assert_eq!(distinct, 80);
    }
}

use serde::Serialize;

use crate::detection::domain::detection::BoundingBox;

/// Why a frame ended up with the count it has.
///
/// Distinguishes a genuine zero from the cases where nothing could have
/// been counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountStatus {
    /// At least one detection survived suppression and was tested.
    Counted,
    /// Suppression left nothing to test.
    NoSurvivors,
    /// The target class is not in the label vocabulary.
    UnknownTargetClass,
}

/// A detection of the target class whose center is inside the ROI.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RetainedDetection {
    pub bbox: BoundingBox,
    pub center: (f64, f64),
    pub class_id: usize,
    pub confidence: f64,
}

/// Counting outcome for one frame. Not carried across frames.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameResult {
    pub frame_index: usize,
    pub retained: Vec<RetainedDetection>,
    pub count: usize,
    pub status: CountStatus,
}

impl FrameResult {
    pub fn empty(frame_index: usize, status: CountStatus) -> Self {
        Self {
            frame_index,
            retained: Vec::new(),
            count: 0,
            status,
        }
    }
}

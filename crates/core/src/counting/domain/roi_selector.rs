use crate::shared::frame::Frame;
use crate::shared::roi::Roi;

/// Chooses the counting region once, looking at the first frame.
///
/// May block (e.g. waiting on an operator). The returned ROI is fixed for
/// the rest of the run.
pub trait RoiSelector: Send {
    fn select(&mut self, first_frame: &Frame) -> Result<Roi, Box<dyn std::error::Error>>;
}

/// A region decided up front, e.g. from `--roi`.
pub struct FixedRoiSelector {
    roi: Roi,
}

impl FixedRoiSelector {
    pub fn new(roi: Roi) -> Self {
        Self { roi }
    }
}

impl RoiSelector for FixedRoiSelector {
    fn select(&mut self, _first_frame: &Frame) -> Result<Roi, Box<dyn std::error::Error>> {
        Ok(self.roi)
    }
}

/// Counts over the whole frame.
pub struct FullFrameRoiSelector;

impl RoiSelector for FullFrameRoiSelector {
    fn select(&mut self, first_frame: &Frame) -> Result<Roi, Box<dyn std::error::Error>> {
        Ok(Roi::full_frame(first_frame.width(), first_frame.height())?)
    }
}

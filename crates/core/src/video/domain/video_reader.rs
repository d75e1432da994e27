use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Source of frames for the counting loop: a video file or a single image.
///
/// Frames are yielded in decode order with consecutive indices starting at 0.
/// Running out of frames is normal termination, not an error.
pub trait VideoReader: Send {
    /// Opens the source and reports its dimensions, rate and (if known) length.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Safe to call more than once, and without a prior `open`.
    fn close(&mut self);
}

use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Sink for annotated frames.
///
/// Opened lazily with the dimensions of the first frame; every later frame
/// must have the same size.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes and finalizes the output. A no-op when nothing was opened.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

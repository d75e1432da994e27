use std::path::{Path, PathBuf};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Writes the single annotated frame of an image input with the `image`
/// crate; the format follows the output file extension.
#[derive(Default)]
pub struct ImageFileWriter {
    target: Option<PathBuf>,
    written: bool,
}

impl ImageFileWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoWriter for ImageFileWriter {
    fn open(
        &mut self,
        path: &Path,
        _metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.target = Some(path.to_path_buf());
        self.written = false;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let path = self.target.as_ref().ok_or("ImageFileWriter: not opened")?;
        if self.written {
            return Err(format!("{} already holds a frame", path.display()).into());
        }
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;
        img.save(path)?;
        self.written = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.target = None;
        Ok(())
    }
}

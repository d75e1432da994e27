use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// `None` when the container does not report a frame count.
    pub total_frames: Option<usize>,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Total for progress reporting; 0 when unknown.
    pub fn progress_total(&self) -> usize {
        self.total_frames.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(total_frames: Option<usize>) -> VideoMetadata {
        VideoMetadata {
            width: 1920,
            height: 1080,
            fps: 30.0,
            total_frames,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/walkers.mp4")),
        }
    }

    #[test]
    fn test_known_frame_count() {
        assert_eq!(meta(Some(900)).progress_total(), 900);
    }

    #[test]
    fn test_unknown_frame_count_reports_zero_total() {
        let m = meta(None);
        assert!(m.total_frames.is_none());
        assert_eq!(m.progress_total(), 0);
    }
}

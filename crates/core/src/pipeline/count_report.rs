use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::shared::counting_config::CountingConfig;

use super::count_objects_use_case::RunSummary;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write counts report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize counts report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// JSON document written by `--counts-json`.
#[derive(Serialize)]
pub struct CountReport<'a> {
    pub source: Option<&'a Path>,
    pub config: &'a CountingConfig,
    pub peak_count: usize,
    pub mean_count: f64,
    #[serde(flatten)]
    pub summary: &'a RunSummary,
}

impl<'a> CountReport<'a> {
    pub fn new(source: Option<&'a Path>, config: &'a CountingConfig, summary: &'a RunSummary) -> Self {
        Self {
            source,
            config,
            peak_count: summary.peak_count(),
            mean_count: summary.mean_count(),
            summary,
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let io_err = |source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, self)?;
        out.write_all(b"\n").map_err(io_err)?;
        out.flush().map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::domain::frame_result::CountStatus;
    use crate::pipeline::count_objects_use_case::{FinishReason, FrameCount};
    use crate::shared::roi::Roi;

    fn summary() -> RunSummary {
        RunSummary {
            target_class: "person".to_string(),
            roi: Some(Roi::new(10, 20, 300, 200).unwrap()),
            frames_processed: 2,
            finish_reason: FinishReason::Cancelled,
            frames: vec![
                FrameCount {
                    frame_index: 0,
                    count: 3,
                    status: CountStatus::Counted,
                },
                FrameCount {
                    frame_index: 1,
                    count: 0,
                    status: CountStatus::NoSurvivors,
                },
            ],
        }
    }

    #[test]
    fn test_json_layout() {
        let config = CountingConfig::default();
        let summary = summary();
        let report = CountReport::new(Some(Path::new("walkers.mp4")), &config, &summary);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["source"], "walkers.mp4");
        assert_eq!(value["target_class"], "person");
        assert_eq!(value["finish_reason"], "cancelled");
        assert_eq!(value["peak_count"], 3);
        assert_eq!(value["mean_count"], 1.5);
        assert_eq!(value["roi"]["x"], 10);
        assert_eq!(value["roi"]["height"], 200);
        assert_eq!(value["config"]["confidence_threshold"], 0.5);
        assert_eq!(value["config"]["score_layout"], "class_scores");
        assert_eq!(value["frames"][1]["status"], "no_survivors");
        assert_eq!(value["frames"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counts.json");
        let config = CountingConfig::default();
        let summary = summary();
        CountReport::new(None, &config, &summary)
            .write_to(&path)
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["source"].is_null());
        assert_eq!(value["frames_processed"], 2);
    }

    #[test]
    fn test_write_to_missing_dir_is_io_error() {
        let config = CountingConfig::default();
        let summary = summary();
        let err = CountReport::new(None, &config, &summary)
            .write_to(Path::new("/nonexistent/dir/counts.json"))
            .unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));
    }
}

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::detection::Detection;
use super::object_detector::OutputTensor;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("output rows have {columns} columns, need at least {required} for the {layout:?} layout")]
    RowTooShort {
        columns: usize,
        required: usize,
        layout: ScoreLayout,
    },
}

/// Column layout of one anchor row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLayout {
    /// `[cx, cy, w, h, score_0 .. score_n]`
    #[default]
    ClassScores,
    /// `[cx, cy, w, h, objectness, score_0 .. score_n]`; objectness is ignored.
    WithObjectness,
}

impl ScoreLayout {
    pub fn class_offset(self) -> usize {
        match self {
            ScoreLayout::ClassScores => 4,
            ScoreLayout::WithObjectness => 5,
        }
    }
}

/// Turns raw per-anchor detector rows into pixel-space [`Detection`]s.
///
/// Box coordinates in the tensor are normalized to `[0, 1]` and are scaled
/// by the frame size. Rows whose best class score is not strictly above the
/// confidence threshold are dropped.
#[derive(Clone, Debug)]
pub struct DetectionDecoder {
    confidence_threshold: f64,
    layout: ScoreLayout,
}

impl DetectionDecoder {
    pub fn new(confidence_threshold: f64, layout: ScoreLayout) -> Self {
        Self {
            confidence_threshold,
            layout,
        }
    }

    pub fn decode(
        &self,
        outputs: &[OutputTensor],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Detection>, DecodeError> {
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let offset = self.layout.class_offset();

        let mut candidates = Vec::new();
        for output in outputs {
            if output.nrows() == 0 {
                continue;
            }
            if output.ncols() <= offset {
                return Err(DecodeError::RowTooShort {
                    columns: output.ncols(),
                    required: offset + 1,
                    layout: self.layout,
                });
            }

            for row in output.rows() {
                let Some((class_id, score)) = best_class(row.slice(ndarray::s![offset..])) else {
                    continue;
                };
                let confidence = score as f64;
                if confidence <= self.confidence_threshold {
                    continue;
                }
                candidates.push(Detection {
                    center_x: row[0] as f64 * fw,
                    center_y: row[1] as f64 * fh,
                    width: (row[2] as f64 * fw).max(0.0),
                    height: (row[3] as f64 * fh).max(0.0),
                    class_id,
                    confidence,
                });
            }
        }
        Ok(candidates)
    }
}

/// Index and value of the highest score; the first index wins ties.
fn best_class(scores: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if s <= b => {}
            _ if s.is_nan() => {}
            _ => best = Some((i, s)),
        }
    }
    best
}

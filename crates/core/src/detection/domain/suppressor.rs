use super::detection::{BoundingBox, Detection};

/// Reduces a candidate list to the indices worth keeping.
pub trait Suppressor: Send {
    fn suppress(&self, candidates: &[Detection]) -> Vec<usize>;
}

/// Greedy non-maximum suppression over integer bounding boxes.
///
/// Candidates at or below `score_threshold` are ignored. The rest are
/// visited by descending confidence (original order on ties); each kept
/// box removes every remaining box whose IoU with it exceeds
/// `overlap_threshold`. Indices come back in keep order.
#[derive(Clone, Debug)]
pub struct GreedyNms {
    score_threshold: f64,
    overlap_threshold: f64,
}

impl GreedyNms {
    pub fn new(score_threshold: f64, overlap_threshold: f64) -> Self {
        Self {
            score_threshold,
            overlap_threshold,
        }
    }
}

impl Suppressor for GreedyNms {
    fn suppress(&self, candidates: &[Detection]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..candidates.len())
            .filter(|&i| candidates[i].confidence > self.score_threshold)
            .collect();
        // stable: equal confidences keep detection order
        order.sort_by(|&a, &b| {
            candidates[b]
                .confidence
                .total_cmp(&candidates[a].confidence)
        });

        let boxes: Vec<BoundingBox> = candidates.iter().map(Detection::bounding_box).collect();
        let mut suppressed = vec![false; order.len()];
        let mut keep = Vec::new();

        for i in 0..order.len() {
            if suppressed[i] {
                continue;
            }
            let kept = order[i];
            keep.push(kept);
            for j in (i + 1)..order.len() {
                if !suppressed[j] && boxes[kept].iou(&boxes[order[j]]) > self.overlap_threshold {
                    suppressed[j] = true;
                }
            }
        }
        keep
    }
}

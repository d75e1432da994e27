use crate::shared::frame::Frame;

/// One raw detector output: `anchors × (4 [+ objectness] + classes)`,
/// box coordinates normalized to the input size.
pub type OutputTensor = ndarray::Array2<f32>;

/// Domain interface for the detection forward pass.
///
/// Implementations own preprocessing and inference; decoding, suppression
/// and counting happen downstream so backends can be swapped freely.
pub trait ObjectDetector: Send {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<OutputTensor>, Box<dyn std::error::Error>>;
}

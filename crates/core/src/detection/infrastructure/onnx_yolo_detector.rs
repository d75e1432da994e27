/// YOLO object detector using ONNX Runtime via `ort`.
///
/// Handles stretch-resize preprocessing and inference, and reshapes every
/// model output into the `anchors × features` layout the decoder expects.
use std::path::Path;

use ndarray::{s, Array2, Array4, ArrayViewD};

use crate::detection::domain::object_detector::{ObjectDetector, OutputTensor};
use crate::shared::constants::DEFAULT_INPUT_SIZE;
use crate::shared::frame::Frame;

/// Units of the four box columns in the raw model output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoxUnits {
    /// Already normalized to `[0, 1]` (darknet-style exports).
    Normalized,
    /// Pixels of the square model input (ultralytics-style exports).
    #[default]
    InputPixels,
}

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    input_size: u32,
    box_units: BoxUnits,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting NCHW).
    /// Falls back to 416 if the shape is dynamic or unreadable.
    pub fn new(model_path: &Path, box_units: BoxUnits) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(accelerators())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // [N, C, H, W], square input
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded detector {} (input {input_size}x{input_size}, {box_units:?} boxes)",
            model_path.display()
        );

        Ok(Self {
            session,
            input_size,
            box_units,
        })
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

/// Platform accelerator tried before the CPU provider. Registration
/// failures fall back to CPU inside `ort`.
fn accelerators() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<OutputTensor>, Box<dyn std::error::Error>> {
        let input_tensor = preprocess(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("detector model produced no outputs".into());
        }

        let mut tensors = Vec::with_capacity(outputs.len());
        for i in 0..outputs.len() {
            let raw = outputs[i].try_extract_array::<f32>()?;
            tensors.push(to_anchor_rows(raw, self.input_size, self.box_units)?);
        }
        Ok(tensors)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Stretch-resize a frame to `size` × `size` and scale pixels to `[0, 1]`.
///
/// No letterboxing: normalized model coordinates then map straight back onto
/// the original frame by multiplying with its width and height.
fn preprocess(frame: &Frame, size: u32) -> Array4<f32> {
    let n = size as usize;
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let scale_y = src_h as f64 / n as f64;
    let scale_x = src_w as f64 / n as f64;

    let mut tensor = Array4::<f32>::zeros((1, 3, n, n));
    for y in 0..n {
        let src_y = ((y as f64 * scale_y) as usize).min(src_h - 1);
        for x in 0..n {
            let src_x = ((x as f64 * scale_x) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }
    tensor
}

// ---------------------------------------------------------------------------
// Output reshaping
// ---------------------------------------------------------------------------

/// Converts one raw output into `anchors × features` with normalized boxes.
///
/// Accepts `[1, A, F]`, `[A, F]` and their transposed forms; the smaller
/// axis is taken as the feature axis.
fn to_anchor_rows(
    raw: ArrayViewD<'_, f32>,
    input_size: u32,
    units: BoxUnits,
) -> Result<OutputTensor, Box<dyn std::error::Error>> {
    let shape = raw.shape().to_vec();
    let (rows, cols) = match shape.as_slice() {
        [1, a, b] | [a, b] => (*a, *b),
        _ => return Err(format!("Unexpected detector output shape: {shape:?}").into()),
    };

    let data: Vec<f32> = raw.iter().copied().collect();
    let matrix = Array2::from_shape_vec((rows, cols), data)?;
    let mut anchors = if rows < cols {
        matrix.t().to_owned()
    } else {
        matrix
    };

    if anchors.nrows() > 0 && anchors.ncols() < 4 {
        return Err(format!("Detector output has too few features: {shape:?}").into());
    }
    if units == BoxUnits::InputPixels && anchors.nrows() > 0 {
        let size = input_size as f32;
        anchors
            .slice_mut(s![.., 0..4])
            .mapv_inplace(|v| v / size);
    }
    Ok(anchors)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

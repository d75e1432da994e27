/// Default file names inside a model directory (`--model-dir`).
pub const MODEL_FILE_NAME: &str = "model.onnx";
pub const LABELS_FILE_NAME: &str = "coco.names";

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.3;

/// Fallback detector input resolution when the model shape is dynamic.
pub const DEFAULT_INPUT_SIZE: u32 = 416;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Fonts tried for label text when `--font` is not given.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::annotation::domain::frame_annotator::{
    class_color, detection_label, summary_text, FrameAnnotator,
};
use crate::counting::domain::frame_result::FrameResult;
use crate::detection::domain::detection::BoundingBox;
use crate::shared::constants::SYSTEM_FONT_PATHS;
use crate::shared::frame::Frame;
use crate::shared::roi::Roi;

const ROI_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const SUMMARY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const CENTER_RADIUS: i32 = 5;
const LABEL_SCALE: f32 = 16.0;
const SUMMARY_SCALE: f32 = 30.0;
const SUMMARY_ORIGIN: (i32, i32) = (40, 40);
/// Gap between a box's top edge and the baseline of its label.
const LABEL_OFFSET: i32 = 5;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a usable TrueType/OpenType font")]
    Invalid(PathBuf),
}

/// Loads the font for label text.
///
/// An explicit path must load. Without one the first readable entry of
/// [`SYSTEM_FONT_PATHS`] is used, and `None` means no font was found.
pub fn load_font(path: Option<&Path>) -> Result<Option<FontVec>, FontError> {
    if let Some(path) = path {
        return read_font(path).map(Some);
    }
    for candidate in SYSTEM_FONT_PATHS {
        let candidate = Path::new(candidate);
        if !candidate.is_file() {
            continue;
        }
        match read_font(candidate) {
            Ok(font) => {
                log::debug!("Using font {}", candidate.display());
                return Ok(Some(font));
            }
            Err(e) => log::debug!("Skipping font: {e}"),
        }
    }
    Ok(None)
}

fn read_font(path: &Path) -> Result<FontVec, FontError> {
    let bytes = fs::read(path).map_err(|e| FontError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    FontVec::try_from_vec(bytes).map_err(|_| FontError::Invalid(path.to_path_buf()))
}

/// CPU annotator drawing with `imageproc`.
///
/// Shapes are always drawn. Text needs a font; without one only the
/// shapes appear.
pub struct ImageprocAnnotator {
    font: Option<FontVec>,
}

impl ImageprocAnnotator {
    pub fn new(font: Option<FontVec>) -> Self {
        if font.is_none() {
            log::warn!("No font available, annotated frames will carry no text");
        }
        Self { font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

impl FrameAnnotator for ImageprocAnnotator {
    fn annotate(
        &self,
        frame: &mut Frame,
        roi: &Roi,
        result: &FrameResult,
        target_class: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let font = self.font.as_ref();
        frame.with_rgb_image(|img| {
            draw_thick_rect(
                img,
                roi.x() as i32,
                roi.y() as i32,
                roi.width(),
                roi.height(),
                ROI_COLOR,
            );

            for retained in &result.retained {
                let color = Rgb(class_color(retained.class_id));
                draw_box(img, &retained.bbox, color);
                let (cx, cy) = retained.center;
                draw_filled_circle_mut(img, (cx as i32, cy as i32), CENTER_RADIUS, CENTER_COLOR);

                if let Some(font) = font {
                    let text = detection_label(target_class, retained.confidence);
                    let top = retained
                        .bbox
                        .y
                        .saturating_sub(LABEL_OFFSET + LABEL_SCALE as i32);
                    draw_text_mut(img, color, retained.bbox.x, top, PxScale::from(LABEL_SCALE), font, &text);
                }
            }

            if let Some(font) = font {
                let text = summary_text(target_class, result.count);
                let (x, baseline) = SUMMARY_ORIGIN;
                let top = baseline - SUMMARY_SCALE as i32;
                draw_text_mut(img, SUMMARY_COLOR, x, top, PxScale::from(SUMMARY_SCALE), font, &text);
            }
        });
        Ok(())
    }
}

fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    if bbox.width <= 0 || bbox.height <= 0 {
        return;
    }
    draw_thick_rect(img, bbox.x, bbox.y, bbox.width as u32, bbox.height as u32, color);
}

/// Two-pixel outline, growing inwards from the given rectangle.
fn draw_thick_rect(img: &mut RgbImage, x: i32, y: i32, width: u32, height: u32, color: Rgb<u8>) {
    if width == 0 || height == 0 {
        return;
    }
    draw_hollow_rect_mut(img, Rect::at(x, y).of_size(width, height), color);
    if width > 2 && height > 2 {
        draw_hollow_rect_mut(img, Rect::at(x + 1, y + 1).of_size(width - 2, height - 2), color);
    }
}

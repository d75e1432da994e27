use std::path::Path;

use ffmpeg_next::codec::encoder::video::Encoder;
use ffmpeg_next::format::context::Output;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use ffmpeg_next::Rational;

use super::rgb_pixels::pack_rgb;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// H.264 constant rate factor used when none is configured.
pub const DEFAULT_CRF: u32 = 18;
pub const MAX_CRF: u32 = 51;

const FALLBACK_FPS: i32 = 30;

/// Encodes annotated frames via ffmpeg-next.
///
/// Prefers libx264 with a CRF quality setting and falls back to the
/// built-in MPEG-4 encoder when libx264 is unavailable.
pub struct FfmpegWriter {
    crf: u32,
    session: Option<EncodeSession>,
}

struct EncodeSession {
    octx: Output,
    encoder: Encoder,
    scaler: scaling::Context,
    width: u32,
    height: u32,
    fps: i32,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            crf: DEFAULT_CRF,
            session: None,
        }
    }

    /// Values above [`MAX_CRF`] are clamped.
    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = crf.min(MAX_CRF);
        self
    }

    pub fn crf(&self) -> u32 {
        self.crf
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let (codec, options) = match ffmpeg_next::encoder::find_by_name("libx264") {
            Some(codec) => {
                let mut options = ffmpeg_next::Dictionary::new();
                options.set("crf", &self.crf.to_string());
                options.set("preset", "medium");
                (codec, options)
            }
            None => {
                log::warn!("libx264 not available, encoding MPEG-4 (CRF {} ignored)", self.crf);
                let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
                    .ok_or("No usable video encoder found")?;
                (codec, ffmpeg_next::Dictionary::new())
            }
        };

        let mut ost = octx.add_stream(Some(codec))?;
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let fps = match metadata.fps.round() as i32 {
            f if f > 0 => f,
            _ => FALLBACK_FPS,
        };
        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(Pixel::YUV420P);
        encoder_ctx.set_time_base(Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(options)?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        let scaler = scaling::Context::get(
            Pixel::RGB24,
            metadata.width,
            metadata.height,
            Pixel::YUV420P,
            metadata.width,
            metadata.height,
            scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Writing {}x{} @ {fps} fps to {}",
            metadata.width,
            metadata.height,
            path.display()
        );

        self.session = Some(EncodeSession {
            octx,
            encoder,
            scaler,
            width: metadata.width,
            height: metadata.height,
            fps,
            frame_count: 0,
        });
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let session = self.session.as_mut().ok_or("FfmpegWriter: not opened")?;
        if frame.size() != (session.width, session.height) {
            return Err(format!(
                "Frame {} is {}x{}, writer expects {}x{}",
                frame.index(),
                frame.width(),
                frame.height(),
                session.width,
                session.height
            )
            .into());
        }

        let mut rgb_frame = Video::new(Pixel::RGB24, session.width, session.height);
        pack_rgb(frame.data(), &mut rgb_frame, session.width, session.height);

        let mut yuv_frame = Video::empty();
        session.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(session.frame_count as i64));

        session.encoder.send_frame(&yuv_frame)?;
        session.drain()?;
        session.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        session.encoder.send_eof()?;
        session.drain()?;
        session.octx.write_trailer()?;
        log::debug!("Encoded {} frames", session.frame_count);
        Ok(())
    }
}

impl EncodeSession {
    fn drain(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let ost_time_base = self
            .octx
            .stream(0)
            .ok_or("Output stream missing")?
            .time_base();
        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(Rational(1, self.fps), ost_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::counting::domain::frame_result::{CountStatus, FrameResult};
use crate::counting::domain::roi_counter::RoiCounter;
use crate::counting::domain::roi_selector::RoiSelector;
use crate::counting::domain::target_class::TargetClass;
use crate::detection::domain::detection_decoder::DetectionDecoder;
use crate::detection::domain::label_vocabulary::LabelVocabulary;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::suppressor::{GreedyNms, Suppressor};
use crate::shared::counting_config::CountingConfig;
use crate::shared::frame::Frame;
use crate::shared::roi::Roi;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

type ProgressCallback = Box<dyn Fn(usize, usize) -> bool + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    EndOfStream,
    Cancelled,
}

/// Where the frame loop is. Only moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    AwaitingRoi,
    Processing,
    Finished(FinishReason),
}

/// Per-frame line of the run summary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FrameCount {
    pub frame_index: usize,
    pub count: usize,
    pub status: CountStatus,
}

impl From<&FrameResult> for FrameCount {
    fn from(result: &FrameResult) -> Self {
        Self {
            frame_index: result.frame_index,
            count: result.count,
            status: result.status,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub target_class: String,
    /// `None` when the source had no frames to select a region on.
    pub roi: Option<Roi>,
    pub frames_processed: usize,
    pub finish_reason: FinishReason,
    pub frames: Vec<FrameCount>,
}

impl RunSummary {
    pub fn peak_count(&self) -> usize {
        self.frames.iter().map(|f| f.count).max().unwrap_or(0)
    }

    pub fn mean_count(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.frames.iter().map(|f| f.count).sum::<usize>() as f64 / self.frames.len() as f64
    }
}

/// The per-frame stages, kept apart from the reader so a frame can be
/// processed while the reader's iterator is borrowed.
struct FrameStages {
    detector: Box<dyn ObjectDetector>,
    decoder: DetectionDecoder,
    suppressor: Box<dyn Suppressor>,
    annotator: Box<dyn FrameAnnotator>,
}

impl FrameStages {
    fn process(
        &mut self,
        frame: &mut Frame,
        counter: &RoiCounter,
        logger: &mut dyn PipelineLogger,
    ) -> Result<FrameResult, Box<dyn std::error::Error>> {
        let t = Instant::now();
        let outputs = self.detector.infer(frame)?;
        logger.timing("detect", elapsed_ms(t));

        let t = Instant::now();
        let candidates = self.decoder.decode(&outputs, frame.width(), frame.height())?;
        logger.timing("decode", elapsed_ms(t));

        let t = Instant::now();
        let survivors = self.suppressor.suppress(&candidates);
        logger.timing("suppress", elapsed_ms(t));

        let t = Instant::now();
        let result = counter.count(frame.index(), &candidates, &survivors);
        logger.timing("count", elapsed_ms(t));

        let t = Instant::now();
        self.annotator
            .annotate(frame, counter.roi(), &result, counter.target().name())?;
        logger.timing("annotate", elapsed_ms(t));

        logger.metric("candidates", candidates.len() as f64);
        logger.metric("survivors", survivors.len() as f64);
        logger.metric("count", result.count as f64);
        log::debug!(
            "Frame {}: {} candidates, {} survivors, {} in ROI",
            frame.index(),
            candidates.len(),
            survivors.len(),
            result.count
        );
        Ok(result)
    }
}

struct OutputSink {
    writer: Box<dyn VideoWriter>,
    path: PathBuf,
}

/// Counts one object class inside a fixed ROI, frame by frame.
///
/// `AwaitingRoi`: the first frame is read and handed to the
/// [`RoiSelector`]. `Processing`: every following frame runs detect,
/// decode, suppress, count, annotate and write; the selection frame itself
/// only joins them with [`with_count_selection_frame`]. `Finished`: the
/// stream ended or the run was cancelled. Reader and writer are closed on
/// every exit path. Single use: a second `execute` fails.
///
/// [`with_count_selection_frame`]: Self::with_count_selection_frame
pub struct CountObjectsUseCase {
    reader: Box<dyn VideoReader>,
    output: Option<OutputSink>,
    stages: FrameStages,
    roi_selector: Box<dyn RoiSelector>,
    vocabulary: LabelVocabulary,
    config: CountingConfig,
    logger: Box<dyn PipelineLogger>,
    on_progress: Option<ProgressCallback>,
    on_frame: Option<Box<dyn FnMut(&FrameResult) + Send>>,
    cancelled: Arc<AtomicBool>,
    count_selection_frame: bool,
    state: LoopState,
}

impl CountObjectsUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn ObjectDetector>,
        annotator: Box<dyn FrameAnnotator>,
        roi_selector: Box<dyn RoiSelector>,
        vocabulary: LabelVocabulary,
        config: CountingConfig,
    ) -> Self {
        let decoder = DetectionDecoder::new(config.confidence_threshold, config.score_layout);
        let suppressor = Box::new(GreedyNms::new(
            config.confidence_threshold,
            config.overlap_threshold,
        ));
        Self {
            reader,
            output: None,
            stages: FrameStages {
                detector,
                decoder,
                suppressor,
                annotator,
            },
            roi_selector,
            vocabulary,
            config,
            logger: Box::new(NullPipelineLogger),
            on_progress: None,
            on_frame: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            count_selection_frame: false,
            state: LoopState::AwaitingRoi,
        }
    }

    /// Replaces the greedy NMS built from the config. The replacement owns
    /// its own thresholds.
    pub fn with_suppressor(mut self, suppressor: Box<dyn Suppressor>) -> Self {
        self.stages.suppressor = suppressor;
        self
    }

    /// Also counts and writes the frame the ROI was selected on. Off by
    /// default; a single still image needs it to produce any output.
    pub fn with_count_selection_frame(mut self, enabled: bool) -> Self {
        self.count_selection_frame = enabled;
        self
    }

    /// Annotated frames go to `writer`, opened lazily at `path`.
    pub fn with_output(mut self, writer: Box<dyn VideoWriter>, path: &Path) -> Self {
        self.output = Some(OutputSink {
            writer,
            path: path.to_path_buf(),
        });
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Called after every frame with `(frames_done, total)`; returning
    /// `false` cancels the run. `total` is 0 when the length is unknown.
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Receives every frame's result as soon as it is counted.
    pub fn with_frame_observer(mut self, on_frame: Box<dyn FnMut(&FrameResult) + Send>) -> Self {
        self.on_frame = Some(on_frame);
        self
    }

    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
    ) -> Result<RunSummary, Box<dyn std::error::Error>> {
        if self.state != LoopState::AwaitingRoi {
            return Err("Counting run already executed".into());
        }

        let result = self.run(metadata);

        self.reader.close();
        let closed = match self.output.as_mut() {
            Some(sink) => sink.writer.close(),
            None => Ok(()),
        };

        let summary = result?;
        closed?;
        self.logger.summary();
        Ok(summary)
    }

    fn run(&mut self, metadata: &VideoMetadata) -> Result<RunSummary, Box<dyn std::error::Error>> {
        self.config.validate()?;
        let target = self.resolve_target()?;

        match metadata.total_frames {
            Some(n) => self.logger.info(&format!("{n} total frames in video")),
            None => log::warn!("Could not determine number of frames in video"),
        }

        let mut summary = RunSummary {
            target_class: target.name().to_string(),
            roi: None,
            frames_processed: 0,
            finish_reason: FinishReason::EndOfStream,
            frames: Vec::new(),
        };

        let mut frames = self.reader.frames();
        let mut frame = match frames.next() {
            Some(frame) => frame?,
            None => {
                self.logger.info("Source has no frames");
                self.state = LoopState::Finished(FinishReason::EndOfStream);
                return Ok(summary);
            }
        };

        let roi = self.roi_selector.select(&frame)?;
        roi.validate_for(frame.width(), frame.height())?;
        let (width, height) = frame.size();
        let counter = RoiCounter::new(roi, target);
        summary.roi = Some(roi);
        self.logger.info(&format!(
            "Counting '{}' inside ROI {roi} of {width}x{height} frames",
            counter.target().name()
        ));

        if let Some(sink) = self.output.as_mut() {
            let frame_meta = VideoMetadata {
                width,
                height,
                ..metadata.clone()
            };
            sink.writer.open(&sink.path, &frame_meta)?;
        }

        self.state = LoopState::Processing;
        let mut total = metadata.progress_total();

        if !self.count_selection_frame {
            total = total.saturating_sub(1);
            frame = match frames.next() {
                Some(next) => next?,
                None => {
                    self.state = LoopState::Finished(FinishReason::EndOfStream);
                    return Ok(summary);
                }
            };
        }

        let finish_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break FinishReason::Cancelled;
            }
            if frame.size() != (width, height) {
                return Err(format!(
                    "Frame {} is {}x{}, expected {width}x{height}",
                    frame.index(),
                    frame.width(),
                    frame.height()
                )
                .into());
            }

            let started = Instant::now();
            let result = self
                .stages
                .process(&mut frame, &counter, self.logger.as_mut())?;

            if let Some(sink) = self.output.as_mut() {
                let t = Instant::now();
                sink.writer.write(&frame)?;
                self.logger.timing("write", elapsed_ms(t));
            }

            if summary.frames_processed == 0 {
                self.logger
                    .first_frame(elapsed_ms(started), (total > 0).then_some(total));
            }
            summary.frames_processed += 1;
            summary.frames.push(FrameCount::from(&result));
            if let Some(on_frame) = self.on_frame.as_mut() {
                on_frame(&result);
            }

            self.logger.progress(summary.frames_processed, total);
            if let Some(on_progress) = &self.on_progress {
                if !on_progress(summary.frames_processed, total) {
                    break FinishReason::Cancelled;
                }
            }

            frame = match frames.next() {
                Some(next) => next?,
                None => break FinishReason::EndOfStream,
            };
        };

        if finish_reason == FinishReason::Cancelled {
            self.logger.info("Counting cancelled");
        }
        self.state = LoopState::Finished(finish_reason);
        summary.finish_reason = finish_reason;
        Ok(summary)
    }

    fn resolve_target(&self) -> Result<TargetClass, Box<dyn std::error::Error>> {
        let name = &self.config.target_class;
        if self.config.strict_class {
            return Ok(TargetClass::resolve_strict(name, &self.vocabulary)?);
        }
        let target = TargetClass::resolve(name, &self.vocabulary);
        if !target.is_known() {
            log::warn!(
                "Target class '{name}' is not one of the {} model labels; every frame will count 0",
                self.vocabulary.len()
            );
        }
        Ok(target)
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

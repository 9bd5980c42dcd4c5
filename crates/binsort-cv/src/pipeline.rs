//! Frame-by-frame control loop
//!
//! Each iteration pulls one frame, runs the detector, reduces the detections
//! to at most one command, consults the lockout and, on a fire, publishes
//! the command and records the activation. Frames are handled strictly in
//! acquisition order and a stop request is only honored between frames.

use crate::detection::{FrameAggregate, Hud, PipelineConfig, annotate};
use crate::error::PipelineError;
use crate::history::{HistoryRecord, HistoryRecorder};
use crate::source::Frame;
use crate::traits::{CommandPublisher, FrameSource, ObjectDetector};
use crate::Result;
use anyhow::Context;
use binsort_core::{Activation, Command, CommandTable, Lockout, SampleWindow, Verdict};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, warn};

/// Cloneable flag used to ask a running pipeline to stop
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub fires: u64,
    pub suppressed: u64,
    pub publish_failures: u64,
    pub persistence_failures: u64,
    pub budget_overruns: u64,
    pub mean_fps: Option<f64>,
    pub stopped_by_request: bool,
}

/// What happened to a single frame
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub index: u64,
    pub aggregate: FrameAggregate,
    pub command: Option<Command>,
    pub verdict: Verdict,
    pub published: bool,
    pub record: Option<HistoryRecord>,
    pub hud: Hud,
}

type Clock = Box<dyn FnMut() -> SystemTime>;

pub struct Pipeline<S, D, P> {
    source: S,
    detector: D,
    publisher: P,
    recorder: HistoryRecorder,
    table: CommandTable,
    lockout: Lockout,
    fps: SampleWindow,
    input_size: u32,
    frame_budget: Option<Duration>,
    clock: Clock,
    stop: StopHandle,
    summary: RunSummary,
}

impl<S, D, P> Pipeline<S, D, P>
where
    S: FrameSource,
    D: ObjectDetector,
    P: CommandPublisher,
{
    pub fn new(config: &PipelineConfig, source: S, detector: D, publisher: P) -> Result<Self> {
        config.validate()?;

        let recorder = HistoryRecorder::open(&config.history.dir, &config.history.log_file)?
            .with_comment(config.history.comment.as_str());

        Ok(Self {
            source,
            detector,
            publisher,
            recorder,
            table: config.command_table(),
            lockout: Lockout::new(config.lockout_duration()?, config.advance_policy),
            fps: SampleWindow::new(config.fps_window),
            input_size: config.input_resolution,
            frame_budget: config.frame_budget(),
            clock: Box::new(SystemTime::now),
            stop: StopHandle::new(),
            summary: RunSummary::default(),
        })
    }

    /// Replace the wall clock used for lockout decisions and history names
    pub fn with_clock(mut self, clock: impl FnMut() -> SystemTime + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn lockout(&self) -> &Lockout {
        &self.lockout
    }

    pub fn recorder(&self) -> &HistoryRecorder {
        &self.recorder
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Run until the source is exhausted or a stop is requested. Detector
    /// and acquisition errors end the run; publish and persistence errors
    /// are logged and counted.
    pub fn run(&mut self) -> Result<RunSummary> {
        loop {
            let started = Instant::now();
            if self.stop.is_requested() {
                info!("Stop requested, leaving control loop");
                self.summary.stopped_by_request = true;
                break;
            }

            let Some(frame) = self
                .source
                .next_frame()
                .context("Frame acquisition failed")?
            else {
                info!("Source exhausted");
                break;
            };

            self.handle_frame(&frame, started)?;
        }

        self.summary.mean_fps = self.fps.mean();
        Ok(self.summary.clone())
    }

    /// Handle one already acquired frame
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutcome> {
        self.handle_frame(frame, Instant::now())
    }

    /// `started` marks the beginning of the iteration, acquisition included
    fn handle_frame(&mut self, frame: &Frame, started: Instant) -> Result<FrameOutcome> {
        let detections = self
            .detector
            .detect(frame, self.input_size)
            .map_err(|e| PipelineError::Model(format!("{e:#}")))?;

        let aggregate = FrameAggregate::from_detections(&detections, self.detector.class_names());
        let command = aggregate.command(&self.table);
        let now = (self.clock)();
        let verdict = self.lockout.evaluate(now, command);

        let mut published = false;
        let mut record = None;

        match verdict {
            Verdict::Fire(activation) => {
                (published, record) = self.fire(frame, &aggregate, activation);
            }
            Verdict::Suppressed { command, remaining } => {
                self.summary.suppressed += 1;
                debug!(
                    %command,
                    remaining_ms = remaining.as_millis() as u64,
                    "Command suppressed by lockout"
                );
            }
            Verdict::NoCommand => {
                if let Some((label, confidence)) = aggregate.best() {
                    debug!(label, confidence, "Winning class maps to no command");
                }
            }
        }

        let elapsed = started.elapsed();
        if let Some(budget) = self.frame_budget {
            if elapsed > budget {
                self.summary.budget_overruns += 1;
                warn!(
                    frame = frame.index,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "Frame exceeded its processing budget"
                );
            }
        }

        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.fps.push(1.0 / secs);
        }
        self.summary.frames += 1;
        if self.summary.frames % self.fps.capacity() as u64 == 0 {
            if let Some(fps) = self.fps.mean() {
                debug!(fps, frames = self.summary.frames, "Throughput");
            }
        }

        Ok(FrameOutcome {
            index: frame.index,
            hud: Hud {
                fps: self.fps.mean(),
                object_count: aggregate.object_count,
                command,
            },
            aggregate,
            command,
            verdict,
            published,
            record,
        })
    }

    fn fire(
        &mut self,
        frame: &Frame,
        aggregate: &FrameAggregate,
        activation: Activation,
    ) -> (bool, Option<HistoryRecord>) {
        self.summary.fires += 1;
        info!(
            command = %activation.command,
            objects = aggregate.object_count,
            "Valid detection, sending command"
        );

        let published = match self.publisher.publish(activation.command) {
            Ok(()) => true,
            Err(e) => {
                self.summary.publish_failures += 1;
                error!(command = %activation.command, error = %format!("{e:#}"), "Publish failed");
                false
            }
        };

        let snapshot = annotate(&frame.image, &aggregate.overlays);
        let record = match self.recorder.record(
            &snapshot,
            aggregate.object_count,
            activation.command,
            activation.at,
        ) {
            Ok(record) => {
                info!(file = %record.image_file, "History saved");
                Some(record)
            }
            Err(e) => {
                self.summary.persistence_failures += 1;
                error!(
                    command = %activation.command,
                    error = %format!("{e:#}"),
                    "Failed to save history"
                );
                None
            }
        };

        if published && record.is_some() {
            self.lockout.confirm(&activation);
        }

        (published, record)
    }
}

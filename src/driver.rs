//! Driver task that owns a message source and the pipeline

use std::future::pending;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::StreamConfig;
use crate::pipeline::{DepthPipeline, PipelineEvent, PipelineStats};
use crate::source::MessageSource;
use crate::types::{ConnectionStatus, FrameHeader, RenderedFrame, ViewMode};

/// Watch channels shared between a session handle and its driver.
///
/// The session keeps the same outputs across reconnects, so subscribers
/// survive a close followed by a new connect.
#[derive(Debug)]
pub struct Outputs {
    pub status: watch::Sender<ConnectionStatus>,
    pub header: watch::Sender<Option<Arc<FrameHeader>>>,
    pub frame_rate: watch::Sender<Option<f64>>,
    pub last_arrival: watch::Sender<Option<Instant>>,
    pub frames: watch::Sender<Option<RenderedFrame>>,
    pub stats: watch::Sender<PipelineStats>,
    pub view_mode: watch::Sender<ViewMode>,
}

impl Outputs {
    pub fn new(view_mode: ViewMode) -> Self {
        Self {
            status: watch::channel(ConnectionStatus::Disconnected).0,
            header: watch::channel(None).0,
            frame_rate: watch::channel(None).0,
            last_arrival: watch::channel(None).0,
            frames: watch::channel(None).0,
            stats: watch::channel(PipelineStats::default()).0,
            view_mode: watch::channel(view_mode).0,
        }
    }

    /// Clear per-connection observables before a new driver starts.
    pub fn reset_connection_state(&self) {
        self.frame_rate.send_replace(None);
        self.last_arrival.send_replace(None);
        self.stats.send_replace(PipelineStats::default());
    }
}

/// Why the driver loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Exit {
    Cancelled,
    Ended,
    Failed(String),
}

/// Spawns the task that reads messages and runs them through the pipeline.
///
/// Decoding happens inline on the driver task; there is exactly one decode
/// and draw site per completed cycle.
pub struct Driver;

impl Driver {
    /// Spawn a driver for `source`. Cancel `cancel` to tear it down.
    pub fn spawn<M>(
        source: M,
        config: &StreamConfig,
        outputs: Arc<Outputs>,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        M: MessageSource,
    {
        let pipeline = DepthPipeline::new(config);
        let diagnostics = config.diagnostic_interval();

        tokio::spawn(async move {
            Self::run(source, pipeline, diagnostics, outputs, cancel).await;
        })
    }

    async fn run<M>(
        mut source: M,
        mut pipeline: DepthPipeline,
        diagnostics: Option<std::time::Duration>,
        outputs: Arc<Outputs>,
        cancel: CancellationToken,
    ) where
        M: MessageSource,
    {
        let description = source.describe();
        info!(source = %description, "Driver started");

        let mut view_rx = outputs.view_mode.subscribe();
        let mode = *view_rx.borrow_and_update();
        if let Some(event) = pipeline.set_view_mode(mode) {
            Self::publish(event, &pipeline, &outputs, &cancel);
        }

        let mut ticker = diagnostics.map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        let exit = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Exit::Cancelled,
                changed = view_rx.changed() => {
                    if changed.is_err() {
                        break Exit::Cancelled;
                    }
                    let mode = *view_rx.borrow_and_update();
                    if let Some(event) = pipeline.set_view_mode(mode) {
                        Self::publish(event, &pipeline, &outputs, &cancel);
                    }
                }
                _ = Self::tick(&mut ticker) => {
                    let snapshot = pipeline.sequencer_snapshot();
                    debug!(
                        state = ?snapshot.state,
                        header_timestamp = snapshot.header_timestamp,
                        left_buffered = snapshot.left_buffered,
                        has_complete_cycle = snapshot.has_complete_cycle,
                        "Diagnostic tick"
                    );
                }
                result = source.next_message() => match result {
                    Ok(Some(message)) => {
                        let now = tokio::time::Instant::now().into_std();
                        let event = pipeline.handle_message(&message, now);
                        Self::publish(event, &pipeline, &outputs, &cancel);
                    }
                    Ok(None) => break Exit::Ended,
                    Err(err) => break Exit::Failed(err.to_string()),
                },
            }
        };

        let stats = pipeline.stats();
        match &exit {
            Exit::Cancelled => {
                info!(source = %description, frames = stats.frames_rendered, "Driver cancelled")
            }
            Exit::Ended => {
                info!(source = %description, frames = stats.frames_rendered, "Stream ended")
            }
            Exit::Failed(reason) => error!(source = %description, %reason, "Transport failed"),
        }

        if let Err(err) = source.close().await {
            warn!(error = %err, "Failed to close source cleanly");
        }

        // After teardown the session owns the status
        if cancel.is_cancelled() {
            return;
        }
        let status = match exit {
            Exit::Failed(message) => ConnectionStatus::Error { message },
            Exit::Cancelled | Exit::Ended => ConnectionStatus::Disconnected,
        };
        outputs.status.send_replace(status);
    }

    async fn tick(ticker: &mut Option<Interval>) {
        match ticker {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => pending().await,
        }
    }

    fn publish(
        event: PipelineEvent,
        pipeline: &DepthPipeline,
        outputs: &Outputs,
        cancel: &CancellationToken,
    ) {
        if cancel.is_cancelled() {
            debug!("Discarding pipeline output after teardown");
            return;
        }

        match event {
            PipelineEvent::Header { header, frame_rate } => {
                outputs.header.send_replace(Some(header));
                if frame_rate.is_some() {
                    outputs.frame_rate.send_replace(frame_rate);
                }
            }
            PipelineEvent::Rendered(frame) => {
                outputs.frames.send_replace(Some(frame));
            }
            PipelineEvent::Buffered
            | PipelineEvent::Dropped(_)
            | PipelineEvent::DecodeFailed(_) => {}
        }

        outputs.last_arrival.send_replace(pipeline.liveness().last_arrival());
        outputs.stats.send_replace(pipeline.stats());
    }
}

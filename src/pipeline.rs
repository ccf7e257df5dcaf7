//! Message pipeline: sequencer, decoders, compositor and trackers in one owned value.
//!
//! [`DepthPipeline`] is the only place a completed cycle is decoded and drawn.
//! It is driven one message at a time and never suspends, so it can be
//! exercised without a runtime or a socket.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

use crate::StreamError;
use crate::config::StreamConfig;
use crate::decode::Decoders;
use crate::liveness::{LivenessTracker, RateTracker};
use crate::render::{Compositor, FrameSurface, Surface};
use crate::sequencer::{Cycle, FrameSequencer, SequencerEvent, SequencerSnapshot};
use crate::types::{FrameHeader, RenderedFrame, StreamMessage, ViewMode};

/// Counters kept by the pipeline, published read-only by the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Every message handed to the pipeline
    pub messages: u64,
    /// Headers accepted
    pub headers: u64,
    pub cycles_completed: u64,
    /// Cycles preempted by a header before their depth payload arrived
    pub cycles_abandoned: u64,
    /// Right color payloads received and dropped
    pub payloads_discarded: u64,
    /// Binary messages with no header pending
    pub unexpected_payloads: u64,
    pub malformed_headers: u64,
    /// Compressed color decodes recovered by the raw path
    pub decode_fallbacks: u64,
    /// Decodes that failed outright; the previous frame stayed on screen
    pub decode_failures: u64,
    pub frames_rendered: u64,
}

/// What a single message did to the pipeline.
#[derive(Debug)]
pub enum PipelineEvent {
    /// A header was accepted; `frame_rate` is the latest rate, if known
    Header { header: Arc<FrameHeader>, frame_rate: Option<f64> },
    /// A payload was buffered or discarded as part of a cycle in progress
    Buffered,
    /// A cycle was decoded and drawn
    Rendered(RenderedFrame),
    /// The message was dropped; the sequencer recovers on the next header
    Dropped(StreamError),
    /// A complete cycle could not be decoded; the previous frame remains
    DecodeFailed(StreamError),
}

/// Owns all per-session decoding state.
#[derive(Debug)]
pub struct DepthPipeline<S = FrameSurface> {
    sequencer: FrameSequencer,
    decoders: Decoders,
    compositor: Compositor<S>,
    rate: RateTracker,
    liveness: LivenessTracker,
    view_mode: ViewMode,
    stats: PipelineStats,
}

impl DepthPipeline<FrameSurface> {
    /// Pipeline drawing into an in-memory [`FrameSurface`].
    pub fn new(config: &StreamConfig) -> Self {
        Self::with_surface(config, FrameSurface::new())
    }
}

impl<S: Surface> DepthPipeline<S> {
    pub fn with_surface(config: &StreamConfig, surface: S) -> Self {
        Self {
            sequencer: FrameSequencer::new(),
            decoders: Decoders::new(config.target_display_width()),
            compositor: Compositor::new(surface),
            rate: RateTracker::new(),
            liveness: LivenessTracker::new(config.liveness_threshold()),
            view_mode: config.view_mode,
            stats: PipelineStats::default(),
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn frame_rate(&self) -> Option<f64> {
        self.rate.rate()
    }

    pub fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    pub fn current_header(&self) -> Option<&Arc<FrameHeader>> {
        self.sequencer.current_header()
    }

    pub fn sequencer_snapshot(&self) -> SequencerSnapshot {
        self.sequencer.snapshot()
    }

    pub fn compositor(&self) -> &Compositor<S> {
        &self.compositor
    }

    /// Change the display width used by the color path.
    pub fn set_display_width(&mut self, width: u32) {
        self.decoders.color.set_target_width(width);
    }

    /// Feed one inbound message that arrived at `now`.
    pub fn handle_message(&mut self, message: &StreamMessage, now: Instant) -> PipelineEvent {
        self.stats.messages += 1;
        self.liveness.record(now);
        let kind = if message.is_binary() { "binary" } else { "text" };
        trace!(kind, len = message.len(), "Message received");

        match self.sequencer.handle(message) {
            Ok(SequencerEvent::HeaderAccepted { header, abandoned }) => {
                self.stats.headers += 1;
                if abandoned.is_some() {
                    self.stats.cycles_abandoned += 1;
                }
                let frame_rate = self.rate.record(header.timestamp);
                PipelineEvent::Header { header, frame_rate }
            }
            Ok(SequencerEvent::LeftBuffered) => PipelineEvent::Buffered,
            Ok(SequencerEvent::RightDiscarded) => {
                self.stats.payloads_discarded += 1;
                PipelineEvent::Buffered
            }
            Ok(SequencerEvent::CycleComplete(cycle)) => {
                self.stats.cycles_completed += 1;
                self.render(&cycle)
            }
            Err(err) => {
                match &err {
                    StreamError::UnexpectedPayload { .. } => self.stats.unexpected_payloads += 1,
                    StreamError::HeaderParse { .. } | StreamError::Framing { .. } => {
                        self.stats.malformed_headers += 1
                    }
                    _ => {}
                }
                warn!(error = %err, "Dropping message");
                PipelineEvent::Dropped(err)
            }
        }
    }

    /// Switch decoders. The most recent complete cycle, if any, is redrawn
    /// with the new mode straight away.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> Option<PipelineEvent> {
        if mode == self.view_mode {
            return None;
        }
        debug!(from = %self.view_mode, to = %mode, "View mode changed");
        self.view_mode = mode;

        let cycle = self.sequencer.last_complete().cloned()?;
        Some(self.render(&cycle))
    }

    fn render(&mut self, cycle: &Cycle) -> PipelineEvent {
        let mode = self.view_mode;
        let decoded = match self.decoders.for_mode(mode).decode(cycle) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.stats.decode_failures += 1;
                let timestamp = cycle.header.timestamp;
                warn!(%mode, timestamp, error = %err, "Decode failed, keeping previous frame");
                return PipelineEvent::DecodeFailed(err);
            }
        };

        if decoded.fell_back {
            self.stats.decode_fallbacks += 1;
        }
        let probe = decoded.probe;

        if let Err(err) = self.compositor.present(decoded.buffer) {
            self.stats.decode_failures += 1;
            warn!(%mode, error = %err, "Surface rejected frame");
            return PipelineEvent::DecodeFailed(err);
        }
        let buffer = match self.compositor.surface().snapshot() {
            Some(snapshot) => snapshot,
            None => Arc::new(decoded.buffer.clone()),
        };

        self.stats.frames_rendered += 1;
        debug!(
            %mode,
            timestamp = cycle.header.timestamp,
            width = buffer.width(),
            height = buffer.height(),
            distance_m = probe.map(|p| p.distance_m),
            "Cycle rendered"
        );

        let timestamp = cycle.header.timestamp;
        PipelineEvent::Rendered(RenderedFrame { mode, timestamp, buffer, probe })
    }
}

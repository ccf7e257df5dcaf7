//! Stream session: the public handle over one device connection

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StreamConfig;
use crate::driver::{Driver, Outputs};
use crate::liveness::is_online;
use crate::pipeline::PipelineStats;
use crate::source::MessageSource;
use crate::sources::WebSocketSource;
use crate::stream::SampleExt;
use crate::types::{ConnectionStatus, FrameHeader, RenderedFrame, UpdateRate, ViewMode};
use crate::Result;

#[cfg(test)]
mod tests;

struct ActiveDriver {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Handle over a depth sensor stream.
///
/// Owns the connection lifecycle and exposes what the host UI observes:
/// status, the latest header, frame rate, liveness and rendered frames.
/// All observables are backed by watch channels and stay valid across
/// reconnects.
///
/// Dropping the session tears the driver down.
pub struct StreamSession {
    config: StreamConfig,
    outputs: Arc<Outputs>,
    active: Option<ActiveDriver>,
}

impl StreamSession {
    /// Disconnected session for `config`.
    pub fn new(config: StreamConfig) -> Self {
        let outputs = Arc::new(Outputs::new(config.view_mode));
        Self { config, outputs, active: None }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Open the device socket and start streaming.
    ///
    /// Configuration problems are reported before any connection attempt.
    /// Transport failures leave the status at [`ConnectionStatus::Error`];
    /// there is no automatic retry, calling `connect` again reconnects.
    pub async fn connect(&mut self) -> Result<()> {
        if let Err(err) = self.config.validate() {
            warn!(error = %err, "Refusing to connect");
            let status = ConnectionStatus::Error { message: err.to_string() };
            self.outputs.status.send_replace(status);
            return Err(err);
        }

        self.stop().await;
        self.outputs.status.send_replace(ConnectionStatus::Connecting);

        match WebSocketSource::connect(&self.config).await {
            Ok(source) => {
                self.start(source);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Connection failed");
                let status = ConnectionStatus::Error { message: err.to_string() };
                self.outputs.status.send_replace(status);
                Err(err)
            }
        }
    }

    /// Stream from an already open source instead of the device socket.
    ///
    /// Any running driver is stopped and awaited first, so nothing it
    /// computed is published after the new source starts.
    pub async fn connect_with_source<M: MessageSource>(&mut self, source: M) {
        self.stop().await;
        self.start(source);
    }

    /// Stop streaming and close the socket.
    pub async fn close(&mut self) {
        self.stop().await;
        self.outputs.status.send_replace(ConnectionStatus::Disconnected);
    }

    fn start<M: MessageSource>(&mut self, source: M) {
        let cancel = CancellationToken::new();
        self.outputs.reset_connection_state();
        self.outputs.status.send_replace(ConnectionStatus::Connected);
        info!(source = %source.describe(), mode = %self.view_mode(), "Stream connected");

        let task = Driver::spawn(source, &self.config, Arc::clone(&self.outputs), cancel.clone());
        self.active = Some(ActiveDriver { cancel, task });
    }

    async fn stop(&mut self) {
        let Some(active) = self.active.take() else { return };
        debug!("Stopping driver");
        active.cancel.cancel();
        if let Err(err) = active.task.await {
            warn!(error = %err, "Driver task did not shut down cleanly");
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.outputs.status.borrow().clone()
    }

    /// Current status followed by every change.
    pub fn status_updates(&self) -> impl Stream<Item = ConnectionStatus> + 'static {
        WatchStream::new(self.outputs.status.subscribe())
    }

    /// Most recent accepted header, for resolution and scale display.
    pub fn current_header(&self) -> Option<Arc<FrameHeader>> {
        self.outputs.header.borrow().clone()
    }

    /// Frames per second derived from header timestamps.
    pub fn frame_rate(&self) -> Option<f64> {
        *self.outputs.frame_rate.borrow()
    }

    /// Connected and a message arrived within the liveness threshold.
    pub fn is_online(&self) -> bool {
        let status = self.outputs.status.borrow().clone();
        let last_arrival = *self.outputs.last_arrival.borrow();
        let now = tokio::time::Instant::now().into_std();
        is_online(&status, last_arrival, self.config.liveness_threshold(), now)
    }

    pub fn last_frame(&self) -> Option<RenderedFrame> {
        self.outputs.frames.borrow().clone()
    }

    /// Rendered frames, starting with the current one if any.
    ///
    /// With [`UpdateRate::Max`] a slow subscriber sees only the latest frame
    /// per period.
    pub fn frames(&self, rate: UpdateRate) -> BoxStream<'static, RenderedFrame> {
        let frames = WatchStream::new(self.outputs.frames.subscribe())
            .filter_map(|frame| async move { frame });

        match rate.interval() {
            None => frames.boxed(),
            Some(period) => frames.sample(period).boxed(),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        *self.outputs.stats.borrow()
    }

    pub fn view_mode(&self) -> ViewMode {
        *self.outputs.view_mode.borrow()
    }

    /// Select the decoder for subsequent cycles. A running session redraws
    /// the most recent complete cycle in the new mode.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        let changed = self.outputs.view_mode.send_if_modified(|current| {
            let changed = *current != mode;
            *current = mode;
            changed
        });
        if changed {
            debug!(%mode, "View mode requested");
        }
    }

    /// Flip between color and depth.
    pub fn toggle_view_mode(&mut self) -> ViewMode {
        let mode = self.view_mode().toggled();
        self.set_view_mode(mode);
        mode
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("Dropping stream session");
            active.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("host", &self.config.host)
            .field("status", &self.status())
            .field("view_mode", &self.view_mode())
            .field("running", &self.active.is_some())
            .finish()
    }
}

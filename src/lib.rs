//! Live viewer client for a networked stereo depth camera.
//!
//! `depthview` connects to a sensor's WebSocket stream, reassembles each
//! capture cycle (one JSON header followed by three binary payloads) and turns
//! it into displayable pixels: either the left color image or a
//! contrast-stretched grayscale depth map with a center-distance probe.
//!
//! # Features
//!
//! - **Cycle sequencing**: explicit four-state machine; incomplete cycles are
//!   abandoned on the next header and never decoded
//! - **Color and depth decoding**: compressed containers with raw fallback,
//!   raw BGR/RGB, 16-bit depth with adaptive windowing
//! - **Observables**: status, header, frame rate, liveness and rendered frames
//!   through watch channels and streams
//! - **Replay**: recorded or scripted message sources for tests and offline use
//!
//! ## Example
//!
//! ```rust,no_run
//! use depthview::{DepthView, StreamConfig, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> depthview::Result<()> {
//!     let config = StreamConfig::new("192.168.1.40", "abc123");
//!     let session = DepthView::connect(config).await?;
//!     let mut frames = session.frames(UpdateRate::Max(30));
//!
//!     while let Some(frame) = frames.next().await {
//!         if let Some(probe) = frame.probe {
//!             println!("{:.2} m", probe.distance_m);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Cycle processing
pub mod decode;
pub mod liveness;
pub mod pipeline;
pub mod render;
pub mod sequencer;

// Stream-based session architecture
pub mod driver;
pub mod session;
pub mod source;
pub mod sources;
pub mod stream;

// Core exports
pub use config::StreamConfig;
pub use error::{ErrorCategory, Result, StreamError};
pub use types::*;

// Main API exports
pub use pipeline::{DepthPipeline, PipelineEvent, PipelineStats};
pub use render::{Compositor, FrameSurface, Surface};
pub use session::StreamSession;
pub use source::MessageSource;
pub use sources::{ReplayFeed, ReplaySource, WebSocketSource};

/// Unified entry point for depth stream sessions.
///
/// # Examples
///
/// ## Live sensor
/// ```rust,no_run
/// use depthview::{DepthView, StreamConfig};
///
/// #[tokio::main]
/// async fn main() -> depthview::Result<()> {
///     let session = DepthView::connect(StreamConfig::new("camera.local", "token")).await?;
///     println!("{}", session.status());
///     Ok(())
/// }
/// ```
///
/// ## Recorded messages
/// ```rust,no_run
/// use depthview::{DepthView, StreamConfig, StreamMessage};
///
/// #[tokio::main]
/// async fn main() {
///     let recording: Vec<StreamMessage> = Vec::new();
///     let session = DepthView::replay(StreamConfig::default(), recording).await;
///     println!("{:?}", session.stats());
/// }
/// ```
pub struct DepthView;

impl DepthView {
    /// Connect to a live sensor.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - host or token is missing (no connection is attempted)
    /// - the socket cannot be opened within the connect timeout
    pub async fn connect(config: StreamConfig) -> Result<StreamSession> {
        let mut session = StreamSession::new(config);
        session.connect().await?;
        Ok(session)
    }

    /// Play back recorded messages through a new session.
    pub async fn replay(
        config: StreamConfig,
        messages: impl IntoIterator<Item = StreamMessage>,
    ) -> StreamSession {
        let mut session = StreamSession::new(config);
        session.connect_with_source(ReplaySource::new(messages)).await;
        session
    }
}

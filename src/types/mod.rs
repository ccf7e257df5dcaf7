//! Core types for depth stream data representation.
//!
//! ## Architecture
//!
//! The types follow the wire protocol and the host UI contract:
//! - [`FrameHeader`] is the JSON control message that opens every cycle
//! - [`StreamMessage`] tags each inbound message as text or binary
//! - [`PixelBuffer`] holds RGBA output, row-major, with fixed dimensions
//! - [`RenderedFrame`] is what the UI sees after a cycle is decoded
//! - [`ViewMode`], [`ConnectionStatus`] and [`UpdateRate`] are the UI-facing knobs and signals
//!
//! ## Usage Example
//!
//! ```rust
//! use depthview::types::{FrameHeader, PixelBuffer, ViewMode};
//!
//! let header = FrameHeader::parse(
//!     r#"{"type":"frame","timestamp":100,
//!         "depth":{"width":4,"height":2,"format":"z16","scale_m":0.001},
//!         "left_rgb":{"width":4,"height":2,"format":"bgr8"},
//!         "right_rgb":{"width":4,"height":2,"format":"bgr8"}}"#,
//! ).unwrap();
//!
//! assert_eq!(header.depth_resolution(), (4, 2));
//!
//! let buffer = PixelBuffer::new(header.depth.width, header.depth.height);
//! assert_eq!(buffer.pixel_count(), 8);
//! assert_eq!("color".parse::<ViewMode>(), Ok(ViewMode::Color));
//! ```

mod frame;
mod header;
mod message;
mod pixel_buffer;
mod status;
mod update_rate;
mod view_mode;

pub use frame::{DepthProbe, Region, RenderedFrame};
pub use header::{DepthStreamInfo, FRAME_HEADER_TYPE, FrameHeader, StreamInfo};
pub use message::StreamMessage;
pub use pixel_buffer::{CHANNELS, OPAQUE, PixelBuffer};
pub use status::ConnectionStatus;
pub use update_rate::UpdateRate;
pub use view_mode::ViewMode;

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    prop_compose! {
        fn arb_stream_info()(
            width in 0u32..4096,
            height in 0u32..4096,
            format in prop::sample::select(vec!["jpeg", "png", "bgr8", "rgb8", "z16", ""]),
        ) -> StreamInfo {
            StreamInfo { width, height, format: format.to_string() }
        }
    }

    prop_compose! {
        fn arb_header()(
            timestamp in 0u64..1_000_000_000_000,
            depth in arb_stream_info(),
            scale_m in prop::sample::select(vec![0.001, 0.0001, 0.00025, 0.002]),
            left_rgb in arb_stream_info(),
            right_rgb in arb_stream_info(),
        ) -> FrameHeader {
            FrameHeader {
                kind: FRAME_HEADER_TYPE.to_string(),
                timestamp: timestamp as f64,
                depth: DepthStreamInfo { stream: depth, scale_m },
                left_rgb,
                right_rgb,
            }
        }
    }

    proptest! {
        #[test]
        fn prop_serialized_headers_parse_back(header in arb_header()) {
            let text = serde_json::to_string(&header).unwrap();
            let parsed = FrameHeader::parse(&text).unwrap();
            prop_assert_eq!(parsed, header);
        }

        #[test]
        fn prop_arbitrary_text_never_panics(text in ".*") {
            // Parse either succeeds or reports a framing-class error
            if let Err(err) = FrameHeader::parse(&text) {
                prop_assert_eq!(err.category(), crate::ErrorCategory::Framing);
            }
        }

        #[test]
        fn prop_pixel_buffer_size_matches_dimensions(width in 0u32..256, height in 0u32..256) {
            let buffer = PixelBuffer::new(width, height);
            prop_assert_eq!(buffer.as_bytes().len(), width as usize * height as usize * CHANNELS);
            prop_assert_eq!(buffer.pixels().count(), buffer.pixel_count());
        }
    }

    #[test]
    fn status_strings() {
        assert_eq!(ConnectionStatus::default().as_str(), "disconnected");
        assert_eq!(ConnectionStatus::Connecting.as_str(), "connecting");
        assert!(ConnectionStatus::Connected.is_connected());

        let error = ConnectionStatus::Error { message: "refused".to_string() };
        assert_eq!(error.as_str(), "error");
        assert_eq!(error.error_message(), Some("refused"));
        assert_eq!(error.to_string(), "error: refused");
    }
}

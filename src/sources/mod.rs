//! Concrete message sources

pub mod replay;
pub mod websocket;

pub use replay::{ReplayFeed, ReplaySource};
pub use websocket::WebSocketSource;

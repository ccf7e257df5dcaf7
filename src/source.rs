//! MessageSource trait for inbound wire messages

use crate::Result;
use crate::types::StreamMessage;

/// Anything that yields the device's wire messages in arrival order.
///
/// Sources abstract over the live socket and recorded or scripted sequences.
/// Each source handles its own timing.
#[async_trait::async_trait]
pub trait MessageSource: Send + 'static {
    /// Wait for the next message.
    ///
    /// Returns:
    /// - `Ok(Some(message))` - a text or binary message arrived
    /// - `Ok(None)` - the peer closed the stream (normal termination)
    /// - `Err(e)` - transport failure; the source is unusable afterwards
    async fn next_message(&mut self) -> Result<Option<StreamMessage>>;

    /// Release the underlying transport. Called once on teardown.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

#[async_trait::async_trait]
impl MessageSource for Box<dyn MessageSource> {
    async fn next_message(&mut self) -> Result<Option<StreamMessage>> {
        (**self).next_message().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

//! Wire messages delivered by a message source

use bytes::Bytes;

/// One inbound message, tagged as text or binary.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// UTF-8 control message (frame header)
    Text(String),
    /// Binary image payload
    Binary(Bytes),
}

impl StreamMessage {
    /// Convenience constructor for binary messages from owned bytes.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        StreamMessage::Binary(data.into())
    }

    /// Convenience constructor for text messages.
    pub fn text(text: impl Into<String>) -> Self {
        StreamMessage::Text(text.into())
    }

    /// Message size in bytes.
    pub fn len(&self) -> usize {
        match self {
            StreamMessage::Text(text) => text.len(),
            StreamMessage::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, StreamMessage::Binary(_))
    }
}

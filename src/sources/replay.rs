//! Replay source for recorded or scripted message sequences

use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, trace};

use crate::Result;
use crate::source::MessageSource;
use crate::types::StreamMessage;

/// Sender half returned by [`ReplaySource::feed`]. Dropping it ends the feed.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    tx: mpsc::UnboundedSender<StreamMessage>,
}

impl ReplayFeed {
    /// Queue a message. Returns `false` once the source is gone.
    pub fn send(&self, message: StreamMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn send_all(&self, messages: impl IntoIterator<Item = StreamMessage>) -> bool {
        messages.into_iter().all(|m| self.send(m))
    }
}

/// Plays back messages as if they came from a socket.
///
/// Recorded messages are yielded first, then anything pushed through a
/// [`ReplayFeed`]. When both are exhausted the source reports a clean close,
/// or, with [`hold_open`](Self::hold_open), stays silent until closed.
#[derive(Debug)]
pub struct ReplaySource {
    recorded: VecDeque<StreamMessage>,
    feed: Option<mpsc::UnboundedReceiver<StreamMessage>>,
    pacing: Option<Duration>,
    ticker: Option<Interval>,
    hold_open: bool,
    yielded: u64,
    closed: bool,
}

impl ReplaySource {
    pub fn new(messages: impl IntoIterator<Item = StreamMessage>) -> Self {
        Self {
            recorded: messages.into_iter().collect(),
            feed: None,
            pacing: None,
            ticker: None,
            hold_open: false,
            yielded: 0,
            closed: false,
        }
    }

    /// An empty source driven by the returned feed.
    pub fn feed() -> (ReplayFeed, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut source = Self::new([]);
        source.feed = Some(rx);
        (ReplayFeed { tx }, source)
    }

    /// Yield at most one message per `period`.
    pub fn with_pacing(mut self, period: Duration) -> Self {
        self.pacing = Some(period);
        self.ticker = None;
        self
    }

    /// Stay open after the last message instead of reporting end of stream.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Messages not yet yielded from the recording.
    pub fn remaining(&self) -> usize {
        self.recorded.len()
    }

    async fn next_queued(&mut self) -> Option<StreamMessage> {
        if let Some(message) = self.recorded.pop_front() {
            return Some(message);
        }
        match self.feed.as_mut() {
            Some(feed) => feed.recv().await,
            None => None,
        }
    }
}

#[async_trait::async_trait]
impl MessageSource for ReplaySource {
    async fn next_message(&mut self) -> Result<Option<StreamMessage>> {
        if self.closed {
            return Ok(None);
        }

        if let Some(period) = self.pacing {
            // interval() needs a running runtime
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;
        }

        match self.next_queued().await {
            Some(message) => {
                self.yielded += 1;
                trace!(index = self.yielded, len = message.len(), "Replaying message");
                Ok(Some(message))
            }
            None if self.hold_open => {
                debug!(yielded = self.yielded, "Replay exhausted, holding open");
                std::future::pending::<()>().await;
                Ok(None)
            }
            None => {
                debug!(yielded = self.yielded, "Reached end of replay");
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.feed = None;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("replay ({} recorded messages remaining)", self.recorded.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::uniform_cycle;

    #[tokio::test]
    async fn yields_recording_then_ends() {
        let messages = uniform_cycle(1.0, 2, 2, [0, 0, 0], 500);
        let mut source = ReplaySource::new(messages.clone());

        for expected in &messages {
            assert_eq!(source.next_message().await.unwrap().as_ref(), Some(expected));
        }
        assert!(source.next_message().await.unwrap().is_none());
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn feed_continues_after_recording() {
        let (feed, mut source) = ReplaySource::feed();
        assert!(feed.send(StreamMessage::Text("hello".into())));

        assert_eq!(source.next_message().await.unwrap(), Some(StreamMessage::Text("hello".into())));

        drop(feed);
        assert!(source.next_message().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn hold_open_never_ends_on_its_own() {
        let mut source = ReplaySource::new([]).hold_open();
        let waited = tokio::time::timeout(Duration::from_secs(60), source.next_message()).await;
        assert!(waited.is_err());

        source.close().await.unwrap();
        assert!(source.next_message().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_spaces_messages() {
        let messages = uniform_cycle(1.0, 2, 2, [0, 0, 0], 500);
        let mut source = ReplaySource::new(messages).with_pacing(Duration::from_millis(100));
        let start = tokio::time::Instant::now();

        for _ in 0..4 {
            source.next_message().await.unwrap();
        }

        // First tick completes immediately
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }
}

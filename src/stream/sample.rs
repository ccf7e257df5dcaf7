//! Latest-wins sampling

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add sampling to any Stream
pub trait SampleExt: Stream {
    /// Emit at most once per `period`.
    ///
    /// Items arriving between ticks replace each other; only the latest is
    /// emitted. Nothing is emitted for a tick with no new item.
    fn sample(self, period: Duration) -> Sample<Self>
    where
        Self: Sized,
    {
        Sample::new(self, period)
    }
}

impl<T: Stream> SampleExt for T {}

pin_project! {
    /// A stream combinator that emits the latest item once per period
    pub struct Sample<S: Stream> {
        #[pin]
        stream: S,
        period: Duration,
        interval: Option<Interval>,
        latest: Option<S::Item>,
        done: bool,
    }
}

impl<S: Stream> Sample<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        Self { stream, period, interval: None, latest: None, done: false }
    }
}

impl<S: Stream> Stream for Sample<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain whatever is ready, keeping only the latest
        while !*this.done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.latest = Some(item),
                Poll::Ready(None) => *this.done = true,
                Poll::Pending => break,
            }
        }

        if this.latest.is_none() {
            return if *this.done { Poll::Ready(None) } else { Poll::Pending };
        }

        let period = *this.period;
        let ticker = this.interval.get_or_insert_with(|| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ready!(ticker.poll_tick(cx));

        Poll::Ready(this.latest.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_to_latest() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sampled = UnboundedReceiverStream::new(rx).sample(Duration::from_millis(100));

        tx.send(1).unwrap();
        // First tick is immediate
        assert_eq!(sampled.next().await, Some(1));

        for i in 2..=5 {
            tx.send(i).unwrap();
        }
        assert_eq!(sampled.next().await, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_is_enforced() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sampled = UnboundedReceiverStream::new(rx).sample(Duration::from_millis(100));
        let start = tokio::time::Instant::now();

        tx.send(1).unwrap();
        sampled.next().await;
        tx.send(2).unwrap();
        sampled.next().await;

        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn pending_item_is_flushed_when_upstream_ends() {
        let sampled = futures::stream::iter(vec![1, 2, 3]).sample(Duration::from_millis(10));
        assert_eq!(sampled.collect::<Vec<_>>().await, vec![3]);
    }

    #[tokio::test]
    async fn empty_upstream_ends_immediately() {
        let sampled = futures::stream::iter(Vec::<u8>::new()).sample(Duration::from_secs(60));
        assert!(sampled.collect::<Vec<_>>().await.is_empty());
    }
}

//! Frame sequencer: pairs each header with its three binary payloads.
//!
//! The device sends one JSON header followed by exactly three binary messages:
//! left color, right color, depth. The sequencer tracks that cadence as an
//! explicit state machine:
//!
//! ```text
//!            header (any state)
//!   ┌────────────────────────────────┐
//!   ▼                                │
//! Idle ──header──▶ ExpectLeft ──bin──▶ ExpectRight ──bin──▶ ExpectDepth ──bin──▶ Idle
//!                  (store left)        (discard right)      (store depth, complete)
//! ```
//!
//! A new header always preempts an in-flight cycle; the partial cycle is
//! abandoned and never reaches a decoder. Binary messages while `Idle` are
//! dropped and reported as [`StreamError::UnexpectedPayload`]. Malformed
//! headers are dropped without touching the state.

use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::types::{FrameHeader, StreamMessage};
use crate::{Result, StreamError};

/// Sequencer position within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    /// No header since the last completed cycle
    #[default]
    Idle,
    ExpectLeft,
    ExpectRight,
    ExpectDepth,
}

impl SequencerState {
    /// Number of binary payloads already received in the current cycle.
    pub fn payloads_received(self) -> usize {
        match self {
            SequencerState::Idle | SequencerState::ExpectLeft => 0,
            SequencerState::ExpectRight => 1,
            SequencerState::ExpectDepth => 2,
        }
    }
}

/// One complete header plus the two payloads that get decoded.
#[derive(Debug, Clone)]
pub struct Cycle {
    pub header: Arc<FrameHeader>,
    /// Left color payload
    pub left: Bytes,
    /// Raw 16-bit depth payload
    pub depth: Bytes,
}

/// Result of feeding one message to the sequencer.
#[derive(Debug, Clone)]
pub enum SequencerEvent {
    /// A header opened a new cycle. `abandoned` is the state of the cycle it
    /// replaced when that cycle was still in flight.
    HeaderAccepted { header: Arc<FrameHeader>, abandoned: Option<SequencerState> },
    /// Left color payload stored
    LeftBuffered,
    /// Right color payload received and dropped
    RightDiscarded,
    /// Depth payload stored; the cycle is ready for decoding
    CycleComplete(Cycle),
}

/// Point-in-time view of the sequencer for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerSnapshot {
    pub state: SequencerState,
    pub header_timestamp: Option<f64>,
    pub left_buffered: bool,
    pub has_complete_cycle: bool,
}

/// Owns all cycle state; nothing else mutates it.
#[derive(Debug, Default)]
pub struct FrameSequencer {
    state: SequencerState,
    header: Option<Arc<FrameHeader>>,
    left: Option<Bytes>,
    last_complete: Option<Cycle>,
}

impl FrameSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Header of the cycle currently being assembled or last completed.
    pub fn current_header(&self) -> Option<&Arc<FrameHeader>> {
        self.header.as_ref()
    }

    /// Most recent complete cycle, kept for re-rendering on view mode changes.
    pub fn last_complete(&self) -> Option<&Cycle> {
        self.last_complete.as_ref()
    }

    pub fn snapshot(&self) -> SequencerSnapshot {
        SequencerSnapshot {
            state: self.state,
            header_timestamp: self.header.as_ref().map(|h| h.timestamp),
            left_buffered: self.left.is_some(),
            has_complete_cycle: self.last_complete.is_some(),
        }
    }

    /// Feed one inbound message.
    ///
    /// Errors are framing errors for a dropped message; the state is left
    /// exactly as it was before the call.
    pub fn handle(&mut self, message: &StreamMessage) -> Result<SequencerEvent> {
        match message {
            StreamMessage::Text(text) => self.handle_header(text),
            StreamMessage::Binary(payload) => self.handle_payload(payload.clone()),
        }
    }

    fn handle_header(&mut self, text: &str) -> Result<SequencerEvent> {
        let header = Arc::new(FrameHeader::parse(text)?);

        let abandoned = match self.state {
            SequencerState::Idle => None,
            in_flight => {
                debug!(
                    state = ?in_flight,
                    payloads = in_flight.payloads_received(),
                    "Header preempted incomplete cycle"
                );
                Some(in_flight)
            }
        };

        trace!(timestamp = header.timestamp, "Header accepted");
        self.left = None;
        self.header = Some(Arc::clone(&header));
        self.state = SequencerState::ExpectLeft;

        Ok(SequencerEvent::HeaderAccepted { header, abandoned })
    }

    fn handle_payload(&mut self, payload: Bytes) -> Result<SequencerEvent> {
        match self.state {
            SequencerState::Idle => Err(StreamError::UnexpectedPayload { len: payload.len() }),
            SequencerState::ExpectLeft => {
                self.left = Some(payload);
                self.state = SequencerState::ExpectRight;
                Ok(SequencerEvent::LeftBuffered)
            }
            SequencerState::ExpectRight => {
                self.state = SequencerState::ExpectDepth;
                Ok(SequencerEvent::RightDiscarded)
            }
            SequencerState::ExpectDepth => {
                let (Some(header), Some(left)) = (self.header.clone(), self.left.take()) else {
                    // Unreachable through the public API; resync on the next header.
                    self.state = SequencerState::Idle;
                    return Err(StreamError::framing("depth payload without buffered header"));
                };

                let cycle = Cycle { header, left, depth: payload };
                self.last_complete = Some(cycle.clone());
                self.state = SequencerState::Idle;
                Ok(SequencerEvent::CycleComplete(cycle))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{header_json, marked_payload};
    use proptest::prelude::*;

    fn text(ts: f64) -> StreamMessage {
        StreamMessage::Text(header_json(ts, 2, 2))
    }

    fn bin(mark: u8) -> StreamMessage {
        StreamMessage::Binary(marked_payload(mark))
    }

    fn complete(event: SequencerEvent) -> Cycle {
        match event {
            SequencerEvent::CycleComplete(cycle) => cycle,
            other => panic!("expected completed cycle, got {other:?}"),
        }
    }

    #[test]
    fn full_cycle_keeps_first_and_third_payloads() {
        let mut seq = FrameSequencer::new();

        assert!(matches!(
            seq.handle(&text(10.0)).unwrap(),
            SequencerEvent::HeaderAccepted { abandoned: None, .. }
        ));
        assert_eq!(seq.state(), SequencerState::ExpectLeft);
        assert!(matches!(seq.handle(&bin(1)).unwrap(), SequencerEvent::LeftBuffered));
        assert!(matches!(seq.handle(&bin(2)).unwrap(), SequencerEvent::RightDiscarded));
        let cycle = complete(seq.handle(&bin(3)).unwrap());

        assert_eq!(cycle.left[0], 1);
        assert_eq!(cycle.depth[0], 3);
        assert_eq!(cycle.header.timestamp, 10.0);
        assert_eq!(seq.state(), SequencerState::Idle);
        assert!(seq.last_complete().is_some());
    }

    #[test]
    fn header_abandons_incomplete_cycle() {
        let mut seq = FrameSequencer::new();
        seq.handle(&text(1.0)).unwrap();
        seq.handle(&bin(1)).unwrap();
        seq.handle(&bin(2)).unwrap();

        match seq.handle(&text(2.0)).unwrap() {
            SequencerEvent::HeaderAccepted { abandoned, header } => {
                assert_eq!(abandoned, Some(SequencerState::ExpectDepth));
                assert_eq!(header.timestamp, 2.0);
            }
            other => panic!("unexpected {other:?}"),
        }

        seq.handle(&bin(4)).unwrap();
        seq.handle(&bin(5)).unwrap();
        let cycle = complete(seq.handle(&bin(6)).unwrap());
        assert_eq!(cycle.left[0], 4);
        assert_eq!(cycle.depth[0], 6);
        assert_eq!(cycle.header.timestamp, 2.0);
    }

    #[test]
    fn binary_while_idle_is_dropped() {
        let mut seq = FrameSequencer::new();
        let err = seq.handle(&bin(9)).unwrap_err();
        assert!(matches!(err, StreamError::UnexpectedPayload { len: 1 }));
        assert_eq!(seq.state(), SequencerState::Idle);

        // A fourth binary after completion is just as unexpected
        seq.handle(&text(1.0)).unwrap();
        for mark in 1..=3 {
            seq.handle(&bin(mark)).unwrap();
        }
        assert!(seq.handle(&bin(4)).is_err());
        assert_eq!(seq.last_complete().unwrap().depth[0], 3);
    }

    #[test]
    fn malformed_header_leaves_state_unchanged() {
        let mut seq = FrameSequencer::new();
        seq.handle(&text(1.0)).unwrap();
        seq.handle(&bin(1)).unwrap();

        let before = seq.snapshot();
        assert!(seq.handle(&StreamMessage::text("{oops")).is_err());
        assert_eq!(seq.snapshot(), before);

        seq.handle(&bin(2)).unwrap();
        let cycle = complete(seq.handle(&bin(3)).unwrap());
        assert_eq!(cycle.left[0], 1);
    }

    #[derive(Debug, Clone)]
    enum Step {
        Header,
        Payload,
    }

    proptest! {
        #[test]
        fn prop_completed_cycles_never_contain_abandoned_or_right_payloads(
            steps in prop::collection::vec(
                prop_oneof![Just(Step::Header), Just(Step::Payload)],
                0..60,
            )
        ) {
            // Each payload carries a unique mark. The reference model tracks which
            // marks belong to the cycle in flight and what a completion must yield.
            let mut seq = FrameSequencer::new();
            let mut in_flight: Option<Vec<u8>> = None;
            let mut mark = 0u8;

            for step in steps {
                match step {
                    Step::Header => {
                        seq.handle(&text(mark as f64)).unwrap();
                        in_flight = Some(Vec::new());
                    }
                    Step::Payload => {
                        mark = mark.wrapping_add(1);
                        let result = seq.handle(&bin(mark));
                        match in_flight.as_mut() {
                            None => prop_assert!(result.is_err()),
                            Some(received) => {
                                received.push(mark);
                                if received.len() == 3 {
                                    let cycle = complete(result.unwrap());
                                    prop_assert_eq!(cycle.left[0], received[0]);
                                    prop_assert_eq!(cycle.depth[0], received[2]);
                                    prop_assert_ne!(cycle.left[0], received[1]);
                                    in_flight = None;
                                } else {
                                    prop_assert!(result.is_ok());
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

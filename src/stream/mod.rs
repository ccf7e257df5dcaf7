//! Stream utilities for rendered frame subscriptions

mod sample;

pub use sample::{Sample, SampleExt};

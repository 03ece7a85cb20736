//! Transcript matcher
//!
//! A pure function from a transcript to a `MatchResult`. Holds no state
//! between calls and cannot fail.

mod transcript;

pub use transcript::{BoundaryMode, MatchResult, TranscriptMatcher};

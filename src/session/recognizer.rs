//! Host speech-to-text capability
//!
//! The host exposes a constructible, single-shot recognizer. Each recognizer
//! reports its lifecycle through `RecognizerEvent`s sent on the channel it was
//! created with.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Error codes reported by recognizers
pub mod codes {
    /// Silence until the host gave up on the utterance
    pub const NO_SPEECH: &str = "no-speech";
    /// Audio could not be captured
    pub const AUDIO_CAPTURE: &str = "audio-capture";
    /// Microphone permission was revoked or refused
    pub const NOT_ALLOWED: &str = "not-allowed";
    /// Recognition service refused by the host
    pub const SERVICE_NOT_ALLOWED: &str = "service-not-allowed";
    /// Capture was aborted
    pub const ABORTED: &str = "aborted";
}

/// Per-recognizer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizerSettings {
    /// BCP-47 locale tag
    pub lang: String,
    /// Report interim hypotheses before the final one
    pub interim_results: bool,
    /// Keep capturing after the first final result
    pub continuous: bool,
    /// Alternatives per result
    pub max_alternatives: u32,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            lang: "ta-IN".to_string(),
            interim_results: true,
            continuous: false,
            max_alternatives: 1,
        }
    }
}

/// One recognized alternative
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f32,
}

/// Alternatives recognized for one result slot
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub alternatives: Vec<Alternative>,
    pub is_final: bool,
}

impl RecognitionResult {
    /// Single-alternative result
    pub fn single(transcript: impl Into<String>, is_final: bool) -> Self {
        Self {
            alternatives: vec![Alternative {
                transcript: transcript.into(),
                confidence: 1.0,
            }],
            is_final,
        }
    }
}

/// Raw events fired by a host recognizer
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    Start,
    Result {
        /// Index of the result that changed
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Error {
        code: String,
    },
    End,
}

/// Channel a recognizer reports its events on
pub type RecognizerEventTx = mpsc::UnboundedSender<RecognizerEvent>;

/// Errors from the speech capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    #[error("speech recognition is not available on this host")]
    Unavailable,

    #[error("recognizer is already started")]
    AlreadyStarted,

    #[error("failed to start recognizer: {0}")]
    StartFailed(String),
}

/// A single-shot recognizer
///
/// `start` begins capturing one utterance. The recognizer fires `End` after
/// at most one final result, an error, or a `stop` request.
pub trait SpeechRecognizer: Send {
    fn start(&mut self) -> Result<(), SpeechError>;

    fn stop(&mut self);
}

/// Factory for recognizers
pub trait SpeechCapability: Send + Sync {
    fn create(
        &self,
        settings: &RecognizerSettings,
        events: RecognizerEventTx,
    ) -> Result<Box<dyn SpeechRecognizer>, SpeechError>;
}

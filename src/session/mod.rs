//! Recognition session module
//!
//! Wraps the host's single-utterance recognizer behind a uniform event
//! contract:
//! - Started: capture has begun
//! - Transcript: interim or final hypothesis
//! - Error: capture failed with a reason code
//! - Ended: the session terminated, successfully or not

mod microphone;
mod recognition;
mod recognizer;

pub use microphone::{MicrophoneAccess, MicrophoneError};
pub use recognition::{RecognitionSession, SessionEvent};
pub use recognizer::{
    codes, RecognitionResult, RecognizerEvent, RecognizerEventTx, RecognizerSettings,
    SpeechCapability, SpeechError, SpeechRecognizer,
};

//! Microphone access seam

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MicrophoneError {
    #[error("microphone permission denied")]
    Denied,

    #[error("no microphone available")]
    Unavailable,
}

/// Asynchronous grant/deny of microphone access
#[async_trait]
pub trait MicrophoneAccess: Send + Sync {
    async fn request(&self) -> Result<(), MicrophoneError>;
}

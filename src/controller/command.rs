//! Controller inbox messages and the handle used to send them

use tokio::sync::mpsc;
use tracing::warn;

use crate::session::{MicrophoneError, RecognizerEvent};

/// User requests accepted by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// Start when stopped, stop otherwise
    Toggle,
    /// Stop everything and end the controller task
    Shutdown,
}

/// Everything the controller reacts to, delivered through one queue
#[derive(Debug)]
pub enum ControllerEvent {
    Command(Command),
    /// Microphone access request `request` completed
    PermissionResolved {
        request: u64,
        result: Result<(), MicrophoneError>,
    },
    /// Raw event from the recognizer of session `session`
    Recognizer {
        session: u64,
        event: RecognizerEvent,
    },
    /// Restart delay `generation` elapsed
    RestartDue { generation: u64 },
}

/// Failures surfaced by the controller as status text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("speech recognition is not available")]
    CapabilityUnavailable,

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no microphone available")]
    MicrophoneUnavailable,

    #[error("recognition session error: {0}")]
    Session(String),

    #[error("failed to start recognition: {0}")]
    StartFailure(String),

    #[error("failed to restart recognition: {0}")]
    RestartFailure(String),
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("listening controller is not running")]
pub struct ControllerClosed;

/// Cloneable sender for controller commands
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    inbox: mpsc::UnboundedSender<ControllerEvent>,
}

impl ControllerHandle {
    pub(super) fn new(inbox: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        Self { inbox }
    }

    pub fn send(&self, command: Command) -> Result<(), ControllerClosed> {
        self.inbox
            .send(ControllerEvent::Command(command))
            .map_err(|_| ControllerClosed)
    }

    pub fn start(&self) -> Result<(), ControllerClosed> {
        self.send(Command::Start)
    }

    /// Request shutdown; a controller that already exited is not an error
    pub fn shutdown(&self) {
        if self.send(Command::Shutdown).is_err() {
            warn!("shutdown requested but controller already stopped");
        }
    }
}

//! Listening controller module
//!
//! Provides an explicit state machine with four states:
//! - Stopped: not listening
//! - AwaitingPermission: waiting for microphone access
//! - Listening: a recognition session is capturing
//! - RestartPending: the session ended, restart is scheduled

mod command;
mod machine;

pub use command::{Command, ControllerHandle};
pub use machine::{ControllerSettings, ControllerStatus, ListeningController, ListeningState};

//! Events module for listening controller transitions
//!
//! Provides structured event types broadcast to the presentation layer and
//! to subscribed IPC clients.

use serde::{Deserialize, Serialize};

use crate::controller::ListeningState;

/// Events emitted by the listening controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListeningEvent {
    /// Controller moved between states
    StateChanged {
        from: ListeningState,
        to: ListeningState,
    },

    /// User-visible status text changed
    Status { message: String },

    /// A hypothesis was heard (interim or final)
    Transcript { text: String, is_final: bool },

    /// The character animation changed
    ActionChanged { action: String },

    /// A number was flashed on the display
    NumberShown { value: u8 },

    /// The controller has shut down; no further events follow
    Shutdown,
}

impl std::fmt::Display for ListeningEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListeningEvent::StateChanged { from, to } => {
                write!(f, "STATE_CHANGED ({} -> {})", from, to)
            }
            ListeningEvent::Status { message } => write!(f, "STATUS ({})", message),
            ListeningEvent::Transcript { text, is_final } => {
                let kind = if *is_final { "final" } else { "interim" };
                write!(f, "TRANSCRIPT ({kind}: {text})")
            }
            ListeningEvent::ActionChanged { action } => write!(f, "ACTION_CHANGED ({})", action),
            ListeningEvent::NumberShown { value } => write!(f, "NUMBER_SHOWN ({})", value),
            ListeningEvent::Shutdown => write!(f, "SHUTDOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = ListeningEvent::StateChanged {
            from: ListeningState::Listening,
            to: ListeningState::RestartPending,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("state_changed"));
        assert!(json.contains("restart_pending"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"number_shown","value":5}"#;
        let event: ListeningEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, ListeningEvent::NumberShown { value: 5 });
    }

    #[test]
    fn test_event_display() {
        let event = ListeningEvent::ActionChanged {
            action: "dance".into(),
        };
        assert_eq!(event.to_string(), "ACTION_CHANGED (dance)");
    }
}

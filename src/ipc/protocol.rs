//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::controller::{Command, ControllerStatus, ListeningState};
use crate::events::ListeningEvent;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current listener status
    GetStatus,

    /// Begin continuous listening
    StartListening,

    /// Stop listening
    StopListening,

    /// The single start/stop control
    ToggleListening,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to listening event notifications
    Subscribe,
}

impl Request {
    /// Controller command carried by this request, if any
    pub fn command(&self) -> Option<Command> {
        match self {
            Request::StartListening => Some(Command::Start),
            Request::StopListening => Some(Command::Stop),
            Request::ToggleListening => Some(Command::Toggle),
            Request::GetStatus | Request::Ping | Request::Subscribe => None,
        }
    }
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current listener status
    Status(ListenerStatus),

    /// Command queued for the controller
    Accepted,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Event { event: ListeningEvent },
}

/// Listener status snapshot as seen by UI clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStatus {
    /// Daemon version
    pub version: String,

    pub state: ListeningState,

    /// Whether continuous listening is on
    pub listening: bool,

    /// Animation currently playing
    pub current_action: String,

    /// Status line text
    pub status_message: String,

    /// Last number flashed, if any
    pub last_number: Option<u8>,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl ListenerStatus {
    /// Fold a controller event into the snapshot
    pub fn apply(&mut self, event: &ListeningEvent) {
        match event {
            ListeningEvent::StateChanged { to, .. } => {
                self.state = *to;
                self.listening = *to != ListeningState::Stopped;
            }
            ListeningEvent::Status { message } => self.status_message = message.clone(),
            ListeningEvent::ActionChanged { action } => self.current_action = action.clone(),
            ListeningEvent::NumberShown { value } => self.last_number = Some(*value),
            ListeningEvent::Transcript { .. } => {}
            ListeningEvent::Shutdown => {
                self.state = ListeningState::Stopped;
                self.listening = false;
            }
        }
    }
}

impl From<ControllerStatus> for ListenerStatus {
    fn from(status: ControllerStatus) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: status.state,
            listening: status.listening,
            current_action: status.current_action,
            status_message: status.status_message,
            last_number: None,
            uptime_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initial() -> ListenerStatus {
        ListenerStatus::from(ControllerStatus {
            state: ListeningState::Stopped,
            listening: false,
            keep_alive: false,
            current_action: "sit".into(),
            status_message: "ready".into(),
            sessions_created: 0,
        })
    }

    #[test]
    fn test_request_serialization() {
        let json = serde_json::to_string(&Request::ToggleListening).unwrap();
        assert_eq!(json, r#"{"type":"toggle_listening"}"#);

        let req: Request = serde_json::from_str(r#"{"type":"start_listening"}"#).unwrap();
        assert_eq!(req.command(), Some(Command::Start));
        assert_eq!(Request::Ping.command(), None);
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(initial());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""state":"stopped""#));
    }

    #[test]
    fn test_notification_keeps_event_tag() {
        let note = Notification::Event {
            event: ListeningEvent::NumberShown { value: 3 },
        };
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, r#"{"type":"event","event":{"type":"number_shown","value":3}}"#);
    }

    #[test]
    fn test_status_apply() {
        let mut status = initial();
        status.apply(&ListeningEvent::StateChanged {
            from: ListeningState::Stopped,
            to: ListeningState::AwaitingPermission,
        });
        assert!(status.listening);

        status.apply(&ListeningEvent::ActionChanged {
            action: "walk".into(),
        });
        status.apply(&ListeningEvent::NumberShown { value: 9 });
        status.apply(&ListeningEvent::Status {
            message: "heard".into(),
        });
        assert_eq!(status.current_action, "walk");
        assert_eq!(status.last_number, Some(9));
        assert_eq!(status.status_message, "heard");

        status.apply(&ListeningEvent::Shutdown);
        assert_eq!(status.state, ListeningState::Stopped);
        assert!(!status.listening);
    }
}

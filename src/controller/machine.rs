//! Core listening state machine
//!
//! Keeps a single-shot recognizer listening continuously: a session that
//! ends on its own is restarted after a short delay for as long as the user
//! wants to listen. Every input arrives as a `ControllerEvent` on one queue,
//! so transitions never interleave.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::config::StatusMessages;
use crate::events::ListeningEvent;
use crate::matcher::{MatchResult, TranscriptMatcher};
use crate::presenter::Presenter;
use crate::session::{
    codes, MicrophoneAccess, MicrophoneError, RecognitionSession, RecognizerEvent,
    RecognizerSettings, SessionEvent, SpeechCapability, SpeechError,
};

use super::command::{Command, ControllerError, ControllerEvent, ControllerHandle};

/// The four states of the listening lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListeningState {
    /// Not listening
    #[default]
    Stopped,
    /// Waiting for the microphone grant
    AwaitingPermission,
    /// A recognition session is capturing
    Listening,
    /// The session ended; waiting out the restart delay
    RestartPending,
}

impl fmt::Display for ListeningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListeningState::Stopped => write!(f, "Stopped"),
            ListeningState::AwaitingPermission => write!(f, "AwaitingPermission"),
            ListeningState::Listening => write!(f, "Listening"),
            ListeningState::RestartPending => write!(f, "RestartPending"),
        }
    }
}

/// Tunables for the controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub recognizer: RecognizerSettings,
    pub restart_delay: Duration,
    pub default_action: String,
    pub messages: StatusMessages,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            recognizer: RecognizerSettings::default(),
            restart_delay: Duration::from_millis(300),
            default_action: "sit".to_string(),
            messages: StatusMessages::default(),
        }
    }
}

/// Snapshot of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub state: ListeningState,
    pub listening: bool,
    pub keep_alive: bool,
    pub current_action: String,
    pub status_message: String,
    pub sessions_created: u64,
}

/// Orchestrates recognition sessions across the continuous listening lifecycle
pub struct ListeningController {
    state: ListeningState,
    /// User asked for continuous listening
    is_listening: bool,
    /// A session that ends should be restarted; only true while listening
    keep_alive: bool,
    current_action: String,
    status_message: String,
    state_entered_at: Instant,

    settings: ControllerSettings,
    matcher: TranscriptMatcher,
    capability: Option<Arc<dyn SpeechCapability>>,
    microphone: Option<Arc<dyn MicrophoneAccess>>,
    presenter: Arc<dyn Presenter>,

    /// Reused across restarts, released on stop and shutdown
    session: Option<RecognitionSession>,
    /// Id of the newest session; events tagged with older ids are stale
    session_id: u64,
    sessions_created: u64,
    /// Generation of the outstanding microphone request
    permission_request: u64,
    /// Generation of the outstanding restart timer
    restart_generation: u64,
    shutting_down: bool,

    inbox_tx: mpsc::UnboundedSender<ControllerEvent>,
    inbox_rx: Option<mpsc::UnboundedReceiver<ControllerEvent>>,
    event_tx: broadcast::Sender<ListeningEvent>,
}

impl ListeningController {
    /// Create a controller in the Stopped state
    ///
    /// `capability` is `None` when the host has no speech recognition;
    /// `microphone` is `None` when there is no way to request audio access.
    pub fn new(
        settings: ControllerSettings,
        matcher: TranscriptMatcher,
        capability: Option<Arc<dyn SpeechCapability>>,
        microphone: Option<Arc<dyn MicrophoneAccess>>,
        presenter: Arc<dyn Presenter>,
        event_tx: broadcast::Sender<ListeningEvent>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Self {
            state: ListeningState::Stopped,
            is_listening: false,
            keep_alive: false,
            current_action: settings.default_action.clone(),
            status_message: settings.messages.prompt.clone(),
            state_entered_at: Instant::now(),
            settings,
            matcher,
            capability,
            microphone,
            presenter,
            session: None,
            session_id: 0,
            sessions_created: 0,
            permission_request: 0,
            restart_generation: 0,
            shutting_down: false,
            inbox_tx,
            inbox_rx: Some(inbox_rx),
            event_tx,
        }
    }

    /// Handle for sending commands to this controller
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle::new(self.inbox_tx.clone())
    }

    pub fn state(&self) -> ListeningState {
        self.state
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            state: self.state,
            listening: self.is_listening,
            keep_alive: self.keep_alive,
            current_action: self.current_action.clone(),
            status_message: self.status_message.clone(),
            sessions_created: self.sessions_created,
        }
    }

    /// Process events until shutdown
    pub async fn run(mut self) {
        let Some(mut inbox) = self.inbox_rx.take() else {
            warn!("listening controller already running");
            return;
        };

        info!(action = %self.current_action, "listening controller started in Stopped state");
        self.present_action();
        self.emit(ListeningEvent::Status {
            message: self.status_message.clone(),
        });

        while let Some(event) = inbox.recv().await {
            self.handle_event(event);
            if self.shutting_down {
                break;
            }
        }

        info!("listening controller stopped");
    }

    /// Apply one event to the state machine
    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Command(command) => self.handle_command(command),
            ControllerEvent::PermissionResolved { request, result } => {
                self.on_permission(request, result)
            }
            ControllerEvent::Recognizer { session, event } => {
                self.on_recognizer_event(session, event)
            }
            ControllerEvent::RestartDue { generation } => self.on_restart_due(generation),
        }
    }

    fn handle_command(&mut self, command: Command) {
        debug!(?command, state = %self.state, "command received");

        match command {
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Toggle => {
                if self.state == ListeningState::Stopped {
                    self.start()
                } else {
                    self.stop()
                }
            }
            Command::Shutdown => self.shutdown(),
        }
    }

    // ------------------------------------------------------------------
    // User transitions
    // ------------------------------------------------------------------

    fn start(&mut self) {
        if self.is_listening {
            debug!(state = %self.state, "start ignored, already listening");
            return;
        }
        if self.capability.is_none() {
            self.fail(ControllerError::CapabilityUnavailable);
            return;
        }
        let Some(microphone) = self.microphone.clone() else {
            self.fail(ControllerError::MicrophoneUnavailable);
            return;
        };

        self.is_listening = true;
        self.transition_to(ListeningState::AwaitingPermission);

        self.permission_request += 1;
        let request = self.permission_request;
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = microphone.request().await;
            let _ = inbox.send(ControllerEvent::PermissionResolved { request, result });
        });
    }

    fn stop(&mut self) {
        if self.state == ListeningState::Stopped {
            debug!("stop ignored, not listening");
            return;
        }

        self.end_listening();
        self.set_status(self.settings.messages.stopped.clone());
    }

    fn shutdown(&mut self) {
        info!(state = %self.state, "listening controller shutting down");

        let was_active = self.state != ListeningState::Stopped;
        self.end_listening();
        if was_active {
            self.set_status(self.settings.messages.stopped.clone());
        }

        self.shutting_down = true;
        self.emit(ListeningEvent::Shutdown);
    }

    // ------------------------------------------------------------------
    // Asynchronous completions
    // ------------------------------------------------------------------

    fn on_permission(&mut self, request: u64, result: Result<(), MicrophoneError>) {
        if request != self.permission_request || self.state != ListeningState::AwaitingPermission {
            debug!(request, state = %self.state, "stale permission result ignored");
            return;
        }

        match result {
            Err(MicrophoneError::Denied) => self.fail(ControllerError::PermissionDenied),
            Err(MicrophoneError::Unavailable) => self.fail(ControllerError::MicrophoneUnavailable),
            Ok(()) => {
                info!("microphone access granted");
                self.keep_alive = true;
                if let Err(e) = self.begin_capture() {
                    self.fail(e);
                }
            }
        }
    }

    fn on_recognizer_event(&mut self, id: u64, event: RecognizerEvent) {
        if id != self.session_id {
            debug!(session = id, "event from a released session ignored");
            return;
        }
        let Some(session) = self.session.as_mut() else {
            debug!(session = id, "event after session release ignored");
            return;
        };
        let Some(event) = session.handle(event) else {
            return;
        };

        match event {
            SessionEvent::Started => {
                debug!(session = id, "capture started");
                if self.state == ListeningState::Listening {
                    self.set_status(self.settings.messages.listening.clone());
                }
            }
            SessionEvent::Transcript { text, is_final } => self.on_transcript(text, is_final),
            SessionEvent::Error { code } => self.on_session_error(code),
            SessionEvent::Ended => self.on_session_ended(),
        }
    }

    fn on_restart_due(&mut self, generation: u64) {
        if generation != self.restart_generation
            || self.state != ListeningState::RestartPending
            || !self.keep_alive
        {
            debug!(generation, state = %self.state, "stale restart ignored");
            return;
        }

        let result = match self.session.as_mut() {
            Some(session) => session.start().map_err(|e| e.to_string()),
            None => Err("no recognition session".to_string()),
        };

        match result {
            Ok(()) => {
                let starts = self.session.as_ref().map_or(0, |s| s.starts());
                debug!(session = self.session_id, starts, "recognition restarted");
                self.transition_to(ListeningState::Listening);
            }
            Err(reason) => self.fail(ControllerError::RestartFailure(reason)),
        }
    }

    // ------------------------------------------------------------------
    // Session events
    // ------------------------------------------------------------------

    fn on_transcript(&mut self, text: String, is_final: bool) {
        self.emit(ListeningEvent::Transcript {
            text: text.clone(),
            is_final,
        });

        if is_final {
            self.dispatch(&text);
        } else {
            self.set_status(self.settings.messages.heard(&text));
        }
    }

    /// Report a recognizer error; the following end restarts as usual
    fn on_session_error(&mut self, code: String) {
        let status = match code.as_str() {
            codes::NO_SPEECH => {
                debug!("no speech before timeout");
                self.settings.messages.no_speech.clone()
            }
            codes::NOT_ALLOWED | codes::SERVICE_NOT_ALLOWED => {
                warn!(code = %code, "microphone access refused during capture");
                self.status_for(&ControllerError::Session(code.clone()))
            }
            _ => {
                warn!(code = %code, "recognition session error");
                self.status_for(&ControllerError::Session(code.clone()))
            }
        };
        self.set_status(status);
    }

    fn on_session_ended(&mut self) {
        if self.state != ListeningState::Listening {
            debug!(state = %self.state, "session end ignored");
            return;
        }

        if !self.keep_alive {
            self.end_listening();
            self.set_status(self.settings.messages.stopped.clone());
            return;
        }

        self.transition_to(ListeningState::RestartPending);

        self.restart_generation += 1;
        let generation = self.restart_generation;
        let delay = self.settings.restart_delay;
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inbox.send(ControllerEvent::RestartDue { generation });
        });
    }

    fn dispatch(&mut self, text: &str) {
        match self.matcher.match_transcript(text) {
            MatchResult::Action(action) => {
                info!(transcript = %text, action = %action, "command recognized");
                if action != self.current_action {
                    self.current_action = action.clone();
                    self.present_action();
                    self.emit(ListeningEvent::ActionChanged { action });
                }
                self.set_status(self.settings.messages.heard(text));
            }
            MatchResult::Numeral(value) => {
                info!(transcript = %text, value, "number recognized");
                if let Err(e) = self.presenter.show_number(value) {
                    error!(value, error = %e, "failed to show number");
                }
                self.emit(ListeningEvent::NumberShown { value });
                self.set_status(self.settings.messages.heard(text));
            }
            MatchResult::NoMatch => {
                info!(transcript = %text, "no command recognized");
                self.set_status(self.settings.messages.unrecognized(text));
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Create the session if needed and start capturing
    fn begin_capture(&mut self) -> Result<(), ControllerError> {
        if self.session.is_none() {
            self.session = Some(self.open_session()?);
        }
        if let Some(session) = self.session.as_mut() {
            session
                .start()
                .map_err(|e| ControllerError::StartFailure(e.to_string()))?;
        }
        self.transition_to(ListeningState::Listening);
        Ok(())
    }

    fn open_session(&mut self) -> Result<RecognitionSession, ControllerError> {
        let capability = self
            .capability
            .clone()
            .ok_or(ControllerError::CapabilityUnavailable)?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = RecognitionSession::open(capability.as_ref(), &self.settings.recognizer, tx)
            .map_err(|e| match e {
                SpeechError::Unavailable => ControllerError::CapabilityUnavailable,
                other => ControllerError::StartFailure(other.to_string()),
            })?;

        self.session_id += 1;
        self.sessions_created += 1;
        let id = self.session_id;
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if inbox
                    .send(ControllerEvent::Recognizer { session: id, event })
                    .is_err()
                {
                    break;
                }
            }
        });

        info!(session = id, "recognition session opened");
        Ok(session)
    }

    /// Leave the listening lifecycle: clear keep-alive first, then stop
    fn end_listening(&mut self) {
        self.keep_alive = false;
        if let Some(mut session) = self.session.take() {
            session.stop();
            debug!(
                session = self.session_id,
                state = ?session.state(),
                "recognition session released"
            );
        }
        self.is_listening = false;
        self.transition_to(ListeningState::Stopped);
    }

    fn fail(&mut self, err: ControllerError) {
        warn!(error = %err, state = %self.state, "listening failed");
        if self.is_listening {
            self.end_listening();
        }
        let status = self.status_for(&err);
        self.set_status(status);
    }

    fn status_for(&self, err: &ControllerError) -> String {
        let messages = &self.settings.messages;
        match err {
            ControllerError::CapabilityUnavailable => messages.unsupported.clone(),
            ControllerError::PermissionDenied => messages.permission_denied.clone(),
            ControllerError::MicrophoneUnavailable => messages.microphone_unavailable.clone(),
            ControllerError::Session(code) | ControllerError::StartFailure(code) => {
                messages.session_error(code)
            }
            ControllerError::RestartFailure(reason) => messages.restart_failure(reason),
        }
    }

    fn present_action(&self) {
        if let Err(e) = self.presenter.set_action(&self.current_action) {
            error!(action = %self.current_action, error = %e, "failed to present action");
        }
    }

    fn set_status(&mut self, message: String) {
        if message == self.status_message {
            return;
        }
        info!(status = %message, "status");
        self.status_message = message.clone();
        self.emit(ListeningEvent::Status { message });
    }

    /// Perform a state transition
    fn transition_to(&mut self, new_state: ListeningState) {
        let old_state = self.state;
        if new_state == old_state {
            return;
        }

        let duration_ms = self.state_entered_at.elapsed().as_millis() as u64;
        info!(
            from = %old_state,
            to = %new_state,
            duration_ms = duration_ms,
            "state transition"
        );

        self.state = new_state;
        self.state_entered_at = Instant::now();
        self.emit(ListeningEvent::StateChanged {
            from: old_state,
            to: new_state,
        });
    }

    fn emit(&self, event: ListeningEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}

//! One recognition session over a host recognizer
//!
//! Translates raw recognizer events into `SessionEvent`s and tracks the
//! session lifecycle: Idle → Starting → Listening → Ending → Idle.

use tracing::{debug, trace};

use super::recognizer::{
    RecognizerEvent, RecognizerEventTx, RecognizerSettings, SpeechCapability, SpeechError,
    SpeechRecognizer,
};

/// Lifecycle of the wrapped recognizer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecognitionState {
    #[default]
    Idle,
    /// `start` was called, waiting for the host to begin capture
    Starting,
    /// Capture is running
    Listening,
    /// Stop requested or an error occurred, waiting for the end event
    Ending,
}

/// Uniform session events consumed by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started,
    Transcript { text: String, is_final: bool },
    Error { code: String },
    Ended,
}

/// Owned wrapper around one host recognizer
pub struct RecognitionSession {
    recognizer: Box<dyn SpeechRecognizer>,
    state: RecognitionState,
    /// A final transcript was already delivered in this capture
    final_delivered: bool,
    /// Number of successful `start` calls
    starts: u64,
}

impl RecognitionSession {
    /// Construct a recognizer through the host capability
    pub fn open(
        capability: &dyn SpeechCapability,
        settings: &RecognizerSettings,
        events: RecognizerEventTx,
    ) -> Result<Self, SpeechError> {
        let recognizer = capability.create(settings, events)?;
        debug!(lang = %settings.lang, "recognition session created");

        Ok(Self {
            recognizer,
            state: RecognitionState::Idle,
            final_delivered: false,
            starts: 0,
        })
    }

    pub fn state(&self) -> RecognitionState {
        self.state
    }

    pub fn starts(&self) -> u64 {
        self.starts
    }

    /// Begin capturing one utterance
    pub fn start(&mut self) -> Result<(), SpeechError> {
        if self.state != RecognitionState::Idle {
            return Err(SpeechError::AlreadyStarted);
        }

        self.recognizer.start()?;
        self.state = RecognitionState::Starting;
        self.final_delivered = false;
        self.starts += 1;
        Ok(())
    }

    /// Ask the recognizer to stop; the end event still follows
    pub fn stop(&mut self) {
        if self.state == RecognitionState::Idle {
            return;
        }
        self.state = RecognitionState::Ending;
        self.recognizer.stop();
    }

    /// Translate a raw recognizer event
    ///
    /// Returns `None` for results without an alternative, for blank interim
    /// results and for any result arriving after the final transcript of this
    /// capture.
    pub fn handle(&mut self, event: RecognizerEvent) -> Option<SessionEvent> {
        trace!(?event, state = ?self.state, "recognizer event");

        match event {
            RecognizerEvent::Start => {
                if self.state == RecognitionState::Starting {
                    self.state = RecognitionState::Listening;
                }
                Some(SessionEvent::Started)
            }
            RecognizerEvent::Result {
                result_index,
                results,
            } => {
                if self.final_delivered {
                    return None;
                }
                let result = results.get(result_index)?;
                let best = result.alternatives.first()?;
                let text = best.transcript.trim();
                // Blank finals still end the utterance and are reported as unmatched
                if text.is_empty() && !result.is_final {
                    return None;
                }
                if result.is_final {
                    self.final_delivered = true;
                }
                debug!(confidence = best.confidence, is_final = result.is_final, "transcript");
                Some(SessionEvent::Transcript {
                    text: text.to_string(),
                    is_final: result.is_final,
                })
            }
            RecognizerEvent::Error { code } => {
                self.state = RecognitionState::Ending;
                Some(SessionEvent::Error { code })
            }
            RecognizerEvent::End => {
                self.state = RecognitionState::Idle;
                Some(SessionEvent::Ended)
            }
        }
    }
}

impl Drop for RecognitionSession {
    fn drop(&mut self) {
        if matches!(
            self.state,
            RecognitionState::Starting | RecognitionState::Listening
        ) {
            self.recognizer.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::recognizer::RecognitionResult;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct Calls {
        starts: usize,
        stops: usize,
    }

    struct FakeRecognizer(Arc<Mutex<Calls>>);

    impl SpeechRecognizer for FakeRecognizer {
        fn start(&mut self) -> Result<(), SpeechError> {
            self.0.lock().unwrap().starts += 1;
            Ok(())
        }

        fn stop(&mut self) {
            self.0.lock().unwrap().stops += 1;
        }
    }

    struct FakeCapability(Arc<Mutex<Calls>>);

    impl SpeechCapability for FakeCapability {
        fn create(
            &self,
            _settings: &RecognizerSettings,
            _events: RecognizerEventTx,
        ) -> Result<Box<dyn SpeechRecognizer>, SpeechError> {
            Ok(Box::new(FakeRecognizer(Arc::clone(&self.0))))
        }
    }

    fn open_session() -> (RecognitionSession, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = RecognitionSession::open(
            &FakeCapability(Arc::clone(&calls)),
            &RecognizerSettings::default(),
            tx,
        )
        .unwrap();
        (session, calls)
    }

    fn result(text: &str, is_final: bool) -> RecognizerEvent {
        RecognizerEvent::Result {
            result_index: 0,
            results: vec![RecognitionResult::single(text, is_final)],
        }
    }

    #[test]
    fn test_lifecycle() {
        let (mut session, calls) = open_session();
        assert_eq!(session.state(), RecognitionState::Idle);

        session.start().unwrap();
        assert_eq!(session.state(), RecognitionState::Starting);
        assert_eq!(session.handle(RecognizerEvent::Start), Some(SessionEvent::Started));
        assert_eq!(session.state(), RecognitionState::Listening);

        session.stop();
        assert_eq!(session.state(), RecognitionState::Ending);
        assert_eq!(session.handle(RecognizerEvent::End), Some(SessionEvent::Ended));
        assert_eq!(session.state(), RecognitionState::Idle);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.starts, 1);
        assert_eq!(calls.stops, 1);
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let (mut session, _) = open_session();
        session.start().unwrap();
        assert_eq!(session.start(), Err(SpeechError::AlreadyStarted));
        assert_eq!(session.starts(), 1);
    }

    #[test]
    fn test_session_restarts_after_end() {
        let (mut session, calls) = open_session();
        session.start().unwrap();
        session.handle(RecognizerEvent::End);
        session.start().unwrap();
        assert_eq!(session.starts(), 2);
        assert_eq!(calls.lock().unwrap().starts, 2);
    }

    #[test]
    fn test_interim_then_final() {
        let (mut session, _) = open_session();
        session.start().unwrap();
        session.handle(RecognizerEvent::Start);

        assert_eq!(
            session.handle(result(" ஐந் ", false)),
            Some(SessionEvent::Transcript {
                text: "ஐந்".into(),
                is_final: false
            })
        );
        assert_eq!(
            session.handle(result("ஐந்து", true)),
            Some(SessionEvent::Transcript {
                text: "ஐந்து".into(),
                is_final: true
            })
        );
        // At most one final per capture
        assert_eq!(session.handle(result("ஆறு", true)), None);
    }

    #[test]
    fn test_result_index_selects_slot() {
        let (mut session, _) = open_session();
        session.start().unwrap();
        let event = RecognizerEvent::Result {
            result_index: 1,
            results: vec![
                RecognitionResult::single("first", true),
                RecognitionResult::single("second", false),
            ],
        };
        assert_eq!(
            session.handle(event),
            Some(SessionEvent::Transcript {
                text: "second".into(),
                is_final: false
            })
        );
    }

    #[test]
    fn test_empty_results_are_ignored() {
        let (mut session, _) = open_session();
        session.start().unwrap();
        let missing = RecognizerEvent::Result {
            result_index: 3,
            results: vec![],
        };
        let no_alternatives = RecognizerEvent::Result {
            result_index: 0,
            results: vec![RecognitionResult {
                alternatives: vec![],
                is_final: true,
            }],
        };
        assert_eq!(session.handle(missing), None);
        assert_eq!(session.handle(no_alternatives), None);
        assert_eq!(session.handle(result("   ", false)), None);
    }

    #[test]
    fn test_blank_final_is_delivered() {
        let (mut session, _) = open_session();
        session.start().unwrap();
        assert_eq!(
            session.handle(result("   ", true)),
            Some(SessionEvent::Transcript {
                text: String::new(),
                is_final: true
            })
        );
        assert_eq!(session.handle(result("ஆடு", true)), None);
    }

    #[test]
    fn test_error_moves_to_ending() {
        let (mut session, _) = open_session();
        session.start().unwrap();
        session.handle(RecognizerEvent::Start);
        assert_eq!(
            session.handle(RecognizerEvent::Error {
                code: "no-speech".into()
            }),
            Some(SessionEvent::Error {
                code: "no-speech".into()
            })
        );
        assert_eq!(session.state(), RecognitionState::Ending);
    }

    #[test]
    fn test_drop_stops_active_recognizer() {
        let (mut session, calls) = open_session();
        session.start().unwrap();
        drop(session);
        assert_eq!(calls.lock().unwrap().stops, 1);
    }
}

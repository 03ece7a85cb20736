//! Stdin-backed speech capability
//!
//! Each recognizer start captures one line typed on the console as the
//! utterance. Like a host recognizer it is single-shot: it fires `Start`,
//! optional interim results, at most one final result and then `End`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::{
    codes, RecognitionResult, RecognizerEvent, RecognizerEventTx, RecognizerSettings,
    SpeechCapability, SpeechError, SpeechRecognizer,
};

type Utterances = Arc<Mutex<mpsc::UnboundedReceiver<String>>>;

pub struct ConsoleSpeech {
    utterances: Utterances,
    timeout: Duration,
}

impl ConsoleSpeech {
    /// `timeout` is the silence after which a capture ends without a result
    pub fn new(utterances: mpsc::UnboundedReceiver<String>, timeout: Duration) -> Self {
        Self {
            utterances: Arc::new(Mutex::new(utterances)),
            timeout,
        }
    }
}

impl SpeechCapability for ConsoleSpeech {
    fn create(
        &self,
        settings: &RecognizerSettings,
        events: RecognizerEventTx,
    ) -> Result<Box<dyn SpeechRecognizer>, SpeechError> {
        debug!(lang = %settings.lang, "console recognizer created");
        Ok(Box::new(ConsoleRecognizer {
            utterances: Arc::clone(&self.utterances),
            timeout: self.timeout,
            interim_results: settings.interim_results,
            events,
            capture: None,
        }))
    }
}

struct ConsoleRecognizer {
    utterances: Utterances,
    timeout: Duration,
    interim_results: bool,
    events: RecognizerEventTx,
    capture: Option<JoinHandle<()>>,
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&mut self) -> Result<(), SpeechError> {
        if self.capture.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err(SpeechError::AlreadyStarted);
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SpeechError::StartFailed(e.to_string()))?;

        self.capture = Some(runtime.spawn(capture_utterance(
            Arc::clone(&self.utterances),
            self.timeout,
            self.interim_results,
            self.events.clone(),
        )));
        Ok(())
    }

    fn stop(&mut self) {
        let Some(task) = self.capture.take() else {
            return;
        };
        if task.is_finished() {
            return;
        }

        task.abort();
        let _ = self.events.send(RecognizerEvent::Error {
            code: codes::ABORTED.to_string(),
        });
        let _ = self.events.send(RecognizerEvent::End);
    }
}

impl Drop for ConsoleRecognizer {
    fn drop(&mut self) {
        if let Some(task) = self.capture.take() {
            task.abort();
        }
    }
}

async fn capture_utterance(
    utterances: Utterances,
    timeout: Duration,
    interim_results: bool,
    events: RecognizerEventTx,
) {
    let _ = events.send(RecognizerEvent::Start);

    let next = tokio::time::timeout(timeout, async { utterances.lock().await.recv().await }).await;

    match next {
        Ok(Some(line)) => {
            if interim_results {
                let words: Vec<&str> = line.split_whitespace().collect();
                for n in 1..words.len() {
                    let _ = events.send(result(words[..n].join(" "), false));
                }
            }
            let _ = events.send(result(line, true));
        }
        Ok(None) => {
            let _ = events.send(RecognizerEvent::Error {
                code: codes::AUDIO_CAPTURE.to_string(),
            });
        }
        Err(_) => {
            let _ = events.send(RecognizerEvent::Error {
                code: codes::NO_SPEECH.to_string(),
            });
        }
    }

    let _ = events.send(RecognizerEvent::End);
}

fn result(transcript: String, is_final: bool) -> RecognizerEvent {
    RecognizerEvent::Result {
        result_index: 0,
        results: vec![RecognitionResult::single(transcript, is_final)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect_until_end(rx: &mut mpsc::UnboundedReceiver<RecognizerEvent>) -> Vec<RecognizerEvent> {
        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap();
            let done = event == RecognizerEvent::End;
            events.push(event);
            if done {
                return events;
            }
        }
    }

    fn setup(timeout: Duration, interim: bool) -> (
        Box<dyn SpeechRecognizer>,
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<RecognizerEvent>,
    ) {
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let speech = ConsoleSpeech::new(lines_rx, timeout);
        let settings = RecognizerSettings {
            interim_results: interim,
            ..RecognizerSettings::default()
        };
        let recognizer = speech.create(&settings, events_tx).unwrap();
        (recognizer, lines_tx, events_rx)
    }

    #[tokio::test]
    async fn test_captures_one_line() {
        let (mut recognizer, lines, mut events) = setup(Duration::from_secs(2), false);
        lines.send("உக்காரு".to_string()).unwrap();
        recognizer.start().unwrap();

        let events = collect_until_end(&mut events).await;
        assert_eq!(
            events,
            vec![
                RecognizerEvent::Start,
                result("உக்காரு".to_string(), true),
                RecognizerEvent::End,
            ]
        );
    }

    #[tokio::test]
    async fn test_interim_prefixes() {
        let (mut recognizer, lines, mut events) = setup(Duration::from_secs(2), true);
        lines.send("நடனம் ஆடு".to_string()).unwrap();
        recognizer.start().unwrap();

        let events = collect_until_end(&mut events).await;
        assert_eq!(events[1], result("நடனம்".to_string(), false));
        assert_eq!(events[2], result("நடனம் ஆடு".to_string(), true));
    }

    #[tokio::test]
    async fn test_silence_timeout() {
        let (mut recognizer, _lines, mut events) = setup(Duration::from_millis(10), false);
        recognizer.start().unwrap();

        let events = collect_until_end(&mut events).await;
        assert_eq!(
            events[1],
            RecognizerEvent::Error {
                code: codes::NO_SPEECH.into()
            }
        );
    }

    #[tokio::test]
    async fn test_closed_input_is_capture_error() {
        let (mut recognizer, lines, mut events) = setup(Duration::from_secs(2), false);
        drop(lines);
        recognizer.start().unwrap();

        let events = collect_until_end(&mut events).await;
        assert_eq!(
            events[1],
            RecognizerEvent::Error {
                code: codes::AUDIO_CAPTURE.into()
            }
        );
    }

    #[tokio::test]
    async fn test_stop_aborts_capture() {
        let (mut recognizer, _lines, mut events) = setup(Duration::from_secs(30), false);
        recognizer.start().unwrap();
        assert_eq!(recognizer.start(), Err(SpeechError::AlreadyStarted));

        recognizer.stop();
        let events = collect_until_end(&mut events).await;
        assert_eq!(events.last(), Some(&RecognizerEvent::End));
        assert!(events.contains(&RecognizerEvent::Error {
            code: codes::ABORTED.into()
        }));
    }
}

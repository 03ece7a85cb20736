//! Console input: toggle commands and spoken-utterance stand-ins
//!
//! Lines starting with `/` are controller commands, anything else is an
//! utterance for the console recognizer.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::controller::{Command, ControllerHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(Command),
    Utterance(String),
    Unknown(String),
    Empty,
}

pub fn parse_line(line: &str) -> ConsoleInput {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleInput::Empty;
    }

    match line.strip_prefix('/') {
        Some(command) => match command.trim() {
            "start" => ConsoleInput::Command(Command::Start),
            "stop" => ConsoleInput::Command(Command::Stop),
            "toggle" | "t" => ConsoleInput::Command(Command::Toggle),
            "quit" | "exit" => ConsoleInput::Command(Command::Shutdown),
            other => ConsoleInput::Unknown(other.to_string()),
        },
        None => ConsoleInput::Utterance(line.to_string()),
    }
}

/// Read stdin until EOF; closing the console shuts the controller down
pub fn spawn_stdin(
    utterances: mpsc::UnboundedSender<String>,
    controller: ControllerHandle,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match parse_line(&line) {
                    ConsoleInput::Command(command) => {
                        if controller.send(command).is_err() {
                            break;
                        }
                    }
                    ConsoleInput::Utterance(text) => {
                        if utterances.send(text).is_err() {
                            warn!("console recognizer is gone, utterance dropped");
                        }
                    }
                    ConsoleInput::Unknown(command) => {
                        warn!(command = %command, "unknown console command");
                    }
                    ConsoleInput::Empty => {}
                },
                Ok(None) => {
                    info!("console input closed");
                    controller.shutdown();
                    break;
                }
                Err(e) => {
                    error!(?e, "failed to read console input");
                    controller.shutdown();
                    break;
                }
            }
        }
    })
}

//! Configuration loading and management
//!
//! Paths come from the environment; everything else has built-in defaults
//! that an optional `config.toml` in the data directory can override.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::controller::ControllerSettings;
use crate::matcher::BoundaryMode;
use crate::session::RecognizerSettings;
use crate::triggers::{
    tamil_actions, tamil_numerals, NumeralEntry, TriggerEntry, TriggerTable, TAMIL_DIGITS,
};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data and `config.toml`
    pub data_dir: PathBuf,

    pub speech: SpeechConfig,
    pub microphone: MicrophoneConfig,
    pub display: DisplayConfig,
    pub messages: StatusMessages,

    /// Replacement trigger phrases; empty keeps the built-in table
    pub triggers: Vec<TriggerEntry>,
    /// Replacement numeral lexicon; empty keeps the built-in lexicon
    pub numerals: Vec<NumeralEntry>,
}

/// Contents of `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub microphone: MicrophoneConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub messages: StatusMessages,
    #[serde(default)]
    pub triggers: Vec<TriggerEntry>,
    #[serde(default)]
    pub numerals: Vec<NumeralEntry>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid config.toml")
    }
}

// ============================================================================
// Speech
// ============================================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// Lines typed on stdin stand in for recognized utterances
    #[default]
    Console,
    /// No speech capability on this host
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_true")]
    pub interim_results: bool,
    #[serde(default)]
    pub continuous: bool,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: u32,
    /// Delay before a session that ended on its own is restarted
    #[serde(default = "default_restart_delay")]
    pub restart_delay_ms: u64,
    #[serde(default)]
    pub backend: SpeechBackend,
    /// Console backend: silence before a session ends without a result
    #[serde(default = "default_utterance_timeout")]
    pub utterance_timeout_ms: u64,
    /// Start listening as soon as the daemon is up
    #[serde(default = "default_true")]
    pub autostart: bool,
    /// `whole_word`, or `substring` for plain containment
    #[serde(default)]
    pub boundary: BoundaryMode,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            interim_results: true,
            continuous: false,
            max_alternatives: default_max_alternatives(),
            restart_delay_ms: default_restart_delay(),
            backend: SpeechBackend::default(),
            utterance_timeout_ms: default_utterance_timeout(),
            autostart: true,
            boundary: BoundaryMode::default(),
        }
    }
}

fn default_lang() -> String {
    "ta-IN".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_alternatives() -> u32 {
    1
}

fn default_restart_delay() -> u64 {
    300
}

fn default_utterance_timeout() -> u64 {
    8000
}

// ============================================================================
// Microphone
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct MicrophoneConfig {
    /// Whether the console microphone grants access
    #[serde(default = "default_true")]
    pub allow: bool,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self { allow: true }
    }
}

// ============================================================================
// Display
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Action shown before any command is heard
    #[serde(default = "default_action")]
    pub default_action: String,
    /// Action key → animation asset
    #[serde(default = "default_animations")]
    pub animations: BTreeMap<String, String>,
    #[serde(default = "default_number_flash")]
    pub number_flash_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_action: default_action(),
            animations: default_animations(),
            number_flash_ms: default_number_flash(),
        }
    }
}

fn default_action() -> String {
    "sit".to_string()
}

fn default_animations() -> BTreeMap<String, String> {
    ["sit", "walk", "dance", "jump"]
        .into_iter()
        .map(|key| (key.to_string(), format!("{key}.json")))
        .collect()
}

fn default_number_flash() -> u64 {
    1500
}

// ============================================================================
// Status messages
// ============================================================================

/// User-visible status strings
///
/// `{text}` is replaced with the heard transcript, `{code}` with an error
/// code or reason.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StatusMessages {
    pub prompt: String,
    pub listening: String,
    /// Silence until the recognizer gave up on the utterance
    pub no_speech: String,
    pub heard: String,
    pub unrecognized: String,
    pub stopped: String,
    pub unsupported: String,
    pub permission_denied: String,
    pub microphone_unavailable: String,
    pub session_error: String,
    pub restart_failure: String,
}

impl Default for StatusMessages {
    fn default() -> Self {
        Self {
            prompt: "பேசுங்கள்… (Speak a command)".into(),
            listening: "கேட்கிறது… (Listening)".into(),
            no_speech: "எதுவும் கேட்கவில்லை (No speech detected)".into(),
            heard: "நீங்கள் சொன்னது: {text}".into(),
            unrecognized: "அறிய முடியவில்லை: {text}".into(),
            stopped: "நிறுத்தப்பட்டது (Stopped)".into(),
            unsupported: "இந்த சாதனத்தில் பேச்சு அறிதல் இல்லை (Speech recognition unsupported)".into(),
            permission_denied: "மைக்ரோஃபோன் அனுமதி மறுக்கப்பட்டது (Microphone permission denied)".into(),
            microphone_unavailable: "மைக்ரோஃபோன் கிடைக்கவில்லை (No microphone)".into(),
            session_error: "பிழை: {code}".into(),
            restart_failure: "மீண்டும் தொடங்க முடியவில்லை: {code}".into(),
        }
    }
}

impl StatusMessages {
    pub fn heard(&self, text: &str) -> String {
        self.heard.replace("{text}", text)
    }

    pub fn unrecognized(&self, text: &str) -> String {
        self.unrecognized.replace("{text}", text)
    }

    pub fn session_error(&self, code: &str) -> String {
        self.session_error.replace("{code}", code)
    }

    pub fn restart_failure(&self, reason: &str) -> String {
        self.restart_failure.replace("{code}", reason)
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("bommai");

        let file_path = data_dir.join("config.toml");
        let file = if file_path.exists() {
            let text = std::fs::read_to_string(&file_path)
                .with_context(|| format!("failed to read {}", file_path.display()))?;
            FileConfig::parse(&text)?
        } else {
            FileConfig::default()
        };

        Ok(Self::from_file(data_dir, file))
    }

    /// Build configuration rooted at `data_dir` from parsed file contents
    pub fn from_file(data_dir: impl AsRef<Path>, file: FileConfig) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let socket_path = data_dir.join("bommai.sock");

        Self {
            socket_path,
            data_dir,
            speech: file.speech,
            microphone: file.microphone,
            display: file.display,
            messages: file.messages,
            triggers: file.triggers,
            numerals: file.numerals,
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Build the trigger table, falling back to the built-in lists
    ///
    /// Also checks that the default action is a configured command. Actions
    /// without an animation are only warned about; the presenter reports
    /// them when they are dispatched.
    pub fn trigger_table(&self) -> Result<TriggerTable> {
        let actions = if self.triggers.is_empty() {
            tamil_actions()
        } else {
            self.triggers.clone()
        };
        let numerals = if self.numerals.is_empty() {
            tamil_numerals()
        } else {
            self.numerals.clone()
        };

        let table = TriggerTable::new(actions, numerals, Some(TAMIL_DIGITS))?;

        if !table.has_action(&self.display.default_action) {
            bail!(
                "default action '{}' has no trigger phrases",
                self.display.default_action
            );
        }
        for action in table.actions() {
            if !self.display.animations.contains_key(action) {
                warn!(action = %action, "no animation configured for action");
            }
        }

        Ok(table)
    }

    pub fn recognizer_settings(&self) -> RecognizerSettings {
        RecognizerSettings {
            lang: self.speech.lang.clone(),
            interim_results: self.speech.interim_results,
            continuous: self.speech.continuous,
            max_alternatives: self.speech.max_alternatives,
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            recognizer: self.recognizer_settings(),
            restart_delay: Duration::from_millis(self.speech.restart_delay_ms),
            default_action: self.display.default_action.clone(),
            messages: self.messages.clone(),
        }
    }
}

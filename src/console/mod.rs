//! Console host: stands in for the speech API and microphone of a real host
//!
//! Typed lines become utterances, `/start`, `/stop` and `/toggle` drive the
//! listening toggle, and EOF closes the app.

mod input;
mod speech;

pub use input::spawn_stdin;
pub use speech::ConsoleSpeech;

use async_trait::async_trait;

use crate::session::{MicrophoneAccess, MicrophoneError};

/// Microphone whose grant is fixed by configuration
pub struct ConsoleMicrophone {
    allow: bool,
}

impl ConsoleMicrophone {
    pub fn new(allow: bool) -> Self {
        Self { allow }
    }
}

#[async_trait]
impl MicrophoneAccess for ConsoleMicrophone {
    async fn request(&self) -> Result<(), MicrophoneError> {
        if self.allow {
            Ok(())
        } else {
            Err(MicrophoneError::Denied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microphone_grant() {
        tokio_test::assert_ok!(tokio_test::block_on(ConsoleMicrophone::new(true).request()));
        assert_eq!(
            tokio_test::block_on(ConsoleMicrophone::new(false).request()),
            Err(MicrophoneError::Denied)
        );
    }
}

//! Presentation adapter
//!
//! The animation renderer is an external collaborator. The controller only
//! tells it which action to play or which number to flash; failures are
//! reported back as `PresentError` and logged by the caller.

mod console;

pub use console::ConsolePresenter;

#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    #[error("no animation configured for action '{0}'")]
    UnknownAnimation(String),

    #[error("number {0} is outside the displayable range")]
    NumberOutOfRange(u8),

    #[error("renderer failed: {0}")]
    Renderer(String),
}

/// Renders the character animation and the number display
pub trait Presenter: Send + Sync {
    /// Swap the looping animation to `action`
    fn set_action(&self, action: &str) -> Result<(), PresentError>;

    /// Flash `value` on the number display
    fn show_number(&self, value: u8) -> Result<(), PresentError>;
}

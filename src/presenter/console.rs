//! Terminal stand-in for the animation renderer

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::DisplayConfig;

use super::{PresentError, Presenter};

type Output = Arc<Mutex<Box<dyn Write + Send>>>;

/// Line printed when a flashed number is taken off the display
const NUMBER_CLEARED: &str = "🔢 _";

/// Prints animation swaps and number flashes to a writer (stdout by default)
pub struct ConsolePresenter {
    animations: BTreeMap<String, String>,
    number_flash: Duration,
    out: Output,
    /// Bumped on every flash; only the newest flash clears the display
    flash_generation: Arc<AtomicU64>,
}

impl ConsolePresenter {
    pub fn new(display: &DisplayConfig) -> Self {
        Self::with_writer(display, Box::new(std::io::stdout()))
    }

    pub fn with_writer(display: &DisplayConfig, out: Box<dyn Write + Send>) -> Self {
        Self {
            animations: display.animations.clone(),
            number_flash: Duration::from_millis(display.number_flash_ms),
            out: Arc::new(Mutex::new(out)),
            flash_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Clear the number once the flash elapses, unless a newer number replaced it
    fn schedule_clear(&self, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime, number stays on the display");
            return;
        };

        let out = Arc::clone(&self.out);
        let current = Arc::clone(&self.flash_generation);
        let flash = self.number_flash;
        runtime.spawn(async move {
            tokio::time::sleep(flash).await;
            if current.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = write_line(&out, NUMBER_CLEARED) {
                debug!(error = %e, "failed to clear number");
            }
        });
    }
}

fn write_line(out: &Mutex<Box<dyn Write + Send>>, line: &str) -> Result<(), PresentError> {
    let mut out = out
        .lock()
        .map_err(|_| PresentError::Renderer("output lock poisoned".into()))?;
    writeln!(out, "{line}").map_err(|e| PresentError::Renderer(e.to_string()))?;
    out.flush().map_err(|e| PresentError::Renderer(e.to_string()))
}

impl Presenter for ConsolePresenter {
    fn set_action(&self, action: &str) -> Result<(), PresentError> {
        let asset = self
            .animations
            .get(action)
            .ok_or_else(|| PresentError::UnknownAnimation(action.to_string()))?;

        info!(action, asset = %asset, "playing animation");
        write_line(&self.out, &format!("🎭 [{action}] ({asset})"))
    }

    fn show_number(&self, value: u8) -> Result<(), PresentError> {
        if !(1..=10).contains(&value) {
            return Err(PresentError::NumberOutOfRange(value));
        }

        info!(value, flash_ms = self.number_flash.as_millis() as u64, "flashing number");
        write_line(&self.out, &format!("🔢 {value}"))?;

        let generation = self.flash_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.schedule_clear(generation);
        Ok(())
    }
}

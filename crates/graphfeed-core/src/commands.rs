use crate::error::Result;
use crate::host::CommandPalette;
use crate::DISPLAY_NAME;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Label for the run-every-source command.
pub fn all_sources_label() -> String {
    format!("{DISPLAY_NAME}: Retrieve all sources")
}

/// Label for a single source's command.
pub fn single_source_label(source_id: &str) -> String {
    format!("{DISPLAY_NAME}: Retrieve items from {source_id}")
}

/// Tracks which per-source commands are registered with the host palette and
/// keeps them aligned with the configured source list.
pub struct CommandRegistry {
    palette: Arc<dyn CommandPalette>,
    installed: Mutex<Vec<String>>,
}

impl CommandRegistry {
    pub fn new(palette: Arc<dyn CommandPalette>) -> Self {
        Self { palette, installed: Mutex::new(Vec::new()) }
    }

    pub async fn install(&self, sources: &[String]) -> Result<()> {
        {
            let installed = self.lock_installed();
            if !installed.is_empty() {
                warn!("previous commands were not uninstalled first");
            }
        }
        for source in sources {
            self.palette.add_command(&single_source_label(source)).await?;
            self.lock_installed().push(source.clone());
        }
        self.palette.add_command(&all_sources_label()).await?;
        debug!(count = sources.len(), "installed source commands");
        Ok(())
    }

    pub async fn uninstall(&self) -> Result<()> {
        self.palette.remove_command(&all_sources_label()).await?;
        let installed = std::mem::take(&mut *self.lock_installed());
        for source in installed {
            self.palette.remove_command(&single_source_label(&source)).await?;
        }
        debug!("uninstalled source commands");
        Ok(())
    }

    pub async fn reinstall(&self, sources: &[String]) -> Result<()> {
        self.uninstall().await?;
        self.install(sources).await
    }

    fn lock_installed(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.installed.lock().unwrap_or_else(|p| p.into_inner())
    }
}

pub mod types;
pub mod error;
pub mod host;
pub mod settings;
pub mod resolver;
pub mod content;
pub mod coordinator;
pub mod commands;
pub mod api;

pub use error::{GraphfeedError, Result};
pub use types::*;
pub use host::{CommandPalette, GraphHost, MemoryGraph, MemoryPalette, MemorySettings, SettingsBackend};
pub use settings::{ReconcileOutcome, Settings, SettingsEvent, SettingsStore};
pub use resolver::{Anchor, InsertionResolver};
pub use content::{ContentSource, filter_items, format_item, format_notice};
pub use coordinator::{AutoRunOutcome, ResolutionCoordinator};
pub use commands::CommandRegistry;
pub use api::Graphfeed;

/// Human-visible name, used for command labels and as the anchor text
/// fallback when no hashtag is configured.
pub const DISPLAY_NAME: &str = "graphfeed";

#[cfg(test)]
pub(crate) mod test_support;

mod parse;
mod store;

#[cfg(test)]
mod tests;

pub use store::{ReconcileOutcome, SettingsEvent, SettingsStore};

use regex::Regex;
use tracing::warn;

pub const KEY_AUTO: &str = "auto";
pub const KEY_SOURCES: &str = "sources";
pub const KEY_SORT: &str = "sort";
pub const KEY_ITEMS_PER_RUN: &str = "items-per-run";
pub const KEY_HASHTAG: &str = "hashtag";
pub const KEY_GROUP: &str = "group";
pub const KEY_TITLE_ONLY: &str = "title-only";
pub const KEY_BLOCKED_WORDS: &str = "blocked-words";
pub const KEY_MINIMUM_SCORE: &str = "minimum-score";

/// Every recognized raw key, in reconciliation order.
pub const ALL_SETTING_KEYS: [&str; 9] = [
    KEY_AUTO,
    KEY_SOURCES,
    KEY_SORT,
    KEY_ITEMS_PER_RUN,
    KEY_HASHTAG,
    KEY_GROUP,
    KEY_TITLE_ONLY,
    KEY_BLOCKED_WORDS,
    KEY_MINIMUM_SCORE,
];

pub const DEFAULT_AUTO: bool = true;
pub const DEFAULT_SORT: &str = "top";
pub const DEFAULT_ITEMS_PER_RUN: u32 = 1;
pub const DEFAULT_HASHTAG: &str = "#graphfeed";
pub const DEFAULT_GROUP: bool = true;
pub const DEFAULT_TITLE_ONLY: bool = false;
pub const DEFAULT_MINIMUM_SCORE: u32 = 0;

pub fn default_sources() -> Vec<String> {
    vec!["lifeprotips".to_string()]
}

/// Typed user settings. Always fully valid: reconciliation replaces any
/// invalid or missing raw value with the field default before assignment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Content-source identifiers to poll, in command order.
    pub sources: Vec<String>,
    /// Whether automatic (non-interactive) runs are enabled.
    pub auto: bool,
    /// Ranking order requested from the content source.
    pub sort: String,
    /// Whether inserted items share one anchor node per run.
    pub group: bool,
    /// Normalized hashtag (single leading `#`), or `None` for no hashtag.
    pub hashtag: Option<String>,
    pub items_per_run: u32,
    /// Exclude item bodies when formatting.
    pub title_only: bool,
    pub blocked_words: Vec<String>,
    /// Derived from `blocked_words`; recomputed on every change to it and
    /// never persisted.
    pub blocked_matchers: Vec<Regex>,
    pub minimum_score: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            auto: DEFAULT_AUTO,
            sort: DEFAULT_SORT.to_string(),
            group: DEFAULT_GROUP,
            hashtag: Some(DEFAULT_HASHTAG.to_string()),
            items_per_run: DEFAULT_ITEMS_PER_RUN,
            title_only: DEFAULT_TITLE_ONLY,
            blocked_words: Vec::new(),
            blocked_matchers: Vec::new(),
            minimum_score: DEFAULT_MINIMUM_SCORE,
        }
    }
}

/// Case-insensitive word-boundary matchers for the blocked phrases.
pub fn blocked_matchers_for(words: &[String]) -> Vec<Regex> {
    words
        .iter()
        .filter_map(|word| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(word));
            match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(err) => {
                    // Escaped literals compile; this is unreachable in practice.
                    warn!(%word, %err, "skipping uncompilable blocked phrase");
                    None
                }
            }
        })
        .collect()
}

/// Recognized settings fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum SettingField {
    Auto,
    Sources,
    Sort,
    ItemsPerRun,
    Hashtag,
    Group,
    TitleOnly,
    BlockedWords,
    MinimumScore,
}

impl SettingField {
    pub(crate) fn from_camel(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(Self::Auto),
            "sources" => Some(Self::Sources),
            "sort" => Some(Self::Sort),
            "itemsPerRun" => Some(Self::ItemsPerRun),
            "hashtag" => Some(Self::Hashtag),
            "group" => Some(Self::Group),
            "titleOnly" => Some(Self::TitleOnly),
            "blockedWords" => Some(Self::BlockedWords),
            "minimumScore" => Some(Self::MinimumScore),
            _ => None,
        }
    }
}

/// Translate a hyphen-delimited raw key to its field name:
/// first segment as-is, later segments capitalized, concatenated.
/// `blocked-words` -> `blockedWords`.
pub(crate) fn raw_key_to_camel(raw_key: &str) -> String {
    let mut segments = raw_key.split('-');
    let mut out = segments.next().unwrap_or_default().to_string();
    for segment in segments {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

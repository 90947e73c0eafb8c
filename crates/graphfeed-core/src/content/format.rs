use crate::settings::Settings;
use crate::types::RankedItem;

pub const PREFIX_NOTE: &str = "NOTE";
pub const PREFIX_ERROR: &str = "ERROR";

/// Render one item into node text: title, optional body, attribution,
/// score, optional hashtag.
pub fn format_item(item: &RankedItem, settings: &Settings) -> String {
    let signature = format!("by {} on {}", item.author, item.source_ref);
    let mut out = if settings.title_only || item.body.is_empty() {
        format!("{}\n\n__- {}__", item.title, signature)
    } else {
        format!("{}\n\n__{}\n\n- {}__", item.title, item.body, signature)
    };
    out.push_str(&format!(" ({} points)", item.score));
    if let Some(tag) = &settings.hashtag {
        out.push(' ');
        out.push_str(tag);
    }
    out
}

/// Render a user-facing notice node, e.g. fetch failures or empty results.
pub fn format_notice(text: &str, prefix: &str, settings: &Settings) -> String {
    match &settings.hashtag {
        Some(tag) => format!("{prefix}: {text} {tag}"),
        None => format!("{prefix}: {text}"),
    }
}

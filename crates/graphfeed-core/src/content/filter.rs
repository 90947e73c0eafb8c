use crate::settings::Settings;
use crate::types::RankedItem;
use rand::seq::SliceRandom;
use tracing::debug;

/// Apply the configured filters: blocked phrases (matched against titles),
/// minimum score, then shuffle and cap at `items_per_run`.
pub fn filter_items(items: Vec<RankedItem>, settings: &Settings) -> Vec<RankedItem> {
    let before = items.len();
    let mut items: Vec<RankedItem> = items
        .into_iter()
        .filter(|item| {
            settings
                .blocked_matchers
                .iter()
                .all(|matcher| !matcher.is_match(&item.title))
        })
        .filter(|item| item.score >= settings.minimum_score)
        .collect();
    items.shuffle(&mut rand::thread_rng());
    items.truncate(settings.items_per_run as usize);
    debug!(before, after = items.len(), "filtered content items");
    items
}

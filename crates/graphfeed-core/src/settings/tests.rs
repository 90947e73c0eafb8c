use crate::host::{MemorySettings, SettingsBackend};
use crate::settings::store::DEBOUNCE_WINDOW;
use crate::settings::{SettingsEvent, SettingsStore, ALL_SETTING_KEYS, KEY_BLOCKED_WORDS};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

fn new_store() -> (
    SettingsStore,
    Arc<MemorySettings>,
    tokio::sync::mpsc::UnboundedReceiver<SettingsEvent>,
) {
    let backend = Arc::new(MemorySettings::new());
    let (store, rx) = SettingsStore::new(backend.clone());
    (store, backend, rx)
}

#[test]
fn unrecognized_and_malformed_keys_are_tolerated() {
    let (store, backend, _rx) = new_store();
    let outcome = store.reconcile_one("definitely-not-a-setting", Some(&json!("x")));
    assert!(!outcome.recognized);
    let outcome = store.reconcile_one("", Some(&json!("x")));
    assert!(!outcome.recognized);
    // No corrective writes for unknown keys.
    assert!(backend.writes().is_empty());
}

#[test]
fn every_published_raw_key_is_recognized() {
    let (store, _backend, _rx) = new_store();
    for key in ALL_SETTING_KEYS {
        assert!(store.reconcile_one(key, None).recognized, "unrecognized key {key}");
    }
    store.reconcile_one("items-per-run", Some(&json!("5")));
    assert_eq!(store.snapshot().items_per_run, 5);
}

#[test]
fn rejected_value_defaults_and_writes_back_exactly_once() {
    let (store, backend, _rx) = new_store();
    let outcome = store.reconcile_one("items-per-run", Some(&json!("-5")));
    assert!(outcome.recognized && outcome.used_default);
    assert_eq!(store.snapshot().items_per_run, 1);
    assert_eq!(backend.writes(), vec![("items-per-run".to_string(), json!(1))]);
}

#[test]
fn valid_value_assigns_without_write_back() {
    let (store, backend, _rx) = new_store();
    let outcome = store.reconcile_one("minimum-score", Some(&json!("250")));
    assert!(!outcome.used_default);
    assert_eq!(store.snapshot().minimum_score, 250);
    assert!(backend.writes().is_empty());
}

#[test]
fn hashtag_empty_means_none_and_is_not_a_failure() {
    let (store, backend, _rx) = new_store();
    let outcome = store.reconcile_one("hashtag", Some(&json!("##news")));
    assert!(!outcome.used_default);
    assert_eq!(store.snapshot().hashtag.as_deref(), Some("#news"));

    let outcome = store.reconcile_one("hashtag", Some(&json!("")));
    assert!(!outcome.used_default);
    assert_eq!(store.snapshot().hashtag, None);
    assert!(backend.writes().is_empty());
}

#[test]
fn blocked_matchers_track_blocked_words() {
    let (store, _backend, _rx) = new_store();
    store.reconcile_one(KEY_BLOCKED_WORDS, Some(&json!("foo, bar baz")));
    let settings = store.snapshot();
    assert_eq!(settings.blocked_words.len(), 2);
    assert_eq!(settings.blocked_matchers.len(), settings.blocked_words.len());
    assert!(settings.blocked_matchers[0].is_match("FOO fighters"));
    assert!(!settings.blocked_matchers[0].is_match("foofighters"));

    // Unrelated field updates leave the matchers untouched.
    let before: Vec<String> = store
        .snapshot()
        .blocked_matchers
        .iter()
        .map(|m| m.as_str().to_string())
        .collect();
    store.reconcile_one("minimum-score", Some(&json!(9)));
    let after: Vec<String> = store
        .snapshot()
        .blocked_matchers
        .iter()
        .map(|m| m.as_str().to_string())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn sources_change_emits_event() {
    let (store, _backend, mut rx) = new_store();
    store.reconcile_one("sources", Some(&json!("rust,programming")));
    assert_eq!(
        rx.try_recv().unwrap(),
        SettingsEvent::SourcesChanged(vec!["rust".to_string(), "programming".to_string()])
    );
}

#[test]
fn reconcile_all_is_deterministic_and_defaults_missing_keys() {
    let raw: BTreeMap<String, Value> = [
        ("sources".to_string(), json!("rust")),
        ("minimum-score".to_string(), json!("bad")),
        ("mystery-key".to_string(), json!("ignored")),
    ]
    .into();

    let (store_a, backend_a, mut rx_a) = new_store();
    store_a.reconcile_all(&raw);
    let (store_b, backend_b, _rx_b) = new_store();
    store_b.reconcile_all(&raw);

    let a = store_a.snapshot();
    let b = store_b.snapshot();
    assert_eq!(a.sources, vec!["rust"]);
    assert_eq!(a.sources, b.sources);
    assert_eq!(a.minimum_score, 0);
    assert_eq!(a.items_per_run, 1);
    assert_eq!(a.hashtag.as_deref(), Some("#graphfeed"));
    assert_eq!(backend_a.writes(), backend_b.writes());
    // Startup reconciliation withholds command-refresh notifications.
    assert!(rx_a.try_recv().is_err());
    // Recognized keys were all visited: every defaulted field wrote back.
    let writes = backend_a.writes();
    let written: Vec<&str> = writes.iter().map(|(k, _)| k.as_str()).collect();
    for key in ALL_SETTING_KEYS {
        if key == "sources" {
            assert!(!written.contains(&key));
        } else {
            assert!(written.contains(&key), "missing write-back for {key}");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn debounce_collapses_rapid_edits_to_the_last_value() {
    let (store, backend, _rx) = new_store();
    store.edit("items-per-run", json!("2"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    store.edit("items-per-run", json!("3"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    // Last edit is invalid, so exactly one corrective write proves exactly
    // one reconciliation ran, and with the final value.
    store.edit("items-per-run", json!("-1"));

    tokio::time::sleep(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;
    assert_eq!(store.snapshot().items_per_run, 1);
    assert_eq!(backend.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn debounced_edits_to_different_fields_are_independent() {
    let (store, _backend, _rx) = new_store();
    store.edit("items-per-run", json!("4"));
    store.edit("minimum-score", json!("10"));
    tokio::time::sleep(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;
    let settings = store.snapshot();
    assert_eq!(settings.items_per_run, 4);
    assert_eq!(settings.minimum_score, 10);
}

#[tokio::test(start_paused = true)]
async fn direct_reconcile_cancels_a_pending_debounce() {
    let (store, _backend, _rx) = new_store();
    store.edit("minimum-score", json!("99"));
    // A programmatic update for the same field lands first; the stale timer
    // must not overwrite it afterwards.
    store.reconcile_one("minimum-score", Some(&json!("5")));
    tokio::time::sleep(DEBOUNCE_WINDOW + Duration::from_millis(100)).await;
    assert_eq!(store.snapshot().minimum_score, 5);
}

/// Backend that mimics a host firing a change notification for every write,
/// including the store's own corrective ones.
#[derive(Default)]
struct EchoBackend {
    store: OnceLock<SettingsStore>,
    writes: Mutex<Vec<(String, Value)>>,
}

impl SettingsBackend for EchoBackend {
    fn get_all_raw(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    fn set_raw(&self, key: &str, value: Value) {
        self.writes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((key.to_string(), value.clone()));
        if let Some(store) = self.store.get() {
            // Echo an invalid value; without suppression this would schedule
            // another reconciliation and another corrective write.
            store.edit(key, json!("-1"));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn corrective_write_back_does_not_retrigger_reconciliation() {
    let backend = Arc::new(EchoBackend::default());
    let (store, _rx) = SettingsStore::new(backend.clone());
    backend.store.set(store.clone()).ok();

    store.reconcile_one("items-per-run", Some(&json!("nope")));
    tokio::time::sleep(DEBOUNCE_WINDOW * 3).await;

    let writes = backend.writes.lock().unwrap_or_else(|p| p.into_inner());
    assert_eq!(writes.len(), 1);
}

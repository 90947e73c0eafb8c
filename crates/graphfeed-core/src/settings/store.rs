use crate::settings::parse::{
    parse_bool, parse_hashtag, parse_non_negative, parse_sort, parse_string_list,
    render_hashtag, render_string_list,
};
use crate::settings::{
    blocked_matchers_for, default_sources, raw_key_to_camel, SettingField, Settings,
    ALL_SETTING_KEYS, DEFAULT_AUTO, DEFAULT_GROUP, DEFAULT_HASHTAG, DEFAULT_ITEMS_PER_RUN,
    DEFAULT_MINIMUM_SCORE, DEFAULT_SORT, DEFAULT_TITLE_ONLY,
};
use crate::host::SettingsBackend;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Debounce window for UI-originated edits.
pub(crate) const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Change notifications emitted by the store. Fire-and-forget: reconciliation
/// never blocks on a slow listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsEvent {
    /// The source list changed; per-source commands need re-registering.
    SourcesChanged(Vec<String>),
}

/// What a single reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Whether the raw key mapped to a known field. Unrecognized keys are
    /// tolerated no-ops.
    pub recognized: bool,
    /// Whether the raw value was rejected and the field default substituted
    /// (and written back to the raw store).
    pub used_default: bool,
}

impl ReconcileOutcome {
    const UNRECOGNIZED: Self = Self { recognized: false, used_default: false };
}

struct StoreInner {
    settings: Arc<RwLock<Settings>>,
    backend: Arc<dyn SettingsBackend>,
    /// Pending debounce timers, one per raw key.
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    /// Set while writing a self-corrected default back to the raw store, so
    /// the host's change notification for that synthetic write is ignored.
    suppress: AtomicBool,
    events: mpsc::UnboundedSender<SettingsEvent>,
}

/// Single source of truth for typed settings, reconciling them against the
/// host's raw persisted store and against live UI edits.
///
/// Cheap to clone; all clones share one [`Settings`] instance.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<StoreInner>,
}

impl SettingsStore {
    pub fn new(
        backend: Arc<dyn SettingsBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<SettingsEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let store = Self {
            inner: Arc::new(StoreInner {
                settings: Arc::new(RwLock::new(Settings::default())),
                backend,
                timers: Mutex::new(HashMap::new()),
                suppress: AtomicBool::new(false),
                events,
            }),
        };
        (store, rx)
    }

    /// Shared handle to the live settings.
    pub fn settings(&self) -> Arc<RwLock<Settings>> {
        self.inner.settings.clone()
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.inner
            .settings
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Reconcile every recognized key (absent ones fall to defaults), then
    /// the remaining raw entries in key order. Deterministic for a given map.
    /// Source-change notifications are withheld, matching the startup path
    /// where command installation happens afterwards anyway.
    pub fn reconcile_all(&self, raw: &BTreeMap<String, Value>) {
        for key in ALL_SETTING_KEYS {
            if !raw.contains_key(key) {
                self.reconcile_inner(key, None, true);
            }
        }
        for (key, value) in raw {
            self.reconcile_inner(key, Some(value), true);
        }
        debug!(settings = ?self.snapshot(), "reconciled all settings");
    }

    /// Reconcile one raw entry immediately. Never fails: invalid values are
    /// defaulted, unknown keys tolerated.
    pub fn reconcile_one(&self, raw_key: &str, raw_value: Option<&Value>) -> ReconcileOutcome {
        self.reconcile_inner(raw_key, raw_value, false)
    }

    /// Debounced UI-edit entry point: collapses rapid edits to the same key
    /// within [`DEBOUNCE_WINDOW`] into one reconciliation carrying the last
    /// observed value. Ignored while a self-corrected write-back is in flight.
    pub fn edit(&self, raw_key: &str, raw_value: Value) {
        if self.inner.suppress.load(Ordering::SeqCst) {
            trace!(raw_key, "suppressed synthetic settings notification");
            return;
        }
        let store = self.clone();
        let key = raw_key.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(DEBOUNCE_WINDOW).await;
            store.reconcile_one(&key, Some(&raw_value));
        });
        let mut timers = self.lock_timers();
        if let Some(stale) = timers.insert(raw_key.to_string(), handle) {
            stale.abort();
        }
    }

    fn reconcile_inner(
        &self,
        raw_key: &str,
        raw_value: Option<&Value>,
        withhold_source_event: bool,
    ) -> ReconcileOutcome {
        // Clear the field's pending timer up front so a stale debounce can't
        // fire after this update lands.
        if let Some(timer) = self.lock_timers().remove(raw_key) {
            timer.abort();
        }

        let camel = raw_key_to_camel(raw_key);
        let Some(field) = SettingField::from_camel(&camel) else {
            trace!(raw_key, %camel, "ignoring unrecognized setting key");
            return ReconcileOutcome::UNRECOGNIZED;
        };

        let (used_default, rendered_default, sources) =
            self.apply(field, raw_value);

        if let Some(sources) = sources {
            if withhold_source_event {
                trace!(raw_key, "source-change notification withheld");
            } else {
                // Fire-and-forget; command re-registration happens elsewhere.
                let _ = self.inner.events.send(SettingsEvent::SourcesChanged(sources));
            }
        }

        if used_default {
            warn!(raw_key, ?raw_value, "invalid setting value, restored default");
            // Synchronous write under the suppression flag: the host's change
            // notification for this synthetic write must be ignored, and no
            // suspension point may intervene before the flag clears.
            self.inner.suppress.store(true, Ordering::SeqCst);
            self.inner.backend.set_raw(raw_key, rendered_default);
            self.inner.suppress.store(false, Ordering::SeqCst);
        }

        ReconcileOutcome { recognized: true, used_default }
    }

    /// Parse and assign one field. Returns whether the default was used, the
    /// rendered value for a corrective write-back, and the new source list
    /// when the source field changed.
    fn apply(
        &self,
        field: SettingField,
        raw: Option<&Value>,
    ) -> (bool, Value, Option<Vec<String>>) {
        let mut settings = self
            .inner
            .settings
            .write()
            .unwrap_or_else(|p| p.into_inner());
        match field {
            SettingField::Auto => {
                let parsed = parse_bool(raw, DEFAULT_AUTO);
                settings.auto = parsed.value;
                (parsed.used_default, Value::Bool(parsed.value), None)
            }
            SettingField::Sources => {
                let parsed = parse_string_list(raw, &default_sources());
                settings.sources = parsed.value.clone();
                (
                    parsed.used_default,
                    render_string_list(&parsed.value),
                    Some(parsed.value),
                )
            }
            SettingField::Sort => {
                let parsed = parse_sort(raw, DEFAULT_SORT);
                settings.sort = parsed.value.clone();
                (parsed.used_default, Value::String(parsed.value), None)
            }
            SettingField::ItemsPerRun => {
                let parsed = parse_non_negative(raw, DEFAULT_ITEMS_PER_RUN);
                settings.items_per_run = parsed.value;
                (parsed.used_default, Value::from(parsed.value), None)
            }
            SettingField::Hashtag => {
                let parsed = parse_hashtag(raw, Some(DEFAULT_HASHTAG));
                settings.hashtag = parsed.value.clone();
                (parsed.used_default, render_hashtag(parsed.value.as_deref()), None)
            }
            SettingField::Group => {
                let parsed = parse_bool(raw, DEFAULT_GROUP);
                settings.group = parsed.value;
                (parsed.used_default, Value::Bool(parsed.value), None)
            }
            SettingField::TitleOnly => {
                let parsed = parse_bool(raw, DEFAULT_TITLE_ONLY);
                settings.title_only = parsed.value;
                (parsed.used_default, Value::Bool(parsed.value), None)
            }
            SettingField::BlockedWords => {
                let parsed = parse_string_list(raw, &[]);
                settings.blocked_words = parsed.value.clone();
                settings.blocked_matchers = blocked_matchers_for(&settings.blocked_words);
                (parsed.used_default, render_string_list(&parsed.value), None)
            }
            SettingField::MinimumScore => {
                let parsed = parse_non_negative(raw, DEFAULT_MINIMUM_SCORE);
                settings.minimum_score = parsed.value;
                (parsed.used_default, Value::from(parsed.value), None)
            }
        }
    }

    fn lock_timers(&self) -> std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.inner.timers.lock().unwrap_or_else(|p| p.into_inner())
    }
}

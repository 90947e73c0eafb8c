use graphfeed_core::SettingsBackend;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// File-backed raw settings store: one flat JSON object of raw key/values.
/// A missing file reads as empty; corrective write-backs rewrite the file.
pub struct JsonFileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileSettings {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, values: Mutex::new(values) })
    }

    fn persist(&self, values: &BTreeMap<String, Value>) {
        let rendered = match serde_json::to_string_pretty(values) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(%err, "could not serialize settings");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, rendered) {
            warn!(path = %self.path.display(), %err, "could not persist settings");
        }
    }
}

impl SettingsBackend for JsonFileSettings {
    fn get_all_raw(&self) -> BTreeMap<String, Value> {
        self.values.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn set_raw(&self, key: &str, value: Value) {
        let mut values = self.values.lock().unwrap_or_else(|p| p.into_inner());
        values.insert(key.to_string(), value);
        self.persist(&values);
    }
}

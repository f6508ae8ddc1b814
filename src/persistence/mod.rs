use crate::metrics::{self, PersistedMetricRow, ScoringWeightConfig};
use serde_json::Error as SerdeJsonError;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Mutex;

pub const DETECTION_METHOD_KEY: &str = "speech_rate_detection_method";
pub const CONFIG_SNAPSHOT_KEY: &str = "scoring_config_snapshot";

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    Csv(csv::Error),
    InvalidData(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            PersistenceError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Primary store for per-metric rows.
pub trait MetricStore {
    fn load_metric_rows(&self) -> PersistenceResult<Vec<PersistedMetricRow>>;
    fn save_metric_rows(&self, rows: &[PersistedMetricRow]) -> PersistenceResult<()>;
}

/// Key-value store kept beside the primary rows.
pub trait SideChannelStore {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PersistenceResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryMetricStore {
    rows: Mutex<Vec<PersistedMetricRow>>,
}

impl MemoryMetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<PersistedMetricRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }
}

impl MetricStore for MemoryMetricStore {
    fn load_metric_rows(&self) -> PersistenceResult<Vec<PersistedMetricRow>> {
        Ok(self.rows.lock().expect("metric rows mutex poisoned").clone())
    }

    fn save_metric_rows(&self, rows: &[PersistedMetricRow]) -> PersistenceResult<()> {
        let now = chrono::Utc::now();
        let mut guard = self.rows.lock().expect("metric rows mutex poisoned");
        for row in rows {
            let mut row = row.clone();
            row.updated_at = Some(now);
            match guard.iter_mut().find(|r| r.metric_name == row.metric_name) {
                Some(existing) => *existing = row,
                None => guard.push(row),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySideChannel {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySideChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SideChannelStore for MemorySideChannel {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        let values = self.values.lock().expect("side channel mutex poisoned");
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let mut values = self.values.lock().expect("side channel mutex poisoned");
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Fetch rows and the detection method, then resolve them into a full config.
pub fn load_scoring_config(
    store: &dyn MetricStore,
    side_channel: &dyn SideChannelStore,
) -> PersistenceResult<ScoringWeightConfig> {
    let rows = store.load_metric_rows()?;
    let method = side_channel.get(DETECTION_METHOD_KEY)?;
    Ok(metrics::load_config(&rows, method.as_deref()))
}

/// Write a config back: rows to the primary store, the detection method and a
/// JSON snapshot of the whole config to the side channel.
pub fn save_scoring_config(
    store: &dyn MetricStore,
    side_channel: &dyn SideChannelStore,
    config: &ScoringWeightConfig,
) -> PersistenceResult<()> {
    let rows = metrics::to_persisted_rows(config);
    store.save_metric_rows(&rows)?;
    if let Some(method) = config.detection_method() {
        side_channel.set(DETECTION_METHOD_KEY, method.as_str())?;
    }
    let snapshot = serde_json::to_string(config)?;
    side_channel.set(CONFIG_SNAPSHOT_KEY, &snapshot)?;

    let distribution = config.weight_distribution();
    tracing::info!(
        rows = rows.len(),
        total_weight = distribution.total,
        balanced = distribution.balanced,
        "saved scoring config"
    );
    Ok(())
}

/// Last snapshot written by [`save_scoring_config`], if any. Not authoritative.
pub fn load_cached_config(
    side_channel: &dyn SideChannelStore,
) -> PersistenceResult<Option<ScoringWeightConfig>> {
    match side_channel.get(CONFIG_SNAPSHOT_KEY)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    JsonFileSideChannel, load_metric_rows_from_csv, save_deadlines_to_csv,
    save_deadlines_to_json, save_metric_rows_to_csv,
};

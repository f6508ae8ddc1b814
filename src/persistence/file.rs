use super::{PersistenceError, PersistenceResult, SideChannelStore};
use crate::metrics::PersistedMetricRow;
use crate::schedule::Deadline;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Side channel backed by a single JSON object on disk.
///
/// The file is read on every `get` and rewritten on every `set`, so several
/// handles on one path see each other's writes (last write wins).
pub struct JsonFileSideChannel {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSideChannel {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> PersistenceResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let file = File::open(&self.path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

impl SideChannelStore for JsonFileSideChannel {
    fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let _guard = self.write_lock.lock().expect("side channel mutex poisoned");
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &values)?;
        Ok(())
    }
}

#[derive(Default, Serialize, Deserialize)]
struct MetricCsvRecord {
    metric_name: String,
    weight: f64,
    min_value: String,
    max_value: String,
    #[serde(default)]
    updated_at: String,
}

impl From<&PersistedMetricRow> for MetricCsvRecord {
    fn from(row: &PersistedMetricRow) -> Self {
        Self {
            metric_name: row.metric_name.clone(),
            weight: row.weight,
            min_value: format_option_f64(row.min_value),
            max_value: format_option_f64(row.max_value),
            updated_at: row
                .updated_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

impl MetricCsvRecord {
    fn into_row(self) -> PersistenceResult<PersistedMetricRow> {
        if self.metric_name.trim().is_empty() {
            return Err(PersistenceError::InvalidData(
                "metric row requires a metric_name".into(),
            ));
        }
        Ok(PersistedMetricRow {
            metric_name: self.metric_name.trim().to_string(),
            weight: self.weight,
            min_value: parse_f64(&self.min_value)?,
            max_value: parse_f64(&self.max_value)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn save_metric_rows_to_csv<P: AsRef<Path>>(
    rows: &[PersistedMetricRow],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer.serialize(MetricCsvRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_metric_rows_from_csv<P: AsRef<Path>>(
    path: P,
) -> PersistenceResult<Vec<PersistedMetricRow>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for record in reader.deserialize::<MetricCsvRecord>() {
        rows.push(record?.into_row()?);
    }
    Ok(rows)
}

pub fn save_deadlines_to_json<P: AsRef<Path>>(
    deadlines: &[Deadline],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, deadlines)?;
    Ok(())
}

#[derive(Serialize)]
struct DeadlineCsvRecord<'a> {
    lesson_id: &'a str,
    lesson_name: &'a str,
    order_index: i64,
    due_date: String,
    status: String,
    is_past: bool,
    is_due_today: bool,
    days_remaining: i64,
}

pub fn save_deadlines_to_csv<P: AsRef<Path>>(
    deadlines: &[Deadline],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for deadline in deadlines {
        writer.serialize(DeadlineCsvRecord {
            lesson_id: &deadline.lesson_id,
            lesson_name: &deadline.lesson_name,
            order_index: deadline.order_index,
            due_date: deadline.due_date.format("%Y-%m-%d").to_string(),
            status: deadline.status().to_string(),
            is_past: deadline.is_past,
            is_due_today: deadline.is_due_today,
            days_remaining: deadline.days_remaining,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn format_option_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_f64(input: &str) -> PersistenceResult<Option<f64>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid float '{input}': {e}")))
}

fn parse_timestamp(input: &str) -> PersistenceResult<Option<DateTime<Utc>>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(input.trim())
        .map(|ts| Some(ts.with_timezone(&Utc)))
        .map_err(|e| PersistenceError::InvalidData(format!("invalid timestamp '{input}': {e}")))
}

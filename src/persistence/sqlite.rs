use super::{MetricStore, PersistenceError, PersistenceResult};
use crate::metrics::PersistedMetricRow;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::sync::Mutex;

pub struct SqliteMetricStore {
    connection: Mutex<Connection>,
}

impl SqliteMetricStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS metric_settings (
                metric_name TEXT PRIMARY KEY,
                weight REAL NOT NULL,
                min_value REAL,
                max_value REAL,
                updated_at TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> PersistenceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| PersistenceError::InvalidData(format!("invalid updated_at '{raw}': {e}")))
}

impl MetricStore for SqliteMetricStore {
    fn load_metric_rows(&self) -> PersistenceResult<Vec<PersistedMetricRow>> {
        let conn = self.connection.lock().expect("sqlite mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT metric_name, weight, min_value, max_value, updated_at
             FROM metric_settings ORDER BY metric_name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (metric_name, weight, min_value, max_value, updated_at) = row?;
            result.push(PersistedMetricRow {
                metric_name,
                weight,
                min_value,
                max_value,
                updated_at: Some(parse_timestamp(&updated_at)?),
            });
        }
        Ok(result)
    }

    fn save_metric_rows(&self, rows: &[PersistedMetricRow]) -> PersistenceResult<()> {
        let mut conn = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO metric_settings (metric_name, weight, min_value, max_value, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(metric_name) DO UPDATE SET
                    weight = excluded.weight,
                    min_value = excluded.min_value,
                    max_value = excluded.max_value,
                    updated_at = excluded.updated_at",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.metric_name,
                    row.weight,
                    row.min_value,
                    row.max_value,
                    now
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(rows = rows.len(), "upserted metric rows");
        Ok(())
    }
}

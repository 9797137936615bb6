//! [`SqliteStore`], the SQLite implementation of [`SampleStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::types::Value;
use skyreplay_core::{
  filter::SampleFilter,
  sample::{Batch, ControllerSample, PilotSample},
  store::{Column, NewProtectedRange, ProtectedRange, SampleStore, ValueCount},
};

use crate::{
  Result,
  encode::{
    CONTROLLER_COLUMNS, PILOT_COLUMNS, RawProtectedRange, controller_from_row, encode_dt,
    pilot_from_row,
  },
  query::{IN_CHUNK, filter_clause, placeholders},
  schema::SCHEMA,
};

const INSERT_PILOT: &str = "INSERT INTO pilots (
    timestamp, callsign, subject_id, latitude, longitude,
    altitude, groundspeed, heading, airspace, departure, destination
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const INSERT_CONTROLLER: &str = "INSERT INTO controllers (
    timestamp, callsign, subject_id, frequency, facility, latitude, longitude
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// Rows with a timestamp older than the cutoff and outside every protected
/// range. `{table}` is substituted with a fixed table name.
const PRUNE_TEMPLATE: &str = "DELETE FROM {table}
   WHERE timestamp < ?1
     AND NOT EXISTS (
       SELECT 1 FROM protected_ranges r
        WHERE {table}.timestamp BETWEEN r.start_ts AND r.end_ts
     )";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A sample store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of pilot rows stored under `timestamp`.
  pub async fn count_pilots_at(&self, timestamp: i64) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM pilots WHERE timestamp = ?1",
          rusqlite::params![timestamp],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(n as usize)
  }

  /// Run a pilot `SELECT` with the filter appended to `where_clause`.
  async fn select_pilots(
    &self,
    where_clause: String,
    mut params: Vec<Value>,
    filter: &SampleFilter,
  ) -> Result<Vec<PilotSample>> {
    let filter_sql = filter_clause(filter, &mut params);
    let sql = format!(
      "SELECT {PILOT_COLUMNS} FROM pilots
        WHERE {where_clause}{filter_sql}
        ORDER BY timestamp, row_id"
    );

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), pilot_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn select_controllers(
    &self,
    where_clause: String,
    params: Vec<Value>,
  ) -> Result<Vec<ControllerSample>> {
    let sql = format!(
      "SELECT {CONTROLLER_COLUMNS} FROM controllers
        WHERE {where_clause}
        ORDER BY timestamp, row_id"
    );

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), controller_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

/// Sorted, deduplicated copy of `timestamps`, split into `IN`-sized chunks.
fn timestamp_chunks(timestamps: &[i64]) -> Vec<Vec<i64>> {
  let mut sorted = timestamps.to_vec();
  sorted.sort_unstable();
  sorted.dedup();
  sorted.chunks(IN_CHUNK).map(<[i64]>::to_vec).collect()
}

fn in_clause(chunk: &[i64]) -> (String, Vec<Value>) {
  (
    format!("timestamp IN ({})", placeholders(chunk.len())),
    chunk.iter().copied().map(Value::Integer).collect(),
  )
}

// ─── SampleStore impl ────────────────────────────────────────────────────────

impl SampleStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert_batch(&self, batch: Batch) -> Result<usize> {
    let Batch { timestamp, pilots, controllers } = batch;

    let written = self
      .conn
      .call(move |conn| {
        // Dropping the transaction without committing rolls back, so an error
        // on any row leaves no part of the batch behind.
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(INSERT_PILOT)?;
          for p in &pilots {
            stmt.execute(rusqlite::params![
              timestamp,
              p.callsign,
              p.subject_id,
              p.latitude,
              p.longitude,
              p.altitude,
              p.groundspeed,
              p.heading,
              p.airspace,
              p.departure,
              p.destination,
            ])?;
          }

          let mut stmt = tx.prepare_cached(INSERT_CONTROLLER)?;
          for c in &controllers {
            stmt.execute(rusqlite::params![
              timestamp,
              c.callsign,
              c.subject_id,
              c.frequency,
              c.facility,
              c.latitude,
              c.longitude,
            ])?;
          }
        }
        tx.commit()?;
        Ok(pilots.len() + controllers.len())
      })
      .await?;

    tracing::debug!(timestamp, written, "inserted batch");
    Ok(written)
  }

  async fn prune(&self, cutoff: i64) -> Result<usize> {
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for table in ["pilots", "controllers"] {
          let sql = PRUNE_TEMPLATE.replace("{table}", table);
          deleted += tx.execute(&sql, rusqlite::params![cutoff])?;
        }
        tx.commit()?;
        Ok(deleted)
      })
      .await?;

    tracing::info!(cutoff, deleted, "pruned samples");
    Ok(deleted)
  }

  // ── Pilot reads ───────────────────────────────────────────────────────────

  async fn query_range(
    &self,
    since: i64,
    until: i64,
    filter: &SampleFilter,
  ) -> Result<Vec<PilotSample>> {
    self
      .select_pilots(
        "timestamp BETWEEN ? AND ?".to_owned(),
        vec![Value::Integer(since), Value::Integer(until)],
        filter,
      )
      .await
  }

  async fn query_timestamps(
    &self,
    timestamps: &[i64],
    filter: &SampleFilter,
  ) -> Result<Vec<PilotSample>> {
    let mut out = Vec::new();
    // Chunks are ascending and disjoint, so concatenation stays ordered.
    for chunk in timestamp_chunks(timestamps) {
      let (clause, params) = in_clause(&chunk);
      out.extend(self.select_pilots(clause, params, filter).await?);
    }
    Ok(out)
  }

  async fn distinct_timestamps(&self, since: i64, until: i64) -> Result<Vec<i64>> {
    let timestamps = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT timestamp FROM pilots      WHERE timestamp BETWEEN ?1 AND ?2
           UNION
           SELECT timestamp FROM controllers WHERE timestamp BETWEEN ?1 AND ?2
           ORDER BY 1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![since, until], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(timestamps)
  }

  async fn aggregate_distinct(
    &self,
    column: Column,
    since: i64,
    until: i64,
    filter: &SampleFilter,
  ) -> Result<Vec<ValueCount>> {
    let col = column.as_str();
    let mut params = vec![Value::Integer(since), Value::Integer(until)];
    let filter_sql = filter_clause(filter, &mut params);
    let sql = format!(
      "SELECT {col}, COUNT(*) AS n FROM pilots
        WHERE timestamp BETWEEN ? AND ?
          AND {col} IS NOT NULL{filter_sql}
        GROUP BY {col}
        ORDER BY n DESC, {col} ASC"
    );

    let counts = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |r| {
            Ok(ValueCount { value: r.get(0)?, count: r.get::<_, i64>(1)? as u64 })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(counts)
  }

  // ── Controller reads ──────────────────────────────────────────────────────

  async fn controllers_range(&self, since: i64, until: i64) -> Result<Vec<ControllerSample>> {
    self
      .select_controllers(
        "timestamp BETWEEN ? AND ?".to_owned(),
        vec![Value::Integer(since), Value::Integer(until)],
      )
      .await
  }

  async fn controllers_at_timestamps(&self, timestamps: &[i64]) -> Result<Vec<ControllerSample>> {
    let mut out = Vec::new();
    for chunk in timestamp_chunks(timestamps) {
      let (clause, params) = in_clause(&chunk);
      out.extend(self.select_controllers(clause, params).await?);
    }
    Ok(out)
  }

  // ── Protected ranges ──────────────────────────────────────────────────────

  async fn add_protected_range(&self, range: NewProtectedRange) -> Result<ProtectedRange> {
    range.validate()?;

    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let NewProtectedRange { start, end, label } = range;
    let label_param = label.clone();

    let range_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO protected_ranges (start_ts, end_ts, label, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![start, end, label_param, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::info!(range_id, start, end, "added protected range");
    Ok(ProtectedRange { range_id, start, end, label, created_at })
  }

  async fn protected_ranges(&self) -> Result<Vec<ProtectedRange>> {
    let raws: Vec<RawProtectedRange> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT range_id, start_ts, end_ts, label, created_at
             FROM protected_ranges
            ORDER BY start_ts, range_id",
        )?;
        let rows = stmt
          .query_map([], RawProtectedRange::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProtectedRange::into_range).collect()
  }
}

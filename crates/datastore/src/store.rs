//! Store Contract
//!
//! One read/write contract with two implementations: the live InfluxDB
//! store and the deterministic fixture store. Callers hold a
//! `Box<dyn TimeSeriesStore>` and stay agnostic to which is wired in.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::table::{DataTable, Value, TIME_COLUMN};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Outcome of a read call.
///
/// The three-way split is the central contract of the read path: callers
/// must be able to tell "store unreachable" from "store reachable, nothing
/// recorded yet" from "store reachable with data". It is always returned by
/// value; no variant is ever conveyed by panicking or by `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// Query succeeded and matched at least one row
    Found(DataTable),
    /// Query succeeded but matched zero rows
    Empty,
    /// No successful query completed (transport failure or not connected)
    Unavailable,
}

impl ReadOutcome {
    /// The table, when data was found
    pub fn table(&self) -> Option<&DataTable> {
        match self {
            ReadOutcome::Found(table) => Some(table),
            _ => None,
        }
    }
}

/// Read/write contract against the time-series store.
///
/// Methods take `&mut self`: one instance owns one connection handle and is
/// not safe for concurrent callers; serialize access externally or hold one
/// instance per worker. `Err` from a read is reserved for caller contract
/// violations caught before any network traffic; transport failures are
/// reported as `Ok(ReadOutcome::Unavailable)`.
#[async_trait]
pub trait TimeSeriesStore: Send {
    /// Establish (or replace) the connection to the store.
    ///
    /// Any existing handle is dropped first. On failure the call pauses for
    /// the configured reconnect interval before returning; it does not
    /// retry by itself.
    async fn connect(&mut self) -> Result<(), StoreError>;

    /// Read recent throughput samples for one cell, newest first
    async fn read_cell(&mut self, cell_id: &str, limit: usize)
        -> Result<ReadOutcome, StoreError>;

    /// Read the latest report for one UE
    async fn read_ue(&mut self, ue_id: &str) -> Result<ReadOutcome, StoreError>;

    /// Submit one prediction record to the given bucket.
    ///
    /// The record must be a non-empty table carrying the cell-id tag column,
    /// both throughput columns and a `_time` column; anything else is
    /// rejected before any network call. A transport failure is logged and
    /// the point is dropped — no retry, no queue.
    async fn write_prediction(&mut self, record: &DataTable, bucket: &str)
        -> Result<(), StoreError>;

    /// Distinct cell identifiers currently present in the cell measurement
    async fn cell_ids(&mut self) -> Result<Vec<String>, StoreError>;
}

/// Values extracted from a single-row prediction record.
///
/// Extraction doubles as the record validation both implementations run
/// before touching the network (or, for the fixture store, before
/// discarding the write): the record must be non-empty and carry the
/// cell-id tag column, both throughput columns and a `_time` column.
pub(crate) struct PredictionParts {
    pub(crate) cell: String,
    pub(crate) uplink: String,
    pub(crate) downlink: String,
    pub(crate) timestamp: DateTime<Utc>,
}

impl PredictionParts {
    pub(crate) fn from_record(
        record: &DataTable,
        config: &StoreConfig,
    ) -> Result<Self, StoreError> {
        if record.is_empty() {
            return Err(StoreError::InvalidRecord("record has no rows".to_string()));
        }
        let cell = required_cell(record, &config.cell_id_tag)?;
        let uplink = required_cell(record, &config.uplink_field)?;
        let downlink = required_cell(record, &config.downlink_field)?;
        let timestamp = record
            .get(0, TIME_COLUMN)
            .ok_or_else(|| StoreError::InvalidRecord(format!("missing column {}", TIME_COLUMN)))?
            .as_time()
            .ok_or_else(|| {
                StoreError::InvalidRecord(format!("{} column is not a timestamp", TIME_COLUMN))
            })?;
        Ok(Self {
            cell,
            uplink,
            downlink,
            timestamp,
        })
    }
}

fn required_cell(record: &DataTable, column: &str) -> Result<String, StoreError> {
    record
        .get(0, column)
        .map(Value::to_string)
        .ok_or_else(|| StoreError::InvalidRecord(format!("missing column {}", column)))
}

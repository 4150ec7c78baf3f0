//! Fixture Store
//!
//! Deterministic substitute for the live store: canned UE and cell tables,
//! no network. Lets the rest of the pipeline run without an InfluxDB
//! deployment while honouring the exact same contract.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::flux::UE_LIMIT;
use crate::store::{PredictionParts, ReadOutcome, TimeSeriesStore};
use crate::table::{DataTable, Value, TIME_COLUMN};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::path::Path;
use tracing::{debug, info};

/// Offline implementation of [`TimeSeriesStore`] backed by fixture tables.
///
/// Reads ignore the identifier and return up to `limit` fixture rows;
/// writes are validated like the live store's, then discarded.
pub struct FixtureStore {
    config: StoreConfig,
    ue_fixture: DataTable,
    cell_fixture: DataTable,
}

impl FixtureStore {
    pub fn new(config: StoreConfig) -> Self {
        let ue_fixture = built_in_ue_fixture();
        let cell_fixture = built_in_cell_fixture(&config);
        Self {
            config,
            ue_fixture,
            cell_fixture,
        }
    }

    /// Replace the built-in cell fixture with rows loaded from a CSV file
    pub fn load_cells(&mut self, path: &Path) -> Result<(), StoreError> {
        let body = std::fs::read_to_string(path)
            .map_err(|err| StoreError::Fixture(format!("{}: {}", path.display(), err)))?;
        let table = DataTable::from_annotated_csv(&body);
        if table.columns().is_empty() {
            return Err(StoreError::Fixture(format!(
                "{}: no header row",
                path.display()
            )));
        }
        info!(path = %path.display(), rows = table.len(), "loaded cell fixture");
        self.cell_fixture = table;
        Ok(())
    }
}

/// One canned UE report, mirroring the shape of a live UE read
fn built_in_ue_fixture() -> DataTable {
    let mut table = DataTable::new(
        [
            "du-id",
            "RF.serving.Id",
            "prb_usage",
            "rsrp",
            "rsrq",
            "rssinr",
            "throughput",
            "targetTput",
            "ue-id",
            "x",
            "y",
            TIME_COLUMN,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    );
    table.push_row(vec![
        Value::Float(1002.0),
        Value::Str("c2/B13".to_string()),
        Value::Float(8.0),
        Value::Float(69.0),
        Value::Float(65.0),
        Value::Float(113.0),
        Value::Float(0.1),
        Value::Float(0.1),
        Value::Str("Car-1".to_string()),
        Value::Float(-882.0),
        Value::Float(-959.0),
        Value::Time(Utc.with_ymd_and_hms(2021, 5, 12, 7, 43, 51).unwrap()),
    ]);
    table
}

/// Canned pivoted cell reads, column names taken from the configured
/// tag/field names so the shape matches a live cell read
fn built_in_cell_fixture(config: &StoreConfig) -> DataTable {
    let mut table = DataTable::new(vec![
        TIME_COLUMN.to_string(),
        config.cell_id_tag.clone(),
        config.uplink_field.clone(),
        config.downlink_field.clone(),
    ]);
    let samples = [
        ("c1/B2", 10.2, 35.9),
        ("c1/B2", 9.8, 34.1),
        ("c2/B7", 4.4, 18.6),
        ("c2/B7", 4.9, 17.3),
        ("c2/B13", 6.1, 22.0),
        ("c3/B13", 2.3, 11.7),
    ];
    for (i, (cell, uplink, downlink)) in samples.iter().enumerate() {
        table.push_row(vec![
            Value::Time(
                Utc.with_ymd_and_hms(2021, 5, 12, 7, 43, 51).unwrap()
                    - chrono::Duration::seconds(10 * i as i64),
            ),
            Value::Str(cell.to_string()),
            Value::Float(*uplink),
            Value::Float(*downlink),
        ]);
    }
    table
}

#[async_trait]
impl TimeSeriesStore for FixtureStore {
    async fn connect(&mut self) -> Result<(), StoreError> {
        info!("fixture store connected (no-op)");
        Ok(())
    }

    async fn read_cell(
        &mut self,
        _cell_id: &str,
        limit: usize,
    ) -> Result<ReadOutcome, StoreError> {
        if limit == 0 {
            return Err(StoreError::InvalidRequest("limit must be positive"));
        }
        let head = self.cell_fixture.head(limit);
        if head.is_empty() {
            Ok(ReadOutcome::Empty)
        } else {
            Ok(ReadOutcome::Found(head))
        }
    }

    async fn read_ue(&mut self, _ue_id: &str) -> Result<ReadOutcome, StoreError> {
        let head = self.ue_fixture.head(UE_LIMIT);
        if head.is_empty() {
            Ok(ReadOutcome::Empty)
        } else {
            Ok(ReadOutcome::Found(head))
        }
    }

    async fn write_prediction(
        &mut self,
        record: &DataTable,
        bucket: &str,
    ) -> Result<(), StoreError> {
        // Same record contract as the live store; valid points are discarded
        PredictionParts::from_record(record, &self.config)?;
        debug!(bucket, rows = record.len(), "discarding prediction write");
        Ok(())
    }

    async fn cell_ids(&mut self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for row in 0..self.cell_fixture.len() {
            if let Some(value) = self.cell_fixture.get(row, &self.config.cell_id_tag) {
                let id = value.to_string();
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

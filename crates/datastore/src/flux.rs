//! Flux Query Construction
//!
//! Renders the two read shapes the layer supports. Pure string templating;
//! no validation beyond what the caller already guaranteed (a malformed
//! identifier simply matches zero rows).

use crate::config::StoreConfig;

/// Lookback window for per-cell reads
pub const CELL_LOOKBACK: &str = "-2h";

/// Lookback window for per-UE reads. Shorter than the cell window: a UE
/// report older than this is no longer useful for prediction.
pub const UE_LOOKBACK: &str = "-1h";

/// Per-UE reads always fetch the latest report only
pub const UE_LIMIT: usize = 1;

/// Builds Flux query text from the configured measurement/tag/field names
pub struct QueryBuilder<'a> {
    config: &'a StoreConfig,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(config: &'a StoreConfig) -> Self {
        Self { config }
    }

    /// Query for the most recent throughput samples of one cell.
    ///
    /// Selects only the two throughput fields, collapses series, sorts by
    /// time descending, caps at `2 * limit` rows (uplink and downlink arrive
    /// as separate long-format rows) and pivots fields into columns keyed by
    /// timestamp.
    pub fn cell_query(&self, cell_id: &str, limit: usize) -> String {
        let c = self.config;
        format!(
            "from(bucket:\"{bucket}\") |> range(start: {lookback}) \
             |> filter(fn: (r) => r._measurement == \"{meas}\" and \
             r[\"{tag}\"] == \"{id}\" and \
             (r._field == \"{ul}\" or r._field == \"{dl}\")) \
             |> group() \
             |> sort(columns: [\"_time\"], desc: true) \
             |> limit(n: {n}) \
             |> pivot(rowKey: [\"_time\"], columnKey: [\"_field\"], valueColumn: \"_value\")",
            bucket = c.bucket,
            lookback = CELL_LOOKBACK,
            meas = c.cell_measurement,
            tag = c.cell_id_tag,
            id = cell_id,
            ul = c.uplink_field,
            dl = c.downlink_field,
            n = limit.saturating_mul(2),
        )
    }

    /// Query for the latest report of one UE
    pub fn ue_query(&self, ue_id: &str) -> String {
        let c = self.config;
        format!(
            "from(bucket:\"{bucket}\") |> range(start: {lookback}) \
             |> filter(fn: (r) => r._measurement == \"{meas}\" and \
             r[\"{tag}\"] == \"{id}\") \
             |> group() \
             |> sort(columns: [\"_time\"], desc: true) \
             |> limit(n: {n})",
            bucket = c.bucket,
            lookback = UE_LOOKBACK,
            meas = c.ue_measurement,
            tag = c.ue_id_tag,
            id = ue_id,
            n = UE_LIMIT,
        )
    }

    /// Query for the distinct cell identifiers seen in the cell measurement
    pub fn cell_ids_query(&self) -> String {
        let c = self.config;
        format!(
            "from(bucket:\"{bucket}\") |> range(start: {lookback}) \
             |> filter(fn: (r) => r._measurement == \"{meas}\") \
             |> group() \
             |> distinct(column: \"{tag}\")",
            bucket = c.bucket,
            lookback = CELL_LOOKBACK,
            meas = c.cell_measurement,
            tag = c.cell_id_tag,
        )
    }
}

//! Resolved Store Configuration
//!
//! The settings object handed to the layer at construction. Loading it from
//! disk or environment belongs to the host application; the layer never
//! re-reads configuration after construction.

use serde::Deserialize;

/// Default pause after a failed connect attempt, in seconds. A coarse
/// rate-limit on reconnection storms, not a retry loop.
pub const DEFAULT_RECONNECT_PAUSE_SECS: u64 = 120;

/// Resolved configuration for the time-series store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// InfluxDB base URL
    pub url: String,
    /// API token
    pub token: String,
    /// Basic-auth username (kept for deployments without token auth)
    pub username: String,
    /// Basic-auth password
    pub password: String,
    /// Organization scoping queries and writes
    pub org: String,
    /// Bucket holding the measurement data
    pub bucket: String,
    /// Verify TLS certificates when connecting
    pub verify_tls: bool,
    /// Measurement holding per-cell reports
    pub cell_measurement: String,
    /// Measurement holding per-UE reports
    pub ue_measurement: String,
    /// Tag identifying a cell within the cell measurement
    pub cell_id_tag: String,
    /// Tag identifying a UE within the UE measurement
    pub ue_id_tag: String,
    /// Field carrying uplink throughput
    pub uplink_field: String,
    /// Field carrying downlink throughput
    pub downlink_field: String,
    /// Pause after a failed connect, in seconds
    pub reconnect_pause_secs: u64,
    /// Use the fixture store instead of a live connection
    pub offline: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://r4-influxdb-influxdb2.ricplt".to_string(),
            token: String::new(),
            username: "admin".to_string(),
            password: String::new(),
            org: "ricplt".to_string(),
            bucket: "kpimon".to_string(),
            verify_tls: false,
            cell_measurement: "CellReports".to_string(),
            ue_measurement: "UEReports".to_string(),
            cell_id_tag: "Viavi_GnbDuId".to_string(),
            ue_id_tag: "ue-id".to_string(),
            uplink_field: "DRB_UEThpUl".to_string(),
            downlink_field: "DRB_UEThpDl".to_string(),
            reconnect_pause_secs: DEFAULT_RECONNECT_PAUSE_SECS,
            offline: false,
        }
    }
}

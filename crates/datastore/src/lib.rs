//! Data-Access Layer for RAN Throughput Prediction
//!
//! Reads recent per-cell and per-UE measurement series from an InfluxDB v2
//! deployment and writes back per-device throughput predictions.
//!
//! This crate provides:
//! - Connection lifecycle with a coarse reconnect rate-limit
//! - Flux query construction for the two supported read shapes
//! - Tri-state read outcomes (`Found` / `Empty` / `Unavailable`)
//! - A fire-and-forget prediction write path
//! - A deterministic fixture store for offline runs

mod config;
mod error;
mod fixture;
mod flux;
mod influx;
mod line;
mod store;
mod table;

pub use config::{StoreConfig, DEFAULT_RECONNECT_PAUSE_SECS};
pub use error::StoreError;
pub use fixture::FixtureStore;
pub use influx::{InfluxStore, PREDICTION_MEASUREMENT};
pub use store::{ReadOutcome, TimeSeriesStore};
pub use table::{DataTable, Value, TIME_COLUMN};

/// Build the store selected by configuration: the fixture store when
/// `offline` is set, the live InfluxDB store otherwise.
pub fn build_store(config: StoreConfig) -> Box<dyn TimeSeriesStore> {
    if config.offline {
        Box::new(FixtureStore::new(config))
    } else {
        Box::new(InfluxStore::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_flag_selects_fixture_store() {
        let config = StoreConfig {
            offline: true,
            ..StoreConfig::default()
        };
        let mut store = build_store(config);
        store.connect().await.unwrap();
        let outcome = store.read_ue("Car-1").await.unwrap();
        assert!(matches!(outcome, ReadOutcome::Found(_)));
    }

    #[tokio::test]
    async fn test_live_store_starts_unconnected() {
        let mut store = build_store(StoreConfig::default());
        let outcome = store.read_ue("Car-1").await.unwrap();
        assert_eq!(outcome, ReadOutcome::Unavailable);
    }
}

//! Live InfluxDB Store
//!
//! Owns the single connection handle, executes the two read shapes and
//! submits prediction points over the InfluxDB v2 HTTP API.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::flux::QueryBuilder;
use crate::line::Point;
use crate::store::{PredictionParts, ReadOutcome, TimeSeriesStore};
use crate::table::DataTable;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

/// Measurement under which prediction points are written
pub const PREDICTION_MEASUREMENT: &str = "PredictThp";

/// Field carrying the formatted prediction timestamp
const PREDICTION_TS_FIELD: &str = "index";

/// Second-precision format for the prediction timestamp field
const PREDICTION_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Health-probe response body
#[derive(Debug, Deserialize)]
struct HealthBody {
    #[allow(dead_code)]
    status: String,
    #[serde(default)]
    version: Option<String>,
}

/// Verified handle to the store
struct Connection {
    http: reqwest::Client,
}

/// Live implementation of [`TimeSeriesStore`].
///
/// Holds at most one connection; `connect` replaces it. Not safe for
/// concurrent callers.
pub struct InfluxStore {
    config: StoreConfig,
    conn: Option<Connection>,
}

impl InfluxStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config, conn: None }
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.config.token)
    }

    async fn probe(&self) -> Result<(reqwest::Client, String), reqwest::Error> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.config.verify_tls)
            .build()?;
        let resp = http
            .get(format!("{}/health", self.base_url()))
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await?
            .error_for_status()?;
        let health: HealthBody = resp.json().await?;
        Ok((http, health.version.unwrap_or_else(|| "unknown".to_string())))
    }

    /// Run one Flux query and classify the outcome. Transport failures are
    /// logged and reported as `Unavailable`, never raised.
    async fn execute(&self, flux: &str, measurement: &str, id: Option<&str>) -> ReadOutcome {
        let Some(conn) = self.conn.as_ref() else {
            error!(measurement, "query attempted without a store connection");
            return ReadOutcome::Unavailable;
        };
        let url = format!("{}/api/v2/query?org={}", self.base_url(), self.config.org);
        let resp = conn
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "application/vnd.flux")
            .header(ACCEPT, "application/csv")
            .body(flux.to_string())
            .send()
            .await
            .and_then(|r| r.error_for_status());
        let body = match resp {
            Ok(resp) => match resp.text().await {
                Ok(body) => body,
                Err(err) => {
                    error!(error = %err, measurement, "failed to read query response");
                    return ReadOutcome::Unavailable;
                }
            },
            Err(err) => {
                error!(error = %err, measurement, "query against the store failed");
                return ReadOutcome::Unavailable;
            }
        };
        let table = DataTable::from_annotated_csv(&body);
        if table.is_empty() {
            match id {
                Some(id) => error!(identifier = id, measurement, "no data found"),
                None => error!(measurement, "no data found"),
            }
            ReadOutcome::Empty
        } else {
            ReadOutcome::Found(table)
        }
    }

    /// Validate the prediction record and render it as one point. Runs
    /// before any network traffic.
    fn build_point(&self, record: &DataTable) -> Result<Point, StoreError> {
        let parts = PredictionParts::from_record(record, &self.config)?;
        Ok(Point::new(PREDICTION_MEASUREMENT)
            .tag(&self.config.cell_id_tag, &parts.cell)
            .tag(&self.config.uplink_field, &parts.uplink)
            .tag(&self.config.downlink_field, &parts.downlink)
            .field_str(
                PREDICTION_TS_FIELD,
                &parts.timestamp.format(PREDICTION_TS_FORMAT).to_string(),
            ))
    }
}

#[async_trait]
impl TimeSeriesStore for InfluxStore {
    async fn connect(&mut self) -> Result<(), StoreError> {
        // Any prior handle is dropped before dialing a new one
        self.conn = None;
        match self.probe().await {
            Ok((http, version)) => {
                self.conn = Some(Connection { http });
                info!(version = %version, url = %self.config.url, "connected to time-series store");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, url = %self.config.url, "failed to establish a store connection");
                // Coarse rate-limit on reconnection storms; this is a pause,
                // not a retry. The caller must invoke connect again.
                tokio::time::sleep(Duration::from_secs(self.config.reconnect_pause_secs)).await;
                Err(StoreError::Connect(err.to_string()))
            }
        }
    }

    async fn read_cell(
        &mut self,
        cell_id: &str,
        limit: usize,
    ) -> Result<ReadOutcome, StoreError> {
        if limit == 0 {
            return Err(StoreError::InvalidRequest("limit must be positive"));
        }
        if cell_id.is_empty() {
            return Err(StoreError::InvalidRequest("cell id must be non-empty"));
        }
        let query = QueryBuilder::new(&self.config).cell_query(cell_id, limit);
        info!(query = %query, "executing cell read");
        let measurement = self.config.cell_measurement.clone();
        Ok(self.execute(&query, &measurement, Some(cell_id)).await)
    }

    async fn read_ue(&mut self, ue_id: &str) -> Result<ReadOutcome, StoreError> {
        if ue_id.is_empty() {
            return Err(StoreError::InvalidRequest("UE id must be non-empty"));
        }
        let query = QueryBuilder::new(&self.config).ue_query(ue_id);
        info!(query = %query, "executing UE read");
        let measurement = self.config.ue_measurement.clone();
        Ok(self.execute(&query, &measurement, Some(ue_id)).await)
    }

    async fn write_prediction(
        &mut self,
        record: &DataTable,
        bucket: &str,
    ) -> Result<(), StoreError> {
        let point = self.build_point(record)?;
        let Some(conn) = self.conn.as_ref() else {
            error!(bucket, "prediction write attempted without a store connection");
            return Err(StoreError::NotConnected);
        };
        let url = format!(
            "{}/api/v2/write?org={}&bucket={}&precision=s",
            self.base_url(),
            self.config.org,
            bucket
        );
        let result = conn
            .http
            .post(&url)
            .header(AUTHORIZATION, self.auth_header())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(point.to_line())
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                // Fire and forget: the point is dropped, nothing is queued
                error!(error = %err, bucket, "failed to submit prediction point");
                Err(StoreError::Write(err.to_string()))
            }
        }
    }

    async fn cell_ids(&mut self) -> Result<Vec<String>, StoreError> {
        let query = QueryBuilder::new(&self.config).cell_ids_query();
        info!(query = %query, "listing cell identifiers");
        let measurement = self.config.cell_measurement.clone();
        match self.execute(&query, &measurement, None).await {
            ReadOutcome::Found(table) => {
                let mut ids: Vec<String> = Vec::new();
                for row in 0..table.len() {
                    if let Some(value) = table.get(row, "_value") {
                        let id = value.to_string();
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
                Ok(ids)
            }
            ReadOutcome::Empty => Ok(Vec::new()),
            ReadOutcome::Unavailable => {
                Err(StoreError::Transport("store unavailable".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Value, TIME_COLUMN};
    use chrono::{TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Minimal HTTP stub standing in for the store: answers the health
    /// probe with a passing body and every query with `query_body`.
    async fn spawn_store_stub(query_body: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 16 * 1024];
                    let mut read = 0;
                    let header_end = loop {
                        let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        read += n;
                        if let Some(pos) =
                            buf[..read].windows(4).position(|w| w == b"\r\n\r\n")
                        {
                            break pos + 4;
                        }
                    };
                    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
                    let body_len = head
                        .lines()
                        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok()))
                        .unwrap_or(0);
                    while read < header_end + body_len {
                        let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        read += n;
                    }
                    let (content_type, body) = if head.starts_with("GET /health") {
                        ("application/json", r#"{"status":"pass","version":"2.7.1"}"#)
                    } else {
                        ("application/csv", query_body)
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\
                         Connection: close\r\n\r\n{}",
                        content_type,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}", addr)
    }

    async fn connected_store(query_body: &'static str) -> InfluxStore {
        let url = spawn_store_stub(query_body).await;
        let mut store = InfluxStore::new(StoreConfig {
            url,
            reconnect_pause_secs: 0,
            ..StoreConfig::default()
        });
        store.connect().await.unwrap();
        store
    }

    fn unreachable_config() -> StoreConfig {
        StoreConfig {
            url: "http://127.0.0.1:9".to_string(),
            reconnect_pause_secs: 0,
            ..StoreConfig::default()
        }
    }

    fn prediction_record() -> DataTable {
        let config = StoreConfig::default();
        let mut record = DataTable::new(vec![
            config.cell_id_tag.clone(),
            config.uplink_field.clone(),
            config.downlink_field.clone(),
            TIME_COLUMN.to_string(),
        ]);
        record.push_row(vec![
            Value::Str("gNB1".to_string()),
            Value::Float(5.2),
            Value::Float(3.1),
            Value::Time(Utc.with_ymd_and_hms(2021, 5, 12, 7, 43, 51).unwrap()),
        ]);
        record
    }

    #[tokio::test]
    async fn test_connect_unreachable_leaves_no_handle() {
        let mut store = InfluxStore::new(unreachable_config());
        let result = store.connect().await;
        assert!(matches!(result, Err(StoreError::Connect(_))));
        assert!(store.conn.is_none());
    }

    #[tokio::test]
    async fn test_zero_row_response_classified_empty() {
        // Annotations plus a header row, zero data rows: reachable store,
        // nothing recorded for this cell.
        let mut store = connected_store(
            "#datatype,string,long,dateTime:RFC3339\r\n\
             #group,false,false,false\r\n\
             #default,_result,,\r\n\
             ,result,table,_time\r\n",
        )
        .await;
        let outcome = store.read_cell("C1", 10).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Empty);
        let outcome = store.read_ue("Car-1").await.unwrap();
        assert_eq!(outcome, ReadOutcome::Empty);
    }

    #[tokio::test]
    async fn test_row_response_classified_found() {
        let mut store = connected_store(
            ",result,table,_time,DRB_UEThpUl,DRB_UEThpDl,Viavi_GnbDuId\r\n\
             ,_result,0,2021-05-12T07:43:51Z,5.2,3.1,gNB1\r\n",
        )
        .await;
        let outcome = store.read_cell("gNB1", 10).await.unwrap();
        let table = outcome.table().expect("row response should be Found");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, "DRB_UEThpUl").unwrap().as_f64(), Some(5.2));
    }

    #[tokio::test]
    async fn test_read_without_connection_is_unavailable() {
        let mut store = InfluxStore::new(unreachable_config());
        let outcome = store.read_ue("Car-1").await.unwrap();
        assert_eq!(outcome, ReadOutcome::Unavailable);
        let outcome = store.read_cell("C1", 10).await.unwrap();
        assert_eq!(outcome, ReadOutcome::Unavailable);
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let mut store = InfluxStore::new(unreachable_config());
        let result = store.read_cell("C1", 0).await;
        assert!(matches!(result, Err(StoreError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_empty_identifier_rejected() {
        let mut store = InfluxStore::new(unreachable_config());
        assert!(store.read_ue("").await.is_err());
        assert!(store.read_cell("", 5).await.is_err());
    }

    #[tokio::test]
    async fn test_write_missing_column_rejected_before_network() {
        let mut store = InfluxStore::new(unreachable_config());
        let config = StoreConfig::default();
        // Record lacks the downlink column
        let mut record = DataTable::new(vec![
            config.cell_id_tag.clone(),
            config.uplink_field.clone(),
            TIME_COLUMN.to_string(),
        ]);
        record.push_row(vec![
            Value::Str("gNB1".to_string()),
            Value::Float(5.2),
            Value::Time(Utc.with_ymd_and_hms(2021, 5, 12, 7, 43, 51).unwrap()),
        ]);
        let result = store.write_prediction(&record, "qp").await;
        assert!(matches!(result, Err(StoreError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_write_empty_record_rejected() {
        let mut store = InfluxStore::new(unreachable_config());
        let record = DataTable::new(vec![TIME_COLUMN.to_string()]);
        let result = store.write_prediction(&record, "qp").await;
        assert!(matches!(result, Err(StoreError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_valid_write_without_connection() {
        let mut store = InfluxStore::new(unreachable_config());
        let result = store.write_prediction(&prediction_record(), "qp").await;
        assert!(matches!(result, Err(StoreError::NotConnected)));
    }

    #[test]
    fn test_point_shape_and_timestamp_precision() {
        let store = InfluxStore::new(StoreConfig::default());
        let point = store.build_point(&prediction_record()).unwrap();
        let line = point.to_line();
        assert_eq!(
            line,
            "PredictThp,Viavi_GnbDuId=gNB1,DRB_UEThpUl=5.2,DRB_UEThpDl=3.1 \
             index=\"2021-05-12 07:43:51\""
        );
    }
}

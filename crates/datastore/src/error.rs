//! Store Error Types

use thiserror::Error;

/// Errors raised by the data-access layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not establish a connection to the store
    #[error("Failed to connect to the time-series store: {0}")]
    Connect(String),

    /// Operation attempted before a successful connect
    #[error("Store is not connected")]
    NotConnected,

    /// Network or protocol error while talking to the store
    #[error("Transport error: {0}")]
    Transport(String),

    /// Point submission failed
    #[error("Write rejected by the store: {0}")]
    Write(String),

    /// Prediction record rejected before any network call
    #[error("Invalid prediction record: {0}")]
    InvalidRecord(String),

    /// Caller violated a read-call contract
    #[error("Invalid read request: {0}")]
    InvalidRequest(&'static str),

    /// Fixture data could not be loaded
    #[error("Fixture error: {0}")]
    Fixture(String),
}

//! Core library for the nmwifi Wi-Fi settings tool.
//! This crate defines the data model, the remote-call seam towards
//! NetworkManager, the components that turn raw D-Bus replies into a ranked
//! network list, and the controller that sequences them. Backends (the real
//! system bus or an in-memory mock) are selected by feature flags.

pub mod access_points;
pub mod active;
pub mod adapter;
pub mod assemble;
pub mod backends;
pub mod config;
pub mod controller;
pub mod profile;
pub mod scan;
pub mod structs;
pub mod traits;
pub mod web_server;

pub use config::ServiceConfig;
pub use controller::{NetworkListing, WifiController};
pub use structs::{AccessPoint, ConnectionProfile, Network, ObjectId, Security, Variant};
pub use traits::{Presenter, RemoteCallClient};

// Define a shared Error and Result type for the entire crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The bus is unreachable or NetworkManager does not own its name.
    #[error("NetworkManager is not available: {0}")]
    ServiceUnavailable(String),

    #[error("{operation} timed out")]
    Timeout { operation: String },

    #[error("No wireless adapter found")]
    NotFound,

    /// A single call got an error reply (or an undecodable one).
    #[error("{operation} failed: {message}")]
    CallFailed {
        operation: String,
        /// D-Bus error name, when the service sent an error reply.
        name: Option<String>,
        message: String,
    },

    #[error("Connection profile rejected: {name}: {message}")]
    ConnectError { name: String, message: String },

    #[error("Unsupported security type: {0}")]
    UnsupportedSecurity(Security),

    #[error("A connection profile for '{ssid}' already exists ({path})")]
    DuplicateProfile { ssid: String, path: ObjectId },

    #[error("Superseded by a newer request")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Web server error: {0}")]
    WebServer(#[from] axum::BoxError),
}

impl Error {
    /// Errors after which no further call in the session can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ServiceUnavailable(_) | Error::Timeout { .. })
    }

    /// Errors that only concern the entry being read; listings skip them.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Error::CallFailed { .. })
    }

    pub(crate) fn unexpected_type(operation: impl Into<String>) -> Self {
        Error::CallFailed {
            operation: operation.into(),
            name: None,
            message: "unexpected value type in reply".to_string(),
        }
    }
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;

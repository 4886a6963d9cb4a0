//! gptveil error types

use thiserror::Error;

/// The main error type for gptveil operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading or writing the device
    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device path does not resolve to an accessible device
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The protective MBR checks failed
    #[error("Not a GPT disk: {0}")]
    NotGpt(String),

    /// A GPT header that cannot be used to locate its partition table
    #[error("Invalid zone table: {0}")]
    InvalidZoneTable(String),

    /// Hide/unhide requested against a partition in the wrong state
    #[error("Ambiguous partition state: {0}")]
    AmbiguousState(String),

    /// GUID text that is not a canonical 8-4-4-4-12 GUID
    #[error("Invalid GUID: {0}")]
    InvalidGuid(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Result type alias for gptveil operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a device not found error
    pub fn device_not_found(msg: impl Into<String>) -> Self {
        Error::DeviceNotFound(msg.into())
    }

    /// Create a not-GPT error
    pub fn not_gpt(msg: impl Into<String>) -> Self {
        Error::NotGpt(msg.into())
    }

    /// Create an invalid zone table error
    pub fn invalid_zone_table(msg: impl Into<String>) -> Self {
        Error::InvalidZoneTable(msg.into())
    }

    /// Create an ambiguous state error
    pub fn ambiguous_state(msg: impl Into<String>) -> Self {
        Error::AmbiguousState(msg.into())
    }

    /// Create an invalid GUID error
    pub fn invalid_guid(msg: impl Into<String>) -> Self {
        Error::InvalidGuid(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Error::PermissionDenied(msg.into())
    }

    /// Map an `open` failure on `path` to the matching error kind
    pub fn from_open(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::device_not_found(path.to_string()),
            std::io::ErrorKind::PermissionDenied => Error::permission_denied(path.to_string()),
            _ => Error::Io(err),
        }
    }
}

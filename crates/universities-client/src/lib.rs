//! University listing client
//!
//! HTTP access to the university search endpoint: request building, JSON
//! decoding, error normalization into [`RemoteError`], and an opt-in retry
//! helper for the layers above.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod client;
pub mod retry;
pub mod types;

pub use api::UniversityApi;
pub use client::{ApiClient, ApiClientConfig, RemoteError};
pub use retry::RetryPolicy;
pub use types::{Filter, Page, UniversityRecord, PAGE_SIZE};

/// Result type for client construction
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up the client
///
/// Request failures are reported as [`RemoteError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Base URL failed to parse
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = Error::InvalidUrl("::".to_string());
        assert!(err.to_string().contains("Invalid base URL"));
    }
}

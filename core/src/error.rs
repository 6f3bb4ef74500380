//! Error types for the dashboard API client.
//!
//! # Design
//! Failures fall into three transport-level kinds: the server answered with
//! an error, the request went out but nothing came back, or the request never
//! left. Each renders a fixed English message; the detail that produced it
//! stays on the variant for logging. A fourth variant covers 2xx bodies that
//! do not match the expected shape.

use thiserror::Error;

pub const GENERIC_SERVER_MESSAGE: &str = "API request failed";
pub const NETWORK_MESSAGE: &str = "Network error - please check your connection";
pub const REQUEST_MESSAGE: &str = "Failed to make request";

/// Errors returned by `DashboardClient` parse methods and `ApiClient` calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with an error status or an error envelope.
    #[error("{message}")]
    Server {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        body: String,
    },

    /// The request was sent but no response arrived (timeout, refused
    /// connection, DNS failure).
    #[error("{}", NETWORK_MESSAGE)]
    Network(String),

    /// The request could not be built or sent.
    #[error("{}", REQUEST_MESSAGE)]
    Request(String),

    /// A success response whose body does not match the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// HTTP status of a server error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_displays_backend_message() {
        let err = ApiError::Server {
            status: 500,
            code: Some("X".to_string()),
            message: "boom".to_string(),
            details: None,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "boom");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_not_found());
    }

    #[test]
    fn transport_errors_display_fixed_messages() {
        assert_eq!(ApiError::Network("timed out".to_string()).to_string(), NETWORK_MESSAGE);
        assert_eq!(ApiError::Request("bad uri".to_string()).to_string(), REQUEST_MESSAGE);
        assert_eq!(NETWORK_MESSAGE, "Network error - please check your connection");
        assert_eq!(REQUEST_MESSAGE, "Failed to make request");
        assert_eq!(ApiError::Network(String::new()).status(), None);
    }
}

//! The JSON wrappers every `/api/*` endpoint answers with.
//!
//! Success: `{"status":"success","data":<T>,"metadata":{"timestamp":..}}`.
//! Failure: `{"status":"error","error":{"code":..,"message":..,"details":..}}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Open key/value bag attached to every success envelope. Only `timestamp`
/// is guaranteed; endpoints add their own keys (`chart_type`, `filters`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Metadata {
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }
}

/// Success envelope around a payload of type `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub data: T,
    pub metadata: Metadata,
}

impl<T> ApiResponse<T> {
    /// Hand out `data` only if the envelope reports success.
    pub fn into_data(self) -> Result<T, ApiError> {
        match self.status {
            ResponseStatus::Success => Ok(self.data),
            ResponseStatus::Error => Err(ApiError::Deserialization(
                "envelope carries data but reports status \"error\"".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub status: ResponseStatus,
    pub error: ErrorDetail,
}

/// A decoded body: either the payload or the error the backend reported.
#[derive(Debug)]
pub(crate) enum Envelope<T> {
    Success(ApiResponse<T>),
    Failure(ApiErrorResponse),
}

/// Decode an envelope, dispatching on `status` before looking at `data`.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<Envelope<T>, ApiError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;

    let status = value
        .get("status")
        .cloned()
        .ok_or_else(|| ApiError::Deserialization("envelope has no \"status\" field".to_string()))?;
    let status: ResponseStatus =
        serde_json::from_value(status).map_err(|e| ApiError::Deserialization(e.to_string()))?;

    match status {
        ResponseStatus::Success => serde_json::from_value(value)
            .map(Envelope::Success)
            .map_err(|e| ApiError::Deserialization(e.to_string())),
        ResponseStatus::Error => serde_json::from_value(value)
            .map(Envelope::Failure)
            .map_err(|e| ApiError::Deserialization(e.to_string())),
    }
}

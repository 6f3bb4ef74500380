//! Blocking API client for the AIER risk dashboard.
//!
//! # Overview
//! Typed access to the dashboard backend: patients, aggregate statistics and
//! chart data, each unwrapped from the backend's `{status, data, metadata}`
//! envelope.
//!
//! # Design
//! - `DashboardClient` is stateless. It builds `HttpRequest` values and
//!   parses `HttpResponse` values without touching the network.
//! - `Transport` executes the round trip; `UreqTransport` is the default.
//! - `ApiClient` wires the two together and is the single place where
//!   requests are logged and failures become `ApiError`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use client::DashboardClient;
pub use config::ClientConfig;
pub use envelope::{ApiErrorResponse, ApiResponse, ErrorDetail, Metadata, ResponseStatus};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Averages, DistributionData, HealthStatus, Outcome, Patient, PatientPage, RiskDistribution,
    RiskLevel, ScatterDataPoint, Statistics,
};

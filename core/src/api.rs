//! Typed, blocking facade over the dashboard API.
//!
//! # Design
//! `ApiClient` pairs a `DashboardClient` with a `Transport`. Every endpoint
//! goes through [`ApiClient::send`], which logs the outgoing request and
//! routes transport failures into `ApiError`; server errors are sorted out
//! by the parse step. The client holds no mutable state, so one value can be
//! cloned or shared across threads and used concurrently.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::client::DashboardClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    DistributionData, HealthStatus, Patient, PatientPage, RiskLevel, ScatterDataPoint, Statistics,
};

#[derive(Clone)]
pub struct ApiClient {
    client: DashboardClient,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.client.base_url())
            .finish_non_exhaustive()
    }
}

impl Default for ApiClient {
    /// Configured from `AIER_API_URL`, or `http://localhost:8000`.
    fn default() -> Self {
        Self::from_env()
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }

    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    /// Use a custom transport, e.g. a canned one in tests.
    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            client: DashboardClient::new(&config.base_url),
            transport: Arc::new(transport),
        }
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Patients, optionally capped at `limit` and filtered by risk level.
    ///
    /// The `/api/patients` payload is a `PatientPage` (`patients`, `count`,
    /// `has_more`); only `patients` is returned here. Use
    /// [`get_patient_page`](Self::get_patient_page) for the whole page.
    pub fn get_patients(
        &self,
        limit: Option<u32>,
        risk_level: Option<RiskLevel>,
    ) -> Result<Vec<Patient>> {
        self.get_patient_page(limit, risk_level).map(|page| page.patients)
    }

    /// Like [`get_patients`](Self::get_patients) but keeps `count` and `has_more`.
    pub fn get_patient_page(
        &self,
        limit: Option<u32>,
        risk_level: Option<RiskLevel>,
    ) -> Result<PatientPage> {
        self.call(
            |c| c.build_list_patients(limit, risk_level),
            DashboardClient::parse_list_patients,
        )
    }

    pub fn get_patient(&self, patient_id: &str) -> Result<Patient> {
        self.call(
            |c| c.build_get_patient(patient_id),
            DashboardClient::parse_get_patient,
        )
    }

    pub fn get_statistics(&self) -> Result<Statistics> {
        self.call(
            DashboardClient::build_get_statistics,
            DashboardClient::parse_get_statistics,
        )
    }

    pub fn get_scatter_data(&self) -> Result<Vec<ScatterDataPoint>> {
        self.call(
            DashboardClient::build_get_scatter_data,
            DashboardClient::parse_get_scatter_data,
        )
    }

    pub fn get_distribution_data(&self) -> Result<DistributionData> {
        self.call(
            DashboardClient::build_get_distribution_data,
            DashboardClient::parse_get_distribution_data,
        )
    }

    /// Raw `/health` body; no envelope.
    pub fn health_check(&self) -> Result<HealthStatus> {
        self.call(
            DashboardClient::build_health_check,
            DashboardClient::parse_health_check,
        )
    }

    /// Execute one request. Logs it on the way out; a missing response
    /// becomes `Network` or `Request`. Error statuses come back as data.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        info!(method = %request.method, url = %request.url, "API request");
        let response = self.transport.execute(request).map_err(log_failure)?;
        debug!(status = response.status, url = %request.url, "API response");
        Ok(response)
    }

    fn call<T>(
        &self,
        build: impl FnOnce(&DashboardClient) -> Result<HttpRequest>,
        parse: impl FnOnce(&DashboardClient, HttpResponse) -> Result<T>,
    ) -> Result<T> {
        let request = build(&self.client).map_err(log_failure)?;
        let response = self.send(&request)?;
        parse(&self.client, response)
    }
}

fn log_failure(err: ApiError) -> ApiError {
    match &err {
        ApiError::Network(detail) => error!(error = %detail, "Network error"),
        ApiError::Request(detail) => error!(error = %detail, "Request error"),
        _ => {}
    }
    err
}

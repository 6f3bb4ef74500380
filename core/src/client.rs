//! Stateless HTTP request builder and response parser for the dashboard API.
//!
//! # Design
//! `DashboardClient` holds only a `base_url` and the default headers, and
//! carries no mutable state between calls. Each endpoint is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. The caller executes the actual HTTP
//! round-trip, keeping this layer deterministic and free of I/O.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::error;
use url::Url;

use crate::envelope::{self, Envelope, ErrorDetail};
use crate::error::{ApiError, GENERIC_SERVER_MESSAGE};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    DistributionData, HealthStatus, Patient, PatientPage, RiskLevel, ScatterDataPoint, Statistics,
};

/// Synchronous, stateless client for the dashboard API.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    base_url: String,
    default_headers: Vec<(String, String)>,
}

impl DashboardClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: vec![("content-type".to_string(), "application/json".to_string())],
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/patients`. Each filter becomes a query key only when given.
    pub fn build_list_patients(
        &self,
        limit: Option<u32>,
        risk_level: Option<RiskLevel>,
    ) -> Result<HttpRequest, ApiError> {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(level) = risk_level {
            query.push(("risk_level".to_string(), level.as_str().to_string()));
        }
        self.get(&["api", "patients"], query)
    }

    /// `GET /api/patients/{id}`. The id is encoded as a single path segment.
    pub fn build_get_patient(&self, patient_id: &str) -> Result<HttpRequest, ApiError> {
        self.get(&["api", "patients", patient_id], Vec::new())
    }

    pub fn build_get_statistics(&self) -> Result<HttpRequest, ApiError> {
        self.get(&["api", "statistics"], Vec::new())
    }

    pub fn build_get_scatter_data(&self) -> Result<HttpRequest, ApiError> {
        self.get(&["api", "visualizations", "scatter"], Vec::new())
    }

    pub fn build_get_distribution_data(&self) -> Result<HttpRequest, ApiError> {
        self.get(&["api", "visualizations", "distribution"], Vec::new())
    }

    pub fn build_health_check(&self) -> Result<HttpRequest, ApiError> {
        self.get(&["health"], Vec::new())
    }

    pub fn parse_list_patients(&self, response: HttpResponse) -> Result<PatientPage, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_get_patient(&self, response: HttpResponse) -> Result<Patient, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_get_statistics(&self, response: HttpResponse) -> Result<Statistics, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_get_scatter_data(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<ScatterDataPoint>, ApiError> {
        unwrap_envelope(response)
    }

    pub fn parse_get_distribution_data(
        &self,
        response: HttpResponse,
    ) -> Result<DistributionData, ApiError> {
        unwrap_envelope(response)
    }

    /// The health endpoint answers with a bare body, not an envelope.
    pub fn parse_health_check(&self, response: HttpResponse) -> Result<HealthStatus, ApiError> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    fn get(
        &self,
        segments: &[&str],
        query: Vec<(String, String)>,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Request(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Request(format!("base URL {:?} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(&query);
        }

        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            query,
            headers: self.default_headers.clone(),
        })
    }
}

/// Lenient view of an error body: every field may be missing, and `code`
/// and `details` may hold any JSON value without hiding `message`.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<LooseErrorDetail>,
}

#[derive(Deserialize)]
struct LooseErrorDetail {
    code: Option<Value>,
    message: Option<Value>,
    details: Option<Value>,
}

impl From<ErrorDetail> for LooseErrorDetail {
    fn from(detail: ErrorDetail) -> Self {
        Self {
            code: Some(Value::String(detail.code)),
            message: Some(Value::String(detail.message)),
            details: detail.details.map(Value::String),
        }
    }
}

/// Strings pass through; other values keep their JSON text.
fn text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Check the status, decode the envelope and hand back `data`.
fn unwrap_envelope<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    match envelope::decode::<T>(&response.body) {
        Ok(Envelope::Success(resp)) => resp.into_data(),
        Ok(Envelope::Failure(resp)) => Err(server_error(
            response.status,
            Some(resp.error.into()),
            response.body,
        )),
        // An error envelope whose sibling fields are not plain strings.
        Err(_) if reports_error(&response.body) => Err(server_error(
            response.status,
            loose_detail(&response.body),
            response.body,
        )),
        Err(e) => Err(e),
    }
}

fn reports_error(body: &str) -> bool {
    serde_json::from_str::<Value>(body)
        .map(|value| value.get("status").and_then(Value::as_str) == Some("error"))
        .unwrap_or(false)
}

fn loose_detail(body: &str) -> Option<LooseErrorDetail> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error)
}

/// Map non-2xx responses to `ApiError::Server`, taking the message from the
/// error envelope when the body carries one.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(server_error(
        response.status,
        loose_detail(&response.body),
        response.body.clone(),
    ))
}

fn server_error(status: u16, detail: Option<LooseErrorDetail>, body: String) -> ApiError {
    let (code, message, details) = match detail {
        Some(d) => (d.code.map(text), d.message, d.details.map(text)),
        None => (None, None, None),
    };
    let message = message
        .and_then(|m| match m {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        })
        .unwrap_or_else(|| GENERIC_SERVER_MESSAGE.to_string());

    error!(status, code = ?code, message = %message, details = ?details, "API error");

    ApiError::Server {
        status,
        code,
        message,
        details,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> DashboardClient {
        DashboardClient::new("http://localhost:8000")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_list_patients_without_filters_has_no_query() {
        let req = client().build_list_patients(None, None).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/api/patients");
        assert!(req.query.is_empty());
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn build_list_patients_with_both_filters() {
        let req = client()
            .build_list_patients(Some(10), Some(RiskLevel::High))
            .unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/patients?limit=10&risk_level=HIGH");
        assert_eq!(
            req.query,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("risk_level".to_string(), "HIGH".to_string()),
            ]
        );
    }

    #[test]
    fn build_list_patients_with_risk_level_only() {
        let req = client().build_list_patients(None, Some(RiskLevel::Low)).unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/patients?risk_level=LOW");
        assert!(req.query.iter().all(|(k, _)| k != "limit"));
    }

    #[test]
    fn build_list_patients_sends_zero_limit() {
        let req = client().build_list_patients(Some(0), None).unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/patients?limit=0");
    }

    #[test]
    fn build_get_patient_encodes_id_as_one_segment() {
        let req = client().build_get_patient("PT-00001").unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/patients/PT-00001");

        let req = client().build_get_patient("a/b c").unwrap();
        assert_eq!(req.url, "http://localhost:8000/api/patients/a%2Fb%20c");
    }

    #[test]
    fn build_paths_for_remaining_endpoints() {
        let c = client();
        assert_eq!(c.build_get_statistics().unwrap().url, "http://localhost:8000/api/statistics");
        assert_eq!(
            c.build_get_scatter_data().unwrap().url,
            "http://localhost:8000/api/visualizations/scatter"
        );
        assert_eq!(
            c.build_get_distribution_data().unwrap().url,
            "http://localhost:8000/api/visualizations/distribution"
        );
        assert_eq!(c.build_health_check().unwrap().url, "http://localhost:8000/health");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = DashboardClient::new("http://localhost:8000/");
        assert_eq!(
            client.build_get_statistics().unwrap().url,
            "http://localhost:8000/api/statistics"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let client = DashboardClient::new("https://example.org/dashboard/");
        assert_eq!(
            client.build_health_check().unwrap().url,
            "https://example.org/dashboard/health"
        );
    }

    #[test]
    fn malformed_base_url_is_a_request_error() {
        let err = DashboardClient::new("not a url").build_health_check().unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
        assert_eq!(err.to_string(), "Failed to make request");

        let err = DashboardClient::new("mailto:ops@example.org")
            .build_health_check()
            .unwrap_err();
        assert!(matches!(err, ApiError::Request(_)));
    }

    #[test]
    fn parse_statistics_success() {
        let body = r#"{"status":"success","data":{"total_patients":2,"diabetes_prevalence":0.5,
            "risk_distribution":{"LOW":1,"MEDIUM":0,"HIGH":1,"CRITICAL":0},
            "age_distribution":{"<30":1,"60+":1},
            "averages":{"glucose":120.5,"bmi":30.1,"age":45.0}},
            "metadata":{"timestamp":"2024-01-01T00:00:00"}}"#;
        let stats = client().parse_get_statistics(response(200, body)).unwrap();
        assert_eq!(stats.total_patients, 2);
        assert_eq!(stats.risk_distribution.get(RiskLevel::High), 1);
        assert_eq!(stats.age_distribution["60+"], 1);
        assert_eq!(stats.averages.glucose, 120.5);
    }

    #[test]
    fn parse_server_error_uses_envelope_message() {
        let body = r#"{"status":"error","error":{"code":"X","message":"boom"}}"#;
        let err = client().parse_get_statistics(response(500, body)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        match err {
            ApiError::Server { status, code, details, .. } => {
                assert_eq!(status, 500);
                assert_eq!(code.as_deref(), Some("X"));
                assert!(details.is_none());
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn parse_server_error_without_envelope_uses_generic_message() {
        let err = client().parse_get_statistics(response(500, "<html>oops</html>")).unwrap_err();
        assert_eq!(err.to_string(), "API request failed");

        let err = client()
            .parse_get_statistics(response(503, r#"{"detail":"Service unhealthy"}"#))
            .unwrap_err();
        assert_eq!(err.to_string(), "API request failed");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn parse_server_error_with_empty_message_uses_generic_message() {
        let body = r#"{"status":"error","error":{"code":"X","message":""}}"#;
        let err = client().parse_get_statistics(response(500, body)).unwrap_err();
        assert_eq!(err.to_string(), "API request failed");
    }

    #[test]
    fn parse_server_error_message_survives_non_string_siblings() {
        let body = r#"{"status":"error","error":{"code":"X","message":"boom","details":{"field":"limit"}}}"#;
        let err = client().parse_get_statistics(response(500, body)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        match err {
            ApiError::Server { code, details, .. } => {
                assert_eq!(code.as_deref(), Some("X"));
                assert_eq!(details.as_deref(), Some(r#"{"field":"limit"}"#));
            }
            other => panic!("expected server error, got {other:?}"),
        }

        let body = r#"{"status":"error","error":{"code":422,"message":"boom"}}"#;
        let err = client().parse_get_statistics(response(500, body)).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(matches!(err, ApiError::Server { code: Some(ref c), .. } if c == "422"));
    }

    #[test]
    fn parse_server_error_with_non_string_message_uses_generic_message() {
        let body = r#"{"status":"error","error":{"code":"X","message":42}}"#;
        let err = client().parse_get_statistics(response(500, body)).unwrap_err();
        assert_eq!(err.to_string(), "API request failed");
    }

    #[test]
    fn parse_error_envelope_with_success_status_is_server_error() {
        let body = r#"{"status":"error","error":{"code":"DB","message":"table missing"}}"#;
        let err = client().parse_get_scatter_data(response(200, body)).unwrap_err();
        assert_eq!(err.to_string(), "table missing");
        assert_eq!(err.status(), Some(200));
    }

    #[test]
    fn parse_error_envelope_with_success_status_and_numeric_code() {
        let body = r#"{"status":"error","error":{"code":503,"message":"table scan failed","details":{"retry":true}}}"#;
        let err = client().parse_get_patient(response(200, body)).unwrap_err();
        assert_eq!(err.to_string(), "table scan failed");
        assert_eq!(err.status(), Some(200));
    }

    #[test]
    fn parse_get_patient_not_found() {
        let body = r#"{"status":"error","error":{"code":"PATIENT_NOT_FOUND","message":"Patient PT-9 not found"}}"#;
        let err = client().parse_get_patient(response(404, body)).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Patient PT-9 not found");
    }

    #[test]
    fn parse_list_patients_bad_json() {
        let err = client().parse_list_patients(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn parse_health_check_returns_raw_body() {
        let health = client()
            .parse_health_check(response(200, r#"{"status":"ok"}"#))
            .unwrap();
        assert_eq!(health.status, "ok");
        assert!(health.extra.is_empty());
    }
}

//! Executes `HttpRequest` values over the network.
//!
//! # Design
//! `Transport` is the seam between the pure build/parse layer and real I/O.
//! Non-2xx statuses are returned as data; only failures where no response
//! exists come back as `Err`, already sorted into "never sent" and "sent,
//! nothing came back".

use std::time::Duration;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round trip.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a shared `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` bounds the whole call, connect through body read.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.agent.get(request.url.as_str()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder.call().map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        // A body cut off mid-read means the response never fully arrived.
        let body = response.body_mut().read_to_string().map_err(classify)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Sort a `ureq` failure into the request/network halves of the taxonomy.
fn classify(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => ApiError::Request(err.to_string()),
        // The response arrived; it is just too large to decode.
        ureq::Error::BodyExceedsLimit(_) => ApiError::Deserialization(err.to_string()),
        other => ApiError::Network(other.to_string()),
    }
}

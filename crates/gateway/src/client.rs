use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use hyper::ext::ReasonPhrase;
use loanscout_core::config::HttpConfig;
use loanscout_core::errors::TransportFailure;
use loanscout_core::routing::ProviderRequest;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Client;
use tracing::{info, warn};

/// Fetches the raw response text for one provider request.
#[async_trait]
pub trait LoanApiClient: Send + Sync {
    async fn fetch(&self, request: &ProviderRequest) -> Result<String, TransportFailure>;
}

#[derive(Clone, Debug)]
pub struct HttpLoanApiClient {
    client: Client,
}

impl HttpLoanApiClient {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportFailure> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        let device_header = HeaderName::from_bytes(config.device_header.trim().as_bytes())
            .map_err(|error| TransportFailure::Client(format!("device header name: {error}")))?;
        let device_id = HeaderValue::from_str(config.device_id.trim())
            .map_err(|error| TransportFailure::Client(format!("device header value: {error}")))?;
        headers.insert(device_header, device_id);

        let mut builder = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        let client =
            builder.build().map_err(|error| TransportFailure::Client(describe(&error)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LoanApiClient for HttpLoanApiClient {
    async fn fetch(&self, request: &ProviderRequest) -> Result<String, TransportFailure> {
        let url = request.url();
        let response = self.client.get(&url).send().await.map_err(|error| {
            let failure = TransportFailure::Network(describe(&error));
            warn!(
                event_name = "search.fetch.failed",
                loan_type = %request.loan_type,
                error = %failure,
                "loan provider request failed"
            );
            failure
        })?;

        let status = response.status();
        if !status.is_success() {
            let failure = TransportFailure::Status {
                code: status.as_u16(),
                reason: reason_phrase(&response),
            };
            warn!(
                event_name = "search.fetch.failed",
                loan_type = %request.loan_type,
                status = status.as_u16(),
                "loan provider returned a non-success status"
            );
            return Err(failure);
        }

        let body =
            response.text().await.map_err(|error| TransportFailure::Network(describe(&error)))?;
        info!(
            event_name = "search.fetch.completed",
            loan_type = %request.loan_type,
            status = status.as_u16(),
            body_bytes = body.len(),
            "loan provider responded"
        );
        Ok(body)
    }
}

/// The server's own status text. hyper only keeps it as an extension when it
/// differs from the canonical phrase, so fall back to that.
fn reason_phrase(response: &reqwest::Response) -> String {
    if let Some(reason) = response.extensions().get::<ReasonPhrase>() {
        return String::from_utf8_lossy(reason.as_bytes()).into_owned();
    }
    response.status().canonical_reason().unwrap_or("Unknown Status").to_string()
}

/// Flattens the error source chain so the root cause (refused, dns, timeout)
/// reaches the caller.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

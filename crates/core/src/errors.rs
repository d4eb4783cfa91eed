use thiserror::Error;

use crate::domain::loan::LoanTypeCode;
use crate::domain::search::SearchStatus;

pub const QUERY_NOT_UNDERSTOOD: &str = "query not understood";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("completion service call failed: {0}")]
    ServiceUnavailable(String),
    #[error("completion payload is not a JSON object: {0}")]
    MalformedPayload(String),
    #[error("completion service declined the query: {0}")]
    Declined(String),
    #[error("missing or invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String, upstream: Option<String> },
}

impl ParseFailure {
    /// The upstream `error` text when the service supplied one, otherwise the
    /// generic message.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Declined(message) => message,
            Self::InvalidField { upstream: Some(message), .. } => message,
            Self::ServiceUnavailable(_)
            | Self::MalformedPayload(_)
            | Self::InvalidField { upstream: None, .. } => QUERY_NOT_UNDERSTOOD,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoutingFailure {
    #[error("invalid loan type `{0}`")]
    UnknownLoanType(String),
    #[error("invalid loan type: no endpoint configured for `{0}`")]
    EndpointNotConfigured(LoanTypeCode),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("http client could not be built: {0}")]
    Client(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },
    #[error("provider payload is not valid JSON: {0}")]
    InvalidPayload(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    #[error(transparent)]
    Routing(#[from] RoutingFailure),
    #[error(transparent)]
    Transport(#[from] TransportFailure),
}

impl SearchError {
    pub fn status(&self) -> SearchStatus {
        match self {
            Self::Parse(_) => SearchStatus::ParseFailed,
            Self::Routing(_) => SearchStatus::RoutingFailed,
            Self::Transport(_) => SearchStatus::TransportFailed,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Parse(failure) => failure.user_message().to_string(),
            Self::Routing(_) => "invalid loan type".to_string(),
            Self::Transport(failure) => format!("loan provider request failed: {failure}"),
        }
    }
}

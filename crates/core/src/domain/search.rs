use serde::{Deserialize, Serialize};

use crate::domain::loan::{LoanOffer, ParsedLoanQuery};
use crate::errors::SearchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Ok,
    ParseFailed,
    RoutingFailed,
    TransportFailed,
}

/// Outcome of one search. `total_found` always equals `offers.len()`; the
/// fields are private to this module so only the constructors below set them.
/// Serialize-only for the same reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    original_query: String,
    parsed_params: Option<ParsedLoanQuery>,
    offers: Vec<LoanOffer>,
    total_found: usize,
    status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

impl SearchResult {
    /// Offers must already be ranked.
    pub fn assemble(
        original_query: impl Into<String>,
        parsed_params: ParsedLoanQuery,
        offers: Vec<LoanOffer>,
    ) -> Self {
        Self {
            original_query: original_query.into(),
            parsed_params: Some(parsed_params),
            total_found: offers.len(),
            offers,
            status: SearchStatus::Ok,
            failure: None,
        }
    }

    /// Empty result for a search that stopped at `error`. Parsed parameters
    /// are kept when the failure happened after parsing.
    pub fn failed(
        original_query: impl Into<String>,
        parsed_params: Option<ParsedLoanQuery>,
        error: &SearchError,
    ) -> Self {
        Self {
            original_query: original_query.into(),
            parsed_params,
            offers: Vec::new(),
            total_found: 0,
            status: error.status(),
            failure: Some(error.user_message()),
        }
    }

    pub fn original_query(&self) -> &str {
        &self.original_query
    }

    pub fn parsed_params(&self) -> Option<&ParsedLoanQuery> {
        self.parsed_params.as_ref()
    }

    pub fn offers(&self) -> &[LoanOffer] {
        &self.offers
    }

    pub fn total_found(&self) -> usize {
        self.total_found
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_ok(&self) -> bool {
        self.status == SearchStatus::Ok
    }
}

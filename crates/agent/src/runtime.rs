use std::sync::Arc;

use anyhow::{Context, Result};
use loanscout_core::config::AppConfig;
use loanscout_core::domain::loan::ParsedLoanQuery;
use loanscout_core::domain::search::SearchResult;
use loanscout_core::errors::SearchError;
use loanscout_core::offers::{rank_offers, OfferNormalizer, RawProviderOffer};
use loanscout_core::routing::{EndpointTable, LoanTypeRouter, ProviderRequest};
use loanscout_gateway::{HttpLoanApiClient, LoanApiClient};
use tracing::{info, warn};

use crate::llm::build_llm_client;
use crate::query::QueryParser;

/// One search: parse, route, fetch, normalize, rank.
///
/// Holds no per-search state, so a single instance can serve concurrent
/// searches.
#[derive(Clone)]
pub struct LoanSearchRuntime {
    parser: QueryParser,
    router: LoanTypeRouter,
    api_client: Arc<dyn LoanApiClient>,
    normalizer: OfferNormalizer,
}

impl LoanSearchRuntime {
    pub fn new(
        parser: QueryParser,
        router: LoanTypeRouter,
        api_client: Arc<dyn LoanApiClient>,
        normalizer: OfferNormalizer,
    ) -> Self {
        Self { parser, router, api_client, normalizer }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = build_llm_client(&config.llm)?;
        let api_client =
            HttpLoanApiClient::new(&config.http).context("failed to build loan provider client")?;

        Ok(Self::new(
            QueryParser::from_config(llm, &config.llm),
            LoanTypeRouter::new(EndpointTable::from_config(&config.endpoints)),
            Arc::new(api_client),
            OfferNormalizer::default(),
        ))
    }

    /// Parse and routing failures are returned before any provider call.
    /// A transport failure still yields `Ok`, with an empty result marked
    /// `TransportFailed`.
    pub async fn try_search(&self, text: &str) -> Result<SearchResult, SearchError> {
        let parsed = self.parser.parse(text).await?;
        let request = self.router.build_request(&parsed)?;
        Ok(self.fetch_ranked(text, parsed, &request).await)
    }

    /// Like [`Self::try_search`] but every failure is folded into the result.
    pub async fn search(&self, text: &str) -> SearchResult {
        let parsed = match self.parser.parse(text).await {
            Ok(parsed) => parsed,
            Err(error) => return SearchResult::failed(text, None, &error),
        };

        match self.router.build_request(&parsed) {
            Ok(request) => self.fetch_ranked(text, parsed, &request).await,
            Err(failure) => {
                warn!(event_name = "search.route.failed", error = %failure, "search not routed");
                SearchResult::failed(text, Some(parsed), &SearchError::from(failure))
            }
        }
    }

    async fn fetch_ranked(
        &self,
        text: &str,
        parsed: ParsedLoanQuery,
        request: &ProviderRequest,
    ) -> SearchResult {
        let fetched = self
            .api_client
            .fetch(request)
            .await
            .and_then(|body| RawProviderOffer::decode_payload(&body));

        let raw_offers = match fetched {
            Ok(raw_offers) => raw_offers,
            Err(failure) => {
                let error = SearchError::from(failure);
                warn!(
                    event_name = "search.completed",
                    status = "transport_failed",
                    error = %error,
                    "search finished without offers"
                );
                return SearchResult::failed(text, Some(parsed), &error);
            }
        };

        let offers = rank_offers(self.normalizer.normalize(&raw_offers, parsed.loan_type));
        let result = SearchResult::assemble(text, parsed, offers);
        info!(
            event_name = "search.completed",
            status = "ok",
            total_found = result.total_found(),
            "search finished"
        );
        result
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EndpointsConfig;
use crate::domain::loan::{LoanTypeCode, ParsedLoanQuery};
use crate::errors::RoutingFailure;

/// One GET against a provider endpoint, derived from a parsed query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub loan_type: LoanTypeCode,
    pub endpoint_base_url: String,
    pub amount: Decimal,
    pub maturity_months: u32,
}

impl ProviderRequest {
    /// Only `Amount` and `Maturity` are ever appended.
    pub fn url(&self) -> String {
        let separator = if self.endpoint_base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{separator}Amount={}&Maturity={}",
            self.endpoint_base_url,
            self.amount.normalize(),
            self.maturity_months
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointTable {
    consumer: Option<String>,
    housing: Option<String>,
    vehicle: Option<String>,
}

impl EndpointTable {
    pub fn new(
        consumer: Option<String>,
        housing: Option<String>,
        vehicle: Option<String>,
    ) -> Self {
        Self { consumer, housing, vehicle }
    }

    pub fn from_config(config: &EndpointsConfig) -> Self {
        Self::new(
            config.consumer_url.clone(),
            config.housing_url.clone(),
            config.vehicle_url.clone(),
        )
    }

    pub fn get(&self, loan_type: LoanTypeCode) -> Option<&str> {
        let url = match loan_type {
            LoanTypeCode::Consumer => self.consumer.as_deref(),
            LoanTypeCode::Housing => self.housing.as_deref(),
            LoanTypeCode::Vehicle => self.vehicle.as_deref(),
        };
        url.map(str::trim).filter(|url| !url.is_empty())
    }
}

/// Fail-closed mapping from loan type to provider endpoint.
#[derive(Clone, Debug, Default)]
pub struct LoanTypeRouter {
    endpoints: EndpointTable,
}

impl LoanTypeRouter {
    pub fn new(endpoints: EndpointTable) -> Self {
        Self { endpoints }
    }

    /// Resolves a loan-type word through the vocabulary table.
    pub fn classify(code: &str) -> Result<LoanTypeCode, RoutingFailure> {
        LoanTypeCode::from_vocabulary(code)
            .ok_or_else(|| RoutingFailure::UnknownLoanType(code.trim().to_string()))
    }

    pub fn route(&self, loan_type: LoanTypeCode) -> Result<&str, RoutingFailure> {
        self.endpoints.get(loan_type).ok_or(RoutingFailure::EndpointNotConfigured(loan_type))
    }

    pub fn build_request(
        &self,
        query: &ParsedLoanQuery,
    ) -> Result<ProviderRequest, RoutingFailure> {
        let endpoint_base_url = self.route(query.loan_type)?.to_string();
        debug!(
            event_name = "search.route.resolved",
            loan_type = %query.loan_type,
            endpoint = %endpoint_base_url,
            "loan type routed to provider endpoint"
        );

        Ok(ProviderRequest {
            loan_type: query.loan_type,
            endpoint_base_url,
            amount: query.amount,
            maturity_months: query.term_months,
        })
    }
}

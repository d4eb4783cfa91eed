pub mod config;
pub mod domain;
pub mod errors;
pub mod offers;
pub mod routing;

pub use config::{AppConfig, ConfigError, EndpointsConfig, HttpConfig, LlmConfig, LlmProvider};
pub use domain::loan::{LoanOffer, LoanTypeCode, ParsedLoanQuery, LOAN_TYPE_VOCABULARY};
pub use domain::search::{SearchResult, SearchStatus};
pub use errors::{ParseFailure, RoutingFailure, SearchError, TransportFailure};
pub use offers::{rank_offers, OfferDefaults, OfferNormalizer, RawProviderOffer};
pub use routing::{EndpointTable, LoanTypeRouter, ProviderRequest};

//! HTTP transport to the loan provider endpoints.
//!
//! One GET per search, no retries. The relaxed certificate policy configured
//! in `[http]` applies to [`HttpLoanApiClient`] alone; completion-service
//! clients build their own `reqwest::Client` with default verification.

pub mod client;

pub use client::{HttpLoanApiClient, LoanApiClient};

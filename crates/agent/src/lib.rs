//! Search agent: natural-language loan queries in, ranked offers out.
//!
//! # Flow
//!
//! 1. **Parse** (`query`) - the completion service translates free text into
//!    a `ParsedLoanQuery`; the result is validated before anything else runs.
//! 2. **Route** - `loanscout_core::routing` picks the provider endpoint for
//!    the loan type, or stops the search.
//! 3. **Fetch** - one GET through `loanscout_gateway`.
//! 4. **Normalize and rank** - `loanscout_core::offers`.
//!
//! `LoanSearchRuntime` (see `runtime`) wires these together. The completion
//! client and provider client are injected, so tests run the whole flow with
//! stubs.
//!
//! The LLM is strictly a translator. It never picks offers or their order.

pub mod llm;
pub mod query;
pub mod runtime;

pub use llm::{build_llm_client, CompletionRequest, LlmClient};
pub use query::QueryParser;
pub use runtime::LoanSearchRuntime;

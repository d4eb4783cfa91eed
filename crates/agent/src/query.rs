//! Free text to [`ParsedLoanQuery`] through the completion service.
//!
//! The model only translates. Everything it returns is validated here, and a
//! loan-type word it produces still has to pass the router vocabulary before
//! it becomes a [`LoanTypeCode`].

use std::fmt::Write as _;
use std::sync::Arc;

use loanscout_core::config::LlmConfig;
use loanscout_core::domain::loan::{LoanTypeCode, ParsedLoanQuery};
use loanscout_core::errors::{ParseFailure, RoutingFailure, SearchError, QUERY_NOT_UNDERSTOOD};
use loanscout_core::offers::normalize::decimal_from_json;
use loanscout_core::routing::LoanTypeRouter;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::llm::{CompletionRequest, LlmClient};

pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

const AMOUNT_MULTIPLIERS: &[(&str, u32)] = &[
    ("milyon", 1_000_000),
    ("million", 1_000_000),
    ("mn", 1_000_000),
    ("m", 1_000_000),
    ("bin", 1_000),
    ("thousand", 1_000),
    ("k", 1_000),
];

const TERM_UNITS: &[(&str, u32)] = &[
    ("ay", 1),
    ("month", 1),
    ("months", 1),
    ("yıl", 12),
    ("sene", 12),
    ("year", 12),
    ("years", 12),
];

#[derive(Clone)]
pub struct QueryParser {
    llm: Arc<dyn LlmClient>,
    temperature: f32,
    max_tokens: u32,
}

impl QueryParser {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm, temperature: DEFAULT_TEMPERATURE, max_tokens: DEFAULT_MAX_TOKENS }
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self { llm, temperature: config.temperature, max_tokens: config.max_tokens }
    }

    pub async fn parse(&self, query: &str) -> Result<ParsedLoanQuery, SearchError> {
        let request = CompletionRequest {
            prompt: build_prompt(query),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: true,
        };

        let raw = self.llm.complete(&request).await.map_err(|error| {
            let failure = ParseFailure::ServiceUnavailable(format!("{error:#}"));
            warn!(event_name = "search.parse.failed", error = %failure, "completion call failed");
            failure
        })?;

        match interpret_completion(&raw) {
            Ok(parsed) => {
                debug!(
                    event_name = "search.parse.completed",
                    loan_type = %parsed.loan_type,
                    amount = %parsed.amount,
                    term_months = parsed.term_months,
                    "query parsed"
                );
                Ok(parsed)
            }
            Err(error) => {
                warn!(event_name = "search.parse.failed", error = %error, "query not usable");
                Err(error)
            }
        }
    }
}

/// Instruction text sent to the completion service, with `query` embedded.
pub fn build_prompt(query: &str) -> String {
    let mut prompt = String::from(
        "You extract loan search parameters from a single user message.\n\
         The message may be written in Turkish or English.\n\n\
         LOAN TYPES (answer with the canonical code, the first word of each line):\n",
    );
    for loan_type in LoanTypeCode::ALL {
        let words: Vec<&str> = loan_type.synonyms().collect();
        let _ = writeln!(prompt, "- {}", words.join(", "));
    }

    prompt.push_str("\nAMOUNT MULTIPLIERS:\n");
    for (word, factor) in AMOUNT_MULTIPLIERS {
        let _ = writeln!(prompt, "- \"{word}\" means x{factor}");
    }
    prompt.push_str("Write amounts as plain numbers without separators or currency.\n");

    prompt.push_str("\nTERM UNITS (termMonths is always in months):\n");
    for (word, factor) in TERM_UNITS {
        let _ = writeln!(prompt, "- \"{word}\" means x{factor} months");
    }

    prompt.push_str(
        "\nINVENTORY:\n\
         If the user mentions an asset they could sell (a house, a car, gold, ...), estimate its \
         current market value and describe it as \"<asset> - <value>\". Use \"none - 0\" when no \
         asset is mentioned.\n\
         Subtract the estimated inventory value and any stated cash on hand from the total \
         price the user needs to finance, and report what remains as amount.\n\
         cash is the cash the user already has, 0 when not mentioned.\n\n\
         RESPONSE (JSON object only, no prose, no code fences):\n\
         {\"success\": true, \"type\": \"<code>\", \"amount\": <number>, \
         \"termMonths\": <whole number>, \"inventory\": \"<asset> - <value>\", \
         \"cash\": <number>}\n\
         If the message is not a loan request or the amount, term or type cannot be determined, \
         answer {\"success\": false, \"error\": \"<short reason>\"}.\n\n\
         USER MESSAGE:\n",
    );
    prompt.push_str(query.trim());
    prompt.push('\n');
    prompt
}

/// Validates the raw completion text into a typed query.
pub fn interpret_completion(raw: &str) -> Result<ParsedLoanQuery, SearchError> {
    let body = strip_code_fences(raw);
    let payload: Value = serde_json::from_str(body)
        .map_err(|error| ParseFailure::MalformedPayload(error.to_string()))?;
    let Value::Object(fields) = payload else {
        return Err(ParseFailure::MalformedPayload(format!("expected object, got `{body}`")).into());
    };

    let upstream = non_empty_text(fields.get("error"));
    if fields.get("success") != Some(&Value::Bool(true)) {
        let message = upstream.unwrap_or_else(|| QUERY_NOT_UNDERSTOOD.to_string());
        return Err(ParseFailure::Declined(message).into());
    }

    validate_fields(&fields).map_err(|error| attach_upstream(error, upstream))
}

fn validate_fields(fields: &Map<String, Value>) -> Result<ParsedLoanQuery, SearchError> {
    let type_word = non_empty_text(fields.get("type")).ok_or_else(|| invalid("type", "missing"))?;
    let loan_type = LoanTypeRouter::classify(&type_word)?;

    let amount = required_decimal(fields, "amount")?;
    if amount <= Decimal::ZERO {
        return Err(invalid("amount", "must be greater than zero").into());
    }

    let term = required_decimal(fields, "termMonths")?;
    let term_months = (term > Decimal::ZERO && term.fract().is_zero())
        .then(|| term.to_u32())
        .flatten()
        .ok_or_else(|| invalid("termMonths", "must be a positive whole number of months"))?;

    let inventory_description =
        non_empty_text(fields.get("inventory")).ok_or_else(|| invalid("inventory", "missing"))?;

    let cash_on_hand = required_decimal(fields, "cash")?;
    if cash_on_hand < Decimal::ZERO {
        return Err(invalid("cash", "must not be negative").into());
    }

    Ok(ParsedLoanQuery {
        loan_type,
        amount,
        term_months,
        inventory_value: ParsedLoanQuery::inventory_value_from(&inventory_description),
        inventory_description,
        cash_on_hand,
    })
}

/// An upstream `error` text replaces the generic message for rejected fields.
fn attach_upstream(error: SearchError, upstream: Option<String>) -> SearchError {
    let Some(message) = upstream else {
        return error;
    };
    match error {
        SearchError::Parse(ParseFailure::InvalidField { field, reason, .. }) => {
            ParseFailure::InvalidField { field, reason, upstream: Some(message) }.into()
        }
        SearchError::Routing(RoutingFailure::UnknownLoanType(_)) => {
            ParseFailure::Declined(message).into()
        }
        other => other,
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn required_decimal(
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Decimal, ParseFailure> {
    let value = fields.get(field).ok_or_else(|| invalid(field, "missing"))?;
    decimal_from_json(value).ok_or_else(|| invalid(field, "not a number"))
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn invalid(field: &'static str, reason: &str) -> ParseFailure {
    ParseFailure::InvalidField { field, reason: reason.to_string(), upstream: None }
}

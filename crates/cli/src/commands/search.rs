use std::fmt::Write as _;

use anyhow::{Context, Result};
use loanscout_agent::LoanSearchRuntime;
use loanscout_core::config::{AppConfig, LoadOptions};
use loanscout_core::domain::loan::ParsedLoanQuery;
use loanscout_core::domain::search::{SearchResult, SearchStatus};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

use super::{escape_json, CommandResult};
use crate::logging::init_logging;

const EXIT_CONFIG_FAILURE: u8 = 2;
const EXIT_SEARCH_FAILED: u8 = 3;

pub fn run(query: &str, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "search",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG_FAILURE,
            )
        }
    };
    init_logging(&config.logging);

    let (executor, search_runtime) = match build(&config) {
        Ok(parts) => parts,
        Err(error) => {
            return CommandResult::failure(
                "search",
                "client_setup",
                format!("{error:#}"),
                EXIT_CONFIG_FAILURE,
            )
        }
    };

    let result = executor.block_on(search_runtime.search(query));
    let exit_code = if result.is_ok() { 0 } else { EXIT_SEARCH_FAILED };
    let output = if json_output {
        serde_json::to_string_pretty(&result).unwrap_or_else(|error| {
            format!(
                "{{\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&result)
    };

    CommandResult { exit_code, output }
}

fn build(config: &AppConfig) -> Result<(Runtime, LoanSearchRuntime)> {
    let executor = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    let search_runtime = LoanSearchRuntime::from_config(config)?;
    Ok((executor, search_runtime))
}

pub fn render_human(result: &SearchResult) -> String {
    let mut output = String::new();

    match result.status() {
        SearchStatus::Ok if result.total_found() > 0 => {
            let _ = writeln!(output, "{} offers found\n", result.total_found());
        }
        SearchStatus::Ok => {
            output.push_str("No offers found\n\nNo loan offers matched your criteria.\n\n");
        }
        SearchStatus::ParseFailed
        | SearchStatus::RoutingFailed
        | SearchStatus::TransportFailed => {
            let _ = writeln!(
                output,
                "Search failed: {}\n",
                result.failure().unwrap_or("unknown failure")
            );
        }
    }

    if let Some(params) = result.parsed_params() {
        render_criteria(&mut output, params);
    }

    if result.offers().is_empty() {
        if result.is_ok() {
            output.push_str("\nPlease try again with different criteria.");
        }
        return output.trim_end().to_string();
    }

    output.push_str("---\n\nOffers:\n\n");
    for (index, offer) in result.offers().iter().enumerate() {
        let _ = writeln!(output, "{}. {}", index + 1, offer.bank_name);
        let _ = writeln!(output, "   Interest rate: %{}", offer.interest_rate_percent.normalize());
        let _ = writeln!(output, "   Monthly payment: {}", format_money(offer.monthly_payment));
        let _ = writeln!(output, "   Total payment: {}", format_money(offer.total_payment));
        let _ = writeln!(output, "   {}\n", offer.eligibility_note);
    }
    output.push_str(
        "Note: interest rates change frequently. Contact the bank for current terms.",
    );
    output
}

fn render_criteria(output: &mut String, params: &ParsedLoanQuery) {
    output.push_str("Search criteria:\n");
    let _ = writeln!(output, "- Loan type: {}", params.loan_type.display_name());
    let _ = writeln!(output, "- Amount: {}", format_money(params.amount));
    let _ = writeln!(output, "- Term: {} months", params.term_months);
    let _ = writeln!(output, "- Inventory: {}", params.inventory_description);
    let _ = writeln!(output, "- Cash on hand: {}", format_money(params.cash_on_hand));
}

/// `1234567.891` -> `1,234,567.89 TL`
fn format_money(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (position, digit) in whole.chars().enumerate() {
        if position > 0 && (whole.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}.{fraction} TL")
}

use loanscout_core::config::{endpoint_env_keys, AppConfig, LlmProvider, LoadOptions};
use loanscout_core::domain::loan::LoanTypeCode;
use loanscout_core::routing::EndpointTable;
use loanscout_gateway::HttpLoanApiClient;
use secrecy::ExposeSecret;
use serde::Serialize;

use super::escape_json;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: impl Into<String>, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name: name.into(), status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Offline readiness checks; nothing here contacts a remote service.
pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_llm_credentials(&config));
            checks.push(check_provider_client(&config));
            let endpoints = EndpointTable::from_config(&config.endpoints);
            for loan_type in LoanTypeCode::ALL {
                checks.push(check_endpoint(&endpoints, loan_type));
            }
        }
        Err(error) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Fail,
                error.to_string(),
            ));
            let skipped = ["llm_credentials", "provider_client"]
                .into_iter()
                .map(str::to_string)
                .chain(LoanTypeCode::ALL.into_iter().map(endpoint_check_name));
            for name in skipped {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    let llm = &config.llm;
    let ready = match llm.provider {
        LlmProvider::Gemini | LlmProvider::OpenAi => llm
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().trim().is_empty()),
        LlmProvider::Ollama => true,
    };

    if ready {
        DoctorCheck::new(
            "llm_credentials",
            CheckStatus::Pass,
            format!(
                "{:?} model `{}` at `{}`",
                llm.provider,
                llm.model,
                llm.effective_base_url()
            ),
        )
    } else {
        DoctorCheck::new("llm_credentials", CheckStatus::Fail, "api key is missing")
    }
}

fn check_provider_client(config: &AppConfig) -> DoctorCheck {
    match HttpLoanApiClient::new(&config.http) {
        Ok(_) if config.http.accept_invalid_certs => DoctorCheck::new(
            "provider_client",
            CheckStatus::Pass,
            "client ready; certificate verification is disabled for provider endpoints",
        ),
        Ok(_) => DoctorCheck::new("provider_client", CheckStatus::Pass, "client ready"),
        Err(error) => DoctorCheck::new("provider_client", CheckStatus::Fail, error.to_string()),
    }
}

fn check_endpoint(endpoints: &EndpointTable, loan_type: LoanTypeCode) -> DoctorCheck {
    let name = endpoint_check_name(loan_type);
    match endpoints.get(loan_type) {
        Some(url) => DoctorCheck::new(name, CheckStatus::Pass, format!("routes to `{url}`")),
        None => {
            let [primary, legacy] = endpoint_env_keys(loan_type);
            DoctorCheck::new(
                name,
                CheckStatus::Fail,
                format!(
                    "{} searches will fail: set {primary} or {legacy}",
                    loan_type.display_name()
                ),
            )
        }
    }
}

fn endpoint_check_name(loan_type: LoanTypeCode) -> String {
    format!("endpoint_{}", loan_type.code())
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

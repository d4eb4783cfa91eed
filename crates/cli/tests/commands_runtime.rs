use std::env;
use std::sync::{Mutex, OnceLock};

use loanscout_cli::commands::{config, doctor, search};
use mockito::Matcher;
use serde_json::Value;

const KONUT_COMPLETION: &str = r#"{"response": "{\"success\":true,\"type\":\"konut\",\"amount\":5000000,\"termMonths\":48,\"inventory\":\"konut - 2000000\",\"cash\":100000}", "done": true}"#;

#[test]
fn search_returns_ranked_offers_as_json() {
    let mut server = mockito::Server::new();
    let _llm = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(KONUT_COMPLETION)
        .create();
    let provider = server
        .mock("GET", "/housing")
        .match_header("device", "1")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Amount".into(), "5000000".into()),
            Matcher::UrlEncoded("Maturity".into(), "48".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"products": [
                {"id": 1, "bank": {"name": "A Bank"}, "interestRate": 2.5, "amount": 5000000},
                {"id": 2, "bank": {"name": "B Bank"}, "interestRate": 1.9, "amount": 5000000}
            ]}"#,
        )
        .create();

    let base_url = server.url();
    let housing_url = format!("{base_url}/housing");
    with_env(
        &[
            ("LOANSCOUT_LLM_PROVIDER", "ollama"),
            ("LOANSCOUT_LLM_BASE_URL", base_url.as_str()),
            ("LOANSCOUT_ENDPOINTS_HOUSING_URL", housing_url.as_str()),
        ],
        || {
            let result = search::run("5 milyon 48 ay konut kredisi", true);
            assert_eq!(result.exit_code, 0, "expected successful search");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["status"], "ok");
            assert_eq!(payload["totalFound"], 2);
            assert_eq!(payload["offers"][0]["bankName"], "B Bank");
            assert_eq!(payload["offers"][1]["bankName"], "A Bank");
            assert_eq!(payload["parsedParams"]["type"], "housing");
            assert_eq!(payload["originalQuery"], "5 milyon 48 ay konut kredisi");
        },
    );
    provider.assert();
}

#[test]
fn search_reports_declined_parse_with_failure_code() {
    let mut server = mockito::Server::new();
    let _llm = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_body(r#"{"response": "{\"success\":false,\"error\":\"ambiguous amount\"}"}"#)
        .create();
    let provider = server.mock("GET", Matcher::Any).expect(0).create();

    let base_url = server.url();
    let housing_url = format!("{base_url}/housing");
    with_env(
        &[
            ("LOANSCOUT_LLM_PROVIDER", "ollama"),
            ("LOANSCOUT_LLM_BASE_URL", base_url.as_str()),
            ("LOANSCOUT_ENDPOINTS_HOUSING_URL", housing_url.as_str()),
        ],
        || {
            let result = search::run("a loan please", false);
            assert_eq!(result.exit_code, 3, "expected failed search code");
            assert!(result.output.starts_with("Search failed: ambiguous amount"));
        },
    );
    provider.assert();
}

#[test]
fn search_returns_config_failure_without_credentials() {
    with_env(&[], || {
        let result = search::run("konut kredisi", true);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "search");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_redacts_api_key_and_attributes_sources() {
    with_env(
        &[
            ("GEMINI_API_KEY", "AIzaSyD-super-secret-value"),
            ("GATEWAY_API_CONSUMERLOAN_LIST", "https://gateway.test/consumer"),
        ],
        || {
            let output = config::run();

            assert!(!output.contains("super-secret-value"));
            assert!(output.contains("- llm.api_key = AIza*** (source: env (GEMINI_API_KEY))"));
            assert!(output.contains(
                "- endpoints.consumer_url = https://gateway.test/consumer \
                 (source: env (GATEWAY_API_CONSUMERLOAN_LIST))"
            ));
            assert!(output.contains("- endpoints.vehicle_url = <unset> (source: default)"));
        },
    );
}

#[test]
fn doctor_flags_unconfigured_endpoints() {
    with_env(
        &[
            ("LOANSCOUT_LLM_API_KEY", "test-key"),
            ("LOANSCOUT_ENDPOINTS_HOUSING_URL", "https://gateway.test/housing"),
        ],
        || {
            let payload = parse_payload(&doctor::run(true));
            assert_eq!(payload["overall_status"], "fail");

            let checks = payload["checks"].as_array().expect("checks array");
            let status_of = |name: &str| {
                checks
                    .iter()
                    .find(|check| check["name"] == name)
                    .map(|check| check["status"].clone())
                    .unwrap_or(Value::Null)
            };
            assert_eq!(status_of("config_validation"), "pass");
            assert_eq!(status_of("llm_credentials"), "pass");
            assert_eq!(status_of("provider_client"), "pass");
            assert_eq!(status_of("endpoint_housing"), "pass");
            assert_eq!(status_of("endpoint_consumer"), "fail");
            assert_eq!(status_of("endpoint_vehicle"), "fail");
        },
    );
}

#[test]
fn doctor_skips_dependent_checks_when_config_invalid() {
    with_env(&[], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation"));
        assert!(output.contains("- [skip] endpoint_vehicle"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LOANSCOUT_LLM_PROVIDER",
        "LOANSCOUT_LLM_API_KEY",
        "LOANSCOUT_LLM_BASE_URL",
        "LOANSCOUT_LLM_MODEL",
        "LOANSCOUT_LLM_TEMPERATURE",
        "LOANSCOUT_LLM_MAX_TOKENS",
        "LOANSCOUT_LLM_TIMEOUT_SECS",
        "GEMINI_API_KEY",
        "LOANSCOUT_ENDPOINTS_CONSUMER_URL",
        "LOANSCOUT_ENDPOINTS_HOUSING_URL",
        "LOANSCOUT_ENDPOINTS_VEHICLE_URL",
        "GATEWAY_API_CONSUMERLOAN_LIST",
        "GATEWAY_API_HOUSINGLOAN_LIST",
        "GATEWAY_API_VEHICLELOAN_LIST",
        "LOANSCOUT_HTTP_DEVICE_HEADER",
        "LOANSCOUT_HTTP_DEVICE_ID",
        "LOANSCOUT_HTTP_ACCEPT_INVALID_CERTS",
        "LOANSCOUT_HTTP_TIMEOUT_SECS",
        "LOANSCOUT_LOGGING_LEVEL",
        "LOANSCOUT_LOGGING_FORMAT",
        "LOANSCOUT_LOG_LEVEL",
        "LOANSCOUT_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::loan::{LoanOffer, LoanTypeCode};
use crate::errors::TransportFailure;

/// One provider product record, as received. Its shape is provider-defined,
/// so it is only ever read through [`OfferNormalizer`].
#[derive(Clone, Debug, PartialEq)]
pub struct RawProviderOffer(Value);

impl From<Value> for RawProviderOffer {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl RawProviderOffer {
    /// Decodes a provider response body into its `products` records.
    ///
    /// A body without a `products` array yields no records; a body that is
    /// not JSON at all is a transport-level failure.
    pub fn decode_payload(body: &str) -> Result<Vec<Self>, TransportFailure> {
        let payload: Value = serde_json::from_str(body)
            .map_err(|error| TransportFailure::InvalidPayload(error.to_string()))?;

        match payload.get("products") {
            Some(Value::Array(products)) => Ok(products.iter().cloned().map(Self).collect()),
            Some(other) => {
                warn!(
                    event_name = "search.normalize.products_not_array",
                    kind = json_kind(other),
                    "provider `products` field is not an array; treating as empty"
                );
                Ok(Vec::new())
            }
            None => Ok(Vec::new()),
        }
    }

    fn field(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.0, |current, key| current.get(*key))
    }

    fn text(&self, path: &[&str]) -> Option<String> {
        match self.field(path)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }

    fn decimal(&self, path: &[&str]) -> Option<Decimal> {
        self.field(path).and_then(decimal_from_json).filter(|value| !value.is_zero())
    }
}

/// Fallback for every canonical offer field. This is the only place defaults
/// are defined.
///
/// | offer field           | provider field(s)          | fallback                     |
/// |-----------------------|----------------------------|------------------------------|
/// | `id`                  | `id`                       | `loan-<position>`            |
/// | `bank_name`           | `bank.name`                | `Unknown Bank`               |
/// | `interest_rate_percent` | `interestRate`           | `0`                          |
/// | `monthly_payment`     | `monthlyInstallment`       | `0`                          |
/// | `total_payment`       | `totalAmount`              | `0`                          |
/// | `min_amount`/`max_amount` | `amount`               | `0`                          |
/// | `max_term_months`     | `maturity`                 | `0`                          |
/// | `eligibility_note`    | `loanRateText`, `name`     | contact-the-bank message     |
///
/// A missing rate defaults to zero, which ranks the offer first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferDefaults {
    pub id_prefix: &'static str,
    pub bank_name: &'static str,
    pub interest_rate_percent: Decimal,
    pub monthly_payment: Decimal,
    pub total_payment: Decimal,
    pub amount: Decimal,
    pub max_term_months: u32,
    pub eligibility_note: &'static str,
}

impl Default for OfferDefaults {
    fn default() -> Self {
        Self {
            id_prefix: "loan-",
            bank_name: "Unknown Bank",
            interest_rate_percent: Decimal::ZERO,
            monthly_payment: Decimal::ZERO,
            total_payment: Decimal::ZERO,
            amount: Decimal::ZERO,
            max_term_months: 0,
            eligibility_note: "Contact the bank for detailed eligibility information.",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct OfferNormalizer {
    defaults: OfferDefaults,
}

impl OfferNormalizer {
    pub fn new(defaults: OfferDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &OfferDefaults {
        &self.defaults
    }

    /// Maps every record to a [`LoanOffer`]; nothing is dropped.
    pub fn normalize(
        &self,
        raw_offers: &[RawProviderOffer],
        loan_type: LoanTypeCode,
    ) -> Vec<LoanOffer> {
        let offers: Vec<LoanOffer> = raw_offers
            .iter()
            .enumerate()
            .map(|(position, raw)| self.normalize_one(position, raw, loan_type))
            .collect();

        debug!(
            event_name = "search.normalize.completed",
            loan_type = %loan_type,
            offer_count = offers.len(),
            "provider records normalized"
        );
        offers
    }

    fn normalize_one(
        &self,
        position: usize,
        raw: &RawProviderOffer,
        loan_type: LoanTypeCode,
    ) -> LoanOffer {
        let defaults = &self.defaults;
        let amount = raw.decimal(&["amount"]).unwrap_or(defaults.amount);

        LoanOffer {
            id: raw.text(&["id"]).unwrap_or_else(|| format!("{}{position}", defaults.id_prefix)),
            bank_name: raw
                .text(&["bank", "name"])
                .unwrap_or_else(|| defaults.bank_name.to_string()),
            loan_type,
            interest_rate_percent: raw
                .decimal(&["interestRate"])
                .unwrap_or(defaults.interest_rate_percent),
            monthly_payment: raw
                .decimal(&["monthlyInstallment"])
                .unwrap_or(defaults.monthly_payment),
            total_payment: raw.decimal(&["totalAmount"]).unwrap_or(defaults.total_payment),
            min_amount: amount,
            max_amount: amount,
            max_term_months: raw
                .decimal(&["maturity"])
                .and_then(|months| months.trunc().to_u32())
                .unwrap_or(defaults.max_term_months),
            eligibility_note: raw
                .text(&["loanRateText"])
                .or_else(|| raw.text(&["name"]))
                .unwrap_or_else(|| defaults.eligibility_note.to_string()),
        }
    }
}

/// Reads a JSON number or numeric string as an exact decimal.
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text.trim()),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::domain::loan::LoanTypeCode;
    use crate::errors::TransportFailure;

    use super::{decimal_from_json, OfferNormalizer, RawProviderOffer};

    #[test]
    fn full_record_maps_every_field() {
        let raw = RawProviderOffer::from(json!({
            "id": 1,
            "bank": { "name": "A Bank" },
            "interestRate": 2.5,
            "monthlyInstallment": 1000,
            "totalAmount": 48000,
            "amount": 5000000,
            "maturity": 48,
            "loanRateText": "2.5% monthly",
            "name": "Home Plus"
        }));

        let offers = OfferNormalizer::default().normalize(&[raw], LoanTypeCode::Housing);
        let offer = &offers[0];

        assert_eq!(offer.id, "1");
        assert_eq!(offer.bank_name, "A Bank");
        assert_eq!(offer.loan_type, LoanTypeCode::Housing);
        assert_eq!(offer.interest_rate_percent, Decimal::new(25, 1));
        assert_eq!(offer.monthly_payment, Decimal::from(1000));
        assert_eq!(offer.total_payment, Decimal::from(48_000));
        assert_eq!(offer.min_amount, Decimal::from(5_000_000));
        assert_eq!(offer.max_amount, Decimal::from(5_000_000));
        assert_eq!(offer.max_term_months, 48);
        assert_eq!(offer.eligibility_note, "2.5% monthly");
    }

    #[test]
    fn empty_record_is_kept_with_defaults() {
        let raws = vec![RawProviderOffer::from(json!({})), RawProviderOffer::from(json!(null))];

        let offers = OfferNormalizer::default().normalize(&raws, LoanTypeCode::Consumer);

        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].id, "loan-0");
        assert_eq!(offers[1].id, "loan-1");
        assert_eq!(offers[1].bank_name, "Unknown Bank");
        assert_eq!(offers[1].interest_rate_percent, Decimal::ZERO);
        assert_eq!(offers[1].max_term_months, 0);
        assert!(offers[1].eligibility_note.contains("Contact the bank"));
    }

    #[test]
    fn note_falls_back_to_product_name() {
        let raw = RawProviderOffer::from(json!({ "loanRateText": "", "name": "Auto Flex" }));

        let offers = OfferNormalizer::default().normalize(&[raw], LoanTypeCode::Vehicle);

        assert_eq!(offers[0].eligibility_note, "Auto Flex");
    }

    #[test]
    fn payload_without_products_decodes_to_nothing() {
        assert_eq!(RawProviderOffer::decode_payload(r#"{"products": []}"#), Ok(Vec::new()));
        assert_eq!(RawProviderOffer::decode_payload(r#"{"status": "ok"}"#), Ok(Vec::new()));
        assert_eq!(
            RawProviderOffer::decode_payload(r#"{"products": {"id": 1}}"#),
            Ok(Vec::new())
        );
    }

    #[test]
    fn non_json_payload_is_a_transport_failure() {
        let error = RawProviderOffer::decode_payload("<html>gateway error</html>")
            .expect_err("html is not json");
        assert!(matches!(error, TransportFailure::InvalidPayload(_)));
    }

    #[test]
    fn decimals_accept_numbers_and_numeric_strings() {
        assert_eq!(decimal_from_json(&json!(1.9)), Some(Decimal::new(19, 1)));
        assert_eq!(decimal_from_json(&json!(" 48 ")), Some(Decimal::from(48)));
        assert_eq!(decimal_from_json(&json!("1e3")), Some(Decimal::from(1000)));
        assert_eq!(decimal_from_json(&json!("n/a")), None);
        assert_eq!(decimal_from_json(&json!(true)), None);
    }
}

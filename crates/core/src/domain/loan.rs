use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The three loan categories a provider endpoint exists for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanTypeCode {
    Consumer,
    Housing,
    Vehicle,
}

/// Every word the completion service may use for a loan type, mapped to its
/// variant. Lookup is case-insensitive; anything absent here is unmapped.
pub const LOAN_TYPE_VOCABULARY: &[(&str, LoanTypeCode)] = &[
    ("consumer", LoanTypeCode::Consumer),
    ("ihtiyac", LoanTypeCode::Consumer),
    ("ihtiyaç", LoanTypeCode::Consumer),
    ("personal", LoanTypeCode::Consumer),
    ("general", LoanTypeCode::Consumer),
    ("general-purpose", LoanTypeCode::Consumer),
    ("cash", LoanTypeCode::Consumer),
    ("housing", LoanTypeCode::Housing),
    ("konut", LoanTypeCode::Housing),
    ("mortgage", LoanTypeCode::Housing),
    ("home", LoanTypeCode::Housing),
    ("house", LoanTypeCode::Housing),
    ("vehicle", LoanTypeCode::Vehicle),
    ("tasit", LoanTypeCode::Vehicle),
    ("taşıt", LoanTypeCode::Vehicle),
    ("car", LoanTypeCode::Vehicle),
    ("auto", LoanTypeCode::Vehicle),
    ("araç", LoanTypeCode::Vehicle),
];

impl LoanTypeCode {
    pub const ALL: [LoanTypeCode; 3] = [Self::Consumer, Self::Housing, Self::Vehicle];

    pub fn code(self) -> &'static str {
        match self {
            Self::Consumer => "consumer",
            Self::Housing => "housing",
            Self::Vehicle => "vehicle",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Consumer => "Consumer Loan",
            Self::Housing => "Housing Loan",
            Self::Vehicle => "Vehicle Loan",
        }
    }

    pub fn from_vocabulary(word: &str) -> Option<Self> {
        let needle = word.trim().to_lowercase();
        LOAN_TYPE_VOCABULARY
            .iter()
            .find(|(candidate, _)| *candidate == needle)
            .map(|(_, loan_type)| *loan_type)
    }

    /// Vocabulary words for this type, canonical code first.
    pub fn synonyms(self) -> impl Iterator<Item = &'static str> {
        LOAN_TYPE_VOCABULARY
            .iter()
            .filter(move |(_, loan_type)| *loan_type == self)
            .map(|(word, _)| *word)
    }
}

impl fmt::Display for LoanTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Validated, typed form of a free-text loan request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLoanQuery {
    #[serde(rename = "type")]
    pub loan_type: LoanTypeCode,
    pub amount: Decimal,
    pub term_months: u32,
    pub inventory_description: String,
    pub inventory_value: Decimal,
    pub cash_on_hand: Decimal,
}

impl ParsedLoanQuery {
    /// Pulls the asset value out of descriptions shaped like `"konut - 2000000"`.
    ///
    /// The last numeric token wins; thousands separators (`.`/`,` followed by
    /// exactly three digits) are tolerated. Returns zero when no number is
    /// present.
    pub fn inventory_value_from(description: &str) -> Decimal {
        description
            .split(|ch: char| ch.is_whitespace() || ch == '-' || ch == ':' || ch == '=')
            .rev()
            .find_map(parse_grouped_number)
            .unwrap_or(Decimal::ZERO)
    }
}

fn parse_grouped_number(token: &str) -> Option<Decimal> {
    let token = token.trim_matches(|ch: char| !ch.is_ascii_digit());
    if token.is_empty() {
        return None;
    }

    let grouped = token
        .split(['.', ','])
        .skip(1)
        .all(|group| group.len() == 3 && group.chars().all(|ch| ch.is_ascii_digit()));
    let cleaned: String = if grouped {
        token.chars().filter(char::is_ascii_digit).collect()
    } else {
        token.replace(',', ".")
    };

    cleaned.parse::<Decimal>().ok()
}

/// Canonical offer shape every provider record is normalized into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanOffer {
    pub id: String,
    pub bank_name: String,
    #[serde(rename = "type")]
    pub loan_type: LoanTypeCode,
    pub interest_rate_percent: Decimal,
    pub monthly_payment: Decimal,
    pub total_payment: Decimal,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub max_term_months: u32,
    pub eligibility_note: String,
}

use crate::domain::loan::LoanOffer;

/// Orders offers by ascending interest rate. The sort is stable, so offers
/// with equal rates keep the provider's order.
pub fn rank_offers(mut offers: Vec<LoanOffer>) -> Vec<LoanOffer> {
    offers.sort_by_key(|offer| offer.interest_rate_percent);
    offers
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::loan::{LoanOffer, LoanTypeCode};

    use super::rank_offers;

    fn offer(id: &str, bank_name: &str, rate: Decimal) -> LoanOffer {
        LoanOffer {
            id: id.to_string(),
            bank_name: bank_name.to_string(),
            loan_type: LoanTypeCode::Housing,
            interest_rate_percent: rate,
            monthly_payment: Decimal::from(1000),
            total_payment: Decimal::from(48_000),
            min_amount: Decimal::from(5_000_000),
            max_amount: Decimal::from(5_000_000),
            max_term_months: 48,
            eligibility_note: String::new(),
        }
    }

    #[test]
    fn lowest_rate_comes_first() {
        let ranked = rank_offers(vec![
            offer("1", "A Bank", Decimal::new(25, 1)),
            offer("2", "B Bank", Decimal::new(19, 1)),
        ]);

        let banks: Vec<&str> = ranked.iter().map(|offer| offer.bank_name.as_str()).collect();
        assert_eq!(banks, vec!["B Bank", "A Bank"]);
    }

    #[test]
    fn equal_rates_keep_provider_order() {
        let ranked = rank_offers(vec![
            offer("c", "C Bank", Decimal::new(300, 2)),
            offer("a", "A Bank", Decimal::new(3, 0)),
            offer("z", "Z Bank", Decimal::new(12, 1)),
            offer("b", "B Bank", Decimal::new(30, 1)),
        ]);

        let ids: Vec<&str> = ranked.iter().map(|offer| offer.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "c", "a", "b"]);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(rank_offers(Vec::new()).is_empty());
    }
}

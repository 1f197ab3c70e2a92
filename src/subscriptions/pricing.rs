use crate::config::TierRates;
use rust_decimal::{Decimal, RoundingStrategy};

impl TierRates {
    /// Configured monthly rate for a tier. Unknown tiers price at zero here;
    /// rejecting them is the caller's concern.
    pub fn monthly_rate(&self, tier: &str) -> Decimal {
        match tier {
            "basic" => self.basic,
            "pro" => self.pro,
            "research" => self.research,
            _ => Decimal::ZERO,
        }
    }

    /// Total for a subscription: monthly rate x months, rounded to cents.
    pub fn total(&self, tier: &str, months: i32) -> Decimal {
        (self.monthly_rate(tier) * Decimal::from(months))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod pricing_tests {
    use super::*;

    #[test]
    fn basic_three_months() {
        let rates = TierRates::default();
        assert_eq!(rates.total("basic", 3), Decimal::new(3000, 2));
    }

    #[test]
    fn research_one_month() {
        let rates = TierRates::default();
        assert_eq!(rates.total("research", 1), Decimal::new(20000, 2));
    }

    #[test]
    fn unknown_tier_prices_at_zero() {
        let rates = TierRates::default();
        assert_eq!(rates.monthly_rate("platinum"), Decimal::ZERO);
        assert_eq!(rates.total("platinum", 12), Decimal::ZERO);
    }

    #[test]
    fn total_scales_linearly_with_months() {
        let rates = TierRates::default();
        for months in 1..=24 {
            assert_eq!(
                rates.total("pro", months),
                rates.monthly_rate("pro") * Decimal::from(months)
            );
        }
    }

    #[test]
    fn rounds_half_up_to_cents() {
        let rates = TierRates {
            basic: "3.335".parse().expect("decimal"),
            ..TierRates::default()
        };
        // 3.335 x 1 = 3.335 -> 3.34 under midpoint-away-from-zero
        assert_eq!(rates.total("basic", 1), Decimal::new(334, 2));
    }
}

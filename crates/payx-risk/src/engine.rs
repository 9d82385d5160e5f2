use payx_schemas::enums::RiskDecision;

use crate::types::{RiskContext, RiskRule};

const MAX_SCORE: i32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct RiskEngine {
    pub review_threshold: i32,
    pub block_threshold: i32,
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self {
            review_threshold: 50,
            block_threshold: 80,
        }
    }
}

impl RiskEngine {
    pub fn new(review_threshold: i32, block_threshold: i32) -> Self {
        Self {
            review_threshold,
            block_threshold,
        }
    }

    pub fn evaluate(&self, context: &RiskContext) -> (i32, RiskDecision) {
        let score = evaluate(context);
        (score, self.decision_from_score(score))
    }

    fn decision_from_score(&self, score: i32) -> RiskDecision {
        if score >= self.block_threshold {
            RiskDecision::Block
        } else if score >= self.review_threshold {
            RiskDecision::Review
        } else {
            RiskDecision::Allow
        }
    }
}

/// Sum of all rule scores, clamped to 100.
pub fn evaluate(context: &RiskContext) -> i32 {
    RiskRule::ALL
        .iter()
        .map(|rule| rule.score(context))
        .sum::<i32>()
        .min(MAX_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use payx_schemas::enums::KycLevel;
    use rust_decimal_macros::dec;

    fn quiet_context() -> RiskContext {
        RiskContext {
            amount: dec!(10.00),
            policy_max: dec!(1000.00),
            velocity_count: 1,
            velocity_limit: 100,
            repeated_failures: 0,
            is_new_customer: false,
            customer_kyc: KycLevel::Full,
            destination_seen: true,
        }
    }

    #[test]
    fn quiet_context_scores_zero_and_allows() {
        let engine = RiskEngine::default();
        let (score, decision) = engine.evaluate(&quiet_context());
        assert_eq!(score, 0);
        assert_eq!(decision, RiskDecision::Allow);
    }

    #[test]
    fn amount_near_max_scores_25_at_the_boundary() {
        let mut ctx = quiet_context();
        ctx.amount = dec!(900.00); // exactly 0.9 * max
        assert_eq!(RiskRule::AmountNearMax.score(&ctx), 25);
        ctx.amount = dec!(899.99);
        assert_eq!(RiskRule::AmountNearMax.score(&ctx), 0);
    }

    #[test]
    fn velocity_spike_fires_at_80_percent() {
        let mut ctx = quiet_context();
        ctx.velocity_limit = 10;
        ctx.velocity_count = 8;
        assert_eq!(RiskRule::VelocitySpike.score(&ctx), 20);
        ctx.velocity_count = 7;
        assert_eq!(RiskRule::VelocitySpike.score(&ctx), 0);
    }

    #[test]
    fn velocity_spike_ignores_nonpositive_limits() {
        let mut ctx = quiet_context();
        ctx.velocity_limit = 0;
        ctx.velocity_count = 1_000;
        assert_eq!(RiskRule::VelocitySpike.score(&ctx), 0);
    }

    #[test]
    fn repeated_failures_tiers() {
        let mut ctx = quiet_context();
        ctx.repeated_failures = 0;
        assert_eq!(RiskRule::RepeatedFailures.score(&ctx), 0);
        ctx.repeated_failures = 1;
        assert_eq!(RiskRule::RepeatedFailures.score(&ctx), 10);
        ctx.repeated_failures = 2;
        assert_eq!(RiskRule::RepeatedFailures.score(&ctx), 10);
        ctx.repeated_failures = 3;
        assert_eq!(RiskRule::RepeatedFailures.score(&ctx), 25);
    }

    #[test]
    fn new_customer_needs_low_kyc_to_score() {
        let mut ctx = quiet_context();
        ctx.is_new_customer = true;
        ctx.customer_kyc = KycLevel::Full;
        assert_eq!(RiskRule::NewCustomerLowKyc.score(&ctx), 0);
        ctx.customer_kyc = KycLevel::Basic;
        assert_eq!(RiskRule::NewCustomerLowKyc.score(&ctx), 20);
        ctx.customer_kyc = KycLevel::None;
        assert_eq!(RiskRule::NewCustomerLowKyc.score(&ctx), 20);
        ctx.is_new_customer = false;
        assert_eq!(RiskRule::NewCustomerLowKyc.score(&ctx), 0);
    }

    #[test]
    fn unseen_destination_scores_15() {
        let mut ctx = quiet_context();
        ctx.destination_seen = false;
        assert_eq!(RiskRule::NewDestination.score(&ctx), 15);
    }

    #[test]
    fn total_is_clamped_at_100() {
        // All five rules at maximum: 25 + 20 + 25 + 20 + 15 = 105.
        let ctx = RiskContext {
            amount: dec!(1000.00),
            policy_max: dec!(1000.00),
            velocity_count: 10,
            velocity_limit: 10,
            repeated_failures: 5,
            is_new_customer: true,
            customer_kyc: KycLevel::None,
            destination_seen: false,
        };
        assert_eq!(evaluate(&ctx), 100);
        let (score, decision) = RiskEngine::default().evaluate(&ctx);
        assert_eq!(score, 100);
        assert_eq!(decision, RiskDecision::Block);
    }

    #[test]
    fn thresholds_partition_the_score_space() {
        let engine = RiskEngine::new(50, 80);
        // 25 (near max) + 20 (velocity) + 10 (one failure) = 55 → REVIEW.
        let ctx = RiskContext {
            amount: dec!(950.00),
            policy_max: dec!(1000.00),
            velocity_count: 8,
            velocity_limit: 10,
            repeated_failures: 1,
            is_new_customer: false,
            customer_kyc: KycLevel::Full,
            destination_seen: true,
        };
        let (score, decision) = engine.evaluate(&ctx);
        assert_eq!(score, 55);
        assert_eq!(decision, RiskDecision::Review);

        // Add new-customer-low-kyc (20) → 75, still REVIEW; one more
        // failure tier pushes to 90 → BLOCK.
        let mut blocked = ctx.clone();
        blocked.is_new_customer = true;
        blocked.customer_kyc = KycLevel::Basic;
        blocked.repeated_failures = 3;
        let (score, decision) = engine.evaluate(&blocked);
        assert_eq!(score, 90);
        assert_eq!(decision, RiskDecision::Block);
    }
}

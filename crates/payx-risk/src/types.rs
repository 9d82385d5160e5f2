use rust_decimal::Decimal;

use payx_schemas::enums::KycLevel;

/// Everything the rules look at, assembled by the coordinator before
/// evaluation. No rule performs I/O.
#[derive(Debug, Clone)]
pub struct RiskContext {
    pub amount: Decimal,
    pub policy_max: Decimal,
    /// Projected velocity (count including this payment) from the limits
    /// check.
    pub velocity_count: i64,
    pub velocity_limit: i64,
    /// FAILED payments for this customer in the last 24h.
    pub repeated_failures: i64,
    /// Created within the last 7 days; missing created_at counts as new.
    pub is_new_customer: bool,
    pub customer_kyc: KycLevel,
    /// This destination was seen before for this customer.
    pub destination_seen: bool,
}

/// The fixed rule set. Iteration order is `ALL`, which is part of the
/// contract: scores are additive so order does not change the total, but
/// logs and tests rely on a stable sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskRule {
    AmountNearMax,
    VelocitySpike,
    RepeatedFailures,
    NewCustomerLowKyc,
    NewDestination,
}

impl RiskRule {
    pub const ALL: [RiskRule; 5] = [
        RiskRule::AmountNearMax,
        RiskRule::VelocitySpike,
        RiskRule::RepeatedFailures,
        RiskRule::NewCustomerLowKyc,
        RiskRule::NewDestination,
    ];

    pub fn score(&self, context: &RiskContext) -> i32 {
        match self {
            RiskRule::AmountNearMax => {
                let threshold = context.policy_max * Decimal::new(9, 1);
                if context.amount >= threshold {
                    25
                } else {
                    0
                }
            }
            RiskRule::VelocitySpike => {
                if context.velocity_limit <= 0 {
                    return 0;
                }
                // ratio >= 0.8 without leaving integer arithmetic.
                if context.velocity_count * 10 >= context.velocity_limit * 8 {
                    20
                } else {
                    0
                }
            }
            RiskRule::RepeatedFailures => {
                if context.repeated_failures >= 3 {
                    25
                } else if context.repeated_failures >= 1 {
                    10
                } else {
                    0
                }
            }
            RiskRule::NewCustomerLowKyc => {
                if context.is_new_customer
                    && matches!(context.customer_kyc, KycLevel::None | KycLevel::Basic)
                {
                    20
                } else {
                    0
                }
            }
            RiskRule::NewDestination => {
                if context.destination_seen {
                    0
                } else {
                    15
                }
            }
        }
    }
}

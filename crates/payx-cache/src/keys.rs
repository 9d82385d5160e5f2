//! Cache key builders. Key shapes are part of the operational contract
//! (dashboards and runbooks grep for them), so they live in one place.

use payx_schemas::enums::{PaymentMethod, RateLimitDimension};

/// Upper bound on retained AML history entries per customer. Reads use
/// `LRANGE 0..=AML_HISTORY_MAX_ITEMS` and trims use the same bound, so the
/// list holds at most N+1 entries; the window filters decide what counts.
pub const AML_HISTORY_MAX_ITEMS: i64 = 500;

pub fn idempotency_scoped_key(merchant_id: &str, idempotency_key: &str) -> String {
    format!("{merchant_id}:{idempotency_key}")
}

pub fn limits_policy_key(rail: PaymentMethod) -> String {
    format!("limits:policy:{}", rail.as_str())
}

pub fn limits_daily_key(date_key: &str, customer_id: &str, rail: PaymentMethod) -> String {
    format!("limits:daily:{date_key}:{customer_id}:{}", rail.as_str())
}

pub fn limits_velocity_key(customer_id: &str, rail: PaymentMethod) -> String {
    format!("limits:velocity:{customer_id}:{}", rail.as_str())
}

pub fn rate_limit_key(dimension: RateLimitDimension, value: &str, bucket: i64) -> String {
    format!("rate:{}:{value}:{bucket}", dimension.as_str())
}

pub fn aml_history_key(customer_id: &str) -> String {
    format!("aml:history:{customer_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(idempotency_scoped_key("m-1", "idem-1"), "m-1:idem-1");
        assert_eq!(limits_policy_key(PaymentMethod::PIX), "limits:policy:PIX");
        assert_eq!(
            limits_daily_key("20260801", "c-1", PaymentMethod::TED),
            "limits:daily:20260801:c-1:TED"
        );
        assert_eq!(
            limits_velocity_key("c-1", PaymentMethod::CARD),
            "limits:velocity:c-1:CARD"
        );
        assert_eq!(
            rate_limit_key(RateLimitDimension::Merchant, "m-1", 42),
            "rate:merchant:m-1:42"
        );
        assert_eq!(aml_history_key("c-1"), "aml:history:c-1");
    }
}

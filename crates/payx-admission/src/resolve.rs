use payx_schemas::enums::{AmlDecision, PaymentStatus, RiskDecision};

/// BLOCK dominates REVIEW dominates ALLOW, independent of which engine said
/// what.
pub fn resolve_status(risk: RiskDecision, aml: AmlDecision) -> PaymentStatus {
    if risk == RiskDecision::Block || aml == AmlDecision::Block {
        return PaymentStatus::Blocked;
    }
    if risk == RiskDecision::Review || aml == AmlDecision::Review {
        return PaymentStatus::InReview;
    }
    PaymentStatus::Received
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominance_over_the_full_product() {
        let risks = [RiskDecision::Allow, RiskDecision::Review, RiskDecision::Block];
        let amls = [AmlDecision::Allow, AmlDecision::Review, AmlDecision::Block];
        for risk in risks {
            for aml in amls {
                let status = resolve_status(risk, aml);
                let any_block = risk == RiskDecision::Block || aml == AmlDecision::Block;
                let any_review = risk == RiskDecision::Review || aml == AmlDecision::Review;
                if any_block {
                    assert_eq!(status, PaymentStatus::Blocked, "{risk:?}/{aml:?}");
                } else if any_review {
                    assert_eq!(status, PaymentStatus::InReview, "{risk:?}/{aml:?}");
                } else {
                    assert_eq!(status, PaymentStatus::Received, "{risk:?}/{aml:?}");
                }
            }
        }
    }
}

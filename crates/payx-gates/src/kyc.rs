use payx_schemas::enums::{CustomerStatus, PaymentMethod};
use payx_schemas::rails::{kyc_rank, minimum_kyc_level_for};
use payx_schemas::{AdmissionError, Customer};

/// Suspended customers are always denied; otherwise the customer's KYC tier
/// must reach the rail's minimum.
pub fn enforce_kyc(customer: &Customer, rail: PaymentMethod) -> Result<(), AdmissionError> {
    if customer.status != CustomerStatus::Active {
        return Err(AdmissionError::KycDenied("Customer is suspended".to_string()));
    }
    let required = minimum_kyc_level_for(rail);
    if kyc_rank(customer.kyc_level) < kyc_rank(required) {
        return Err(AdmissionError::KycDenied(format!(
            "Customer KYC level {} is below required {}",
            customer.kyc_level.as_str(),
            required.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use payx_schemas::enums::{ErrorCategory, KycLevel};

    fn customer(kyc_level: KycLevel, status: CustomerStatus) -> Customer {
        Customer {
            customer_id: "customer-basic-001".to_string(),
            kyc_level,
            status,
            created_at: None,
        }
    }

    #[test]
    fn basic_customer_is_denied_on_ted() {
        let err = enforce_kyc(
            &customer(KycLevel::Basic, CustomerStatus::Active),
            PaymentMethod::TED,
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::KycDenied);
        assert!(err.to_string().contains("BASIC"));
        assert!(err.to_string().contains("FULL"));
    }

    #[test]
    fn basic_customer_passes_on_pix_boleto_card() {
        for rail in [PaymentMethod::PIX, PaymentMethod::BOLETO, PaymentMethod::CARD] {
            assert!(enforce_kyc(&customer(KycLevel::Basic, CustomerStatus::Active), rail).is_ok());
        }
    }

    #[test]
    fn full_customer_passes_everywhere() {
        for rail in PaymentMethod::ALL {
            assert!(enforce_kyc(&customer(KycLevel::Full, CustomerStatus::Active), rail).is_ok());
        }
    }

    #[test]
    fn none_customer_is_denied_everywhere() {
        for rail in PaymentMethod::ALL {
            assert!(enforce_kyc(&customer(KycLevel::None, CustomerStatus::Active), rail).is_err());
        }
    }

    #[test]
    fn suspended_customer_is_denied_regardless_of_kyc() {
        let err = enforce_kyc(
            &customer(KycLevel::Full, CustomerStatus::Suspended),
            PaymentMethod::PIX,
        )
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::KycDenied);
        assert!(err.to_string().contains("suspended"));
    }
}

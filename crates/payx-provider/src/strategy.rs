use payx_schemas::enums::PaymentMethod;
use payx_schemas::rails;

/// Where to send a confirm call for one rail.
#[derive(Debug, Clone)]
pub struct ProviderStrategy {
    pub provider_name: &'static str,
    pub path: String,
}

/// Total over the method enum; there is no open registration.
pub fn strategy_for(method: PaymentMethod) -> ProviderStrategy {
    ProviderStrategy {
        provider_name: rails::provider_name_for(method),
        path: rails::provider_confirm_path(method),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_method_resolves_to_a_strategy() {
        for method in PaymentMethod::ALL {
            let strategy = strategy_for(method);
            assert!(strategy.path.starts_with("/providers/"));
            assert!(strategy.path.ends_with("/confirm"));
            assert!(strategy.provider_name.ends_with("-provider"));
        }
    }

    #[test]
    fn pix_goes_to_the_pix_provider() {
        let strategy = strategy_for(PaymentMethod::PIX);
        assert_eq!(strategy.provider_name, "pix-provider");
        assert_eq!(strategy.path, "/providers/pix/confirm");
    }
}

//! Static rail profile table: one row per payment method, total over the
//! enum. No open registration; adding a rail is a code change here.

use crate::enums::{KycLevel, PaymentMethod};

#[derive(Debug, Clone, Copy)]
pub struct RailProfile {
    pub method: PaymentMethod,
    pub provider_slug: &'static str,
    pub provider_name: &'static str,
    pub minimum_kyc_level: KycLevel,
}

const RAIL_PROFILES: [RailProfile; 4] = [
    RailProfile {
        method: PaymentMethod::PIX,
        provider_slug: "pix",
        provider_name: "pix-provider",
        minimum_kyc_level: KycLevel::Basic,
    },
    RailProfile {
        method: PaymentMethod::BOLETO,
        provider_slug: "boleto",
        provider_name: "boleto-provider",
        minimum_kyc_level: KycLevel::Basic,
    },
    RailProfile {
        method: PaymentMethod::TED,
        provider_slug: "ted",
        provider_name: "ted-provider",
        minimum_kyc_level: KycLevel::Full,
    },
    RailProfile {
        method: PaymentMethod::CARD,
        provider_slug: "card",
        provider_name: "card-provider",
        minimum_kyc_level: KycLevel::Basic,
    },
];

pub fn rail_profile(method: PaymentMethod) -> &'static RailProfile {
    match method {
        PaymentMethod::PIX => &RAIL_PROFILES[0],
        PaymentMethod::BOLETO => &RAIL_PROFILES[1],
        PaymentMethod::TED => &RAIL_PROFILES[2],
        PaymentMethod::CARD => &RAIL_PROFILES[3],
    }
}

pub fn provider_name_for(method: PaymentMethod) -> &'static str {
    rail_profile(method).provider_name
}

pub fn provider_confirm_path(method: PaymentMethod) -> String {
    format!("/providers/{}/confirm", rail_profile(method).provider_slug)
}

pub fn minimum_kyc_level_for(method: PaymentMethod) -> KycLevel {
    rail_profile(method).minimum_kyc_level
}

/// NONE < BASIC < FULL.
pub fn kyc_rank(level: KycLevel) -> u8 {
    match level {
        KycLevel::None => 0,
        KycLevel::Basic => 1,
        KycLevel::Full => 2,
    }
}

pub fn supported_provider_names() -> [&'static str; 4] {
    [
        RAIL_PROFILES[0].provider_name,
        RAIL_PROFILES[1].provider_name,
        RAIL_PROFILES[2].provider_name,
        RAIL_PROFILES[3].provider_name,
    ]
}

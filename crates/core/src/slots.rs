use std::str::FromStr;

use rust_decimal::Decimal;

use crate::entities::currency_code;
use crate::models::{
    BalanceQuery, DispatchRequest, EntityKey, EntitySet, FxRequest, IntentName, NewBeneficiary,
    PayoutRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredSlot {
    pub key: EntityKey,
    pub label: &'static str,
}

const fn slot(key: EntityKey, label: &'static str) -> RequiredSlot {
    RequiredSlot { key, label }
}

const BENEFICIARY_SLOTS: &[RequiredSlot] = &[
    slot(EntityKey::BeneficiaryName, "name"),
    slot(EntityKey::Email, "email"),
    slot(EntityKey::Country, "country"),
];

const PAYOUT_SLOTS: &[RequiredSlot] = &[
    slot(EntityKey::Amount, "amount"),
    slot(EntityKey::Currency, "currency"),
    slot(EntityKey::BeneficiaryId, "beneficiary ID"),
];

const FX_SLOTS: &[RequiredSlot] = &[
    slot(EntityKey::Currency, "source currency"),
    slot(EntityKey::ToCurrency, "target currency"),
    slot(EntityKey::Amount, "amount"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotResolution {
    Ready(DispatchRequest),
    Missing(Vec<RequiredSlot>),
    NotActionable,
}

pub fn required_slots(intent: IntentName) -> &'static [RequiredSlot] {
    match intent {
        IntentName::CreateBeneficiary => BENEFICIARY_SLOTS,
        IntentName::CreatePayout => PAYOUT_SLOTS,
        IntentName::CheckFx => FX_SLOTS,
        IntentName::CheckBalance | IntentName::Help | IntentName::Unknown => &[],
    }
}

/// Required slots still unfilled, in table order. An amount that does not
/// parse to a positive number counts as unfilled.
pub fn missing_slots(intent: IntentName, entities: &EntitySet) -> Vec<RequiredSlot> {
    required_slots(intent)
        .iter()
        .filter(|required| !slot_filled(required.key, entities))
        .copied()
        .collect()
}

pub fn missing_labels(intent: IntentName, entities: &EntitySet) -> Vec<&'static str> {
    missing_slots(intent, entities)
        .into_iter()
        .map(|missing| missing.label)
        .collect()
}

pub fn resolve_request(intent: IntentName, entities: &EntitySet) -> SlotResolution {
    let missing = missing_slots(intent, entities);
    if !missing.is_empty() {
        return SlotResolution::Missing(missing);
    }

    build_request(intent, entities).map_or(SlotResolution::NotActionable, SlotResolution::Ready)
}

/// Largest amount a single turn may carry: one quadrillion.
const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim().replace(',', "").as_str())
        .ok()
        .filter(|amount| *amount > Decimal::ZERO && *amount <= MAX_AMOUNT)
}

fn slot_filled(key: EntityKey, entities: &EntitySet) -> bool {
    match key {
        EntityKey::Amount => entities.get(key).and_then(parse_amount).is_some(),
        _ => text(entities, key).is_some(),
    }
}

fn build_request(intent: IntentName, entities: &EntitySet) -> Option<DispatchRequest> {
    let request = match intent {
        IntentName::CheckBalance => DispatchRequest::Balance(BalanceQuery {
            currency: currency(entities, EntityKey::Currency),
        }),
        IntentName::CreateBeneficiary => DispatchRequest::Beneficiary(NewBeneficiary {
            name: text(entities, EntityKey::BeneficiaryName)?,
            email: text(entities, EntityKey::Email)?,
            country: text(entities, EntityKey::Country)?,
        }),
        IntentName::CreatePayout => DispatchRequest::Payout(PayoutRequest {
            beneficiary_id: text(entities, EntityKey::BeneficiaryId)?,
            amount: entities.get(EntityKey::Amount).and_then(parse_amount)?,
            currency: currency(entities, EntityKey::Currency)?,
        }),
        IntentName::CheckFx => DispatchRequest::Fx(FxRequest {
            from_currency: currency(entities, EntityKey::Currency)?,
            to_currency: currency(entities, EntityKey::ToCurrency)?,
            amount: entities.get(EntityKey::Amount).and_then(parse_amount)?,
        }),
        IntentName::Help | IntentName::Unknown => return None,
    };
    Some(request)
}

fn text(entities: &EntitySet, key: EntityKey) -> Option<String> {
    entities
        .get(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn currency(entities: &EntitySet, key: EntityKey) -> Option<String> {
    text(entities, key).map(|value| {
        currency_code(&value)
            .map(ToString::to_string)
            .unwrap_or_else(|| value.to_uppercase())
    })
}

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentName {
    CheckBalance,
    CreateBeneficiary,
    CreatePayout,
    CheckFx,
    Help,
    #[default]
    Unknown,
}

impl IntentName {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "check_balance" | "balance" => Some(Self::CheckBalance),
            "create_beneficiary" | "beneficiary" => Some(Self::CreateBeneficiary),
            "create_payout" | "payout" => Some(Self::CreatePayout),
            "check_fx" | "get_fx_rate" | "fx" => Some(Self::CheckFx),
            "help" => Some(Self::Help),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CheckBalance => "check_balance",
            Self::CreateBeneficiary => "create_beneficiary",
            Self::CreatePayout => "create_payout",
            Self::CheckFx => "check_fx",
            Self::Help => "help",
            Self::Unknown => "unknown",
        }
    }

    /// Intents that end in a call to the payment provider.
    pub fn is_actionable(self) -> bool {
        !matches!(self, Self::Help | Self::Unknown)
    }
}

impl fmt::Display for IntentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub name: IntentName,
    pub confidence: f64,
    pub entities: EntitySet,
}

impl Intent {
    pub fn unknown() -> Self {
        Self {
            name: IntentName::Unknown,
            confidence: 0.0,
            entities: EntitySet::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKey {
    Currency,
    ToCurrency,
    Amount,
    Email,
    Country,
    BeneficiaryId,
    BeneficiaryName,
}

impl EntityKey {
    pub const ALL: [EntityKey; 7] = [
        EntityKey::Currency,
        EntityKey::ToCurrency,
        EntityKey::Amount,
        EntityKey::Email,
        EntityKey::Country,
        EntityKey::BeneficiaryId,
        EntityKey::BeneficiaryName,
    ];

    /// `from_currency` is the same slot as `currency`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "currency" | "from_currency" => Some(Self::Currency),
            "to_currency" => Some(Self::ToCurrency),
            "amount" => Some(Self::Amount),
            "email" => Some(Self::Email),
            "country" => Some(Self::Country),
            "beneficiary_id" => Some(Self::BeneficiaryId),
            "beneficiary_name" | "name" => Some(Self::BeneficiaryName),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Currency => "currency",
            Self::ToCurrency => "to_currency",
            Self::Amount => "amount",
            Self::Email => "email",
            Self::Country => "country",
            Self::BeneficiaryId => "beneficiary_id",
            Self::BeneficiaryName => "beneficiary_name",
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entities pulled out of one or more turns. Every field is optional; the
/// slot policy decides which ones an intent needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    #[serde(default, alias = "from_currency", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_name: Option<String>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: EntityKey) -> Option<&str> {
        self.slot(key).as_deref()
    }

    pub fn set(&mut self, key: EntityKey, value: impl Into<String>) {
        *self.slot_mut(key) = Some(value.into());
    }

    pub fn with(mut self, key: EntityKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: EntityKey) -> Option<String> {
        self.slot_mut(key).take()
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.slot(key).is_some()
    }

    pub fn from_currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &str)> + '_ {
        EntityKey::ALL
            .iter()
            .filter_map(move |key| self.get(*key).map(|value| (*key, value)))
    }

    /// Values in `self` win; keys only present in `base` are carried forward.
    pub fn merged_over(&self, base: &EntitySet) -> EntitySet {
        let mut merged = base.clone();
        for (key, value) in self.iter() {
            merged.set(key, value);
        }
        merged
    }

    fn slot(&self, key: EntityKey) -> &Option<String> {
        match key {
            EntityKey::Currency => &self.currency,
            EntityKey::ToCurrency => &self.to_currency,
            EntityKey::Amount => &self.amount,
            EntityKey::Email => &self.email,
            EntityKey::Country => &self.country,
            EntityKey::BeneficiaryId => &self.beneficiary_id,
            EntityKey::BeneficiaryName => &self.beneficiary_name,
        }
    }

    fn slot_mut(&mut self, key: EntityKey) -> &mut Option<String> {
        match key {
            EntityKey::Currency => &mut self.currency,
            EntityKey::ToCurrency => &mut self.to_currency,
            EntityKey::Amount => &mut self.amount,
            EntityKey::Email => &mut self.email,
            EntityKey::Country => &mut self.country,
            EntityKey::BeneficiaryId => &mut self.beneficiary_id,
            EntityKey::BeneficiaryName => &mut self.beneficiary_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetBalance,
    CreateBeneficiary,
    CreatePayout,
    GetExchangeRate,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetBalance => "balance lookup",
            Self::CreateBeneficiary => "beneficiary creation",
            Self::CreatePayout => "payout creation",
            Self::GetExchangeRate => "exchange rate lookup",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceQuery {
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBeneficiary {
    pub name: String,
    pub email: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub beneficiary_id: String,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: Decimal,
}

/// A fully resolved call, ready for the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum DispatchRequest {
    Balance(BalanceQuery),
    Beneficiary(NewBeneficiary),
    Payout(PayoutRequest),
    Fx(FxRequest),
}

impl DispatchRequest {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Balance(_) => Operation::GetBalance,
            Self::Beneficiary(_) => Operation::CreateBeneficiary,
            Self::Payout(_) => Operation::CreatePayout,
            Self::Fx(_) => Operation::GetExchangeRate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryReceipt {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxQuote {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub amount: Decimal,
    pub converted_amount: Decimal,
}

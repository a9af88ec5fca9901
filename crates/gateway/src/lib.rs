mod http;
mod memory;

use payagent_core::{
    Balance, BalanceQuery, BeneficiaryReceipt, FxQuote, FxRequest, NewBeneficiary, PayoutReceipt,
    PayoutRequest,
};
use thiserror::Error;

pub use http::{HttpGateway, HttpGatewayConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
pub use memory::{GatewayCall, MemoryGateway};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway configuration invalid: {0}")]
    Configuration(String),
    #[error("request to payment provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment provider rejected the credentials (status {status}): {body}")]
    Unauthorized { status: u16, body: String },
    #[error("payment provider returned status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected payment provider response: {0}")]
    Decode(String),
    #[error("{0}")]
    Simulated(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}

/// The payment provider as seen by the agent.
pub trait PaymentGateway: Send + Sync {
    async fn get_balance(&self, query: &BalanceQuery) -> Result<Vec<Balance>, GatewayError>;
    async fn create_beneficiary(
        &self,
        request: &NewBeneficiary,
    ) -> Result<BeneficiaryReceipt, GatewayError>;
    async fn create_payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, GatewayError>;
    async fn get_exchange_rate(&self, request: &FxRequest) -> Result<FxQuote, GatewayError>;
}

#[derive(Clone)]
pub enum Gateway {
    Memory(MemoryGateway),
    Http(HttpGateway),
}

impl Gateway {
    pub fn memory() -> Self {
        Self::Memory(MemoryGateway::demo())
    }

    pub fn http(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self::Http(HttpGateway::new(config)?))
    }
}

impl PaymentGateway for Gateway {
    async fn get_balance(&self, query: &BalanceQuery) -> Result<Vec<Balance>, GatewayError> {
        match self {
            Gateway::Memory(gateway) => gateway.get_balance(query).await,
            Gateway::Http(gateway) => gateway.get_balance(query).await,
        }
    }

    async fn create_beneficiary(
        &self,
        request: &NewBeneficiary,
    ) -> Result<BeneficiaryReceipt, GatewayError> {
        match self {
            Gateway::Memory(gateway) => gateway.create_beneficiary(request).await,
            Gateway::Http(gateway) => gateway.create_beneficiary(request).await,
        }
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, GatewayError> {
        match self {
            Gateway::Memory(gateway) => gateway.create_payout(request).await,
            Gateway::Http(gateway) => gateway.create_payout(request).await,
        }
    }

    async fn get_exchange_rate(&self, request: &FxRequest) -> Result<FxQuote, GatewayError> {
        match self {
            Gateway::Memory(gateway) => gateway.get_exchange_rate(request).await,
            Gateway::Http(gateway) => gateway.get_exchange_rate(request).await,
        }
    }
}

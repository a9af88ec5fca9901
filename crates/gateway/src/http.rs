use std::time::Duration;

use payagent_core::{
    Balance, BalanceQuery, BeneficiaryReceipt, FxQuote, FxRequest, NewBeneficiary, PayoutReceipt,
    PayoutRequest,
};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{GatewayError, PaymentGateway};

pub const DEFAULT_BASE_URL: &str = "https://service.tazapay.com/v3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const PAYOUT_TYPE: &str = "local";
const PAYOUT_CHARGE_TYPE: &str = "shared";
const PAYOUT_PURPOSE: &str = "PYR002";
const BENEFICIARY_TYPE: &str = "individual";

#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
}

impl HttpGatewayConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.api_key.trim().is_empty() {
            return Err(GatewayError::Configuration("api key is empty".to_string()));
        }
        if self.api_secret.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "api secret is empty".to_string(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(GatewayError::Configuration("base url is empty".to_string()));
        }
        Ok(())
    }
}

/// REST client for the provider's v3 API.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    config: HttpGatewayConfig,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(6))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%method, path, status = status.as_u16(), "payment provider responded");

        if !status.is_success() {
            warn!(%method, path, status = status.as_u16(), "payment provider request failed");
            return Err(status_error(status, text));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

impl PaymentGateway for HttpGateway {
    #[instrument(skip(self), fields(currency = ?query.currency))]
    async fn get_balance(&self, query: &BalanceQuery) -> Result<Vec<Balance>, GatewayError> {
        let envelope: Envelope<BalanceData> = self
            .send::<(), _>(Method::GET, "/balance", &[], None)
            .await?;
        parse_balances(envelope, query.currency.as_deref())
    }

    #[instrument(skip(self, request), fields(country = %request.country))]
    async fn create_beneficiary(
        &self,
        request: &NewBeneficiary,
    ) -> Result<BeneficiaryReceipt, GatewayError> {
        let payload = beneficiary_payload(request);
        let envelope: Envelope<IdData> = self
            .send(Method::POST, "/beneficiary", &[], Some(&payload))
            .await?;
        parse_beneficiary(envelope)
    }

    #[instrument(skip(self, request), fields(beneficiary = %request.beneficiary_id, currency = %request.currency))]
    async fn create_payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, GatewayError> {
        let payload = payout_payload(request)?;
        let envelope: Envelope<IdData> = self
            .send(Method::POST, "/payout", &[], Some(&payload))
            .await?;
        parse_payout(envelope)
    }

    #[instrument(skip(self, request), fields(from = %request.from_currency, to = %request.to_currency))]
    async fn get_exchange_rate(&self, request: &FxRequest) -> Result<FxQuote, GatewayError> {
        let query = fx_query(request)?;
        let envelope: Envelope<FxData> = self
            .send::<(), _>(Method::GET, "/fx/payout", &query, None)
            .await?;
        parse_fx(envelope, request)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<(T, Option<String>), GatewayError> {
        match self.data {
            Some(data) => Ok((data, self.status)),
            None => Err(GatewayError::Decode(
                self.message
                    .unwrap_or_else(|| "response carried no data".to_string()),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BalanceData {
    #[serde(default)]
    available: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    amount: Decimal,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct IdData {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FxData {
    exchange_rate: Decimal,
    converted_amount: i64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct BeneficiaryPayload<'a> {
    name: &'a str,
    email: &'a str,
    country: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct PayoutPayload<'a> {
    beneficiary: &'a str,
    amount: i64,
    currency: &'a str,
    holding_currency: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    charge_type: &'static str,
    purpose: &'static str,
}

fn status_error(status: StatusCode, body: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized {
            status: status.as_u16(),
            body,
        },
        _ => GatewayError::Rejected {
            status: status.as_u16(),
            body,
        },
    }
}

fn parse_balances(
    envelope: Envelope<BalanceData>,
    currency: Option<&str>,
) -> Result<Vec<Balance>, GatewayError> {
    let (data, _) = envelope.into_data()?;

    Ok(data
        .available
        .into_iter()
        .filter(|entry| currency.map_or(true, |code| entry.currency.eq_ignore_ascii_case(code)))
        .map(|entry| Balance {
            amount: entry.amount,
            currency: entry.currency.to_uppercase(),
        })
        .collect())
}

fn parse_beneficiary(envelope: Envelope<IdData>) -> Result<BeneficiaryReceipt, GatewayError> {
    let (data, status) = envelope.into_data()?;
    Ok(BeneficiaryReceipt {
        id: data.id,
        status: data
            .status
            .or(status)
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

fn parse_payout(envelope: Envelope<IdData>) -> Result<PayoutReceipt, GatewayError> {
    let (data, status) = envelope.into_data()?;
    Ok(PayoutReceipt {
        id: data.id,
        status: data
            .status
            .or(status)
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

fn parse_fx(envelope: Envelope<FxData>, request: &FxRequest) -> Result<FxQuote, GatewayError> {
    let (data, _) = envelope.into_data()?;
    Ok(FxQuote {
        from_currency: request.from_currency.clone(),
        to_currency: request.to_currency.clone(),
        rate: data.exchange_rate,
        amount: request.amount,
        converted_amount: from_minor_units(data.converted_amount),
    })
}

fn beneficiary_payload(request: &NewBeneficiary) -> BeneficiaryPayload<'_> {
    BeneficiaryPayload {
        name: &request.name,
        email: &request.email,
        country: &request.country,
        kind: BENEFICIARY_TYPE,
    }
}

fn payout_payload(request: &PayoutRequest) -> Result<PayoutPayload<'_>, GatewayError> {
    Ok(PayoutPayload {
        beneficiary: &request.beneficiary_id,
        amount: to_minor_units(request.amount)?,
        currency: &request.currency,
        holding_currency: &request.currency,
        kind: PAYOUT_TYPE,
        charge_type: PAYOUT_CHARGE_TYPE,
        purpose: PAYOUT_PURPOSE,
    })
}

fn fx_query(request: &FxRequest) -> Result<Vec<(&'static str, String)>, GatewayError> {
    Ok(vec![
        ("initial_currency", request.from_currency.clone()),
        ("final_currency", request.to_currency.clone()),
        ("amount", to_minor_units(request.amount)?.to_string()),
    ])
}

fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.round().to_i64())
        .ok_or_else(|| GatewayError::Decode(format!("amount {amount} is out of range")))
}

fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use payagent_core::{
    Balance, BalanceQuery, BeneficiaryReceipt, FxQuote, FxRequest, NewBeneficiary, Operation,
    PayoutReceipt, PayoutRequest,
};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{GatewayError, PaymentGateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    GetBalance(BalanceQuery),
    CreateBeneficiary(NewBeneficiary),
    CreatePayout(PayoutRequest),
    GetExchangeRate(FxRequest),
}

impl GatewayCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::GetBalance(_) => Operation::GetBalance,
            Self::CreateBeneficiary(_) => Operation::CreateBeneficiary,
            Self::CreatePayout(_) => Operation::CreatePayout,
            Self::GetExchangeRate(_) => Operation::GetExchangeRate,
        }
    }
}

/// In-process payment provider. Records every call and can be told to fail a
/// given operation.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    balances: Arc<RwLock<Vec<Balance>>>,
    rates: Arc<RwLock<HashMap<(String, String), Decimal>>>,
    failures: Arc<RwLock<HashMap<Operation, String>>>,
    calls: Arc<RwLock<Vec<GatewayCall>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with a few balances and rates for offline use.
    pub fn demo() -> Self {
        Self::new()
            .with_balance(Decimal::new(1_250_000, 2), "USD")
            .with_balance(Decimal::new(830_050, 2), "EUR")
            .with_balance(Decimal::new(2_000_000, 2), "SGD")
            .with_rate("USD", "EUR", Decimal::new(92, 2))
            .with_rate("USD", "SGD", Decimal::new(134, 2))
            .with_rate("GBP", "USD", Decimal::new(127, 2))
    }

    pub fn with_balance(self, amount: Decimal, currency: &str) -> Self {
        self.balances.write().push(Balance {
            amount,
            currency: currency.to_uppercase(),
        });
        self
    }

    pub fn with_rate(self, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .write()
            .insert((from.to_uppercase(), to.to_uppercase()), rate);
        self
    }

    pub fn fail(&self, operation: Operation, message: impl Into<String>) {
        self.failures.write().insert(operation, message.into());
    }

    pub fn recover(&self, operation: Operation) {
        self.failures.write().remove(&operation);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    fn begin(&self, call: GatewayCall) -> Result<(), GatewayError> {
        let operation = call.operation();
        self.calls.write().push(call);
        match self.failures.read().get(&operation) {
            Some(message) => Err(GatewayError::Simulated(message.clone())),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}_mem_{id}")
    }

    fn lookup_rate(&self, from: &str, to: &str) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }

        let rates = self.rates.read();
        rates
            .get(&(from.to_string(), to.to_string()))
            .copied()
            .or_else(|| {
                rates
                    .get(&(to.to_string(), from.to_string()))
                    .and_then(|inverse| Decimal::ONE.checked_div(*inverse))
            })
    }
}

impl PaymentGateway for MemoryGateway {
    async fn get_balance(&self, query: &BalanceQuery) -> Result<Vec<Balance>, GatewayError> {
        self.begin(GatewayCall::GetBalance(query.clone()))?;

        let balances = self.balances.read();
        Ok(balances
            .iter()
            .filter(|balance| {
                query
                    .currency
                    .as_deref()
                    .map_or(true, |code| balance.currency.eq_ignore_ascii_case(code))
            })
            .cloned()
            .collect())
    }

    async fn create_beneficiary(
        &self,
        request: &NewBeneficiary,
    ) -> Result<BeneficiaryReceipt, GatewayError> {
        self.begin(GatewayCall::CreateBeneficiary(request.clone()))?;

        Ok(BeneficiaryReceipt {
            id: self.next_id("bnf"),
            status: "active".to_string(),
        })
    }

    async fn create_payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, GatewayError> {
        self.begin(GatewayCall::CreatePayout(request.clone()))?;

        // Only currencies with a seeded balance are debited.
        let mut balances = self.balances.write();
        if let Some(balance) = balances
            .iter_mut()
            .find(|balance| balance.currency == request.currency)
        {
            if balance.amount < request.amount {
                return Err(GatewayError::Rejected {
                    status: 422,
                    body: format!("insufficient {} balance", request.currency),
                });
            }
            balance.amount -= request.amount;
        }

        Ok(PayoutReceipt {
            id: self.next_id("po"),
            status: "pending".to_string(),
        })
    }

    async fn get_exchange_rate(&self, request: &FxRequest) -> Result<FxQuote, GatewayError> {
        self.begin(GatewayCall::GetExchangeRate(request.clone()))?;

        let rate = self
            .lookup_rate(&request.from_currency, &request.to_currency)
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                body: format!(
                    "no rate for {}/{}",
                    request.from_currency, request.to_currency
                ),
            })?;

        let converted = request
            .amount
            .checked_mul(rate)
            .ok_or_else(|| GatewayError::Rejected {
                status: 422,
                body: format!("amount {} is out of range", request.amount),
            })?;

        Ok(FxQuote {
            from_currency: request.from_currency.clone(),
            to_currency: request.to_currency.clone(),
            rate,
            amount: request.amount,
            converted_amount: converted
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(from: &str, to: &str, amount: i64) -> FxRequest {
        FxRequest {
            from_currency: from.to_string(),
            to_currency: to.to_string(),
            amount: Decimal::new(amount, 0),
        }
    }

    #[tokio::test]
    async fn records_calls_in_order() {
        let gateway = MemoryGateway::demo();
        gateway
            .get_balance(&BalanceQuery { currency: None })
            .await
            .unwrap();
        gateway.get_exchange_rate(&fx("USD", "EUR", 100)).await.unwrap();

        let operations = gateway
            .calls()
            .iter()
            .map(GatewayCall::operation)
            .collect::<Vec<_>>();
        assert_eq!(
            operations,
            vec![Operation::GetBalance, Operation::GetExchangeRate]
        );
    }

    #[tokio::test]
    async fn filters_balances_by_currency() {
        let gateway = MemoryGateway::demo();
        let balances = gateway
            .get_balance(&BalanceQuery {
                currency: Some("eur".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].currency, "EUR");
    }

    #[tokio::test]
    async fn converts_with_direct_and_inverse_rates() {
        let gateway = MemoryGateway::new().with_rate("USD", "EUR", Decimal::new(80, 2));

        let direct = gateway.get_exchange_rate(&fx("USD", "EUR", 100)).await.unwrap();
        assert_eq!(direct.converted_amount, Decimal::new(80, 0));

        let inverse = gateway.get_exchange_rate(&fx("EUR", "USD", 80)).await.unwrap();
        assert_eq!(inverse.converted_amount, Decimal::new(100, 0));

        let missing = gateway.get_exchange_rate(&fx("USD", "JPY", 1)).await;
        assert!(matches!(missing, Err(GatewayError::Rejected { status: 404, .. })));
    }

    #[tokio::test]
    async fn overflowing_conversion_is_rejected() {
        let gateway = MemoryGateway::demo();
        let request = FxRequest {
            from_currency: "USD".to_string(),
            to_currency: "SGD".to_string(),
            amount: Decimal::MAX,
        };

        let result = gateway.get_exchange_rate(&request).await;
        assert!(matches!(result, Err(GatewayError::Rejected { status: 422, .. })));
    }

    #[tokio::test]
    async fn simulated_failure_is_still_recorded() {
        let gateway = MemoryGateway::new();
        gateway.fail(Operation::CreatePayout, "provider unavailable");

        let request = PayoutRequest {
            beneficiary_id: "bnf_1".to_string(),
            amount: Decimal::new(100, 0),
            currency: "USD".to_string(),
        };
        let error = gateway.create_payout(&request).await.unwrap_err();
        assert_eq!(error.to_string(), "provider unavailable");
        assert_eq!(gateway.call_count(), 1);

        gateway.recover(Operation::CreatePayout);
        let receipt = gateway.create_payout(&request).await.unwrap();
        assert_eq!(receipt.id, "po_mem_1");
    }

    #[tokio::test]
    async fn payout_debits_seeded_balance() {
        let gateway = MemoryGateway::new().with_balance(Decimal::new(150, 0), "USD");
        let request = PayoutRequest {
            beneficiary_id: "bnf_1".to_string(),
            amount: Decimal::new(100, 0),
            currency: "USD".to_string(),
        };

        gateway.create_payout(&request).await.unwrap();
        let second = gateway.create_payout(&request).await;
        assert!(matches!(second, Err(GatewayError::Rejected { status: 422, .. })));

        let balances = gateway
            .get_balance(&BalanceQuery { currency: None })
            .await
            .unwrap();
        assert_eq!(balances[0].amount, Decimal::new(50, 0));
    }
}

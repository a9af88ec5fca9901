use std::sync::Arc;
use std::time::Instant;

use payagent_core::formatter::{
    clarification_prompt, failure_reply, format_balances, format_beneficiary, format_fx,
    format_payout, help_reply, unknown_reply,
};
use payagent_core::{
    classify_intent, extract_entities, merge_entities, normalize_text, resolve_request,
    ConversationContext, DispatchRequest, EntityKey, Intent, IntentName, Operation, Role,
    SlotResolution,
};
use payagent_gateway::{GatewayError, PaymentGateway};
use payagent_observability::AppMetrics;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("{operation} failed: {source}")]
    OperationFailed {
        operation: Operation,
        #[source]
        source: GatewayError,
    },
}

impl TurnError {
    pub fn operation(&self) -> Operation {
        match self {
            Self::OperationFailed { operation, .. } => *operation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Help or capability text; nothing was dispatched.
    Answered,
    AwaitingSlots(Vec<EntityKey>),
    Completed(Operation),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    pub reply: String,
    pub intent: IntentName,
    pub confidence: f64,
    pub outcome: TurnOutcome,
}

/// Turns one utterance at a time into a reply, a clarification question or a
/// call against the payment provider. Holds no per-conversation state; every
/// call works on the caller's [`ConversationContext`].
pub struct PaymentAgent<G>
where
    G: PaymentGateway,
{
    gateway: Arc<G>,
    metrics: Arc<AppMetrics>,
}

impl<G> Clone for PaymentAgent<G>
where
    G: PaymentGateway,
{
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<G> PaymentAgent<G>
where
    G: PaymentGateway,
{
    pub fn new(gateway: Arc<G>, metrics: Arc<AppMetrics>) -> Self {
        Self { gateway, metrics }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    pub async fn handle_message(
        &self,
        context: &mut ConversationContext,
        text: &str,
    ) -> Result<String, TurnError> {
        self.handle_turn(context, text)
            .await
            .map(|report| report.reply)
    }

    #[instrument(skip(self, context, text), fields(session_id = %context.session_id()))]
    pub async fn handle_turn(
        &self,
        context: &mut ConversationContext,
        text: &str,
    ) -> Result<TurnReport, TurnError> {
        let started = Instant::now();
        self.metrics.inc_turn();

        let result = self.run_turn(context, text).await;
        self.metrics.observe_latency(started.elapsed());

        match &result {
            Ok(report) => info!(
                intent = %report.intent,
                confidence = report.confidence,
                outcome = ?report.outcome,
                "turn handled"
            ),
            Err(error) => {
                self.metrics.inc_failure();
                warn!(operation = %error.operation(), error = %error, "turn failed");
            }
        }

        result
    }

    async fn run_turn(
        &self,
        context: &mut ConversationContext,
        text: &str,
    ) -> Result<TurnReport, TurnError> {
        context.record(Role::User, text);

        let mut intent = classify_intent(text);
        intent.entities = extract_entities(text);
        let intent = continue_pending(intent, text, context);

        if !intent.name.is_actionable() {
            let reply = match intent.name {
                IntentName::Help => help_reply(),
                _ => unknown_reply(),
            };
            self.metrics.inc_help();
            context.clear_missing();
            context.record(Role::Assistant, reply.as_str());
            return Ok(report(reply, &intent, TurnOutcome::Answered));
        }

        let merged = merge_entities(&intent.entities, context);
        let resolution = resolve_request(intent.name, &merged);
        context.resolve(intent.name, merged);

        let request = match resolution {
            SlotResolution::Ready(request) => request,
            SlotResolution::Missing(missing) => {
                let keys = missing.iter().map(|slot| slot.key).collect::<Vec<_>>();
                let reply = clarification_prompt(&missing);
                self.metrics.inc_clarification();
                context.set_missing(keys.clone());
                context.record(Role::Assistant, reply.as_str());
                return Ok(report(reply, &intent, TurnOutcome::AwaitingSlots(keys)));
            }
            SlotResolution::NotActionable => {
                let reply = unknown_reply();
                context.clear_missing();
                context.record(Role::Assistant, reply.as_str());
                return Ok(report(reply, &intent, TurnOutcome::Answered));
            }
        };

        context.clear_missing();
        let operation = request.operation();
        self.metrics.inc_dispatch();

        match self.dispatch(&request).await {
            Ok(reply) => {
                context.record(Role::Assistant, reply.as_str());
                Ok(report(reply, &intent, TurnOutcome::Completed(operation)))
            }
            Err(source) => {
                context.record(
                    Role::Assistant,
                    failure_reply(operation, &source.to_string()),
                );
                Err(TurnError::OperationFailed { operation, source })
            }
        }
    }

    #[instrument(skip(self, request), fields(operation = %request.operation()))]
    async fn dispatch(&self, request: &DispatchRequest) -> Result<String, GatewayError> {
        match request {
            DispatchRequest::Balance(query) => {
                let balances = self.gateway.get_balance(query).await?;
                Ok(format_balances(&balances, query.currency.as_deref()))
            }
            DispatchRequest::Beneficiary(beneficiary) => {
                let receipt = self.gateway.create_beneficiary(beneficiary).await?;
                Ok(format_beneficiary(beneficiary, &receipt))
            }
            DispatchRequest::Payout(payout) => {
                let receipt = self.gateway.create_payout(payout).await?;
                Ok(format_payout(payout, &receipt))
            }
            DispatchRequest::Fx(fx) => {
                let quote = self.gateway.get_exchange_rate(fx).await?;
                Ok(format_fx(&quote))
            }
        }
    }
}

/// A bare answer such as "100" or "EUR" carries on the intent that asked for
/// it. When the only open slot is free text (a name or a country) and nothing
/// was extracted, the whole utterance is the answer.
fn continue_pending(mut intent: Intent, text: &str, context: &ConversationContext) -> Intent {
    if intent.name != IntentName::Unknown
        || !context.awaiting_slots()
        || !context.last_intent().is_actionable()
    {
        return intent;
    }

    if intent.entities.is_empty() {
        if let [key @ (EntityKey::BeneficiaryName | EntityKey::Country)] = context.missing_fields()
        {
            if let Some(answer) = free_text_answer(text) {
                intent.entities.set(*key, answer);
            }
        }
    }

    if intent.entities.is_empty() {
        return intent;
    }

    Intent {
        name: context.last_intent(),
        ..intent
    }
}

fn free_text_answer(text: &str) -> Option<String> {
    let answer = normalize_text(text);
    let answer = answer.trim_end_matches(['.', '!', '?', ',', ';']).trim();
    (!answer.is_empty()).then(|| answer.to_string())
}

fn report(reply: String, intent: &Intent, outcome: TurnOutcome) -> TurnReport {
    TurnReport {
        reply,
        intent: intent.name,
        confidence: intent.confidence,
        outcome,
    }
}

use std::sync::Arc;

use payagent_agents::{PaymentAgent, TurnOutcome};
use payagent_core::{
    ConversationContext, EntityKey, FxRequest, IntentName, NewBeneficiary, Operation,
    PayoutRequest, Role,
};
use payagent_gateway::{GatewayCall, MemoryGateway};
use payagent_observability::AppMetrics;
use rust_decimal::Decimal;

fn agent() -> PaymentAgent<MemoryGateway> {
    PaymentAgent::new(Arc::new(MemoryGateway::demo()), AppMetrics::shared())
}

fn payout(beneficiary_id: &str, amount: i64, currency: &str) -> GatewayCall {
    GatewayCall::CreatePayout(PayoutRequest {
        beneficiary_id: beneficiary_id.to_string(),
        amount: Decimal::new(amount, 0),
        currency: currency.to_string(),
    })
}

#[tokio::test]
async fn complete_payout_dispatches_in_one_turn() {
    let agent = agent();
    let mut context = ConversationContext::new();

    let reply = agent
        .handle_message(&mut context, "send 100 USD to beneficiary bnf_1")
        .await
        .unwrap();

    assert_eq!(agent.gateway().calls(), vec![payout("bnf_1", 100, "USD")]);
    assert!(reply.starts_with("Payout created successfully!"));
    assert!(reply.contains("ID: po_mem_1"));
    assert!(reply.contains("Amount: 100.00 USD"));
    assert!(context.missing_fields().is_empty());
}

#[tokio::test]
async fn exchange_rate_asks_for_amount_then_dispatches() {
    let agent = agent();
    let mut context = ConversationContext::new();

    let first = agent
        .handle_turn(&mut context, "what's the exchange rate from USD to EUR")
        .await
        .unwrap();
    assert_eq!(first.intent, IntentName::CheckFx);
    assert_eq!(
        first.reply,
        "Please provide the following information: amount"
    );
    assert_eq!(context.missing_fields(), &[EntityKey::Amount]);
    assert_eq!(agent.gateway().call_count(), 0);

    let second = agent.handle_turn(&mut context, "100").await.unwrap();
    assert_eq!(
        second.outcome,
        TurnOutcome::Completed(Operation::GetExchangeRate)
    );
    assert_eq!(
        agent.gateway().calls(),
        vec![GatewayCall::GetExchangeRate(FxRequest {
            from_currency: "USD".to_string(),
            to_currency: "EUR".to_string(),
            amount: Decimal::new(100, 0),
        })]
    );
    assert!(second.reply.contains("Rate: 0.920000"));
    assert!(second.reply.contains("Converted: 92.00 EUR"));
}

#[tokio::test]
async fn gibberish_gets_capabilities_and_no_calls() {
    let agent = agent();
    let mut context = ConversationContext::new();

    let report = agent
        .handle_turn(&mut context, "random gibberish")
        .await
        .unwrap();

    assert_eq!(report.intent, IntentName::Unknown);
    assert_eq!(report.outcome, TurnOutcome::Answered);
    assert!(report.reply.contains("I can help you with"));
    assert_eq!(agent.gateway().call_count(), 0);
}

#[tokio::test]
async fn failed_payout_keeps_entities_for_retry() {
    let agent = agent();
    agent
        .gateway()
        .fail(Operation::CreatePayout, "upstream timeout");
    let mut context = ConversationContext::new();

    let error = agent
        .handle_message(&mut context, "send 100 USD to beneficiary bnf_1")
        .await
        .unwrap_err();
    assert!(error.to_string().contains("upstream timeout"));
    assert_eq!(context.last_intent(), IntentName::CreatePayout);
    assert_eq!(
        context.last_entities().get(EntityKey::BeneficiaryId),
        Some("bnf_1")
    );

    agent.gateway().recover(Operation::CreatePayout);
    let reply = agent
        .handle_message(&mut context, "send the payment now")
        .await
        .unwrap();

    assert!(reply.contains("Payout created successfully!"));
    assert_eq!(
        agent.gateway().calls(),
        vec![payout("bnf_1", 100, "USD"), payout("bnf_1", 100, "USD")]
    );
}

#[tokio::test]
async fn payout_collects_slots_over_several_turns() {
    let agent = agent();
    let mut context = ConversationContext::new();

    let first = agent
        .handle_turn(&mut context, "send 250 to someone")
        .await
        .unwrap();
    assert_eq!(
        first.outcome,
        TurnOutcome::AwaitingSlots(vec![EntityKey::Currency, EntityKey::BeneficiaryId])
    );

    let second = agent.handle_turn(&mut context, "SGD").await.unwrap();
    assert_eq!(
        second.reply,
        "Please provide the following information: beneficiary ID"
    );
    assert_eq!(context.missing_fields(), &[EntityKey::BeneficiaryId]);

    let third = agent
        .handle_turn(&mut context, "beneficiary bnf_42")
        .await
        .unwrap();
    assert_eq!(third.outcome, TurnOutcome::Completed(Operation::CreatePayout));
    assert_eq!(agent.gateway().calls(), vec![payout("bnf_42", 250, "SGD")]);
}

#[tokio::test]
async fn beneficiary_and_balance_round_out_the_operations() {
    let agent = agent();
    let mut context = ConversationContext::new();

    let reply = agent
        .handle_message(
            &mut context,
            "Add a new beneficiary named John Doe, email john@example.com, country Singapore",
        )
        .await
        .unwrap();
    assert!(reply.contains("ID: bnf_mem_1"));
    assert!(reply.contains("Name: John Doe"));

    let reply = agent
        .handle_message(&mut context, "what's my USD balance")
        .await
        .unwrap();
    assert_eq!(reply, "Your balances:\n- 12500.00 USD");

    let calls = agent.gateway().calls();
    assert_eq!(
        calls[0],
        GatewayCall::CreateBeneficiary(NewBeneficiary {
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            country: "Singapore".to_string(),
        })
    );
    assert_eq!(calls[1].operation(), Operation::GetBalance);
}

#[tokio::test]
async fn contexts_on_one_agent_do_not_share_state() {
    let agent = agent();
    let mut first = ConversationContext::new();
    let mut second = ConversationContext::new();

    agent
        .handle_message(&mut first, "convert from USD to EUR")
        .await
        .unwrap();
    let reply = agent.handle_message(&mut second, "100").await.unwrap();

    assert!(reply.contains("I can help you with"));
    assert_eq!(second.last_intent(), IntentName::Unknown);
    assert_eq!(first.missing_fields(), &[EntityKey::Amount]);
    assert_ne!(first.session_id(), second.session_id());
    assert_eq!(agent.gateway().call_count(), 0);
}

#[tokio::test]
async fn history_is_append_only() {
    let agent = agent();
    let mut context = ConversationContext::new();

    agent.handle_message(&mut context, "help").await.unwrap();
    let earlier = context.history().to_vec();

    agent
        .handle_message(&mut context, "send 5 EUR to beneficiary bnf_9")
        .await
        .unwrap();
    agent.handle_message(&mut context, "hello").await.unwrap();

    let history = context.history();
    assert_eq!(history.len(), 6);
    assert_eq!(&history[..2], earlier.as_slice());
    for pair in history.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
    }

    let snapshot = agent.metrics().snapshot();
    assert_eq!(snapshot.turns_total, 3);
    assert_eq!(snapshot.dispatches_total, 1);
    assert_eq!(snapshot.help_replies_total, 2);
}

#[tokio::test]
async fn bare_country_answers_the_clarification() {
    let agent = agent();
    let mut context = ConversationContext::new();

    let first = agent
        .handle_turn(
            &mut context,
            "add a new beneficiary named John Doe, email john@example.com",
        )
        .await
        .unwrap();
    assert_eq!(
        first.outcome,
        TurnOutcome::AwaitingSlots(vec![EntityKey::Country])
    );

    let second = agent.handle_turn(&mut context, "Singapore").await.unwrap();
    assert_eq!(second.intent, IntentName::CreateBeneficiary);
    assert_eq!(
        second.outcome,
        TurnOutcome::Completed(Operation::CreateBeneficiary)
    );
    assert_eq!(
        agent.gateway().calls(),
        vec![GatewayCall::CreateBeneficiary(NewBeneficiary {
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            country: "Singapore".to_string(),
        })]
    );
}

#[tokio::test]
async fn absurd_amount_asks_again_instead_of_crashing() {
    let agent = agent();
    let mut context = ConversationContext::new();

    let report = agent
        .handle_turn(&mut context, "convert 60000000000000000000000000000 USD to SGD")
        .await
        .unwrap();

    assert_eq!(
        report.outcome,
        TurnOutcome::AwaitingSlots(vec![EntityKey::Amount])
    );
    assert_eq!(agent.gateway().call_count(), 0);

    let report = agent.handle_turn(&mut context, "100").await.unwrap();
    assert_eq!(
        report.outcome,
        TurnOutcome::Completed(Operation::GetExchangeRate)
    );
    assert!(report.reply.contains("Converted: 134.00 SGD"));
}

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{
    Balance, BeneficiaryReceipt, FxQuote, NewBeneficiary, Operation, PayoutReceipt, PayoutRequest,
};
use crate::slots::RequiredSlot;

const CAPABILITIES: &str = "I can help you with:\n\
1. Checking your balance\n   Example: 'What's my USD balance?'\n\
2. Adding a beneficiary\n   Example: 'Add a new beneficiary named John Doe, email john@example.com, country Singapore'\n\
3. Sending a payout\n   Example: 'Send 100 USD to beneficiary bnf_123'\n\
4. Checking exchange rates\n   Example: 'What's the rate from USD to EUR for 100?'\n\n\
Just ask in plain language.";

pub fn help_reply() -> String {
    CAPABILITIES.to_string()
}

pub fn unknown_reply() -> String {
    format!("I'm not sure what you want to do. {CAPABILITIES}")
}

pub fn clarification_prompt(missing: &[RequiredSlot]) -> String {
    let labels = missing
        .iter()
        .map(|slot| slot.label)
        .collect::<Vec<_>>()
        .join(", ");
    format!("Please provide the following information: {labels}")
}

pub fn failure_reply(operation: Operation, message: &str) -> String {
    format!("Sorry, {operation} failed: {message}")
}

pub fn format_balances(balances: &[Balance], currency: Option<&str>) -> String {
    if balances.is_empty() {
        return match currency {
            Some(code) => format!("No {code} balance found."),
            None => "No balances available.".to_string(),
        };
    }

    let mut reply = String::from("Your balances:");
    for balance in balances {
        reply.push_str(&format!("\n- {} {}", money(balance.amount), balance.currency));
    }
    reply
}

pub fn format_beneficiary(request: &NewBeneficiary, receipt: &BeneficiaryReceipt) -> String {
    format!(
        "Beneficiary created successfully!\nID: {}\nStatus: {}\nName: {}",
        receipt.id, receipt.status, request.name
    )
}

pub fn format_payout(request: &PayoutRequest, receipt: &PayoutReceipt) -> String {
    format!(
        "Payout created successfully!\nID: {}\nStatus: {}\nAmount: {} {}",
        receipt.id,
        receipt.status,
        money(request.amount),
        request.currency
    )
}

pub fn format_fx(quote: &FxQuote) -> String {
    format!(
        "Exchange rate from {from} to {to}:\nAmount: {amount} {from}\nRate: {rate}\nConverted: {converted} {to}",
        from = quote.from_currency,
        to = quote.to_currency,
        amount = money(quote.amount),
        rate = fixed(quote.rate, 6),
        converted = money(quote.converted_amount),
    )
}

fn money(amount: Decimal) -> String {
    fixed(amount, 2)
}

fn fixed(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", places as usize, rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityKey;

    #[test]
    fn balances_one_per_line_with_two_decimals() {
        let balances = vec![
            Balance {
                amount: Decimal::new(1005, 1),
                currency: "USD".to_string(),
            },
            Balance {
                amount: Decimal::new(2, 0),
                currency: "EUR".to_string(),
            },
        ];

        assert_eq!(
            format_balances(&balances, None),
            "Your balances:\n- 100.50 USD\n- 2.00 EUR"
        );
        assert_eq!(format_balances(&[], Some("SGD")), "No SGD balance found.");
    }

    #[test]
    fn fx_reports_every_figure() {
        let reply = format_fx(&FxQuote {
            from_currency: "USD".to_string(),
            to_currency: "EUR".to_string(),
            rate: Decimal::new(92, 2),
            amount: Decimal::new(100, 0),
            converted_amount: Decimal::new(92, 0),
        });

        assert!(reply.contains("from USD to EUR"));
        assert!(reply.contains("Amount: 100.00 USD"));
        assert!(reply.contains("Rate: 0.920000"));
        assert!(reply.contains("Converted: 92.00 EUR"));
    }

    #[test]
    fn payout_echoes_receipt_verbatim() {
        let reply = format_payout(
            &PayoutRequest {
                beneficiary_id: "bnf_1".to_string(),
                amount: Decimal::new(100, 0),
                currency: "USD".to_string(),
            },
            &PayoutReceipt {
                id: "pot_9XyZ".to_string(),
                status: "Processing".to_string(),
            },
        );
        assert!(reply.contains("ID: pot_9XyZ"));
        assert!(reply.contains("Status: Processing"));
        assert!(reply.contains("Amount: 100.00 USD"));
    }

    #[test]
    fn clarification_lists_labels_in_order() {
        let missing = [
            RequiredSlot {
                key: EntityKey::Currency,
                label: "currency",
            },
            RequiredSlot {
                key: EntityKey::BeneficiaryId,
                label: "beneficiary ID",
            },
        ];
        assert_eq!(
            clarification_prompt(&missing),
            "Please provide the following information: currency, beneficiary ID"
        );
    }
}

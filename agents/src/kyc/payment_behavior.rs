//! Payment behaviour: verified bank accounts, transaction patterns, payment abuse score.

use chrono::Duration;

use veriflow_types::evidence::doc;
use veriflow_types::CheckItem;

use crate::docs::{parse_datetime, BankAccount, FraudSignals};
use crate::{AgentContext, AgentError, AgentOutcome};

/// Transactions above this amount count as large.
pub const LARGE_TRANSACTION: f64 = 5000.0;
/// More than this many large transactions is suspicious.
pub const MAX_LARGE_TRANSACTIONS: usize = 2;
/// Consecutive transactions closer than this count as rapid.
pub const RAPID_WINDOW_MINUTES: i64 = 10;
/// More than this many rapid pairs is suspicious.
pub const MAX_RAPID_PAIRS: usize = 1;
/// Payment abuse scores above this fail.
pub const PAYMENT_ABUSE_THRESHOLD: f64 = 50.0;

pub fn evaluate(ctx: &AgentContext) -> Result<AgentOutcome, AgentError> {
    let accounts: Option<Vec<BankAccount>> = ctx.document(doc::BANKING_HISTORY)?;
    let signals: Option<FraudSignals> = ctx.document(doc::FRAUD_SIGNALS)?;

    let mut checks = Vec::with_capacity(3);

    match &accounts {
        None => {
            checks.push(CheckItem::not_applicable(
                "Bank Account Verification",
                "No banking history on file",
            ));
            checks.push(CheckItem::not_applicable(
                "Transaction Pattern Analysis",
                "No banking history on file",
            ));
        }
        Some(accounts) => {
            let verified = accounts.iter().filter(|a| a.verified).count();
            checks.push(CheckItem::pass_if(
                "Bank Account Verification",
                verified > 0,
                format!("Verified bank accounts: {verified}"),
            ));
            checks.push(transaction_pattern(accounts));
        }
    }

    checks.push(match &signals {
        None => CheckItem::not_applicable("Payment Abuse Score", "No fraud signals on file"),
        Some(s) => {
            let score = s.scores.payment_abuse;
            CheckItem::pass_if(
                "Payment Abuse Score",
                score <= PAYMENT_ABUSE_THRESHOLD,
                format!("Payment abuse score: {score}, threshold: {PAYMENT_ABUSE_THRESHOLD}"),
            )
        }
    });

    Ok(AgentOutcome::new(checks))
}

fn transaction_pattern(accounts: &[BankAccount]) -> CheckItem {
    let mut dated: Vec<_> = accounts
        .iter()
        .flat_map(|a| a.transactions.iter())
        .filter_map(|t| parse_datetime(&t.date).map(|at| (at, t.amount)))
        .collect();
    if dated.is_empty() {
        return CheckItem::not_applicable(
            "Transaction Pattern Analysis",
            "No transaction history available",
        );
    }
    dated.sort_by_key(|(at, _)| *at);

    let large = dated
        .iter()
        .filter(|(_, amount)| *amount > LARGE_TRANSACTION)
        .count();
    let rapid = dated
        .windows(2)
        .filter(|w| w[1].0 - w[0].0 < Duration::minutes(RAPID_WINDOW_MINUTES))
        .count();

    CheckItem::pass_if(
        "Transaction Pattern Analysis",
        large <= MAX_LARGE_TRANSACTIONS && rapid <= MAX_RAPID_PAIRS,
        format!("Large transactions: {large}, rapid transactions: {rapid}"),
    )
}

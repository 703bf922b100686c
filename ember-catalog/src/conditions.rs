use chrono::{DateTime, Utc};
use ember_shared::PlayerBehavior;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Behavior fields a condition can read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionField {
    Level,
    PurchaseCount,
    HoursSinceLastPurchase,
    CurrencyBalance,
    CurrentStreak,
    CompletionRate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOp {
    GreaterThan,
    LessThan,
    Equals,
    NotEquals,
}

/// A single declarative eligibility check. Lists of conditions are ANDed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: ConditionField,
    pub op: ConditionOp,
    pub value: f64,
    /// Currency code, required when field is CurrencyBalance
    #[serde(default)]
    pub currency: Option<String>,
}

impl Condition {
    pub fn new(field: ConditionField, op: ConditionOp, value: f64) -> Self {
        Self {
            field,
            op,
            value,
            currency: None,
        }
    }

    pub fn currency_balance(op: ConditionOp, currency: impl Into<String>, value: f64) -> Self {
        Self {
            field: ConditionField::CurrencyBalance,
            op,
            value,
            currency: Some(currency.into()),
        }
    }
}

/// Everything condition evaluation may read, assembled per request.
/// `balances` is a snapshot pulled from the ledger collaborator; when it is
/// absent, balance conditions evaluate to false.
pub struct EvalContext<'a> {
    pub behavior: &'a PlayerBehavior,
    pub balances: Option<&'a HashMap<String, i64>>,
    pub now: DateTime<Utc>,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        behavior: &'a PlayerBehavior,
        balances: Option<&'a HashMap<String, i64>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            behavior,
            balances,
            now,
        }
    }
}

/// Evaluate a single condition. Total: anything unresolvable is false.
pub fn evaluate(condition: &Condition, ctx: &EvalContext<'_>) -> bool {
    let actual = match resolve_field(condition, ctx) {
        Some(v) => v,
        None => return false,
    };

    match condition.op {
        ConditionOp::GreaterThan => actual > condition.value,
        ConditionOp::LessThan => actual < condition.value,
        ConditionOp::Equals => (actual - condition.value).abs() < f64::EPSILON,
        ConditionOp::NotEquals => (actual - condition.value).abs() >= f64::EPSILON,
    }
}

/// Evaluate an ANDed condition list. Empty list is trivially satisfied.
pub fn evaluate_all(conditions: &[Condition], ctx: &EvalContext<'_>) -> bool {
    conditions.iter().all(|c| evaluate(c, ctx))
}

fn resolve_field(condition: &Condition, ctx: &EvalContext<'_>) -> Option<f64> {
    let behavior = ctx.behavior;
    match condition.field {
        ConditionField::Level => Some(behavior.level as f64),
        ConditionField::PurchaseCount => Some(behavior.purchase_count as f64),
        ConditionField::HoursSinceLastPurchase => behavior.hours_since_last_purchase(ctx.now),
        ConditionField::CurrencyBalance => {
            let code = condition.currency.as_deref()?;
            let balances = ctx.balances?;
            balances.get(code).map(|b| *b as f64)
        }
        ConditionField::CurrentStreak => Some(behavior.current_streak as f64),
        ConditionField::CompletionRate => Some(behavior.completion_rate),
    }
}

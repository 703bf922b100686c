use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Offer families the catalog can carry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferType {
    Starter,
    Comeback,
    Flash,
    Energy,
    Subscription,
    SeasonPass,
    Bundle,
}

/// What caused an offer to become a display candidate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    OnStart,
    OnFail,
    OnReturn,
    TimeBased,
    Always,
}

/// Per-player behavioral counters read by segmentation, pricing and ranking.
///
/// Mutated only by purchase settlement and the explicit level/streak update
/// entry points; persisted on every mutating update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerBehavior {
    pub player_id: String,
    pub level: u32,
    pub purchase_count: u32,
    pub last_purchase_time: Option<DateTime<Utc>>,
    pub total_spent: i64,
    pub current_streak: u32,
    pub completion_rate: f64,
    pub purchase_history: HashMap<OfferType, u32>,
}

impl PlayerBehavior {
    /// Zeroed defaults for a player seen for the first time
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            level: 1,
            purchase_count: 0,
            last_purchase_time: None,
            total_spent: 0,
            current_streak: 0,
            completion_rate: 0.0,
            purchase_history: HashMap::new(),
        }
    }

    pub fn hours_since_last_purchase(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_purchase_time
            .map(|t| (now - t).num_seconds() as f64 / 3600.0)
    }

    pub fn record_purchase(&mut self, offer_type: OfferType, price_paid: i32, now: DateTime<Utc>) {
        self.purchase_count += 1;
        self.last_purchase_time = Some(now);
        self.total_spent += price_paid as i64;
        *self.purchase_history.entry(offer_type).or_insert(0) += 1;
    }
}

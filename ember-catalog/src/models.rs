use crate::conditions::Condition;
use chrono::{DateTime, Utc};
use ember_shared::{OfferType, TriggerType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a purchase grants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum RewardType {
    Currency { code: String },
    InventoryItem { item_id: String },
    Multiplier { target: String },
}

/// One reward line-item within an offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardItem {
    #[serde(flatten)]
    pub reward_type: RewardType,
    pub amount: i64,
}

impl RewardItem {
    pub fn currency(code: impl Into<String>, amount: i64) -> Self {
        Self {
            reward_type: RewardType::Currency { code: code.into() },
            amount,
        }
    }

    pub fn item(item_id: impl Into<String>, amount: i64) -> Self {
        Self {
            reward_type: RewardType::InventoryItem {
                item_id: item_id.into(),
            },
            amount,
        }
    }
}

/// Pricing state for a catalog entry.
///
/// `current_price` is recomputed by the periodic refresh sweep and per-request
/// by dynamic pricing; it always stays within `[min_price, max_price]` when
/// those bounds exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingBlock {
    pub currency: String,
    pub base_price: i32,
    pub current_price: i32,
    #[serde(default)]
    pub discount_percent: f64,
    pub tier_label: Option<String>,
    pub min_price: Option<i32>,
    pub max_price: Option<i32>,
    #[serde(default)]
    pub region_overrides: HashMap<String, i32>,
    pub updated_at: DateTime<Utc>,
}

impl PricingBlock {
    pub fn new(currency: impl Into<String>, base_price: i32) -> Self {
        Self {
            currency: currency.into(),
            base_price,
            current_price: base_price,
            discount_percent: 0.0,
            tier_label: None,
            min_price: None,
            max_price: None,
            region_overrides: HashMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Base price with the configured discount applied, before any multiplier
    pub fn discounted_base(&self) -> f64 {
        self.base_price as f64 * (1.0 - self.discount_percent / 100.0)
    }

    pub fn clamp(&self, price: i32) -> i32 {
        let mut price = price;
        if let Some(min) = self.min_price {
            price = price.max(min);
        }
        if let Some(max) = self.max_price {
            price = price.min(max);
        }
        price
    }
}

/// A purchasable bundle with eligibility conditions, a price and rewards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub offer_type: OfferType,
    pub trigger: TriggerType,
    pub priority: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub max_purchases: u32,
    #[serde(default)]
    pub current_purchases: u32,
    #[serde(default)]
    pub rewards: Vec<RewardItem>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub pricing: PricingBlock,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Experiment id this offer participates in, if any
    pub experiment_id: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Offer {
    pub fn new(
        id: impl Into<String>,
        offer_type: OfferType,
        trigger: TriggerType,
        priority: i32,
        pricing: PricingBlock,
    ) -> Self {
        Self {
            id: id.into(),
            offer_type,
            trigger,
            priority,
            starts_at: None,
            ends_at: None,
            max_purchases: u32::MAX,
            current_purchases: 0,
            rewards: Vec::new(),
            conditions: Vec::new(),
            pricing,
            is_active: true,
            experiment_id: None,
        }
    }

    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.starts_at {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.ends_at {
            if now >= end {
                return false;
            }
        }
        true
    }

    pub fn at_cap(&self) -> bool {
        self.current_purchases >= self.max_purchases
    }

    /// True when both window bounds are set, making the offer time-boxed
    pub fn is_time_boxed(&self) -> bool {
        self.starts_at.is_some() && self.ends_at.is_some()
    }

    /// Fraction of the active window still remaining, in [0, 1].
    /// Offers without a bounded window report 1.0.
    pub fn window_fraction_remaining(&self, now: DateTime<Utc>) -> f64 {
        match (self.starts_at, self.ends_at) {
            (Some(start), Some(end)) if end > start => {
                let total = (end - start).num_seconds() as f64;
                let remaining = (end - now).num_seconds() as f64;
                (remaining / total).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }
}

use serde_json::Value;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OfferViewedEvent {
    pub offer_id: String,
    pub player_id: String,
    pub price: i32,
    pub currency: String,
    pub variant: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PurchaseCompletedEvent {
    pub offer_id: String,
    pub player_id: String,
    pub price_paid: i32,
    pub currency: String,
    pub spend_tier: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SubscriptionEvent {
    pub player_id: String,
    pub tier_id: String,
    pub action: String, // started | renewed | cancelled | expired
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PassLevelUpEvent {
    pub player_id: String,
    pub from_level: u32,
    pub to_level: u32,
    pub total_xp: u64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SpendTierChangedEvent {
    pub player_id: String,
    pub tier: String,
    pub total_spent: i64,
    pub timestamp: i64,
}

impl OfferViewedEvent {
    pub fn into_properties(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

use crate::CoreResult;
use async_trait::async_trait;
use serde_json::Value;

/// Currency and inventory ledger owned by the host game.
///
/// Reward settlement calls this synchronously per line-item; a `false` or
/// error return means "grant failed" and the engine logs and moves on.
#[async_trait]
pub trait CurrencyLedger: Send + Sync {
    async fn add_currency(&self, player_id: &str, currency: &str, amount: i64) -> CoreResult<()>;
    async fn spend_currency(&self, player_id: &str, currency: &str, amount: i64) -> CoreResult<bool>;
    async fn get_currency(&self, player_id: &str, currency: &str) -> CoreResult<i64>;
    async fn add_inventory_item(&self, player_id: &str, item_id: &str, qty: u32) -> CoreResult<()>;
}

/// Fire-and-forget analytics ingestion. Never awaited for correctness;
/// callers discard the result.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn track_event(&self, name: &str, properties: Value) -> CoreResult<()>;
    async fn track_purchase(
        &self,
        name: &str,
        amount: i32,
        currency: &str,
        properties: Value,
    ) -> CoreResult<()>;
}

/// Blob persistence for the catalog snapshot and per-player profiles.
/// The document shape is owned by the caller; this trait only moves bytes.
#[async_trait]
pub trait CatalogPersistence: Send + Sync {
    async fn load_offer_state(&self) -> CoreResult<Option<Value>>;
    async fn save_offer_state(&self, document: &Value) -> CoreResult<()>;
    async fn load_profile(&self, player_id: &str) -> CoreResult<Option<Value>>;
    async fn save_profile(&self, player_id: &str, profile: &Value) -> CoreResult<()>;
}

/// Resolves a player's pricing region, consumed only by dynamic pricing.
pub trait RegionResolver: Send + Sync {
    fn region_for(&self, player_id: &str) -> Option<String>;
}

/// Default resolver for hosts without regional pricing
#[derive(Debug, Default)]
pub struct NoRegion;

impl RegionResolver for NoRegion {
    fn region_for(&self, _player_id: &str) -> Option<String> {
        None
    }
}

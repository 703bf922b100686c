//! In-memory collaborator implementations for tests and backend-less hosts.

use crate::collaborators::{AnalyticsSink, CatalogPersistence, CurrencyLedger};
use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Ledger backed by a plain map of (player, currency) → balance
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: Mutex<HashMap<(String, String), i64>>,
    inventory: Mutex<HashMap<(String, String), u32>>,
    /// Currencies that reject grants, for simulating collaborator failure
    failing: Mutex<Vec<String>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, player_id: &str, currency: &str, amount: i64) {
        self.balances
            .lock()
            .unwrap()
            .insert((player_id.to_string(), currency.to_string()), amount);
    }

    pub fn inventory_count(&self, player_id: &str, item_id: &str) -> u32 {
        *self
            .inventory
            .lock()
            .unwrap()
            .get(&(player_id.to_string(), item_id.to_string()))
            .unwrap_or(&0)
    }

    pub fn fail_currency(&self, currency: &str) {
        self.failing.lock().unwrap().push(currency.to_string());
    }
}

#[async_trait]
impl CurrencyLedger for InMemoryLedger {
    async fn add_currency(&self, player_id: &str, currency: &str, amount: i64) -> CoreResult<()> {
        if amount < 0 {
            return Err(CoreError::ValidationError(format!(
                "negative grant amount: {amount}"
            )));
        }
        if self.failing.lock().unwrap().iter().any(|c| c == currency) {
            return Err(CoreError::CollaboratorError(format!(
                "grant rejected for {currency}"
            )));
        }
        *self
            .balances
            .lock()
            .unwrap()
            .entry((player_id.to_string(), currency.to_string()))
            .or_insert(0) += amount;
        Ok(())
    }

    async fn spend_currency(&self, player_id: &str, currency: &str, amount: i64) -> CoreResult<bool> {
        if amount < 0 {
            return Err(CoreError::ValidationError(format!(
                "negative spend amount: {amount}"
            )));
        }
        let mut balances = self.balances.lock().unwrap();
        let key = (player_id.to_string(), currency.to_string());
        let balance = balances.entry(key).or_insert(0);
        if *balance < amount {
            return Ok(false);
        }
        *balance -= amount;
        Ok(true)
    }

    async fn get_currency(&self, player_id: &str, currency: &str) -> CoreResult<i64> {
        Ok(*self
            .balances
            .lock()
            .unwrap()
            .get(&(player_id.to_string(), currency.to_string()))
            .unwrap_or(&0))
    }

    async fn add_inventory_item(&self, player_id: &str, item_id: &str, qty: u32) -> CoreResult<()> {
        *self
            .inventory
            .lock()
            .unwrap()
            .entry((player_id.to_string(), item_id.to_string()))
            .or_insert(0) += qty;
        Ok(())
    }
}

/// Sink that records events for assertions and drops nothing
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    pub events: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl AnalyticsSink for RecordingAnalytics {
    async fn track_event(&self, name: &str, properties: Value) -> CoreResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((name.to_string(), properties));
        Ok(())
    }

    async fn track_purchase(
        &self,
        name: &str,
        amount: i32,
        currency: &str,
        mut properties: Value,
    ) -> CoreResult<()> {
        if let Some(obj) = properties.as_object_mut() {
            obj.insert("amount".to_string(), Value::from(amount));
            obj.insert("currency".to_string(), Value::from(currency));
        }
        self.events
            .lock()
            .unwrap()
            .push((name.to_string(), properties));
        Ok(())
    }
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NullAnalytics;

#[async_trait]
impl AnalyticsSink for NullAnalytics {
    async fn track_event(&self, _name: &str, _properties: Value) -> CoreResult<()> {
        Ok(())
    }

    async fn track_purchase(
        &self,
        _name: &str,
        _amount: i32,
        _currency: &str,
        _properties: Value,
    ) -> CoreResult<()> {
        Ok(())
    }
}

/// Persistence backed by maps; documents survive for the process lifetime
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    offer_state: Mutex<Option<Value>>,
    profiles: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl CatalogPersistence for InMemoryPersistence {
    async fn load_offer_state(&self) -> CoreResult<Option<Value>> {
        Ok(self.offer_state.lock().unwrap().clone())
    }

    async fn save_offer_state(&self, document: &Value) -> CoreResult<()> {
        *self.offer_state.lock().unwrap() = Some(document.clone());
        Ok(())
    }

    async fn load_profile(&self, player_id: &str) -> CoreResult<Option<Value>> {
        Ok(self.profiles.lock().unwrap().get(player_id).cloned())
    }

    async fn save_profile(&self, player_id: &str, profile: &Value) -> CoreResult<()> {
        self.profiles
            .lock()
            .unwrap()
            .insert(player_id.to_string(), profile.clone());
        Ok(())
    }
}

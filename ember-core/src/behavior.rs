use ember_shared::PlayerBehavior;
use std::collections::HashMap;

/// Owns every player's behavior record. All mutation flows through purchase
/// settlement or the explicit update entry points on the engine; nothing else
/// writes here.
#[derive(Debug, Default)]
pub struct BehaviorStore {
    players: HashMap<String, PlayerBehavior>,
}

impl BehaviorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a player's record, creating zeroed defaults on first reference
    pub fn get_or_create(&mut self, player_id: &str) -> &mut PlayerBehavior {
        self.players
            .entry(player_id.to_string())
            .or_insert_with(|| PlayerBehavior::new(player_id))
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerBehavior> {
        self.players.get(player_id)
    }

    /// Restore a persisted record, replacing any in-memory state
    pub fn restore(&mut self, behavior: PlayerBehavior) {
        self.players.insert(behavior.player_id.clone(), behavior);
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerBehavior> {
        self.players.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ember_shared::OfferType;

    #[test]
    fn first_reference_creates_zeroed_record() {
        let mut store = BehaviorStore::new();
        let behavior = store.get_or_create("p1");
        assert_eq!(behavior.purchase_count, 0);
        assert_eq!(behavior.total_spent, 0);
        assert!(behavior.last_purchase_time.is_none());
    }

    #[test]
    fn record_purchase_updates_counters() {
        let mut store = BehaviorStore::new();
        let now = Utc::now();
        let behavior = store.get_or_create("p1");
        behavior.record_purchase(OfferType::Flash, 999, now);
        behavior.record_purchase(OfferType::Flash, 499, now);

        assert_eq!(behavior.purchase_count, 2);
        assert_eq!(behavior.total_spent, 1498);
        assert_eq!(behavior.purchase_history[&OfferType::Flash], 2);
        assert_eq!(behavior.last_purchase_time, Some(now));
    }
}

use crate::benefit::TimeBoundedBenefit;
use crate::LifecycleError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// A live impulse/limited-time countdown shown to one player.
/// Only start and expiry timestamps are stored; remaining time is derived on
/// read and the periodic sweep performs the expiry transition, so the number
/// of scheduled tasks stays constant regardless of how many countdowns exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownInstance {
    pub offer_id: String,
    #[serde(flatten)]
    pub instance: TimeBoundedBenefit,
}

pub struct CountdownManager {
    countdowns: HashMap<(String, String), CountdownInstance>,
}

impl CountdownManager {
    pub fn new() -> Self {
        Self {
            countdowns: HashMap::new(),
        }
    }

    /// Begin a countdown for (player, offer). A second start while one is
    /// live fails; after expiry the slot reopens.
    pub fn start(
        &mut self,
        player_id: &str,
        offer_id: &str,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let key = (player_id.to_string(), offer_id.to_string());
        if let Some(existing) = self.countdowns.get(&key) {
            if existing.instance.is_active {
                return Err(LifecycleError::AlreadyActive(format!(
                    "{player_id}/{offer_id}"
                )));
            }
        }
        let instance = TimeBoundedBenefit::new(player_id, now, duration, Vec::new());
        info!(player_id, offer_id, "countdown started");
        self.countdowns.insert(
            key,
            CountdownInstance {
                offer_id: offer_id.to_string(),
                instance,
            },
        );
        Ok(())
    }

    pub fn time_remaining(
        &self,
        player_id: &str,
        offer_id: &str,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let key = (player_id.to_string(), offer_id.to_string());
        self.countdowns
            .get(&key)
            .filter(|c| c.instance.is_active && !c.instance.is_expired(now))
            .map(|c| c.instance.expires_at - now)
    }

    pub fn cancel(&mut self, player_id: &str, offer_id: &str) -> Result<(), LifecycleError> {
        let key = (player_id.to_string(), offer_id.to_string());
        let countdown = self
            .countdowns
            .get_mut(&key)
            .filter(|c| c.instance.is_active)
            .ok_or_else(|| LifecycleError::NotActive(format!("{player_id}/{offer_id}")))?;
        countdown.instance.cancel();
        Ok(())
    }

    /// Single sweep over all live countdowns; expired entries are dropped
    /// once their transition has run.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let mut transitioned = 0;
        for countdown in self.countdowns.values_mut() {
            if countdown.instance.expire_if_due(now) {
                transitioned += 1;
            }
        }
        self.countdowns.retain(|_, c| c.instance.is_active);
        transitioned
    }

    pub fn active_count(&self) -> usize {
        self.countdowns
            .values()
            .filter(|c| c.instance.is_active)
            .count()
    }
}

impl Default for CountdownManager {
    fn default() -> Self {
        Self::new()
    }
}

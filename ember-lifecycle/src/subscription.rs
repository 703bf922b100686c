use crate::benefit::{Benefit, TimeBoundedBenefit};
use crate::LifecycleError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionTier {
    pub id: String,
    pub name: String,
    pub duration_days: i64,
    pub price: i32,
    pub benefits: Vec<Benefit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub tier_id: String,
    #[serde(flatten)]
    pub instance: TimeBoundedBenefit,
}

/// Subscription lifecycle. A player holds at most one subscription; starting
/// a second while one is active fails, renewal extends the existing instance.
pub struct SubscriptionManager {
    tiers: Vec<SubscriptionTier>,
    subscriptions: HashMap<String, Subscription>,
}

impl SubscriptionManager {
    pub fn new(tiers: Vec<SubscriptionTier>) -> Self {
        Self {
            tiers,
            subscriptions: HashMap::new(),
        }
    }

    pub fn tier(&self, tier_id: &str) -> Option<&SubscriptionTier> {
        self.tiers.iter().find(|t| t.id == tier_id)
    }

    pub fn subscription(&self, player_id: &str) -> Option<&Subscription> {
        self.subscriptions.get(player_id)
    }

    pub fn start(
        &mut self,
        player_id: &str,
        tier_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        let tier = self
            .tier(tier_id)
            .ok_or_else(|| LifecycleError::UnknownTier(tier_id.to_string()))?
            .clone();

        match self.subscriptions.get_mut(player_id) {
            Some(existing) if existing.instance.is_active => {
                if existing.tier_id == tier_id {
                    // Re-subscribing to the held tier renews instead of failing
                    existing
                        .instance
                        .renew(now, Duration::days(tier.duration_days));
                    info!(player_id, tier_id, "subscription renewed");
                    return Ok(());
                }
                Err(LifecycleError::AlreadyActive(player_id.to_string()))
            }
            _ => {
                let instance = TimeBoundedBenefit::new(
                    player_id,
                    now,
                    Duration::days(tier.duration_days),
                    tier.benefits.clone(),
                );
                info!(player_id, tier_id, "subscription started");
                self.subscriptions.insert(
                    player_id.to_string(),
                    Subscription {
                        tier_id: tier_id.to_string(),
                        instance,
                    },
                );
                Ok(())
            }
        }
    }

    pub fn cancel(&mut self, player_id: &str) -> Result<(), LifecycleError> {
        let subscription = self
            .subscriptions
            .get_mut(player_id)
            .filter(|s| s.instance.is_active)
            .ok_or_else(|| LifecycleError::NotActive(player_id.to_string()))?;
        subscription.instance.cancel();
        info!(player_id, "subscription cancelled");
        Ok(())
    }

    /// Periodic expiry sweep; returns the players whose subscription just
    /// transitioned to Expired.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut expired = Vec::new();
        for (player_id, subscription) in self.subscriptions.iter_mut() {
            if subscription.instance.expire_if_due(now) {
                expired.push(player_id.clone());
            }
        }
        expired
    }

    /// Benefit multiplier for an active subscription; 1.0 once expired or
    /// cancelled.
    pub fn multiplier_for(&self, player_id: &str, benefit_type: &str) -> f64 {
        self.subscriptions
            .get(player_id)
            .and_then(|s| s.instance.benefit_value(benefit_type))
            .unwrap_or(1.0)
    }

    pub fn active_count(&self) -> usize {
        self.subscriptions
            .values()
            .filter(|s| s.instance.is_active)
            .count()
    }
}

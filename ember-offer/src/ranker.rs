use chrono::{DateTime, Utc};
use ember_catalog::models::{Offer, RewardType};
use ember_catalog::segments::PlayerSegment;
use ember_shared::PlayerBehavior;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Offer type is in the player's segment preferred set
    pub preferred_type_factor: f64,
    /// Offer type appears in the player's purchase history
    pub repeat_type_factor: f64,
    /// Offer rewards a currency the player is low on
    pub low_resource_factor: f64,
    /// Offer rewards the player's scarcest currency
    pub scarcest_resource_factor: f64,
    /// Balance below which a currency counts as low
    pub low_resource_threshold: i64,
    /// Scale on the remaining-window fraction for time-boxed offers
    pub time_decay_scale: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            preferred_type_factor: 1.3,
            repeat_type_factor: 1.2,
            low_resource_factor: 1.2,
            scarcest_resource_factor: 1.3,
            low_resource_threshold: 100,
            time_decay_scale: 1.5,
        }
    }
}

/// Composite scoring over eligible offers.
///
/// score = priority × segment priority multiplier × personalization ×
/// time decay. The sort is stable by construction: equal scores keep catalog
/// declaration order.
pub struct OfferRanker {
    config: RankingConfig,
}

impl OfferRanker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Sort descending by score, keeping declaration order on ties
    pub fn rank<'a>(
        &self,
        offers: Vec<&'a Offer>,
        behavior: &PlayerBehavior,
        segment: Option<&PlayerSegment>,
        balances: Option<&HashMap<String, i64>>,
        now: DateTime<Utc>,
    ) -> Vec<&'a Offer> {
        let mut scored: Vec<(f64, &'a Offer)> = offers
            .into_iter()
            .map(|o| (self.score(o, behavior, segment, balances, now), o))
            .collect();

        // sort_by is stable, so equal scores retain declaration order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(_, offer)| offer).collect()
    }

    pub fn score(
        &self,
        offer: &Offer,
        behavior: &PlayerBehavior,
        segment: Option<&PlayerSegment>,
        balances: Option<&HashMap<String, i64>>,
        now: DateTime<Utc>,
    ) -> f64 {
        let priority = offer.priority as f64;
        let segment_multiplier = segment.map(|s| s.priority_multiplier).unwrap_or(1.0);
        let personalization = self.personalization_factor(offer, behavior, segment, balances);
        let decay = self.time_decay_factor(offer, now);

        priority * segment_multiplier * personalization * decay
    }

    fn personalization_factor(
        &self,
        offer: &Offer,
        behavior: &PlayerBehavior,
        segment: Option<&PlayerSegment>,
        balances: Option<&HashMap<String, i64>>,
    ) -> f64 {
        let mut factor = 1.0;

        if segment.map(|s| s.prefers(offer.offer_type)).unwrap_or(false) {
            factor *= self.config.preferred_type_factor;
        }

        if behavior
            .purchase_history
            .get(&offer.offer_type)
            .copied()
            .unwrap_or(0)
            > 0
        {
            factor *= self.config.repeat_type_factor;
        }

        if let Some(balances) = balances {
            factor *= self.resource_factor(offer, balances);
        }

        factor
    }

    /// Reward a currency the player is short on; the scarcest one scores
    /// slightly higher than merely-low ones.
    fn resource_factor(&self, offer: &Offer, balances: &HashMap<String, i64>) -> f64 {
        let scarcest = balances
            .iter()
            .min_by_key(|(_, balance)| **balance)
            .map(|(code, _)| code.as_str());

        let mut factor = 1.0f64;
        for reward in &offer.rewards {
            if let RewardType::Currency { code } = &reward.reward_type {
                let balance = match balances.get(code) {
                    Some(b) => *b,
                    None => continue,
                };
                if balance >= self.config.low_resource_threshold {
                    continue;
                }
                let candidate = if scarcest == Some(code.as_str()) {
                    self.config.scarcest_resource_factor
                } else {
                    self.config.low_resource_factor
                };
                factor = factor.max(candidate);
            }
        }
        factor
    }

    /// Time-boxed offers lose ranking weight as they approach expiry, so a
    /// fresh flash offer outranks a stale one at equal priority.
    fn time_decay_factor(&self, offer: &Offer, now: DateTime<Utc>) -> f64 {
        if !offer.is_time_boxed() {
            return 1.0;
        }
        offer.window_fraction_remaining(now) * self.config.time_decay_scale
    }
}

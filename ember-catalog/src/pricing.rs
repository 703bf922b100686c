use crate::models::Offer;
use chrono::{DateTime, Utc};
use ember_shared::PlayerBehavior;
use serde::{Deserialize, Serialize};

/// Pluggable demand signal in [0, 1].
///
/// The default is a bounded random stand-in; a real measured signal plugs in
/// behind this trait without touching the calculator.
pub trait DemandSignal: Send + Sync {
    fn demand_for(&self, offer_id: &str) -> f64;
}

/// Placeholder demand: uniform random within configured bounds
pub struct RandomDemand {
    pub low: f64,
    pub high: f64,
}

impl Default for RandomDemand {
    fn default() -> Self {
        Self {
            low: 0.0,
            high: 1.0,
        }
    }
}

impl DemandSignal for RandomDemand {
    fn demand_for(&self, _offer_id: &str) -> f64 {
        use rand::Rng;
        rand::thread_rng().gen_range(self.low..=self.high)
    }
}

/// Constant demand, used by tests and the price-refresh sweep
pub struct FixedDemand(pub f64);

impl DemandSignal for FixedDemand {
    fn demand_for(&self, _offer_id: &str) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Hours after which an untouched price earns the staleness discount
    pub staleness_hours: i64,
    pub staleness_multiplier: f64,
    /// Demand above this multiplies the price up
    pub demand_high_threshold: f64,
    pub demand_high_multiplier: f64,
    /// Demand below this multiplies the price down
    pub demand_low_threshold: f64,
    pub demand_low_multiplier: f64,
    /// total_spent (cents) at which a player counts as a high spender
    pub high_spender_min_spent: i64,
    pub high_spender_multiplier: f64,
    /// A player with at least this many purchases and a per-purchase average
    /// below `price_sensitive_avg_spent` counts as price-sensitive
    pub price_sensitive_min_purchases: u32,
    pub price_sensitive_avg_spent: i64,
    pub price_sensitive_multiplier: f64,
    /// Applied when the player purchased within the last hour
    pub urgency_window_hours: f64,
    pub urgency_multiplier: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            staleness_hours: 24,
            staleness_multiplier: 0.9,
            demand_high_threshold: 0.8,
            demand_high_multiplier: 1.2,
            demand_low_threshold: 0.3,
            demand_low_multiplier: 0.8,
            high_spender_min_spent: 5_000,
            high_spender_multiplier: 1.15,
            price_sensitive_min_purchases: 3,
            price_sensitive_avg_spent: 300,
            price_sensitive_multiplier: 0.9,
            urgency_window_hours: 1.0,
            urgency_multiplier: 1.1,
        }
    }
}

/// Computes a clamped current price per request.
///
/// Player-specific flags compound multiplicatively and independently: a
/// price-sensitive high spender gets both factors in full. A regional
/// override, when present, replaces the computed value instead of scaling it.
pub struct DynamicPricing {
    config: PricingConfig,
    demand: Box<dyn DemandSignal>,
}

impl DynamicPricing {
    pub fn new(config: PricingConfig, demand: Box<dyn DemandSignal>) -> Self {
        Self { config, demand }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn price_for(
        &self,
        offer: &Offer,
        behavior: &PlayerBehavior,
        segment_price_multiplier: Option<f64>,
        region: Option<&str>,
        now: DateTime<Utc>,
    ) -> i32 {
        if let Some(region) = region {
            if let Some(&override_price) = offer.pricing.region_overrides.get(region) {
                return offer.pricing.clamp(override_price);
            }
        }

        let mut multiplier = self.market_multiplier(offer, now);
        multiplier *= self.player_multiplier(behavior, now);
        if let Some(segment) = segment_price_multiplier {
            multiplier *= segment;
        }

        let price = (offer.pricing.discounted_base() * multiplier).round() as i32;
        offer.pricing.clamp(price)
    }

    /// Player-independent layer: staleness and demand. The price-refresh
    /// sweep uses this alone to restamp catalog prices.
    pub fn market_multiplier(&self, offer: &Offer, now: DateTime<Utc>) -> f64 {
        let mut multiplier = 1.0;

        let price_age = now - offer.pricing.updated_at;
        if price_age.num_hours() > self.config.staleness_hours {
            multiplier *= self.config.staleness_multiplier;
        }

        let demand = self.demand.demand_for(&offer.id);
        if demand > self.config.demand_high_threshold {
            multiplier *= self.config.demand_high_multiplier;
        } else if demand < self.config.demand_low_threshold {
            multiplier *= self.config.demand_low_multiplier;
        }

        multiplier
    }

    fn player_multiplier(&self, behavior: &PlayerBehavior, now: DateTime<Utc>) -> f64 {
        let mut multiplier = 1.0;

        if behavior.total_spent >= self.config.high_spender_min_spent {
            multiplier *= self.config.high_spender_multiplier;
        }

        if behavior.purchase_count >= self.config.price_sensitive_min_purchases {
            let avg = behavior.total_spent / behavior.purchase_count as i64;
            if avg < self.config.price_sensitive_avg_spent {
                multiplier *= self.config.price_sensitive_multiplier;
            }
        }

        if let Some(hours) = behavior.hours_since_last_purchase(now) {
            if hours < self.config.urgency_window_hours {
                multiplier *= self.config.urgency_multiplier;
            }
        }

        multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricingBlock;
    use chrono::Duration;
    use ember_shared::{OfferType, TriggerType};

    fn calculator(demand: f64) -> DynamicPricing {
        DynamicPricing::new(PricingConfig::default(), Box::new(FixedDemand(demand)))
    }

    fn offer(base_price: i32, discount: f64) -> Offer {
        let mut pricing = PricingBlock::new("USD", base_price);
        pricing.discount_percent = discount;
        Offer::new("o1", OfferType::Flash, TriggerType::Always, 95, pricing)
    }

    #[test]
    fn fresh_player_neutral_demand_gets_discounted_base() {
        let pricing = calculator(0.5);
        let offer = offer(1999, 50.0);
        let behavior = PlayerBehavior::new("fresh");
        let price = pricing.price_for(&offer, &behavior, None, None, Utc::now());
        // 1999 * 0.5 rounded
        assert_eq!(price, 1000);
    }

    #[test]
    fn high_demand_raises_low_demand_lowers() {
        let offer = offer(1000, 0.0);
        let behavior = PlayerBehavior::new("p1");
        let now = Utc::now();

        let high = calculator(0.9).price_for(&offer, &behavior, None, None, now);
        let low = calculator(0.1).price_for(&offer, &behavior, None, None, now);
        let neutral = calculator(0.5).price_for(&offer, &behavior, None, None, now);

        assert_eq!(high, 1200);
        assert_eq!(low, 800);
        assert_eq!(neutral, 1000);
    }

    #[test]
    fn stale_price_earns_discount() {
        let pricing = calculator(0.5);
        let mut offer = offer(1000, 0.0);
        offer.pricing.updated_at = Utc::now() - Duration::hours(30);
        let behavior = PlayerBehavior::new("p1");
        let price = pricing.price_for(&offer, &behavior, None, None, Utc::now());
        assert_eq!(price, 900);
    }

    #[test]
    fn recent_purchase_applies_urgency() {
        let pricing = calculator(0.5);
        let offer = offer(1000, 0.0);
        let now = Utc::now();

        let mut recent = PlayerBehavior::new("recent");
        recent.last_purchase_time = Some(now - Duration::minutes(30));
        let calm = PlayerBehavior::new("calm");

        let urgent_price = pricing.price_for(&offer, &recent, None, None, now);
        let calm_price = pricing.price_for(&offer, &calm, None, None, now);
        assert!(urgent_price > calm_price);
    }

    #[test]
    fn player_flags_compound_multiplicatively() {
        let pricing = calculator(0.5);
        let offer = offer(1000, 0.0);
        let now = Utc::now();

        // High spender who is also price-sensitive by average: both factors apply
        let mut b = PlayerBehavior::new("both");
        b.total_spent = 6_000;
        b.purchase_count = 30; // avg 200 < 300
        let price = pricing.price_for(&offer, &b, None, None, now);
        assert_eq!(price, (1000.0 * 1.15 * 0.9_f64).round() as i32);
    }

    #[test]
    fn regional_override_replaces_not_scales() {
        let pricing = calculator(0.9); // would multiply by 1.2 if computed
        let mut offer = offer(1000, 0.0);
        offer.pricing.region_overrides.insert("BR".to_string(), 499);
        let behavior = PlayerBehavior::new("p1");

        let price = pricing.price_for(&offer, &behavior, None, Some("BR"), Utc::now());
        assert_eq!(price, 499);

        // Unknown region falls back to the computed path
        let computed = pricing.price_for(&offer, &behavior, None, Some("JP"), Utc::now());
        assert_eq!(computed, 1200);
    }

    #[test]
    fn result_is_clamped_to_bounds() {
        let pricing = calculator(0.9);
        let mut offer = offer(1000, 0.0);
        offer.pricing.min_price = Some(900);
        offer.pricing.max_price = Some(1100);
        let mut b = PlayerBehavior::new("whale");
        b.total_spent = 100_000;

        let price = pricing.price_for(&offer, &b, Some(1.5), None, Utc::now());
        assert_eq!(price, 1100);
    }
}

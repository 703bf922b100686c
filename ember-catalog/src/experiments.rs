use crate::models::Offer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// One treatment arm of an A/B test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    /// Relative weight; weights across an experiment sum to 1.0
    pub weight: f64,
    pub price_override: Option<i32>,
    pub discount_override: Option<f64>,
}

/// An A/B test over offer pricing/metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub id: String,
    pub variants: Vec<Variant>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl ExperimentDefinition {
    pub fn is_running(&self, now: DateTime<Utc>) -> bool {
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
        !self.variants.is_empty()
    }

    /// Deterministic variant assignment: a pure function of
    /// (experiment id, player id). No persisted assignment state is needed
    /// because recomputation always lands in the same bucket while the
    /// weight table is unchanged.
    pub fn variant_for(&self, player_id: &str) -> Option<&Variant> {
        if self.variants.is_empty() {
            return None;
        }

        let bucket = Self::bucket(&self.id, player_id);
        let mut cumulative = 0.0;
        for variant in &self.variants {
            cumulative += variant.weight;
            if bucket < cumulative {
                return Some(variant);
            }
        }
        // Weights that sum slightly under 1.0 leave a sliver; the last
        // variant absorbs it.
        self.variants.last()
    }

    /// Hash of (experiment id, player id) mapped into [0, 1)
    fn bucket(experiment_id: &str, player_id: &str) -> f64 {
        let mut hasher = DefaultHasher::new();
        experiment_id.hash(&mut hasher);
        player_id.hash(&mut hasher);
        (hasher.finish() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Apply a variant as a pure transform on a copy of the offer. The
    /// canonical catalog entry is never touched, so one player's variant
    /// cannot leak into another player's view.
    pub fn apply(&self, variant: &Variant, offer: &Offer) -> Offer {
        let mut shown = offer.clone();
        if let Some(price) = variant.price_override {
            shown.pricing.base_price = price;
            shown.pricing.current_price = shown.pricing.clamp(price);
        }
        if let Some(discount) = variant.discount_override {
            shown.pricing.discount_percent = discount;
        }
        shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PricingBlock;
    use ember_shared::{OfferType, TriggerType};

    fn experiment() -> ExperimentDefinition {
        ExperimentDefinition {
            id: "price_test_1".to_string(),
            variants: vec![
                Variant {
                    name: "control".to_string(),
                    weight: 0.5,
                    price_override: None,
                    discount_override: None,
                },
                Variant {
                    name: "cheap".to_string(),
                    weight: 0.5,
                    price_override: Some(999),
                    discount_override: None,
                },
            ],
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn assignment_is_deterministic() {
        let exp = experiment();
        for player in ["p1", "p2", "another-player", "0000"] {
            let first = exp.variant_for(player).unwrap().name.clone();
            let second = exp.variant_for(player).unwrap().name.clone();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn both_variants_are_reachable() {
        let exp = experiment();
        let mut seen = std::collections::HashSet::new();
        for i in 0..200 {
            let name = exp.variant_for(&format!("player-{i}")).unwrap().name.clone();
            seen.insert(name);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn apply_leaves_catalog_entry_untouched() {
        let exp = experiment();
        let offer = Offer::new(
            "o1",
            OfferType::Flash,
            TriggerType::Always,
            50,
            PricingBlock::new("USD", 1999),
        );
        let cheap = exp.variants.iter().find(|v| v.name == "cheap").unwrap();
        let shown = exp.apply(cheap, &offer);

        assert_eq!(shown.pricing.base_price, 999);
        assert_eq!(offer.pricing.base_price, 1999);
    }

    #[test]
    fn expired_experiment_is_not_running() {
        let mut exp = experiment();
        exp.ends_at = Some(Utc::now() - chrono::Duration::hours(1));
        assert!(!exp.is_running(Utc::now()));
    }
}

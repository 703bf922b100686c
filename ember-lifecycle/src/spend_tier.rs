use crate::benefit::Benefit;
use serde::{Deserialize, Serialize};

/// One VIP status level, unlocked by cumulative spend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendTier {
    pub id: String,
    /// Minimum total_spent (cents) for this tier
    pub threshold: i64,
    /// Applied to currency reward grants while the player holds the tier
    pub reward_multiplier: f64,
    #[serde(default)]
    pub benefits: Vec<Benefit>,
}

/// Ordered spend-tier table. A player's tier is the highest threshold not
/// exceeding their total spend; recomputed after every completed purchase.
pub struct SpendTierTable {
    tiers: Vec<SpendTier>,
}

impl SpendTierTable {
    /// Tiers are kept sorted ascending by threshold regardless of input order
    pub fn new(mut tiers: Vec<SpendTier>) -> Self {
        tiers.sort_by_key(|t| t.threshold);
        Self { tiers }
    }

    pub fn tier_for(&self, total_spent: i64) -> Option<&SpendTier> {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.threshold <= total_spent)
    }

    pub fn reward_multiplier(&self, total_spent: i64) -> f64 {
        self.tier_for(total_spent)
            .map(|t| t.reward_multiplier)
            .unwrap_or(1.0)
    }

    pub fn tiers(&self) -> &[SpendTier] {
        &self.tiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SpendTierTable {
        SpendTierTable::new(vec![
            SpendTier {
                id: "vip_gold".to_string(),
                threshold: 50_000,
                reward_multiplier: 1.5,
                benefits: vec![],
            },
            SpendTier {
                id: "vip_bronze".to_string(),
                threshold: 10_000,
                reward_multiplier: 1.1,
                benefits: vec![],
            },
            SpendTier {
                id: "vip_silver".to_string(),
                threshold: 25_000,
                reward_multiplier: 1.25,
                benefits: vec![],
            },
        ])
    }

    #[test]
    fn highest_threshold_not_exceeding_spend_wins() {
        let table = table();
        assert!(table.tier_for(5_000).is_none());
        assert_eq!(table.tier_for(10_000).unwrap().id, "vip_bronze");
        assert_eq!(table.tier_for(30_000).unwrap().id, "vip_silver");
        assert_eq!(table.tier_for(999_999).unwrap().id, "vip_gold");
    }

    #[test]
    fn multiplier_defaults_to_neutral_below_first_tier() {
        let table = table();
        assert_eq!(table.reward_multiplier(0), 1.0);
        assert_eq!(table.reward_multiplier(25_000), 1.25);
    }
}

use crate::benefit::{Benefit, TimeBoundedBenefit};
use crate::LifecycleError;
use chrono::{DateTime, Duration, Utc};
use ember_catalog::models::RewardItem;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// One pass level: awarded once accumulated XP reaches `cumulative_xp`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassThreshold {
    pub level: u32,
    pub cumulative_xp: u64,
    #[serde(default)]
    pub rewards: Vec<RewardItem>,
}

/// Season definition the pass instances snapshot from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassSeason {
    pub id: String,
    pub duration_days: i64,
    /// Ascending by cumulative_xp; level 0 (threshold 0) is implicit
    pub thresholds: Vec<PassThreshold>,
    #[serde(default)]
    pub benefits: Vec<Benefit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassInstance {
    pub season_id: String,
    pub xp: u64,
    pub level: u32,
    #[serde(flatten)]
    pub instance: TimeBoundedBenefit,
}

/// Seasonal pass lifecycle: one active pass per player, XP-driven level-ups,
/// sweep-driven expiry.
pub struct SeasonPassManager {
    season: PassSeason,
    passes: HashMap<String, PassInstance>,
}

impl SeasonPassManager {
    pub fn new(season: PassSeason) -> Self {
        Self {
            season,
            passes: HashMap::new(),
        }
    }

    pub fn season(&self) -> &PassSeason {
        &self.season
    }

    pub fn pass(&self, player_id: &str) -> Option<&PassInstance> {
        self.passes.get(player_id)
    }

    pub fn start(&mut self, player_id: &str, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if let Some(existing) = self.passes.get(player_id) {
            if existing.instance.is_active {
                return Err(LifecycleError::AlreadyActive(player_id.to_string()));
            }
        }
        let instance = TimeBoundedBenefit::new(
            player_id,
            now,
            Duration::days(self.season.duration_days),
            self.season.benefits.clone(),
        );
        info!(player_id, season = %self.season.id, "season pass started");
        self.passes.insert(
            player_id.to_string(),
            PassInstance {
                season_id: self.season.id.clone(),
                xp: 0,
                level: 0,
                instance,
            },
        );
        Ok(())
    }

    /// Accumulate XP and return every threshold crossed, lowest level first.
    /// A large XP jump grants every intermediate level's rewards; none are
    /// skipped. XP on an expired or missing pass is dropped.
    pub fn add_xp(&mut self, player_id: &str, amount: u64) -> Vec<PassThreshold> {
        let pass = match self
            .passes
            .get_mut(player_id)
            .filter(|p| p.instance.is_active)
        {
            Some(p) => p,
            None => return Vec::new(),
        };

        pass.xp += amount;
        let previous_level = pass.level;

        let crossed: Vec<PassThreshold> = self
            .season
            .thresholds
            .iter()
            .filter(|t| t.level > previous_level && t.cumulative_xp <= pass.xp)
            .cloned()
            .collect();

        if let Some(highest) = crossed.last() {
            pass.level = highest.level;
            info!(
                player_id,
                from = previous_level,
                to = pass.level,
                "season pass level up"
            );
        }
        crossed
    }

    /// Periodic expiry sweep; returns players whose pass just expired
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut expired = Vec::new();
        for (player_id, pass) in self.passes.iter_mut() {
            if pass.instance.expire_if_due(now) {
                expired.push(player_id.clone());
            }
        }
        expired
    }

    pub fn active_count(&self) -> usize {
        self.passes
            .values()
            .filter(|p| p.instance.is_active)
            .count()
    }
}

use crate::config::EngineConfig;
use chrono::{DateTime, Duration, Utc};
use ember_catalog::conditions::EvalContext;
use ember_catalog::models::RewardType;
use ember_catalog::pricing::{DemandSignal, DynamicPricing, RandomDemand};
use ember_catalog::segments::{PlayerSegment, SegmentationEngine};
use ember_catalog::store::CatalogStore;
use ember_core::behavior::BehaviorStore;
use ember_core::clock::{Clock, SystemClock};
use ember_core::collaborators::{
    AnalyticsSink, CatalogPersistence, CurrencyLedger, RegionResolver,
};
use ember_lifecycle::{
    CountdownManager, PassSeason, SeasonPassManager, SpendTierTable, SubscriptionManager,
    SubscriptionTier,
};
use ember_offer::ranker::OfferRanker;
use ember_offer::selection::{OfferSelector, PricedOffer};
use ember_shared::models::events::{
    OfferViewedEvent, PassLevelUpEvent, SubscriptionEvent,
};
use ember_shared::PlayerBehavior;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

/// External systems the engine talks to. Constructed by the host and handed
/// in explicitly; there is no global engine instance.
pub struct Collaborators {
    pub ledger: Arc<dyn CurrencyLedger>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub persistence: Arc<dyn CatalogPersistence>,
    pub regions: Arc<dyn RegionResolver>,
    pub clock: Arc<dyn Clock>,
}

/// Aggregate counters for the live-ops dashboard
#[derive(Debug, Clone, Serialize, Default)]
pub struct EngineStatistics {
    pub active_subscriptions: usize,
    pub active_passes: usize,
    pub active_countdowns: usize,
    pub revenue: i64,
    pub purchases_completed: u64,
    pub offers_served: u64,
    pub players_tracked: usize,
    pub tier_distribution: HashMap<String, usize>,
}

/// The monetization engine: offer selection, purchase settlement and the
/// time-bounded benefit lifecycles, behind one explicitly constructed object.
pub struct MonetizationEngine {
    pub(crate) config: EngineConfig,
    pub(crate) catalog: CatalogStore,
    pub(crate) behavior: BehaviorStore,
    pub(crate) selector: OfferSelector,
    pub(crate) subscriptions: SubscriptionManager,
    pub(crate) passes: SeasonPassManager,
    pub(crate) countdowns: CountdownManager,
    pub(crate) spend_tiers: SpendTierTable,
    pub(crate) collab: Collaborators,
    pub(crate) revenue: i64,
    pub(crate) purchases_completed: u64,
    pub(crate) offers_served: u64,
}

impl MonetizationEngine {
    pub fn new(
        config: EngineConfig,
        catalog: CatalogStore,
        subscription_tiers: Vec<SubscriptionTier>,
        season: PassSeason,
        spend_tiers: SpendTierTable,
        collab: Collaborators,
        demand: Box<dyn DemandSignal>,
    ) -> Self {
        let selector = OfferSelector::new(
            OfferRanker::new(config.ranking.clone()),
            DynamicPricing::new(config.pricing.clone(), demand),
        );
        Self {
            config,
            catalog,
            behavior: BehaviorStore::new(),
            selector,
            subscriptions: SubscriptionManager::new(subscription_tiers),
            passes: SeasonPassManager::new(season),
            countdowns: CountdownManager::new(),
            spend_tiers,
            collab,
            revenue: 0,
            purchases_completed: 0,
            offers_served: 0,
        }
    }

    /// Engine with wall-clock time and the placeholder random demand signal
    pub fn with_defaults(
        config: EngineConfig,
        catalog: CatalogStore,
        subscription_tiers: Vec<SubscriptionTier>,
        season: PassSeason,
        spend_tiers: SpendTierTable,
        ledger: Arc<dyn CurrencyLedger>,
        analytics: Arc<dyn AnalyticsSink>,
        persistence: Arc<dyn CatalogPersistence>,
        regions: Arc<dyn RegionResolver>,
    ) -> Self {
        let collab = Collaborators {
            ledger,
            analytics,
            persistence,
            regions,
            clock: Arc::new(SystemClock),
        };
        Self::new(
            config,
            catalog,
            subscription_tiers,
            season,
            spend_tiers,
            collab,
            Box::new(RandomDemand::default()),
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.collab.clock.now()
    }

    /// The ranked, priced, capped offer list for one player.
    ///
    /// Emits one "offer viewed" analytics event per returned offer; analytics
    /// failures never fail the call.
    pub async fn get_offers(&mut self, player_id: &str, max_offers: usize) -> Vec<PricedOffer> {
        let now = self.now();
        let max_offers = max_offers.min(self.config.max_offers);
        let behavior = self.behavior_snapshot(player_id).await;
        let balances = self.balance_snapshot(player_id).await;

        let ctx = EvalContext::new(&behavior, Some(&balances), now);
        let segment = SegmentationEngine::new(self.catalog.segments()).classify(&ctx);
        let region = self.collab.regions.region_for(player_id);

        let shown = self.selector.select(
            &self.catalog,
            &behavior,
            Some(&balances),
            segment,
            region.as_deref(),
            max_offers,
            now,
        );

        self.offers_served += shown.len() as u64;
        for priced in &shown {
            let event = OfferViewedEvent {
                offer_id: priced.offer.id.clone(),
                player_id: player_id.to_string(),
                price: priced.price,
                currency: priced.offer.pricing.currency.clone(),
                variant: priced.variant.clone(),
                timestamp: now.timestamp(),
            };
            let _ = self
                .collab
                .analytics
                .track_event("offer_viewed", event.into_properties())
                .await;
        }
        shown
    }

    pub async fn start_subscription(&mut self, player_id: &str, tier_id: &str) -> bool {
        let now = self.now();
        match self.subscriptions.start(player_id, tier_id, now) {
            Ok(()) => {
                self.emit_subscription_event(player_id, tier_id, "started", now)
                    .await;
                true
            }
            Err(e) => {
                info!(player_id, tier_id, "subscription start rejected: {e}");
                false
            }
        }
    }

    pub async fn cancel_subscription(&mut self, player_id: &str) -> bool {
        let now = self.now();
        let tier_id = self
            .subscriptions
            .subscription(player_id)
            .map(|s| s.tier_id.clone())
            .unwrap_or_default();
        match self.subscriptions.cancel(player_id) {
            Ok(()) => {
                self.emit_subscription_event(player_id, &tier_id, "cancelled", now)
                    .await;
                true
            }
            Err(e) => {
                info!(player_id, "subscription cancel rejected: {e}");
                false
            }
        }
    }

    pub async fn start_season_pass(&mut self, player_id: &str) -> bool {
        let now = self.now();
        match self.passes.start(player_id, now) {
            Ok(()) => true,
            Err(e) => {
                info!(player_id, "season pass start rejected: {e}");
                false
            }
        }
    }

    /// Accumulate seasonal-pass XP. Every threshold crossed by the jump has
    /// its rewards granted, lowest level first; no level is skipped.
    pub async fn add_pass_xp(&mut self, player_id: &str, amount: u64) {
        let now = self.now();
        let crossed = self.passes.add_xp(player_id, amount);
        if crossed.is_empty() {
            return;
        }

        let from_level = crossed.first().map(|t| t.level - 1).unwrap_or(0);
        let to_level = crossed.last().map(|t| t.level).unwrap_or(0);
        for threshold in &crossed {
            for reward in &threshold.rewards {
                self.grant_reward(player_id, &reward.reward_type, reward.amount, 1.0)
                    .await;
            }
        }

        let total_xp = self.passes.pass(player_id).map(|p| p.xp).unwrap_or(0);
        let event = PassLevelUpEvent {
            player_id: player_id.to_string(),
            from_level,
            to_level,
            total_xp,
            timestamp: now.timestamp(),
        };
        let _ = self
            .collab
            .analytics
            .track_event(
                "pass_level_up",
                serde_json::to_value(event).unwrap_or_default(),
            )
            .await;
    }

    /// Begin an impulse countdown for (player, offer); false when one is
    /// already running.
    pub fn start_countdown(&mut self, player_id: &str, offer_id: &str, duration: Duration) -> bool {
        let now = self.now();
        self.countdowns
            .start(player_id, offer_id, duration, now)
            .is_ok()
    }

    pub fn countdown_remaining(&self, player_id: &str, offer_id: &str) -> Option<Duration> {
        self.countdowns
            .time_remaining(player_id, offer_id, self.now())
    }

    pub fn cancel_countdown(&mut self, player_id: &str, offer_id: &str) -> bool {
        self.countdowns.cancel(player_id, offer_id).is_ok()
    }

    pub async fn update_level(&mut self, player_id: &str, level: u32) {
        self.behavior_snapshot(player_id).await;
        self.behavior.get_or_create(player_id).level = level;
        self.persist_profile(player_id).await;
    }

    pub async fn update_streak(&mut self, player_id: &str, streak: u32) {
        self.behavior_snapshot(player_id).await;
        self.behavior.get_or_create(player_id).current_streak = streak;
        self.persist_profile(player_id).await;
    }

    pub async fn update_completion_rate(&mut self, player_id: &str, rate: f64) {
        self.behavior_snapshot(player_id).await;
        self.behavior.get_or_create(player_id).completion_rate = rate;
        self.persist_profile(player_id).await;
    }

    pub fn get_statistics(&self) -> EngineStatistics {
        let mut tier_distribution: HashMap<String, usize> = HashMap::new();
        for behavior in self.behavior.iter() {
            let tier = self
                .spend_tiers
                .tier_for(behavior.total_spent)
                .map(|t| t.id.clone())
                .unwrap_or_else(|| "none".to_string());
            *tier_distribution.entry(tier).or_insert(0) += 1;
        }

        EngineStatistics {
            active_subscriptions: self.subscriptions.active_count(),
            active_passes: self.passes.active_count(),
            active_countdowns: self.countdowns.active_count(),
            revenue: self.revenue,
            purchases_completed: self.purchases_completed,
            offers_served: self.offers_served,
            players_tracked: self.behavior.player_count(),
            tier_distribution,
        }
    }

    pub fn spend_tier_for(&self, player_id: &str) -> Option<&ember_lifecycle::SpendTier> {
        let behavior = self.behavior.get(player_id)?;
        self.spend_tiers.tier_for(behavior.total_spent)
    }

    pub fn behavior(&self, player_id: &str) -> Option<&PlayerBehavior> {
        self.behavior.get(player_id)
    }

    pub fn has_active_subscription(&self, player_id: &str) -> bool {
        self.subscriptions
            .subscription(player_id)
            .map(|s| s.instance.is_active)
            .unwrap_or(false)
    }

    /// Benefit multiplier from an active subscription; 1.0 once expired or
    /// cancelled.
    pub fn subscription_multiplier(&self, player_id: &str, benefit_type: &str) -> f64 {
        self.subscriptions.multiplier_for(player_id, benefit_type)
    }

    pub fn pass_level(&self, player_id: &str) -> Option<u32> {
        self.passes.pass(player_id).map(|p| p.level)
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut CatalogStore {
        &mut self.catalog
    }

    /// Load the persisted catalog snapshot. A missing or malformed document
    /// leaves the engine with an empty catalog instead of failing startup.
    pub async fn load_state(&mut self) {
        match self.collab.persistence.load_offer_state().await {
            Ok(Some(document)) => {
                self.catalog = CatalogStore::from_document(&document);
                info!(
                    offers = self.catalog.offers().len(),
                    "catalog loaded from persistence"
                );
            }
            Ok(None) => info!("no persisted catalog, keeping current one"),
            Err(e) => warn!("catalog load failed, keeping current one: {e}"),
        }
    }

    /// Persist the catalog snapshot; called on teardown. Failure is logged
    /// and left for the host to retry.
    pub async fn save_state(&self) {
        let document = self.catalog.to_document();
        if let Err(e) = self.collab.persistence.save_offer_state(&document).await {
            warn!("catalog save failed: {e}");
        }
    }

    // ---- internals shared with settlement ----

    pub(crate) async fn behavior_snapshot(&mut self, player_id: &str) -> PlayerBehavior {
        if self.behavior.get(player_id).is_none() {
            if let Ok(Some(value)) = self.collab.persistence.load_profile(player_id).await {
                match serde_json::from_value::<PlayerBehavior>(value) {
                    Ok(restored) => self.behavior.restore(restored),
                    Err(e) => warn!(player_id, "corrupt profile, starting fresh: {e}"),
                }
            }
        }
        self.behavior.get_or_create(player_id).clone()
    }

    /// Snapshot of every currency balance the catalog can reference, pulled
    /// from the ledger collaborator. Lookup failures drop the entry, which
    /// makes the dependent conditions evaluate to false rather than erroring.
    pub(crate) async fn balance_snapshot(&self, player_id: &str) -> HashMap<String, i64> {
        let mut codes: HashSet<String> = HashSet::new();
        for offer in self.catalog.offers() {
            for condition in &offer.conditions {
                if let Some(code) = &condition.currency {
                    codes.insert(code.clone());
                }
            }
            for reward in &offer.rewards {
                if let RewardType::Currency { code } = &reward.reward_type {
                    codes.insert(code.clone());
                }
            }
        }
        for segment in self.catalog.segments() {
            for condition in &segment.conditions {
                if let Some(code) = &condition.currency {
                    codes.insert(code.clone());
                }
            }
        }

        let mut balances = HashMap::new();
        for code in codes {
            match self.collab.ledger.get_currency(player_id, &code).await {
                Ok(balance) => {
                    balances.insert(code, balance);
                }
                Err(e) => warn!(player_id, code, "balance lookup failed: {e}"),
            }
        }
        balances
    }

    pub(crate) fn classify<'a>(
        segments: &'a [PlayerSegment],
        ctx: &EvalContext<'_>,
    ) -> Option<&'a PlayerSegment> {
        SegmentationEngine::new(segments).classify(ctx)
    }

    /// Best-effort single reward grant; failures are logged and skipped
    pub(crate) async fn grant_reward(
        &self,
        player_id: &str,
        reward_type: &RewardType,
        amount: i64,
        multiplier: f64,
    ) {
        let result = match reward_type {
            RewardType::Currency { code } => {
                let granted = (amount as f64 * multiplier).round() as i64;
                self.collab
                    .ledger
                    .add_currency(player_id, code, granted)
                    .await
            }
            RewardType::InventoryItem { item_id } => {
                self.collab
                    .ledger
                    .add_inventory_item(player_id, item_id, amount.max(0) as u32)
                    .await
            }
            // Multiplier rewards are lifecycle benefits, not ledger grants
            RewardType::Multiplier { .. } => Ok(()),
        };
        if let Err(e) = result {
            warn!(player_id, "reward grant failed, continuing: {e}");
        }
    }

    pub(crate) async fn persist_profile(&self, player_id: &str) {
        let Some(behavior) = self.behavior.get(player_id) else {
            return;
        };
        let profile = match serde_json::to_value(behavior) {
            Ok(v) => v,
            Err(e) => {
                warn!(player_id, "profile serialization failed: {e}");
                return;
            }
        };
        if let Err(e) = self.collab.persistence.save_profile(player_id, &profile).await {
            warn!(player_id, "profile save deferred: {e}");
        }
    }

    pub(crate) async fn emit_subscription_event(
        &self,
        player_id: &str,
        tier_id: &str,
        action: &str,
        now: DateTime<Utc>,
    ) {
        let event = SubscriptionEvent {
            player_id: player_id.to_string(),
            tier_id: tier_id.to_string(),
            action: action.to_string(),
            timestamp: now.timestamp(),
        };
        let _ = self
            .collab
            .analytics
            .track_event(
                "subscription",
                serde_json::to_value(event).unwrap_or_default(),
            )
            .await;
    }
}

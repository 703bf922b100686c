use chrono::{DateTime, Duration, Utc};
use ember_catalog::conditions::{Condition, ConditionField, ConditionOp};
use ember_catalog::models::{Offer, PricingBlock, RewardItem};
use ember_catalog::pricing::FixedDemand;
use ember_catalog::store::CatalogStore;
use ember_core::clock::ManualClock;
use ember_core::collaborators::{CatalogPersistence, CurrencyLedger, NoRegion};
use ember_core::memory::{InMemoryLedger, InMemoryPersistence, NullAnalytics, RecordingAnalytics};
use ember_engine::{
    spawn_sweepers, CatalogError, Collaborators, EngineConfig, MonetizationEngine, SweepConfig,
};
use ember_lifecycle::{
    Benefit, PassSeason, PassThreshold, SpendTier, SpendTierTable, SubscriptionTier,
};
use ember_shared::{OfferType, PlayerBehavior, TriggerType};
use std::sync::Arc;

struct Harness {
    engine: MonetizationEngine,
    clock: Arc<ManualClock>,
    ledger: Arc<InMemoryLedger>,
    analytics: Arc<RecordingAnalytics>,
    persistence: Arc<InMemoryPersistence>,
}

fn flash_sale(now: DateTime<Utc>) -> Offer {
    let mut pricing = PricingBlock::new("USD", 1999);
    pricing.discount_percent = 50.0;
    pricing.updated_at = now;
    let mut offer = Offer::new(
        "flash_sale_1",
        OfferType::Flash,
        TriggerType::TimeBased,
        95,
        pricing,
    );
    offer.starts_at = Some(now);
    offer.ends_at = Some(now + Duration::hours(6));
    offer.max_purchases = 3;
    offer.rewards.push(RewardItem::currency("gems", 100));
    offer
}

fn energy_pack(now: DateTime<Utc>) -> Offer {
    let mut pricing = PricingBlock::new("USD", 299);
    pricing.updated_at = now;
    let mut offer = Offer::new(
        "energy_pack_1",
        OfferType::Energy,
        TriggerType::Always,
        40,
        pricing,
    );
    offer.rewards.push(RewardItem::currency("energy", 20));
    offer
}

fn season() -> PassSeason {
    PassSeason {
        id: "season_1".to_string(),
        duration_days: 60,
        thresholds: vec![
            PassThreshold {
                level: 1,
                cumulative_xp: 100,
                rewards: vec![RewardItem::currency("coins", 500)],
            },
            PassThreshold {
                level: 2,
                cumulative_xp: 250,
                rewards: vec![RewardItem::currency("gems", 10)],
            },
        ],
        benefits: vec![Benefit::new("xp_boost", 1.2)],
    }
}

fn harness(offers: Vec<Offer>) -> Harness {
    harness_at(offers, Utc::now())
}

fn harness_at(offers: Vec<Offer>, start: DateTime<Utc>) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let clock = Arc::new(ManualClock::new(start));
    let ledger = Arc::new(InMemoryLedger::new());
    let analytics = Arc::new(RecordingAnalytics::default());
    let persistence = Arc::new(InMemoryPersistence::default());

    let collab = Collaborators {
        ledger: ledger.clone(),
        analytics: analytics.clone(),
        persistence: persistence.clone(),
        regions: Arc::new(NoRegion),
        clock: clock.clone(),
    };

    let engine = MonetizationEngine::new(
        EngineConfig::default(),
        CatalogStore::new(offers, vec![], vec![]),
        vec![
            SubscriptionTier {
                id: "gold_monthly".to_string(),
                name: "Gold".to_string(),
                duration_days: 30,
                price: 999,
                benefits: vec![Benefit::new("reward_multiplier", 1.5)],
            },
            SubscriptionTier {
                id: "silver_monthly".to_string(),
                name: "Silver".to_string(),
                duration_days: 30,
                price: 499,
                benefits: vec![],
            },
        ],
        season(),
        SpendTierTable::new(vec![SpendTier {
            id: "vip_bronze".to_string(),
            threshold: 10_000,
            reward_multiplier: 1.1,
            benefits: vec![],
        }]),
        collab,
        Box::new(FixedDemand(0.5)),
    );

    Harness {
        engine,
        clock,
        ledger,
        analytics,
        persistence,
    }
}

#[tokio::test]
async fn flash_sale_shown_first_and_half_price() {
    let now = Utc::now();
    let mut h = harness_at(vec![energy_pack(now), flash_sale(now)], now);

    let shown = h.engine.get_offers("fresh_player", 5).await;
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0].offer.id, "flash_sale_1");
    assert_eq!(shown[1].offer.id, "energy_pack_1");
    // 1999 at 50% discount, neutral demand, no player flags
    assert_eq!(shown[0].price, 1000);

    // One "offer viewed" event per returned offer
    let events = h.analytics.events.lock().unwrap();
    let viewed = events.iter().filter(|(n, _)| n == "offer_viewed").count();
    assert_eq!(viewed, 2);
}

#[tokio::test]
async fn purchase_settles_and_updates_behavior() {
    let now = Utc::now();
    let mut h = harness_at(vec![flash_sale(now)], now);

    assert!(h.engine.purchase_offer("flash_sale_1", "p1").await);

    let behavior = h.engine.behavior("p1").unwrap();
    assert_eq!(behavior.purchase_count, 1);
    assert_eq!(behavior.total_spent, 1000);
    assert_eq!(behavior.purchase_history[&OfferType::Flash], 1);
    assert_eq!(h.engine.catalog().offer("flash_sale_1").unwrap().current_purchases, 1);
    assert_eq!(h.ledger.get_currency("p1", "gems").await.unwrap(), 100);

    // Profile persisted on the mutating update
    let profile = h.persistence.load_profile("p1").await.unwrap().unwrap();
    let restored: PlayerBehavior = serde_json::from_value(profile).unwrap();
    assert_eq!(restored.total_spent, 1000);

    let stats = h.engine.get_statistics();
    assert_eq!(stats.purchases_completed, 1);
    assert_eq!(stats.revenue, 1000);
}

#[tokio::test]
async fn purchase_at_cap_fails_without_side_effects() {
    let now = Utc::now();
    let mut offer = flash_sale(now);
    offer.max_purchases = 1;
    let mut h = harness_at(vec![offer], now);

    assert!(h.engine.purchase_offer("flash_sale_1", "p1").await);
    assert!(!h.engine.purchase_offer("flash_sale_1", "p1").await);

    // No second grant, no second behavior mutation, cap invariant holds
    assert_eq!(h.ledger.get_currency("p1", "gems").await.unwrap(), 100);
    let behavior = h.engine.behavior("p1").unwrap();
    assert_eq!(behavior.purchase_count, 1);
    let offer = h.engine.catalog().offer("flash_sale_1").unwrap();
    assert!(offer.current_purchases <= offer.max_purchases);

    // The capped offer is no longer shown either
    let shown = h.engine.get_offers("p1", 5).await;
    assert!(shown.is_empty());
}

#[tokio::test]
async fn unknown_offer_purchase_is_rejected() {
    let mut h = harness(vec![]);
    assert!(!h.engine.purchase_offer("ghost_offer", "p1").await);
    assert!(h.engine.behavior("p1").unwrap().purchase_count == 0);
}

#[tokio::test]
async fn settlement_errors_name_the_rejection() {
    let now = Utc::now();
    let mut capped = flash_sale(now);
    capped.max_purchases = 1;
    let mut gated = energy_pack(now);
    gated.conditions.push(Condition::new(
        ConditionField::Level,
        ConditionOp::GreaterThan,
        10.0,
    ));
    let mut h = harness_at(vec![capped, gated], now);

    assert!(matches!(
        h.engine.try_purchase("ghost_offer", "p1").await,
        Err(CatalogError::OfferNotFound(_))
    ));
    assert!(h.engine.purchase_offer("flash_sale_1", "p1").await);
    assert!(matches!(
        h.engine.try_purchase("flash_sale_1", "p1").await,
        Err(CatalogError::CapReached(_))
    ));
    assert!(matches!(
        h.engine.try_purchase("energy_pack_1", "p1").await,
        Err(CatalogError::NotEligible(_))
    ));
}

#[tokio::test]
async fn condition_failure_at_settlement_time_blocks_purchase() {
    let now = Utc::now();
    let mut offer = energy_pack(now);
    offer.conditions.push(Condition::new(
        ConditionField::Level,
        ConditionOp::GreaterThan,
        10.0,
    ));
    let mut h = harness_at(vec![offer], now);

    assert!(!h.engine.purchase_offer("energy_pack_1", "p1").await);

    h.engine.update_level("p1", 11).await;
    assert!(h.engine.purchase_offer("energy_pack_1", "p1").await);
}

#[tokio::test]
async fn crossing_spend_tier_is_reflected_immediately() {
    let now = Utc::now();
    let mut h = harness_at(vec![flash_sale(now)], now);

    // Player restored from a persisted profile just below the tier boundary
    let mut returning = PlayerBehavior::new("p1");
    returning.total_spent = 9_500;
    h.persistence
        .save_profile("p1", &serde_json::to_value(&returning).unwrap())
        .await
        .unwrap();

    assert!(h.engine.spend_tier_for("p1").is_none());
    assert!(h.engine.purchase_offer("flash_sale_1", "p1").await);

    let tier = h.engine.spend_tier_for("p1").unwrap();
    assert_eq!(tier.id, "vip_bronze");

    let events = h.analytics.events.lock().unwrap();
    assert!(events.iter().any(|(n, _)| n == "spend_tier_changed"));

    let stats = h.engine.get_statistics();
    assert_eq!(stats.tier_distribution["vip_bronze"], 1);
}

#[tokio::test]
async fn recent_purchase_raises_price_for_that_player_only() {
    let now = Utc::now();
    let mut h = harness_at(vec![flash_sale(now), energy_pack(now)], now);

    assert!(h.engine.purchase_offer("energy_pack_1", "urgent").await);
    h.clock.advance(Duration::minutes(30));

    let urgent = h.engine.get_offers("urgent", 5).await;
    let calm = h.engine.get_offers("calm", 5).await;

    let urgent_flash = urgent.iter().find(|o| o.offer.id == "flash_sale_1").unwrap();
    let calm_flash = calm.iter().find(|o| o.offer.id == "flash_sale_1").unwrap();
    assert!(urgent_flash.price > calm_flash.price);
}

#[tokio::test]
async fn reward_grants_are_best_effort_per_line_item() {
    let now = Utc::now();
    let mut offer = energy_pack(now);
    offer.rewards.push(RewardItem::currency("gold", 50));
    offer.rewards.push(RewardItem::item("booster", 2));
    let mut h = harness_at(vec![offer], now);

    h.ledger.fail_currency("gold");
    assert!(h.engine.purchase_offer("energy_pack_1", "p1").await);

    // The failed gold grant did not stop the others
    assert_eq!(h.ledger.get_currency("p1", "energy").await.unwrap(), 20);
    assert_eq!(h.ledger.get_currency("p1", "gold").await.unwrap(), 0);
    assert_eq!(h.ledger.inventory_count("p1", "booster"), 2);
}

#[tokio::test]
async fn subscription_expires_via_sweep_not_cancel() {
    let mut h = harness(vec![]);

    assert!(h.engine.start_subscription("p1", "gold_monthly").await);
    assert!(h.engine.has_active_subscription("p1"));
    assert_eq!(h.engine.subscription_multiplier("p1", "reward_multiplier"), 1.5);
    assert_eq!(h.engine.get_statistics().active_subscriptions, 1);

    // A second concurrent subscription for another tier is refused
    assert!(!h.engine.start_subscription("p1", "silver_monthly").await);
    assert!(!h.engine.start_subscription("p1", "unknown_tier").await);

    h.clock.advance(Duration::days(31));
    h.engine.sweep_benefits().await;

    assert!(!h.engine.has_active_subscription("p1"));
    assert_eq!(h.engine.subscription_multiplier("p1", "reward_multiplier"), 1.0);
    assert_eq!(h.engine.get_statistics().active_subscriptions, 0);

    let events = h.analytics.events.lock().unwrap();
    assert!(events
        .iter()
        .any(|(n, p)| n == "subscription" && p["action"] == "expired"));
}

#[tokio::test]
async fn pass_xp_jump_grants_every_level() {
    let mut h = harness(vec![]);

    assert!(h.engine.start_season_pass("p1").await);
    assert!(!h.engine.start_season_pass("p1").await);

    h.engine.add_pass_xp("p1", 260).await;
    assert_eq!(h.engine.pass_level("p1"), Some(2));
    assert_eq!(h.ledger.get_currency("p1", "coins").await.unwrap(), 500);
    assert_eq!(h.ledger.get_currency("p1", "gems").await.unwrap(), 10);

    let events = h.analytics.events.lock().unwrap();
    assert!(events.iter().any(|(n, _)| n == "pass_level_up"));
}

#[tokio::test]
async fn countdown_lifecycle_is_sweep_driven() {
    let mut h = harness(vec![]);

    assert!(h.engine.start_countdown("p1", "impulse_1", Duration::hours(6)));
    assert!(!h.engine.start_countdown("p1", "impulse_1", Duration::hours(6)));

    h.clock.advance(Duration::hours(2));
    assert_eq!(
        h.engine.countdown_remaining("p1", "impulse_1"),
        Some(Duration::hours(4))
    );

    h.clock.advance(Duration::hours(5));
    h.engine.sweep_countdowns();
    assert!(h.engine.countdown_remaining("p1", "impulse_1").is_none());
    assert!(h.engine.start_countdown("p1", "impulse_1", Duration::hours(6)));

    // Early cancellation frees the slot without waiting for the sweep
    assert!(h.engine.cancel_countdown("p1", "impulse_1"));
    assert!(!h.engine.cancel_countdown("p1", "impulse_1"));
    assert!(h.engine.countdown_remaining("p1", "impulse_1").is_none());
}

#[tokio::test]
async fn price_refresh_restamps_stale_entries() {
    let now = Utc::now();
    let mut offer = energy_pack(now);
    offer.pricing.updated_at = now - Duration::hours(48);
    let mut h = harness_at(vec![offer], now);

    h.engine.refresh_prices();
    let refreshed = h.engine.catalog().offer("energy_pack_1").unwrap();
    // Stale entry took the staleness discount on refresh, then was restamped
    assert_eq!(refreshed.pricing.current_price, 269);
    assert_eq!(refreshed.pricing.updated_at, now);
}

#[tokio::test]
async fn offers_added_at_runtime_are_served() {
    let now = Utc::now();
    let mut h = harness_at(vec![energy_pack(now)], now);

    h.engine.catalog_mut().add_offer(flash_sale(now));

    let shown = h.engine.get_offers("p1", 5).await;
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[0].offer.id, "flash_sale_1");
}

#[tokio::test]
async fn default_construction_serves_offers_on_wall_clock() {
    let now = Utc::now();
    let mut engine = MonetizationEngine::with_defaults(
        EngineConfig::default(),
        CatalogStore::new(vec![energy_pack(now)], vec![], vec![]),
        vec![],
        season(),
        SpendTierTable::new(vec![]),
        Arc::new(InMemoryLedger::new()),
        Arc::new(NullAnalytics),
        Arc::new(InMemoryPersistence::default()),
        Arc::new(NoRegion),
    );

    let shown = engine.get_offers("p1", 5).await;
    assert_eq!(shown.len(), 1);
    // Random demand stays inside the low/high multiplier envelope
    assert!(shown[0].price >= 239 && shown[0].price <= 359);
}

#[tokio::test(start_paused = true)]
async fn spawned_sweepers_drive_expiry_over_a_shared_handle() {
    let now = Utc::now();
    let h = harness_at(vec![], now);
    let mut engine = h.engine;

    assert!(engine.start_subscription("p1", "gold_monthly").await);
    h.clock.advance(Duration::days(31));

    let engine = Arc::new(tokio::sync::Mutex::new(engine));
    let handles = spawn_sweepers(Arc::clone(&engine), SweepConfig::default());

    // With the runtime paused, each interval's first tick fires immediately
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    assert_eq!(engine.lock().await.get_statistics().active_subscriptions, 0);
    for handle in handles {
        handle.abort();
    }
}

#[tokio::test]
async fn catalog_round_trip_reproduces_decisions() {
    let now = Utc::now();
    let mut h1 = harness_at(vec![energy_pack(now), flash_sale(now)], now);

    let before: Vec<(String, i32)> = h1
        .engine
        .get_offers("rt_player", 5)
        .await
        .into_iter()
        .map(|o| (o.offer.id, o.price))
        .collect();

    h1.engine.save_state().await;

    // Fresh engine, same persistence and clock, empty initial catalog
    let mut h2 = harness_at(vec![], now);
    let document = h1.persistence.load_offer_state().await.unwrap().unwrap();
    h2.persistence.save_offer_state(&document).await.unwrap();
    h2.engine.load_state().await;

    let after: Vec<(String, i32)> = h2
        .engine
        .get_offers("rt_player", 5)
        .await
        .into_iter()
        .map(|o| (o.offer.id, o.price))
        .collect();

    assert_eq!(before, after);
}

//! Periodic lifecycle tasks.
//!
//! One sweep walks all live instances of a family; no per-offer timers exist,
//! so the scheduled task count stays constant regardless of catalog size.

use crate::config::SweepConfig;
use crate::engine::MonetizationEngine;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

impl MonetizationEngine {
    /// Expiry sweep for subscriptions and season passes; emits an analytics
    /// event per subscription that just expired.
    pub async fn sweep_benefits(&mut self) {
        let now = self.now();

        let expired = self.subscriptions.sweep(now);
        for player_id in expired {
            let tier_id = self
                .subscriptions
                .subscription(&player_id)
                .map(|s| s.tier_id.clone())
                .unwrap_or_default();
            info!(player_id, "subscription expired");
            self.emit_subscription_event(&player_id, &tier_id, "expired", now)
                .await;
        }

        let expired_passes = self.passes.sweep(now);
        for player_id in &expired_passes {
            info!(player_id, "season pass expired");
        }
    }

    /// Expiry sweep for impulse countdowns
    pub fn sweep_countdowns(&mut self) {
        let now = self.now();
        let expired = self.countdowns.sweep(now);
        if expired > 0 {
            debug!(expired, "countdown offers expired");
        }
    }

    /// Restamp every catalog price from the player-independent multiplier
    /// layer. Keeps `updated_at` fresh so the staleness discount only hits
    /// entries this sweep has not touched for over a day.
    pub fn refresh_prices(&mut self) {
        let now = self.now();
        let pricing = self.selector.pricing();
        for offer in self.catalog.offers_mut() {
            let multiplier = pricing.market_multiplier(offer, now);
            let price = (offer.pricing.discounted_base() * multiplier).round() as i32;
            offer.pricing.current_price = offer.pricing.clamp(price);
            offer.pricing.updated_at = now;
        }
    }
}

/// Spawn the three periodic tasks over a shared engine handle. The host's
/// cooperative scheduler means at most one tick holds the lock at a time.
pub fn spawn_sweepers(
    engine: Arc<Mutex<MonetizationEngine>>,
    config: SweepConfig,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    let price_engine = Arc::clone(&engine);
    handles.push(tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.price_refresh_secs));
        loop {
            ticker.tick().await;
            price_engine.lock().await.refresh_prices();
        }
    }));

    let countdown_engine = Arc::clone(&engine);
    handles.push(tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.countdown_sweep_secs));
        loop {
            ticker.tick().await;
            countdown_engine.lock().await.sweep_countdowns();
        }
    }));

    let benefit_engine = Arc::clone(&engine);
    handles.push(tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.benefit_sweep_secs));
        loop {
            ticker.tick().await;
            benefit_engine.lock().await.sweep_benefits().await;
        }
    }));

    handles
}

use crate::engine::MonetizationEngine;
use chrono::{DateTime, Utc};
use ember_catalog::conditions::EvalContext;
use ember_catalog::CatalogError;
use ember_offer::eligibility::is_eligible;
use ember_shared::models::events::{PurchaseCompletedEvent, SpendTierChangedEvent};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of a completed purchase
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub transaction_id: Uuid,
    pub offer_id: String,
    pub player_id: String,
    pub price_paid: i32,
    pub currency: String,
    pub settled_at: DateTime<Utc>,
}

impl MonetizationEngine {
    /// Settle a purchase. Returns false on any validation failure, with no
    /// side effects; ineligibility is an expected outcome, not an error.
    pub async fn purchase_offer(&mut self, offer_id: &str, player_id: &str) -> bool {
        match self.try_purchase(offer_id, player_id).await {
            Ok(receipt) => {
                info!(
                    offer_id,
                    player_id,
                    price = receipt.price_paid,
                    "purchase settled"
                );
                true
            }
            Err(e) => {
                info!(offer_id, player_id, "purchase rejected: {e}");
                false
            }
        }
    }

    /// Re-validates eligibility at settlement time: a value read during
    /// ranking is never trusted as still valid here, which closes the race
    /// between offer display and purchase.
    pub async fn try_purchase(
        &mut self,
        offer_id: &str,
        player_id: &str,
    ) -> Result<PurchaseReceipt, CatalogError> {
        let now = self.now();
        let behavior = self.behavior_snapshot(player_id).await;
        let balances = self.balance_snapshot(player_id).await;

        let quote = {
            let ctx = EvalContext::new(&behavior, Some(&balances), now);
            let offer = self
                .catalog
                .offer(offer_id)
                .ok_or_else(|| CatalogError::OfferNotFound(offer_id.to_string()))?;
            if offer.at_cap() {
                return Err(CatalogError::CapReached(offer_id.to_string()));
            }
            if !is_eligible(offer, &ctx) {
                return Err(CatalogError::NotEligible(offer_id.to_string()));
            }

            let segment = Self::classify(self.catalog.segments(), &ctx);
            let region = self.collab.regions.region_for(player_id);
            self.selector.quote(
                &self.catalog,
                offer,
                &behavior,
                segment,
                Some(&balances),
                region.as_deref(),
                now,
            )
        };

        // Reward multiplier from the tier held *before* this purchase plus
        // any active subscription benefit; the tier is recomputed afterwards.
        let tier_before = self
            .spend_tiers
            .tier_for(behavior.total_spent)
            .map(|t| t.id.clone());
        let reward_multiplier = self.spend_tiers.reward_multiplier(behavior.total_spent)
            * self
                .subscriptions
                .multiplier_for(player_id, "reward_multiplier");

        // Past this point the purchase is committed: cap first, then rewards.
        if let Some(offer) = self.catalog.offer_mut(offer_id) {
            offer.current_purchases += 1;
        }

        // Reward grants are best-effort per line-item: a failed grant is
        // logged and the remaining line-items still run. No rollback.
        for reward in &quote.offer.rewards {
            self.grant_reward(player_id, &reward.reward_type, reward.amount, reward_multiplier)
                .await;
        }

        let offer_type = quote.offer.offer_type;
        let record = self.behavior.get_or_create(player_id);
        record.record_purchase(offer_type, quote.price, now);
        let total_spent = record.total_spent;
        self.persist_profile(player_id).await;

        self.revenue += quote.price as i64;
        self.purchases_completed += 1;

        let tier_after = self
            .spend_tiers
            .tier_for(total_spent)
            .map(|t| t.id.clone());
        if tier_after != tier_before {
            if let Some(tier) = &tier_after {
                let event = SpendTierChangedEvent {
                    player_id: player_id.to_string(),
                    tier: tier.clone(),
                    total_spent,
                    timestamp: now.timestamp(),
                };
                let _ = self
                    .collab
                    .analytics
                    .track_event(
                        "spend_tier_changed",
                        serde_json::to_value(event).unwrap_or_default(),
                    )
                    .await;
            }
        }

        let receipt = PurchaseReceipt {
            transaction_id: Uuid::new_v4(),
            offer_id: offer_id.to_string(),
            player_id: player_id.to_string(),
            price_paid: quote.price,
            currency: quote.offer.pricing.currency.clone(),
            settled_at: now,
        };

        let event = PurchaseCompletedEvent {
            offer_id: receipt.offer_id.clone(),
            player_id: receipt.player_id.clone(),
            price_paid: receipt.price_paid,
            currency: receipt.currency.clone(),
            spend_tier: tier_after,
            timestamp: now.timestamp(),
        };
        if self
            .collab
            .analytics
            .track_purchase(
                "offer_purchased",
                receipt.price_paid,
                &receipt.currency,
                serde_json::to_value(event).unwrap_or_default(),
            )
            .await
            .is_err()
        {
            warn!(offer_id, player_id, "purchase analytics dropped");
        }

        Ok(receipt)
    }
}

use crate::eligibility::eligible_offers;
use crate::ranker::OfferRanker;
use chrono::{DateTime, Utc};
use ember_catalog::conditions::EvalContext;
use ember_catalog::models::Offer;
use ember_catalog::pricing::DynamicPricing;
use ember_catalog::segments::PlayerSegment;
use ember_catalog::store::CatalogStore;
use ember_shared::PlayerBehavior;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An offer as shown to one player: a copy of the catalog entry with the
/// variant and the per-player price applied. The catalog entry itself is
/// never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedOffer {
    pub offer: Offer,
    pub price: i32,
    pub variant: Option<String>,
    pub score: f64,
}

/// The request pipeline: filter → score → experiment → price → truncate
pub struct OfferSelector {
    ranker: OfferRanker,
    pricing: DynamicPricing,
}

impl OfferSelector {
    pub fn new(ranker: OfferRanker, pricing: DynamicPricing) -> Self {
        Self { ranker, pricing }
    }

    pub fn pricing(&self) -> &DynamicPricing {
        &self.pricing
    }

    #[allow(clippy::too_many_arguments)]
    pub fn select(
        &self,
        catalog: &CatalogStore,
        behavior: &PlayerBehavior,
        balances: Option<&HashMap<String, i64>>,
        segment: Option<&PlayerSegment>,
        region: Option<&str>,
        max_offers: usize,
        now: DateTime<Utc>,
    ) -> Vec<PricedOffer> {
        let ctx = EvalContext::new(behavior, balances, now);
        let survivors = eligible_offers(catalog.offers(), &ctx);
        let ranked = self.ranker.rank(survivors, behavior, segment, balances, now);

        ranked
            .into_iter()
            .take(max_offers)
            .map(|offer| self.quote(catalog, offer, behavior, segment, balances, region, now))
            .collect()
    }

    /// Clone the catalog entry, apply the player's experiment variant, then
    /// compute the final price for this player. Settlement re-quotes through
    /// this same path so the charged price matches the shown price.
    #[allow(clippy::too_many_arguments)]
    pub fn quote(
        &self,
        catalog: &CatalogStore,
        offer: &Offer,
        behavior: &PlayerBehavior,
        segment: Option<&PlayerSegment>,
        balances: Option<&HashMap<String, i64>>,
        region: Option<&str>,
        now: DateTime<Utc>,
    ) -> PricedOffer {
        let score = self.ranker.score(offer, behavior, segment, balances, now);

        let (mut shown, variant) = match offer
            .experiment_id
            .as_deref()
            .and_then(|id| catalog.experiment(id))
            .filter(|exp| exp.is_running(now))
        {
            Some(experiment) => match experiment.variant_for(&behavior.player_id) {
                Some(variant) => (experiment.apply(variant, offer), Some(variant.name.clone())),
                None => (offer.clone(), None),
            },
            None => (offer.clone(), None),
        };

        let price = self.pricing.price_for(
            &shown,
            behavior,
            segment.map(|s| s.price_multiplier),
            region,
            now,
        );
        shown.pricing.current_price = price;

        PricedOffer {
            offer: shown,
            price,
            variant,
            score,
        }
    }
}

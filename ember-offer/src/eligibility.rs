use ember_catalog::conditions::{evaluate_all, EvalContext};
use ember_catalog::models::Offer;

/// Filter the catalog down to offers this player may be shown right now.
///
/// An offer survives only when its active flag is set, the request time is
/// inside its window, it is below its purchase cap, and every condition
/// holds. Returned in catalog declaration order, which later stages rely on
/// for tie-breaking.
pub fn eligible_offers<'a>(catalog: &'a [Offer], ctx: &EvalContext<'_>) -> Vec<&'a Offer> {
    catalog
        .iter()
        .filter(|offer| is_eligible(offer, ctx))
        .collect()
}

/// Single-offer eligibility check, shared with settlement-time re-validation
pub fn is_eligible(offer: &Offer, ctx: &EvalContext<'_>) -> bool {
    offer.is_active
        && offer.in_window(ctx.now)
        && !offer.at_cap()
        && evaluate_all(&offer.conditions, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use ember_catalog::conditions::{Condition, ConditionField, ConditionOp};
    use ember_catalog::models::PricingBlock;
    use ember_shared::{OfferType, PlayerBehavior, TriggerType};

    fn base_offer(id: &str) -> Offer {
        Offer::new(
            id,
            OfferType::Energy,
            TriggerType::Always,
            50,
            PricingBlock::new("USD", 299),
        )
    }

    #[test]
    fn cap_window_and_flag_all_gate() {
        let behavior = PlayerBehavior::new("p1");
        let now = Utc::now();
        let ctx = EvalContext::new(&behavior, None, now);

        let open = base_offer("open");

        let mut capped = base_offer("capped");
        capped.max_purchases = 2;
        capped.current_purchases = 2;

        let mut inactive = base_offer("inactive");
        inactive.is_active = false;

        let mut ended = base_offer("ended");
        ended.starts_at = Some(now - Duration::hours(2));
        ended.ends_at = Some(now - Duration::hours(1));

        let catalog = vec![open, capped, inactive, ended];
        let survivors = eligible_offers(&catalog, &ctx);
        let ids: Vec<&str> = survivors.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["open"]);
    }

    #[test]
    fn failing_condition_excludes() {
        let behavior = PlayerBehavior::new("p1"); // level 1
        let ctx = EvalContext::new(&behavior, None, Utc::now());

        let mut gated = base_offer("gated");
        gated.conditions.push(Condition::new(
            ConditionField::Level,
            ConditionOp::GreaterThan,
            10.0,
        ));

        assert!(!is_eligible(&gated, &ctx));
    }
}

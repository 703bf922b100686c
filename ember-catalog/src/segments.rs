use crate::conditions::{evaluate_all, Condition, EvalContext};
use ember_shared::OfferType;
use serde::{Deserialize, Serialize};

/// A named player classification used to bias ranking and pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSegment {
    pub id: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub priority_multiplier: f64,
    pub price_multiplier: f64,
    #[serde(default)]
    pub preferred_types: Vec<OfferType>,
}

impl PlayerSegment {
    pub fn prefers(&self, offer_type: OfferType) -> bool {
        self.preferred_types.contains(&offer_type)
    }
}

/// Classifies a player into at most one segment.
///
/// Declaration order is the priority order; the first segment whose
/// conditions all hold wins. Membership is recomputed on every call because
/// behavior mutates between calls.
pub struct SegmentationEngine<'a> {
    segments: &'a [PlayerSegment],
}

impl<'a> SegmentationEngine<'a> {
    pub fn new(segments: &'a [PlayerSegment]) -> Self {
        Self { segments }
    }

    pub fn classify(&self, ctx: &EvalContext<'_>) -> Option<&'a PlayerSegment> {
        self.segments
            .iter()
            .find(|s| evaluate_all(&s.conditions, ctx))
    }
}

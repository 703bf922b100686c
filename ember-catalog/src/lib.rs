pub mod conditions;
pub mod experiments;
pub mod models;
pub mod pricing;
pub mod segments;
pub mod store;

pub use conditions::{Condition, ConditionField, ConditionOp, EvalContext};
pub use experiments::{ExperimentDefinition, Variant};
pub use models::{Offer, PricingBlock, RewardItem, RewardType};
pub use pricing::{DemandSignal, DynamicPricing, FixedDemand, PricingConfig, RandomDemand};
pub use segments::{PlayerSegment, SegmentationEngine};
pub use store::{CatalogDocument, CatalogStore};

/// Why a purchase was refused. Settlement returns these; display-time
/// filtering silently drops ineligible offers instead.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Offer not found: {0}")]
    OfferNotFound(String),

    #[error("Offer not eligible: {0}")]
    NotEligible(String),

    #[error("Purchase cap reached for offer: {0}")]
    CapReached(String),
}

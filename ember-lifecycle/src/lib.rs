pub mod benefit;
pub mod countdown;
pub mod season_pass;
pub mod spend_tier;
pub mod subscription;

pub use benefit::{Benefit, TimeBoundedBenefit};
pub use countdown::{CountdownInstance, CountdownManager};
pub use season_pass::{PassInstance, PassSeason, PassThreshold, SeasonPassManager};
pub use spend_tier::{SpendTier, SpendTierTable};
pub use subscription::{Subscription, SubscriptionManager, SubscriptionTier};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Player already holds an active instance: {0}")]
    AlreadyActive(String),

    #[error("No active instance for player: {0}")]
    NotActive(String),

    #[error("Unknown tier: {0}")]
    UnknownTier(String),
}

pub mod eligibility;
pub mod ranker;
pub mod selection;

pub use eligibility::eligible_offers;
pub use ranker::{OfferRanker, RankingConfig};
pub use selection::{OfferSelector, PricedOffer};

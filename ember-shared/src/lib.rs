pub mod models;

pub use models::behavior::{OfferType, PlayerBehavior, TriggerType};

pub mod config;
pub mod engine;
pub mod settlement;
pub mod sweeper;

pub use config::{EngineConfig, SweepConfig};
pub use engine::{Collaborators, EngineStatistics, MonetizationEngine};
pub use ember_catalog::CatalogError;
pub use settlement::PurchaseReceipt;
pub use sweeper::spawn_sweepers;

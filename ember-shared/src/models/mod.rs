pub mod behavior;
pub mod events;

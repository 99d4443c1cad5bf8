mod accrual;
mod setups;
mod steps;
mod world;

pub use accrual::ScriptedAccrual;
pub use world::{LoyaltySystem, LoyaltyWorld};

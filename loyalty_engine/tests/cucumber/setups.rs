use cucumber::given;

use crate::cucumber::{LoyaltySystem, LoyaltyWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut LoyaltyWorld) {
    let system = LoyaltySystem::new().await;
    world.system = Some(system);
}

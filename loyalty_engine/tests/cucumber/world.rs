use std::{collections::HashMap, fmt::Debug, time::Duration};

use cucumber::World;
use log::*;
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType},
    AccrualAgent,
    AgentConfig,
    LedgerError,
    OrderManagement,
    SqliteDatabase,
};
use tokio::time::sleep;

use crate::{
    cucumber::ScriptedAccrual,
    support::{prepare_test_env, random_db_path},
};

#[derive(Default, Debug, World)]
pub struct LoyaltyWorld {
    pub system: Option<LoyaltySystem>,
}

pub struct LoyaltySystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub accrual: ScriptedAccrual,
    pub users: HashMap<String, i64>,
    pub last_error: Option<LedgerError>,
}

impl Debug for LoyaltySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoyaltySystem ({}) users: {:?}, last error: {:?}", self.db_path, self.users, self.last_error)
    }
}

impl LoyaltyWorld {
    pub fn system(&mut self) -> &mut LoyaltySystem {
        self.system.as_mut().expect("Loyalty system not initialised")
    }
}

impl LoyaltySystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        let db = prepare_test_env(&db_path).await;
        debug!("🚀️ Created database: {db_path}");
        Self { db_path, db, accrual: ScriptedAccrual::default(), users: HashMap::new(), last_error: None }
    }

    pub fn user_id(&self, login: &str) -> i64 {
        *self.users.get(login).unwrap_or_else(|| panic!("Unknown user {login}"))
    }

    /// Runs an accrual agent against the scripted accrual service until the order reaches the expected status.
    pub async fn reconcile_until(&self, number: &str, status: OrderStatusType) {
        let config = AgentConfig { workers: 2, dispatch_interval: Duration::from_millis(50) };
        let mut agent = AccrualAgent::new(self.db.clone(), self.accrual.clone(), config);
        agent.start().expect("Error starting accrual agent");
        let number = OrderNumber::from(number);
        let reached = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let order = self.db.fetch_order_by_number(&number).await.expect("Error fetching order");
                if order.map(|o| o.status) == Some(status) {
                    break;
                }
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        agent.stop().await;
        assert!(reached.is_ok(), "Order {number} did not reach {status} in time");
    }
}

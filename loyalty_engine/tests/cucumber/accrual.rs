use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use accrual_tools::AccrualStatus;
use loyalty_engine::{AccrualOutcome, AccrualProvider};

/// Stands in for the accrual service. Orders nobody has told it about are reported as `REGISTERED`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAccrual {
    verdicts: Arc<Mutex<HashMap<String, AccrualOutcome>>>,
}

impl ScriptedAccrual {
    pub fn set(&self, number: &str, outcome: AccrualOutcome) {
        self.verdicts.lock().unwrap().insert(number.to_string(), outcome);
    }
}

impl AccrualProvider for ScriptedAccrual {
    async fn fetch(&self, order_number: &str) -> AccrualOutcome {
        let verdicts = self.verdicts.lock().unwrap();
        verdicts
            .get(order_number)
            .cloned()
            .unwrap_or(AccrualOutcome::Verdict { status: AccrualStatus::Registered, accrual: None })
    }
}

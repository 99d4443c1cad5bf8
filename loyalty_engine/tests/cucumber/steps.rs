use accrual_tools::AccrualStatus;
use cucumber::{given, then, when};
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType},
    AccrualOutcome,
    BalanceManagement,
    LedgerError,
    OrderManagement,
    UserManagement,
};
use lp_common::Points;

use crate::cucumber::LoyaltyWorld;

#[given(expr = "a user '{word}' with password '{word}'")]
async fn register_user(world: &mut LoyaltyWorld, login: String, password: String) {
    let system = world.system();
    // Password hashing happens outside the ledger, so any opaque string will do here.
    let id = system.db.create_user(&login, &format!("hashed:{password}")).await.expect("Error creating user");
    system.users.insert(login, id);
}

#[given(expr = "{word} has earned {int} points on order {word}")]
async fn earned_points(world: &mut LoyaltyWorld, login: String, points: i64, number: String) {
    submit_order(world, login, number.clone()).await;
    assert!(world.system().last_error.is_none(), "Order {number} could not be submitted");
    accrual_processed(world, number.clone(), points).await;
    world.system().reconcile_until(&number, OrderStatusType::Processed).await;
}

#[when(expr = "{word} submits order {word}")]
async fn submit_order(world: &mut LoyaltyWorld, login: String, number: String) {
    let system = world.system();
    let user_id = system.user_id(&login);
    system.last_error = system.db.create_order(user_id, &OrderNumber::from(number)).await.err();
}

#[when(expr = "{word} submits order {word} again")]
async fn resubmit_order(world: &mut LoyaltyWorld, login: String, number: String) {
    submit_order(world, login, number).await;
}

#[when(expr = "the accrual service reports order {word} as PROCESSED with {int} points")]
async fn accrual_processed(world: &mut LoyaltyWorld, number: String, points: i64) {
    let outcome =
        AccrualOutcome::Verdict { status: AccrualStatus::Processed, accrual: Some(Points::from_whole(points)) };
    world.system().accrual.set(&number, outcome);
}

#[when(expr = "the accrual service does not know order {word}")]
async fn accrual_unknown(world: &mut LoyaltyWorld, number: String) {
    // The accrual client reports unknown orders as invalid
    let outcome = AccrualOutcome::Verdict { status: AccrualStatus::Invalid, accrual: None };
    world.system().accrual.set(&number, outcome);
}

#[when(expr = "the accrual agent runs until order {word} is {word}")]
async fn run_agent(world: &mut LoyaltyWorld, number: String, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Not a valid order status");
    world.system().reconcile_until(&number, status).await;
}

#[when(expr = "{word} withdraws {int} points against order {word}")]
async fn withdraw(world: &mut LoyaltyWorld, login: String, points: i64, number: String) {
    let system = world.system();
    let user_id = system.user_id(&login);
    let result = system.db.withdraw(user_id, Points::from_whole(points), &OrderNumber::from(number)).await;
    system.last_error = result.err();
}

#[then(expr = "{word} has a balance of {int} points with {int} points withdrawn")]
async fn check_balance(world: &mut LoyaltyWorld, login: String, current: i64, withdrawn: i64) {
    let system = world.system();
    let balance = system.db.balance(system.user_id(&login)).await.expect("Error fetching balance");
    assert_eq!(balance.current, Points::from_whole(current), "Current balance is incorrect");
    assert_eq!(balance.withdrawn, Points::from_whole(withdrawn), "Withdrawn total is incorrect");
}

#[then(expr = "order {word} has status {word}")]
async fn check_order_status(world: &mut LoyaltyWorld, number: String, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let order = world
        .system()
        .db
        .fetch_order_by_number(&OrderNumber::from(number.as_str()))
        .await
        .expect("Error fetching order")
        .unwrap_or_else(|| panic!("Order {number} does not exist"));
    assert_eq!(order.status, status, "Status is incorrect");
}

#[then(expr = "order {word} has an accrual of {int} points")]
async fn check_order_accrual(world: &mut LoyaltyWorld, number: String, points: i64) {
    let order = world
        .system()
        .db
        .fetch_order_by_number(&OrderNumber::from(number.as_str()))
        .await
        .expect("Error fetching order")
        .unwrap_or_else(|| panic!("Order {number} does not exist"));
    assert_eq!(order.accrual, Some(Points::from_whole(points)), "Accrual is incorrect");
}

#[then(expr = "order {word} has no accrual")]
async fn check_no_accrual(world: &mut LoyaltyWorld, number: String) {
    let order = world
        .system()
        .db
        .fetch_order_by_number(&OrderNumber::from(number.as_str()))
        .await
        .expect("Error fetching order")
        .unwrap_or_else(|| panic!("Order {number} does not exist"));
    assert!(order.accrual.is_none(), "Order {number} should not have an accrual");
}

#[then(expr = "{word} has {int} order(s)")]
async fn check_order_count(world: &mut LoyaltyWorld, login: String, count: usize) {
    let system = world.system();
    let orders = system.db.orders_for_user(system.user_id(&login)).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count, "Number of orders is incorrect");
}

#[then(expr = "{word} has {int} withdrawal(s)")]
async fn check_withdrawal_count(world: &mut LoyaltyWorld, login: String, count: usize) {
    let system = world.system();
    let withdrawals =
        system.db.withdrawals_for_user(system.user_id(&login)).await.expect("Error fetching withdrawals");
    assert_eq!(withdrawals.len(), count, "Number of withdrawals is incorrect");
}

#[then(expr = "the submission is accepted")]
async fn submission_accepted(world: &mut LoyaltyWorld) {
    let error = world.system().last_error.take();
    assert!(error.is_none(), "Unexpected error: {error:?}");
}

#[then(expr = "the submission is rejected because {word} already owns the order")]
async fn already_owned(world: &mut LoyaltyWorld, login: String) {
    let system = world.system();
    let user_id = system.user_id(&login);
    let error = system.last_error.take();
    match error {
        Some(LedgerError::OrderAlreadyOwnedBySelf(id)) => {
            let orders = system.db.orders_for_user(user_id).await.expect("Error fetching orders");
            assert!(orders.iter().any(|o| o.id == id), "The error does not carry the existing order id");
        },
        other => panic!("Expected OrderAlreadyOwnedBySelf, got {other:?}"),
    }
}

#[then(expr = "the submission is rejected because the order belongs to another user")]
async fn owned_by_other(world: &mut LoyaltyWorld) {
    let error = world.system().last_error.take();
    assert!(matches!(error, Some(LedgerError::OrderOwnedByOther(_))), "Expected OrderOwnedByOther, got {error:?}");
}

#[then(expr = "the withdrawal is rejected for insufficient funds")]
async fn insufficient_funds(world: &mut LoyaltyWorld) {
    let error = world.system().last_error.take();
    assert!(matches!(error, Some(LedgerError::InsufficientFunds)), "Expected InsufficientFunds, got {error:?}");
}

#[then(expr = "the withdrawal is rejected because the order number was already used")]
async fn number_reused(world: &mut LoyaltyWorld) {
    let error = world.system().last_error.take();
    assert!(matches!(error, Some(LedgerError::OrderNumberReused(_))), "Expected OrderNumberReused, got {error:?}");
}

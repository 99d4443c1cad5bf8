use std::fmt::Debug;

use log::*;
use lp_common::Points;
use sqlx::{migrate, SqlitePool};

use super::{balances, new_pool, orders, orders::OrderQueryFilter, users, withdrawals};
use crate::{
    db::{
        errors::{is_unique_violation, LedgerError},
        traits::{AccrualLedger, BalanceManagement, OrderManagement, UserManagement},
    },
    db_types::{Balance, Order, OrderNumber, OrderStatusType, User, Withdrawal},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl UserManagement for SqliteDatabase {
    type Error = LedgerError;

    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, Self::Error> {
        let login = login.to_lowercase();
        let mut tx = self.pool.begin().await?;
        let user_id = users::insert_user(&login, password_hash, &mut tx).await?;
        balances::insert_zero_balance(user_id, &mut tx).await?;
        tx.commit().await?;
        info!("🧑️ New user '{login}' registered as #{user_id}");
        Ok(user_id)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_by_login(&login.to_lowercase(), &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    type Error = LedgerError;

    async fn create_order(&self, user_id: i64, number: &OrderNumber) -> Result<i64, Self::Error> {
        let mut tx = self.pool.begin().await?;
        match orders::insert_order(user_id, number, &mut tx).await {
            Ok(id) => {
                tx.commit().await?;
                Ok(id)
            },
            Err(e) if is_unique_violation(&e) => {
                let existing = orders::fetch_order_by_number(number, &mut tx).await?;
                match existing {
                    Some(order) if order.user_id == user_id => {
                        debug!("📦️ Order {number} was resubmitted by its owner, user #{user_id}");
                        Err(LedgerError::OrderAlreadyOwnedBySelf(order.id))
                    },
                    Some(order) => {
                        warn!("📦️ User #{user_id} tried to submit order {number}, which belongs to user #{}", order.user_id);
                        Err(LedgerError::OrderOwnedByOther(number.as_str().to_string()))
                    },
                    // The conflicting order vanished in the meantime. Report the original conflict.
                    None => Err(e.into()),
                }
            },
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Err(LedgerError::UserNotFound(user_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(OrderQueryFilter::default().with_user_id(user_id), &mut conn).await
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_number(number, &mut conn).await
    }
}

impl BalanceManagement for SqliteDatabase {
    type Error = LedgerError;

    async fn balance(&self, user_id: i64) -> Result<Balance, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        balances::fetch_balance(user_id, &mut conn).await?.ok_or(LedgerError::UserNotFound(user_id))
    }

    /// Takes a withdrawal request, and in a single atomic transaction,
    /// * debits the current balance and credits the withdrawn total, provided the current balance covers `amount`.
    ///   This is the first statement of the transaction, so the balance cannot change between the check and the write.
    /// * records the withdrawal. If the order number has been used before, the transaction is rolled back.
    async fn withdraw(&self, user_id: i64, amount: Points, number: &OrderNumber) -> Result<(), Self::Error> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut tx = self.pool.begin().await?;
        if !balances::debit(user_id, amount, &mut tx).await? {
            return match balances::fetch_balance(user_id, &mut tx).await? {
                Some(balance) => {
                    debug!("🧑️ User #{user_id} cannot withdraw {amount}. Balance is {}", balance.current);
                    Err(LedgerError::InsufficientFunds)
                },
                None => Err(LedgerError::UserNotFound(user_id)),
            };
        }
        withdrawals::insert_withdrawal(user_id, number, amount, &mut tx).await?;
        tx.commit().await?;
        info!("🧑️ User #{user_id} withdrew {amount} against order {number}");
        Ok(())
    }

    async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await
    }
}

impl AccrualLedger for SqliteDatabase {
    type Error = LedgerError;

    async fn orders_awaiting_verdict(&self) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        let query =
            OrderQueryFilter::default().with_status(OrderStatusType::New).with_status(OrderStatusType::Processing);
        orders::fetch_orders(query, &mut conn).await
    }

    /// Applies the verdict in a single atomic transaction:
    /// * the order's status and accrual are updated, provided the order does not have a final status yet. This also
    ///   yields the order's owner.
    /// * for `PROCESSED` orders with a positive accrual, the owner's current balance is credited with the accrual.
    ///
    /// Accruals only mean something for processed orders. Any accrual sent along with another status is dropped.
    async fn apply_verdict(&self, order_id: i64, status: OrderStatusType, accrual: Points) -> Result<(), Self::Error> {
        if status == OrderStatusType::New {
            return Err(LedgerError::InvalidVerdict(format!("order #{order_id} cannot be reset to {status}")));
        }
        let accrual = match status {
            OrderStatusType::Processed => Some(accrual),
            _ if accrual.is_positive() => {
                warn!("🗃️ Ignoring accrual of {accrual} for order #{order_id}, since its new status is {status}");
                None
            },
            _ => None,
        };
        let mut tx = self.pool.begin().await?;
        let user_id = match orders::update_open_order_status(order_id, status, accrual, &mut tx).await? {
            Some(user_id) => user_id,
            None => {
                return match orders::fetch_order_status(order_id, &mut tx).await? {
                    Some(current) => {
                        debug!("🗃️ Order #{order_id} is already {current}. Verdict {status} ignored");
                        Err(LedgerError::OrderAlreadyFinalised(order_id))
                    },
                    None => Err(LedgerError::OrderNotFound(order_id)),
                };
            },
        };
        if let Some(credit) = accrual.filter(Points::is_positive) {
            balances::credit(user_id, credit, &mut tx).await?;
        }
        tx.commit().await?;
        match accrual {
            Some(credit) => debug!("🗃️ Order #{order_id} is now {status}. User #{user_id} credited with {credit}"),
            None => debug!("🗃️ Order #{order_id} is now {status}"),
        }
        Ok(())
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the database schema up to date by running the embedded migrations.
    pub async fn migrate(&self) -> Result<(), LedgerError> {
        migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::prepare_env::{prepare_test_env, random_db_path, remove_database};

    async fn new_db() -> SqliteDatabase {
        prepare_test_env(&random_db_path()).await
    }

    fn number(n: &str) -> OrderNumber {
        OrderNumber::from(n)
    }

    #[tokio::test]
    async fn users_are_created_with_an_empty_balance() {
        let db = new_db().await;
        let alice = db.create_user("Alice", "hash").await.unwrap();
        let user = db.fetch_user_by_login("ALICE").await.unwrap().unwrap();
        assert_eq!(user.id, alice);
        assert_eq!(user.login, "alice");
        assert_eq!(user.password_hash, "hash");
        assert_eq!(db.balance(alice).await.unwrap(), Balance::default());

        let err = db.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateLogin(login) if login == "alice"));
        assert!(db.fetch_user_by_login("bob").await.unwrap().is_none());
        assert!(matches!(db.balance(alice + 1).await, Err(LedgerError::UserNotFound(_))));
        remove_database(db).await;
    }

    #[tokio::test]
    async fn order_numbers_are_unique_across_users() {
        let db = new_db().await;
        let alice = db.create_user("alice", "secret").await.unwrap();
        let bob = db.create_user("bob", "secret").await.unwrap();
        let id = db.create_order(alice, &number("79927398713")).await.unwrap();

        let err = db.create_order(alice, &number("79927398713")).await.unwrap_err();
        assert!(matches!(err, LedgerError::OrderAlreadyOwnedBySelf(existing) if existing == id));
        let err = db.create_order(bob, &number("79927398713")).await.unwrap_err();
        assert!(matches!(err, LedgerError::OrderOwnedByOther(n) if n == "79927398713"));
        let err = db.create_order(bob + 100, &number("12345678903")).await.unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound(_)));

        let orders = db.orders_for_user(alice).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatusType::New);
        assert!(orders[0].accrual.is_none());
        assert!(db.orders_for_user(bob).await.unwrap().is_empty());
        let order = db.fetch_order_by_number(&number("79927398713")).await.unwrap().unwrap();
        assert_eq!(order.id, id);
        assert_eq!(order.user_id, alice);
        remove_database(db).await;
    }

    #[tokio::test]
    async fn verdicts_move_orders_forward_and_credit_once() {
        let db = new_db().await;
        let alice = db.create_user("alice", "secret").await.unwrap();
        let first = db.create_order(alice, &number("79927398713")).await.unwrap();
        let second = db.create_order(alice, &number("12345678903")).await.unwrap();
        let third = db.create_order(alice, &number("2377225624")).await.unwrap();
        let awaiting = db.orders_awaiting_verdict().await.unwrap().into_iter().map(|o| o.id).collect::<Vec<_>>();
        assert_eq!(awaiting, vec![first, second, third]);

        db.apply_verdict(first, OrderStatusType::Processing, Points::default()).await.unwrap();
        assert_eq!(db.balance(alice).await.unwrap(), Balance::default());
        db.apply_verdict(first, OrderStatusType::Processed, Points::from_whole(500)).await.unwrap();
        assert_eq!(db.balance(alice).await.unwrap(), Balance::new(Points::from_whole(500), Points::default()));

        // Once processed, an order is never touched again
        let err = db.apply_verdict(first, OrderStatusType::Processed, Points::from_whole(500)).await.unwrap_err();
        assert!(matches!(err, LedgerError::OrderAlreadyFinalised(id) if id == first));
        let err = db.apply_verdict(first, OrderStatusType::Invalid, Points::default()).await.unwrap_err();
        assert!(matches!(err, LedgerError::OrderAlreadyFinalised(_)));
        assert_eq!(db.balance(alice).await.unwrap().current, Points::from_whole(500));
        let order = db.fetch_order_by_number(&number("79927398713")).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatusType::Processed);
        assert_eq!(order.accrual, Some(Points::from_whole(500)));

        // Accruals only count for processed orders
        db.apply_verdict(second, OrderStatusType::Invalid, Points::from_whole(20)).await.unwrap();
        let order = db.fetch_order_by_number(&number("12345678903")).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatusType::Invalid);
        assert!(order.accrual.is_none());
        assert_eq!(db.balance(alice).await.unwrap().current, Points::from_whole(500));

        let err = db.apply_verdict(third, OrderStatusType::New, Points::default()).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidVerdict(_)));
        let err = db.apply_verdict(9999, OrderStatusType::Processed, Points::from_whole(1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::OrderNotFound(9999)));

        let awaiting = db.orders_awaiting_verdict().await.unwrap().into_iter().map(|o| o.id).collect::<Vec<_>>();
        assert_eq!(awaiting, vec![third]);
        remove_database(db).await;
    }

    #[tokio::test]
    async fn writes_are_visible_to_other_connections_once_they_return() {
        let db = new_db().await;
        let other = SqliteDatabase::new_with_url(db.url(), 1).await.unwrap();
        let alice = db.create_user("alice", "secret").await.unwrap();
        assert_eq!(other.fetch_user_by_login("alice").await.unwrap().map(|u| u.id), Some(alice));
        for (i, n) in ["79927398713", "12345678903", "2377225624"].into_iter().enumerate() {
            let id = db.create_order(alice, &number(n)).await.unwrap();
            let seen = other.orders_for_user(alice).await.unwrap();
            assert_eq!(seen.len(), i + 1);
            assert_eq!(seen.last().map(|o| o.id), Some(id));
            let awaiting = other.orders_awaiting_verdict().await.unwrap();
            assert!(awaiting.iter().any(|o| o.id == id));
        }

        let first = other.fetch_order_by_number(&number("79927398713")).await.unwrap().unwrap();
        db.apply_verdict(first.id, OrderStatusType::Processed, Points::from_whole(100)).await.unwrap();
        assert_eq!(other.balance(alice).await.unwrap().current, Points::from_whole(100));
        db.withdraw(alice, Points::from_whole(40), &number("4561261212345467")).await.unwrap();
        assert_eq!(other.balance(alice).await.unwrap(), Balance::new(Points::from_whole(60), Points::from_whole(40)));
        assert_eq!(other.withdrawals_for_user(alice).await.unwrap().len(), 1);
        other.close().await;
        remove_database(db).await;
    }

    #[tokio::test]
    async fn withdrawals_need_sufficient_funds() {
        let db = new_db().await;
        let alice = db.create_user("alice", "secret").await.unwrap();
        let order = db.create_order(alice, &number("79927398713")).await.unwrap();
        db.apply_verdict(order, OrderStatusType::Processed, Points::from_whole(100)).await.unwrap();

        let err = db.withdraw(alice, Points::from_whole(150), &number("12345678903")).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds));
        assert_eq!(db.balance(alice).await.unwrap(), Balance::new(Points::from_whole(100), Points::default()));

        db.withdraw(alice, Points::from(7550), &number("12345678903")).await.unwrap();
        assert_eq!(db.balance(alice).await.unwrap(), Balance::new(Points::from(2450), Points::from(7550)));

        // The whole withdrawal is rolled back if the order number has been used before
        let err = db.withdraw(alice, Points::from_whole(10), &number("12345678903")).await.unwrap_err();
        assert!(matches!(err, LedgerError::OrderNumberReused(n) if n == "12345678903"));
        assert_eq!(db.balance(alice).await.unwrap(), Balance::new(Points::from(2450), Points::from(7550)));

        let err = db.withdraw(alice, Points::default(), &number("2377225624")).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        let err = db.withdraw(alice + 1, Points::from_whole(1), &number("2377225624")).await.unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound(_)));

        let withdrawals = db.withdrawals_for_user(alice).await.unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].number, number("12345678903"));
        assert_eq!(withdrawals[0].amount, Points::from(7550));
        remove_database(db).await;
    }
}

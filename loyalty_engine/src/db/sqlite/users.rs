use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::errors::{is_unique_violation, LedgerError},
    db_types::User,
};

/// Inserts a new user and returns its id. This is not atomic on its own; the caller is expected to create the user's
/// balance in the same transaction.
pub async fn insert_user(login: &str, password_hash: &str, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let result = sqlx::query("INSERT INTO users (login, password_hash) VALUES ($1, $2);")
        .bind(login)
        .bind(password_hash)
        .execute(conn)
        .await;
    match result.map(|r| r.last_insert_rowid()) {
        Ok(id) => {
            debug!("🧑️ User '{login}' created with id #{id}");
            Ok(id)
        },
        Err(e) if is_unique_violation(&e) => Err(LedgerError::DuplicateLogin(login.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user_by_login(login: &str, conn: &mut SqliteConnection) -> Result<Option<User>, LedgerError> {
    trace!("🧑️ Fetching user '{login}'");
    let user = sqlx::query_as::<_, User>(
        r#"
            SELECT id, login, password_hash, created_at
            FROM users
            WHERE login = $1
        "#,
    )
    .bind(login)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

use crate::db_types::User;

/// The `UserManagement` trait defines the behaviour for creating and looking up users.
#[allow(async_fn_in_trait)]
pub trait UserManagement {
    type Error: std::error::Error;

    /// Creates a new user with the given login and (already hashed) password, along with the user's zero balance.
    /// Both records are written in one transaction.
    ///
    /// Fails with a duplicate-login error if the login, compared case-insensitively, is taken.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, Self::Error>;

    /// Fetches the user with the given login. If no such user exists, `None` is returned.
    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, Self::Error>;
}

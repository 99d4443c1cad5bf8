//! Test database setup shared by the integration tests.
use log::*;
use loyalty_engine::SqliteDatabase;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub fn random_db_path() -> String {
    format!("sqlite://{}/lp_it_store_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        Sqlite::drop_database(url).await.expect("Error dropping stale database");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    db
}

pub async fn remove_database(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e}");
    }
}

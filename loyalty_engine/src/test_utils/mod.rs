//! Helpers for tests that need a real ledger. Every call to [`prepare_env::random_db_path`] yields a fresh SQLite file
//! in the system temp directory, so tests never share state.
pub mod prepare_env;

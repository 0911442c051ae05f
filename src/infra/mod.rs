//! Infrastructure: SQLite session, migrations, secrets.

pub mod config;
pub mod db;

pub use config::{DbCredentials, SecretsStore};
pub use db::{init_db, ConnectionProvider, DbSession, SqliteSession};

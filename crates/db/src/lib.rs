//! Database connection factory and migration tooling.

use std::time::Duration;

use anyhow::Context;
use bookstore_kernel::settings::DatabaseSettings;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

pub mod migrate;

pub use migrate::{run_migrations, MigrationReport};

/// Open a pooled connection using the configured database URL.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .sqlx_logging(settings.sqlx_logging);

    let db = Database::connect(options)
        .await
        .with_context(|| format!("failed to connect to database at {}", redact(&settings.url)))?;

    tracing::info!(
        target: "bookstore-db",
        backend = ?db.get_database_backend(),
        "database connection established"
    );

    Ok(db)
}

/// Strip credentials from a connection URL before it reaches logs.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

//! Application bootstrap: connection, module registry, migrations, server.

use anyhow::Context;
use axum::Router;
use bookstore_db::MigrationReport;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use sea_orm::DatabaseConnection;

use crate::modules;

/// A fully wired bookstore service.
pub struct Application {
    settings: Settings,
    db: DatabaseConnection,
    registry: ModuleRegistry,
}

impl Application {
    /// Connect to the configured database and initialize every module.
    pub async fn build(settings: Settings) -> anyhow::Result<Self> {
        let db = bookstore_db::connect(&settings.database).await?;
        Self::with_connection(settings, db).await
    }

    /// Initialize every module against an existing connection.
    pub async fn with_connection(
        settings: Settings,
        db: DatabaseConnection,
    ) -> anyhow::Result<Self> {
        let registry = modules::registry()?;
        let app = Self {
            settings,
            db,
            registry,
        };

        app.registry
            .init_modules(&app.ctx())
            .await
            .context("module initialization failed")?;

        Ok(app)
    }

    pub fn ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.db,
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Apply every pending module migration.
    pub async fn migrate(&self) -> anyhow::Result<MigrationReport> {
        let migrations = self.registry.collect_migrations();
        let report = bookstore_db::run_migrations(&self.db, &migrations)
            .await
            .context("database migration failed")?;

        tracing::info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "migrations complete"
        );
        Ok(report)
    }

    /// The complete HTTP router, middleware included.
    pub fn router(&self) -> Router {
        bookstore_http::build_router(&self.registry, &self.ctx())
    }

    /// Migrate, start modules and serve until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> anyhow::Result<()> {
        self.migrate().await?;

        let ctx = self.ctx();
        self.registry.start_modules(&ctx).await?;

        let served = bookstore_http::start_server(&self.registry, &ctx, shutdown_signal()).await;

        // Stop modules even when the server failed, then report the first error.
        let stopped = self.registry.stop_modules().await;
        self.db
            .close()
            .await
            .context("failed to close database connection")?;

        served.and(stopped)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

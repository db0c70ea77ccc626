//! Applies module migrations and records them in `schema_migrations`.

use std::collections::HashSet;

use anyhow::Context;
use bookstore_kernel::Migration;
use sea_orm::sea_query::{Alias, ColumnDef, Expr, Index, Query, Table};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement, TransactionTrait};

const MIGRATIONS_TABLE: &str = "schema_migrations";

/// Outcome of a migration run, as `module/id` keys.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Apply every migration that has not been recorded yet.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row, so a failing migration leaves neither schema changes nor a record.
pub async fn run_migrations(
    db: &DatabaseConnection,
    migrations: &[(String, Migration)],
) -> anyhow::Result<MigrationReport> {
    let backend = db.get_database_backend();

    db.execute(create_tracking_table(backend))
        .await
        .with_context(|| format!("failed to create {MIGRATIONS_TABLE} table"))?;

    let applied = applied_migrations(db, backend).await?;
    let mut report = MigrationReport::default();

    for (module, migration) in migrations {
        let key = format!("{}/{}", module, migration.id);

        if applied.contains(&(module.clone(), migration.id.to_string())) {
            tracing::debug!(target: "bookstore-db", migration = %key, "migration already applied");
            report.skipped.push(key);
            continue;
        }

        let txn = db
            .begin()
            .await
            .with_context(|| format!("failed to open transaction for migration {key}"))?;

        for statement in (migration.up)(backend) {
            txn.execute(statement)
                .await
                .with_context(|| format!("migration {key} failed"))?;
        }

        txn.execute(record_migration(backend, module, migration.id)?)
            .await
            .with_context(|| format!("failed to record migration {key}"))?;

        txn.commit()
            .await
            .with_context(|| format!("failed to commit migration {key}"))?;

        tracing::info!(target: "bookstore-db", migration = %key, "migration applied");
        report.applied.push(key);
    }

    Ok(report)
}

fn create_tracking_table(backend: DbBackend) -> Statement {
    let statement = Table::create()
        .table(Alias::new(MIGRATIONS_TABLE))
        .if_not_exists()
        .col(ColumnDef::new(Alias::new("module")).string().not_null())
        .col(ColumnDef::new(Alias::new("id")).string().not_null())
        .col(
            ColumnDef::new(Alias::new("applied_at"))
                .timestamp()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .primary_key(
            Index::create()
                .col(Alias::new("module"))
                .col(Alias::new("id")),
        )
        .to_owned();

    backend.build(&statement)
}

async fn applied_migrations(
    db: &DatabaseConnection,
    backend: DbBackend,
) -> anyhow::Result<HashSet<(String, String)>> {
    let query = Query::select()
        .columns([Alias::new("module"), Alias::new("id")])
        .from(Alias::new(MIGRATIONS_TABLE))
        .to_owned();

    let rows = db
        .query_all(backend.build(&query))
        .await
        .with_context(|| format!("failed to read {MIGRATIONS_TABLE}"))?;

    let mut applied = HashSet::with_capacity(rows.len());
    for row in rows {
        let module: String = row.try_get("", "module")?;
        let id: String = row.try_get("", "id")?;
        applied.insert((module, id));
    }

    Ok(applied)
}

fn record_migration(backend: DbBackend, module: &str, id: &str) -> anyhow::Result<Statement> {
    let statement = Query::insert()
        .into_table(Alias::new(MIGRATIONS_TABLE))
        .columns([Alias::new("module"), Alias::new("id")])
        .values([Expr::value(module), Expr::value(id)])?
        .to_owned();

    Ok(backend.build(&statement))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect;
    use bookstore_kernel::settings::DatabaseSettings;

    fn create_widget(backend: DbBackend) -> Vec<Statement> {
        vec![Statement::from_string(
            backend,
            "CREATE TABLE widget (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
        )]
    }

    fn broken(backend: DbBackend) -> Vec<Statement> {
        vec![
            Statement::from_string(backend, "CREATE TABLE gadget (id INTEGER PRIMARY KEY)"),
            Statement::from_string(backend, "THIS IS NOT SQL"),
        ]
    }

    async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
        let row = db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                format!("SELECT COUNT(*) AS n FROM {table}"),
            ))
            .await
            .unwrap()
            .unwrap();
        row.try_get("", "n").unwrap()
    }

    #[tokio::test]
    async fn applies_pending_and_skips_recorded_migrations() {
        let db = connect(&DatabaseSettings::in_memory()).await.unwrap();
        let migrations = vec![(
            "widgets".to_string(),
            Migration {
                id: "001_init",
                up: create_widget,
            },
        )];

        let first = run_migrations(&db, &migrations).await.unwrap();
        assert_eq!(first.applied, vec!["widgets/001_init".to_string()]);
        assert!(first.skipped.is_empty());

        let second = run_migrations(&db, &migrations).await.unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.skipped, vec!["widgets/001_init".to_string()]);

        assert_eq!(count_rows(&db, "widget").await, 0);
        assert_eq!(count_rows(&db, MIGRATIONS_TABLE).await, 1);
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let db = connect(&DatabaseSettings::in_memory()).await.unwrap();
        let migrations = vec![(
            "gadgets".to_string(),
            Migration {
                id: "001_init",
                up: broken,
            },
        )];

        let err = run_migrations(&db, &migrations).await.unwrap_err();
        assert!(err.to_string().contains("migration gadgets/001_init failed"));
        assert_eq!(count_rows(&db, MIGRATIONS_TABLE).await, 0);
    }
}

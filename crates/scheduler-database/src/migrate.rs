//! Schema migrations. Grounded on `rustpress_database::migration::Migrator`
//! (same version-tracking-table approach), narrowed to the one table this
//! system owns.

use crate::error::{Error, Result};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

pub struct Migrator {
    migrations: Vec<Migration>,
}

impl Migrator {
    pub fn new() -> Self {
        Self {
            migrations: jobs_migrations(),
        }
    }

    /// Raw SQL bodies in version order, for tests that assert on schema
    /// shape without a live database.
    pub fn migration_sql(&self) -> Vec<&str> {
        self.migrations.iter().map(|m| m.sql.as_str()).collect()
    }

    /// Run all pending migrations, returning the versions newly applied.
    pub async fn run(&self, pool: &PgPool) -> Result<Vec<i64>> {
        self.ensure_migrations_table(pool).await?;
        let applied = self.get_applied_migrations(pool).await?;

        let mut newly_applied = Vec::new();
        for migration in &self.migrations {
            if !applied.contains(&migration.version) {
                self.apply_migration(pool, migration).await?;
                newly_applied.push(migration.version);
            }
        }

        if newly_applied.is_empty() {
            tracing::info!("no pending migrations");
        } else {
            tracing::info!(count = newly_applied.len(), "applied migrations");
        }

        Ok(newly_applied)
    }

    async fn ensure_migrations_table(&self, pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| Error::database("failed to create migrations table", e))?;
        Ok(())
    }

    async fn get_applied_migrations(&self, pool: &PgPool) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT version FROM _migrations ORDER BY version")
            .fetch_all(pool)
            .await
            .map_err(|e| Error::database("failed to read applied migrations", e))?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }

    async fn apply_migration(&self, pool: &PgPool, migration: &Migration) -> Result<()> {
        tracing::info!(version = migration.version, name = %migration.name, "applying migration");

        sqlx::query(&migration.sql)
            .execute(pool)
            .await
            .map_err(|e| Error::database(format!("migration {} failed", migration.version), e))?;

        sqlx::query("INSERT INTO _migrations (version, name) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.name)
            .execute(pool)
            .await
            .map_err(|e| Error::database("failed to record migration", e))?;

        Ok(())
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

fn jobs_migrations() -> Vec<Migration> {
    vec![Migration::new(
        1,
        "create_jobs_table",
        r#"
        CREATE TABLE jobs (
            id UUID PRIMARY KEY,
            job_type VARCHAR(255) NOT NULL,
            payload JSONB NOT NULL,
            rrule TEXT,
            next_run_at TIMESTAMPTZ NOT NULL,
            retries INT NOT NULL DEFAULT 0,
            status VARCHAR(20) NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );

        CREATE INDEX idx_jobs_due ON jobs (status, next_run_at);
        "#,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_version_ordered() {
        let migrator = Migrator::new();
        for i in 1..migrator.migrations.len() {
            assert!(migrator.migrations[i].version > migrator.migrations[i - 1].version);
        }
    }
}

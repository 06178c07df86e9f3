use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_metric_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

// Plain SQL shared by PostgreSQL and SQLite. Upserts rely on the unique
// indexes as their conflict target.
const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS counters (
    metric_name TEXT NOT NULL,
    value BIGINT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_counters_metric_name ON counters(metric_name);

CREATE TABLE IF NOT EXISTS gauges (
    metric_name TEXT NOT NULL,
    value DOUBLE PRECISION NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_gauges_metric_name ON gauges(metric_name);
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS gauges;
DROP TABLE IF EXISTS counters;
";

//! Boot-time background migration hook.
//!
//! Concrete schema/data migration steps belong to the persistence layer;
//! none ship with the worker binary itself. The hook keeps the migration
//! lifecycle observable (started / completed / failed) either way.

use async_trait::async_trait;
use conductor_core::port::BackgroundMigration;
use conductor_core::Result;
use tracing::info;

pub struct SchemaMigrations;

#[async_trait]
impl BackgroundMigration for SchemaMigrations {
    fn name(&self) -> &str {
        "schema-migrations"
    }

    async fn run(&self) -> Result<()> {
        info!("no pending background migrations");
        Ok(())
    }
}

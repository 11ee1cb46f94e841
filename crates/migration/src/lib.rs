pub use sea_orm_migration::prelude::*;

mod m20260301_000000_sources;
mod m20260301_000100_ledger;
mod m20260302_090000_ledger_source_key;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000000_sources::Migration),
            Box::new(m20260301_000100_ledger::Migration),
            Box::new(m20260302_090000_ledger_source_key::Migration),
        ]
    }
}

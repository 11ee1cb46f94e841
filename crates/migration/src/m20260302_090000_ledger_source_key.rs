use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum LedgerEntries {
    Table,
    SourceType,
    SourceId,
    SourceRole,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("uidx-ledger_entries-source_type-source_id-source_role")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::SourceType)
                    .col(LedgerEntries::SourceId)
                    .col(LedgerEntries::SourceRole)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("uidx-ledger_entries-source_type-source_id-source_role")
                    .table(LedgerEntries::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

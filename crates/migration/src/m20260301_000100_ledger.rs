//! Engine-owned tables.
//!
//! - `cost_centers`: one per lot, unique by code
//! - `ledger_entries`: immutable expenses and revenues
//! - `allocations`: shares of an entry assigned to cost-bearing entities
//! - `integration_records`: one row per converted source event
//! - `lot_profitability`: rebuildable per-lot aggregate

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum CostCenters {
    Table,
    Id,
    Code,
    Name,
    Description,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    Kind,
    Category,
    Description,
    AmountMinor,
    DueDate,
    CompetenceDate,
    Settled,
    AllocationMethod,
    SourceType,
    SourceId,
    SourceRole,
    LotId,
    CostCenterId,
    CounterpartyId,
    PayerAccountId,
    InvoiceNumber,
    Notes,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Allocations {
    Table,
    Id,
    LedgerEntryId,
    EntityType,
    EntityId,
    AllocatedAmountMinor,
    PercentageBp,
    CreatedAt,
}

#[derive(Iden)]
enum IntegrationRecords {
    Table,
    SourceType,
    SourceId,
    Status,
    EntryIds,
    LotId,
    Attempts,
    ErrorMessage,
    ProcessedAt,
    NeedsRecompute,
    CreatedBy,
    UpdatedAt,
}

#[derive(Iden)]
enum LotProfitability {
    Table,
    LotId,
    PurchaseCostMinor,
    TransportCostMinor,
    FeedCostMinor,
    VeterinaryCostMinor,
    LaborCostMinor,
    OverheadCostMinor,
    TotalCostMinor,
    SaleRevenueMinor,
    OtherRevenueMinor,
    TotalRevenueMinor,
    GrossProfitMinor,
    NetProfitMinor,
    ProfitMargin,
    Roi,
    CostPerAnimalMinor,
    RevenuePerAnimalMinor,
    ProfitPerAnimalMinor,
    CostPerArrobaMinor,
    RevenuePerArrobaMinor,
    ProfitPerArrobaMinor,
    StartDate,
    EndDate,
    DaysInOperation,
    LotStatus,
    LastCalculatedAt,
}

fn money(column: impl IntoIden) -> ColumnDef {
    ColumnDef::new(column).big_integer().not_null().to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CostCenters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CostCenters::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CostCenters::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(CostCenters::Name).string().not_null())
                    .col(ColumnDef::new(CostCenters::Description).string())
                    .col(ColumnDef::new(CostCenters::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(CostCenters::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Kind).string().not_null())
                    .col(ColumnDef::new(LedgerEntries::Category).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::Description)
                            .string()
                            .not_null(),
                    )
                    .col(money(LedgerEntries::AmountMinor))
                    .col(
                        ColumnDef::new(LedgerEntries::DueDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::CompetenceDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::Settled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::AllocationMethod)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::SourceType).string())
                    .col(ColumnDef::new(LedgerEntries::SourceId).string())
                    .col(ColumnDef::new(LedgerEntries::SourceRole).string())
                    .col(ColumnDef::new(LedgerEntries::LotId).string())
                    .col(ColumnDef::new(LedgerEntries::CostCenterId).string())
                    .col(ColumnDef::new(LedgerEntries::CounterpartyId).string())
                    .col(ColumnDef::new(LedgerEntries::PayerAccountId).string())
                    .col(ColumnDef::new(LedgerEntries::InvoiceNumber).string())
                    .col(ColumnDef::new(LedgerEntries::Notes).string())
                    .col(ColumnDef::new(LedgerEntries::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-cost_center_id")
                            .from(LedgerEntries::Table, LedgerEntries::CostCenterId)
                            .to(CostCenters::Table, CostCenters::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-lot_id")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::LotId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-competence_date")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::CompetenceDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Allocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Allocations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Allocations::LedgerEntryId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Allocations::EntityType).string().not_null())
                    .col(ColumnDef::new(Allocations::EntityId).string().not_null())
                    .col(money(Allocations::AllocatedAmountMinor))
                    .col(
                        ColumnDef::new(Allocations::PercentageBp)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Allocations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-allocations-ledger_entry_id")
                            .from(Allocations::Table, Allocations::LedgerEntryId)
                            .to(LedgerEntries::Table, LedgerEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-allocations-ledger_entry_id-entity_type-entity_id")
                    .table(Allocations::Table)
                    .col(Allocations::LedgerEntryId)
                    .col(Allocations::EntityType)
                    .col(Allocations::EntityId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-allocations-entity_type-entity_id")
                    .table(Allocations::Table)
                    .col(Allocations::EntityType)
                    .col(Allocations::EntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IntegrationRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IntegrationRecords::SourceType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationRecords::SourceId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IntegrationRecords::Status).string().not_null())
                    .col(
                        ColumnDef::new(IntegrationRecords::EntryIds)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(IntegrationRecords::LotId).string())
                    .col(
                        ColumnDef::new(IntegrationRecords::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(IntegrationRecords::ErrorMessage).string())
                    .col(ColumnDef::new(IntegrationRecords::ProcessedAt).timestamp())
                    .col(
                        ColumnDef::new(IntegrationRecords::NeedsRecompute)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(IntegrationRecords::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IntegrationRecords::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(IntegrationRecords::SourceType)
                            .col(IntegrationRecords::SourceId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-integration_records-status")
                    .table(IntegrationRecords::Table)
                    .col(IntegrationRecords::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LotProfitability::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LotProfitability::LotId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(money(LotProfitability::PurchaseCostMinor))
                    .col(money(LotProfitability::TransportCostMinor))
                    .col(money(LotProfitability::FeedCostMinor))
                    .col(money(LotProfitability::VeterinaryCostMinor))
                    .col(money(LotProfitability::LaborCostMinor))
                    .col(money(LotProfitability::OverheadCostMinor))
                    .col(money(LotProfitability::TotalCostMinor))
                    .col(money(LotProfitability::SaleRevenueMinor))
                    .col(money(LotProfitability::OtherRevenueMinor))
                    .col(money(LotProfitability::TotalRevenueMinor))
                    .col(money(LotProfitability::GrossProfitMinor))
                    .col(money(LotProfitability::NetProfitMinor))
                    .col(
                        ColumnDef::new(LotProfitability::ProfitMargin)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LotProfitability::Roi).double().not_null())
                    .col(money(LotProfitability::CostPerAnimalMinor))
                    .col(money(LotProfitability::RevenuePerAnimalMinor))
                    .col(money(LotProfitability::ProfitPerAnimalMinor))
                    .col(money(LotProfitability::CostPerArrobaMinor))
                    .col(money(LotProfitability::RevenuePerArrobaMinor))
                    .col(money(LotProfitability::ProfitPerArrobaMinor))
                    .col(
                        ColumnDef::new(LotProfitability::StartDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LotProfitability::EndDate).timestamp())
                    .col(
                        ColumnDef::new(LotProfitability::DaysInOperation)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotProfitability::LotStatus)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LotProfitability::LastCalculatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LotProfitability::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IntegrationRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Allocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CostCenters::Table).to_owned())
            .await?;
        Ok(())
    }
}

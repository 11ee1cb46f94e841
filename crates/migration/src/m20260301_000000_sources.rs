//! Tables owned by the herd-management workflows.
//!
//! The engine only reads them:
//!
//! - `lots`: animal lots and their lifecycle status
//! - `purchases`: the purchase that formed a lot
//! - `sales`: slaughter sales of a lot
//! - `interventions`: sanitary interventions applied to a lot

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Lots {
    Table,
    Id,
    Code,
    Status,
    InitialQuantity,
    CurrentQuantity,
    PurchaseWeightKg,
    CurrentWeightKg,
    PurchaseDate,
    ClosedAt,
}

#[derive(Iden)]
enum Purchases {
    Table,
    Id,
    LotId,
    LotCode,
    VendorId,
    BrokerId,
    CarrierId,
    PayerAccountId,
    PurchaseWeightKg,
    PricePerArrobaMinor,
    CommissionPercentage,
    TransportValueMinor,
    InitialQuantity,
    PurchaseDate,
    PaymentDate,
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    LotId,
    BuyerId,
    SlaughterWeightKg,
    PricePerArrobaMinor,
    InvoiceNumber,
    SaleNumber,
    PaymentDate,
    ExpectedDate,
    SlaughterDate,
    ShipmentDate,
}

#[derive(Iden)]
enum Interventions {
    Table,
    Id,
    LotId,
    InterventionType,
    TotalCostMinor,
    InterventionDate,
    Notes,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lots::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Lots::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Lots::Code).string().not_null())
                    .col(ColumnDef::new(Lots::Status).string().not_null())
                    .col(
                        ColumnDef::new(Lots::InitialQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Lots::CurrentQuantity).big_integer())
                    .col(ColumnDef::new(Lots::PurchaseWeightKg).double().not_null())
                    .col(ColumnDef::new(Lots::CurrentWeightKg).double())
                    .col(ColumnDef::new(Lots::PurchaseDate).timestamp().not_null())
                    .col(ColumnDef::new(Lots::ClosedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-lots-status")
                    .table(Lots::Table)
                    .col(Lots::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Purchases::LotId).string().not_null())
                    .col(ColumnDef::new(Purchases::LotCode).string().not_null())
                    .col(ColumnDef::new(Purchases::VendorId).string().not_null())
                    .col(ColumnDef::new(Purchases::BrokerId).string())
                    .col(ColumnDef::new(Purchases::CarrierId).string())
                    .col(ColumnDef::new(Purchases::PayerAccountId).string())
                    .col(
                        ColumnDef::new(Purchases::PurchaseWeightKg)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::PricePerArrobaMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Purchases::CommissionPercentage).double())
                    .col(ColumnDef::new(Purchases::TransportValueMinor).big_integer())
                    .col(
                        ColumnDef::new(Purchases::InitialQuantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::PurchaseDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Purchases::PaymentDate).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sales::LotId).string().not_null())
                    .col(ColumnDef::new(Sales::BuyerId).string())
                    .col(ColumnDef::new(Sales::SlaughterWeightKg).double())
                    .col(ColumnDef::new(Sales::PricePerArrobaMinor).big_integer())
                    .col(ColumnDef::new(Sales::InvoiceNumber).string())
                    .col(ColumnDef::new(Sales::SaleNumber).string())
                    .col(ColumnDef::new(Sales::PaymentDate).timestamp())
                    .col(ColumnDef::new(Sales::ExpectedDate).timestamp())
                    .col(ColumnDef::new(Sales::SlaughterDate).timestamp())
                    .col(ColumnDef::new(Sales::ShipmentDate).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Interventions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Interventions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Interventions::LotId).string().not_null())
                    .col(
                        ColumnDef::new(Interventions::InterventionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Interventions::TotalCostMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Interventions::InterventionDate)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Interventions::Notes).string())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Interventions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lots::Table).to_owned())
            .await?;
        Ok(())
    }
}

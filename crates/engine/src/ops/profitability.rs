use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, Iterable, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*, sea_query::Expr, sea_query::OnConflict,
};
use serde::Serialize;

use crate::{
    EngineError, EntityType, IntegrationStatus, LedgerCategory, LotLine, LotProfitability,
    MoneyCents, ResultEngine, allocations, integrations, ledger, profitability,
};

use super::{Engine, sources::require_lot, with_tx};

/// Lots touched by a bulk recompute.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub refreshed: Vec<String>,
    /// `(lot_id, reason)` of every lot whose recompute failed.
    pub failed: Vec<(String, String)>,
}

/// Every money line reaching the lot.
///
/// Allocations to the lot contribute their allocated amount. Entries linked
/// to the lot that were never allocated contribute their full amount.
async fn lot_lines<C: ConnectionTrait>(conn: &C, lot_id: &str) -> ResultEngine<Vec<LotLine>> {
    let mut lines = Vec::new();

    let allocated = allocations::Entity::find()
        .filter(allocations::Column::EntityType.eq(EntityType::Lot.as_str()))
        .filter(allocations::Column::EntityId.eq(lot_id))
        .find_also_related(ledger::Entity)
        .all(conn)
        .await?;
    for (allocation, entry) in allocated {
        let entry = entry.ok_or_else(|| {
            EngineError::KeyNotFound(format!("ledger entry {}", allocation.ledger_entry_id))
        })?;
        lines.push(LotLine {
            category: LedgerCategory::parse(&entry.kind, &entry.category)?,
            amount: MoneyCents::new(allocation.allocated_amount_minor),
        });
    }

    let direct = ledger::Entity::find()
        .filter(ledger::Column::LotId.eq(lot_id))
        .find_with_related(allocations::Entity)
        .all(conn)
        .await?;
    for (entry, entry_allocations) in direct {
        if entry_allocations.is_empty() {
            lines.push(LotLine {
                category: LedgerCategory::parse(&entry.kind, &entry.category)?,
                amount: MoneyCents::new(entry.amount_minor),
            });
        }
    }

    Ok(lines)
}

async fn upsert<C: ConnectionTrait>(conn: &C, computed: &LotProfitability) -> ResultEngine<()> {
    let columns = profitability::Column::iter()
        .filter(|column| !matches!(column, profitability::Column::LotId));
    profitability::Entity::insert(profitability::ActiveModel::from(computed))
        .on_conflict(
            OnConflict::column(profitability::Column::LotId)
                .update_columns(columns)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

impl Engine {
    /// Recomputes the lot's profitability from scratch and stores it.
    pub async fn recompute_lot_profitability(&self, lot_id: &str) -> ResultEngine<LotProfitability> {
        with_tx!(self, |db_tx| self.recompute_in(&db_tx, lot_id).await)
    }

    async fn recompute_in(
        &self,
        db_tx: &DatabaseTransaction,
        lot_id: &str,
    ) -> ResultEngine<LotProfitability> {
        let lot = require_lot(db_tx, lot_id).await?;
        let lines = lot_lines(db_tx, lot_id).await?;
        let computed =
            profitability::compute(&lot, &lines, self.settings.arroba_divisor, Utc::now());
        upsert(db_tx, &computed).await?;
        tracing::debug!(
            "lot {lot_id} profitability: cost {}, revenue {}, net {}",
            computed.total_cost,
            computed.total_revenue,
            computed.net_profit
        );
        Ok(computed)
    }

    /// Cached profitability of the lot, as of its last recompute.
    pub async fn lot_profitability(&self, lot_id: &str) -> ResultEngine<Option<LotProfitability>> {
        profitability::Entity::find_by_id(lot_id.to_string())
            .one(&self.database)
            .await?
            .map(LotProfitability::try_from)
            .transpose()
    }

    pub async fn list_lot_profitability(&self) -> ResultEngine<Vec<LotProfitability>> {
        profitability::Entity::find()
            .order_by_asc(profitability::Column::LotId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LotProfitability::try_from)
            .collect()
    }

    /// Recomputes the lots of integration records still flagged
    /// `needs_recompute`, clearing the flag of each record on success.
    pub async fn refresh_stale_profitability(&self) -> ResultEngine<RefreshReport> {
        let stale = integrations::Entity::find()
            .filter(integrations::Column::NeedsRecompute.eq(true))
            .filter(integrations::Column::Status.eq(IntegrationStatus::Processed.as_str()))
            .all(&self.database)
            .await?;

        let mut by_lot: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for record in stale {
            if let Some(lot_id) = record.lot_id {
                by_lot
                    .entry(lot_id)
                    .or_default()
                    .push((record.source_type, record.source_id));
            }
        }

        let mut report = RefreshReport::default();
        for (lot_id, keys) in by_lot {
            match self.recompute_lot_profitability(&lot_id).await {
                Ok(_) => {
                    for (source_type, source_id) in keys {
                        integrations::Entity::update_many()
                            .col_expr(integrations::Column::NeedsRecompute, Expr::value(false))
                            .filter(integrations::Column::SourceType.eq(source_type))
                            .filter(integrations::Column::SourceId.eq(source_id))
                            .exec(&self.database)
                            .await?;
                    }
                    report.refreshed.push(lot_id);
                }
                Err(err) => {
                    tracing::warn!("lot {lot_id} is still stale: {err}");
                    report.failed.push((lot_id, err.to_string()));
                }
            }
        }
        tracing::info!(
            "refreshed {} stale lots, {} still failing",
            report.refreshed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Drops the whole cache and recomputes every lot with ledger activity or
    /// an integration record.
    pub async fn rebuild_all_profitability(&self) -> ResultEngine<RefreshReport> {
        profitability::Entity::delete_many()
            .exec(&self.database)
            .await?;

        let mut lot_ids: BTreeSet<String> = BTreeSet::new();
        lot_ids.extend(
            ledger::Entity::find()
                .select_only()
                .column(ledger::Column::LotId)
                .filter(ledger::Column::LotId.is_not_null())
                .distinct()
                .into_tuple::<String>()
                .all(&self.database)
                .await?,
        );
        lot_ids.extend(
            allocations::Entity::find()
                .select_only()
                .column(allocations::Column::EntityId)
                .filter(allocations::Column::EntityType.eq(EntityType::Lot.as_str()))
                .distinct()
                .into_tuple::<String>()
                .all(&self.database)
                .await?,
        );
        lot_ids.extend(
            integrations::Entity::find()
                .select_only()
                .column(integrations::Column::LotId)
                .filter(integrations::Column::LotId.is_not_null())
                .distinct()
                .into_tuple::<String>()
                .all(&self.database)
                .await?,
        );

        let mut report = RefreshReport::default();
        for lot_id in lot_ids {
            match self.recompute_lot_profitability(&lot_id).await {
                Ok(_) => report.refreshed.push(lot_id),
                Err(err) => {
                    tracing::warn!("rebuild of lot {lot_id} failed: {err}");
                    report.failed.push((lot_id, err.to_string()));
                }
            }
        }

        if !report.refreshed.is_empty() {
            integrations::Entity::update_many()
                .col_expr(integrations::Column::NeedsRecompute, Expr::value(false))
                .filter(integrations::Column::LotId.is_in(report.refreshed.clone()))
                .exec(&self.database)
                .await?;
        }
        tracing::info!(
            "rebuilt profitability of {} lots, {} failed",
            report.refreshed.len(),
            report.failed.len()
        );
        Ok(report)
    }
}

//! Rateio: farm-wide expenses split evenly across the active lots.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Actor, AllocationMethod, EngineError, EntityRef, LedgerCategory, LedgerEntry, ResultEngine,
    SharedExpenseCmd, allocations, ledger, lots,
    util::{is_unique_violation_error, normalize_optional_text},
};

use super::{Engine, with_tx};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RateioOutcome {
    /// No global expense was waiting for allocation.
    NothingPending,
    /// Expenses are waiting but no lot is active; nothing was written.
    NoActiveLots,
    Allocated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RateioReport {
    pub outcome: RateioOutcome,
    /// Global expenses without allocations when the run started.
    pub pending_expenses: usize,
    pub active_lots: Vec<String>,
    pub allocated: Vec<Uuid>,
    /// Expenses allocated by someone else while this run was going.
    pub skipped: Vec<Uuid>,
    /// `(lot_id, reason)` of lots whose recompute failed afterwards.
    pub stale_lots: Vec<(String, String)>,
}

impl RateioReport {
    fn empty(outcome: RateioOutcome, pending_expenses: usize) -> Self {
        Self {
            outcome,
            pending_expenses,
            active_lots: Vec::new(),
            allocated: Vec::new(),
            skipped: Vec::new(),
            stale_lots: Vec::new(),
        }
    }
}

impl Engine {
    /// Records an expense shared by the whole farm, left unallocated until the
    /// next rateio run.
    pub async fn record_shared_expense(
        &self,
        cmd: SharedExpenseCmd,
        actor: &Actor,
    ) -> ResultEngine<LedgerEntry> {
        let description = cmd.description.trim();
        if description.is_empty() {
            return Err(EngineError::InvalidValue(
                "expense description must not be empty".to_string(),
            ));
        }
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(format!(
                "shared expense must be > 0, got {}",
                cmd.amount
            )));
        }
        let mut entry = LedgerEntry::new(
            LedgerCategory::Expense(cmd.category),
            description,
            cmd.amount,
            cmd.due_date.unwrap_or(cmd.competence_date),
            cmd.competence_date,
            AllocationMethod::Global,
            actor.clone(),
            Utc::now(),
        )?;
        entry.counterparty_id = normalize_optional_text(cmd.counterparty_id.as_deref());
        entry.payer_account_id = normalize_optional_text(cmd.payer_account_id.as_deref());
        entry.notes = normalize_optional_text(cmd.notes.as_deref());

        ledger::ActiveModel::from(&entry)
            .insert(&self.database)
            .await?;
        tracing::info!("shared expense {} of {} recorded by {actor}", entry.id, entry.amount);
        Ok(entry)
    }

    /// Splits every unallocated global expense evenly across the active lots.
    ///
    /// Each expense is written in its own transaction that re-checks it has no
    /// allocations, so concurrent runs never allocate an expense twice.
    pub async fn allocate_global_expenses(&self, actor: &Actor) -> ResultEngine<RateioReport> {
        let pending = self.unallocated_global_expenses().await?;
        if pending.is_empty() {
            tracing::debug!("rateio: no global expense pending");
            return Ok(RateioReport::empty(RateioOutcome::NothingPending, 0));
        }

        let statuses: Vec<&str> = self
            .settings
            .active_lot_statuses
            .iter()
            .map(|status| status.as_str())
            .collect();
        let active_lots: Vec<String> = lots::Entity::find()
            .filter(lots::Column::Status.is_in(statuses))
            .order_by_asc(lots::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|lot| lot.id)
            .collect();
        if active_lots.is_empty() {
            tracing::warn!(
                "rateio: {} global expenses pending but no lot is active",
                pending.len()
            );
            return Ok(RateioReport::empty(RateioOutcome::NoActiveLots, pending.len()));
        }

        let entities: Vec<EntityRef> = active_lots.iter().map(EntityRef::lot).collect();
        let mut report = RateioReport::empty(RateioOutcome::Allocated, pending.len());
        report.active_lots = active_lots;

        for entry in &pending {
            match self.allocate_one(entry, &entities, Utc::now()).await {
                Ok(true) => report.allocated.push(entry.id),
                Ok(false) => report.skipped.push(entry.id),
                Err(err) if is_unique_violation_error(&err) => report.skipped.push(entry.id),
                Err(err) => return Err(err),
            }
        }
        tracing::info!(
            "rateio by {actor}: {} expenses over {} lots, {} skipped",
            report.allocated.len(),
            report.active_lots.len(),
            report.skipped.len()
        );

        if !report.allocated.is_empty() {
            for lot_id in &report.active_lots {
                if let Err(err) = self.recompute_lot_profitability(lot_id).await {
                    tracing::warn!("profitability of lot {lot_id} is stale after rateio: {err}");
                    report.stale_lots.push((lot_id.clone(), err.to_string()));
                }
            }
        }
        Ok(report)
    }

    async fn unallocated_global_expenses(&self) -> ResultEngine<Vec<LedgerEntry>> {
        let candidates = ledger::Entity::find()
            .filter(ledger::Column::Kind.eq("expense"))
            .filter(ledger::Column::AllocationMethod.eq(AllocationMethod::Global.as_str()))
            .order_by_asc(ledger::Column::CreatedAt)
            .all(&self.database)
            .await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = candidates.iter().map(|model| model.id.clone()).collect();
        let allocated: HashSet<String> = allocations::Entity::find()
            .filter(allocations::Column::LedgerEntryId.is_in(ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|allocation| allocation.ledger_entry_id)
            .collect();

        candidates
            .into_iter()
            .filter(|model| !allocated.contains(&model.id))
            .map(LedgerEntry::try_from)
            .collect()
    }

    /// `false` when the expense already had allocations.
    async fn allocate_one(
        &self,
        entry: &LedgerEntry,
        entities: &[EntityRef],
        now: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            self.write_split(&db_tx, entry, entities, now).await
        })
    }

    async fn write_split(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &LedgerEntry,
        entities: &[EntityRef],
        now: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        let existing = allocations::Entity::find()
            .filter(allocations::Column::LedgerEntryId.eq(entry.id.to_string()))
            .count(db_tx)
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let rows = allocations::split_across(entry, entities, now);
        allocations::check_conservation(entry, &rows, self.settings.allocation_tolerance_cents)?;
        for row in &rows {
            allocations::ActiveModel::from(row).insert(db_tx).await?;
        }
        Ok(true)
    }
}

//! Read-side operations: integration status, retroactive integration and the
//! period summary of the ledger.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Actor, Allocation, EngineError, IntegrationRecord, IntegrationStatus, LedgerCategory,
    LedgerEntry, MoneyCents, ResultEngine, SourceType, allocations, integrations, interventions,
    ledger, purchases, sales,
};

use super::{Engine, IntegrationOutcome};

/// Integration records grouped by status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationReport {
    pub pending: u64,
    pub processed: u64,
    pub errors: u64,
    /// Processed records whose lot profitability has not been refreshed.
    pub stale: u64,
    /// Records in `ERROR`, with their messages.
    pub failures: Vec<IntegrationRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BacklogFailure {
    pub source_type: SourceType,
    pub source_id: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BacklogReport {
    pub integrated: Vec<(SourceType, String)>,
    /// Converted by a concurrent caller while the backlog ran.
    pub already_processed: u64,
    pub failures: Vec<BacklogFailure>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KindTotals {
    pub total: MoneyCents,
    pub settled: MoneyCents,
    pub count: u64,
    pub settled_count: u64,
}

impl KindTotals {
    fn add(&mut self, amount: MoneyCents, settled: bool) {
        self.total += amount;
        self.count += 1;
        if settled {
            self.settled += amount;
            self.settled_count += 1;
        }
    }

    pub fn outstanding(&self) -> MoneyCents {
        self.total - self.settled
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: LedgerCategory,
    pub total: MoneyCents,
    pub count: u64,
}

/// Ledger totals for entries whose competence date lies in `[from, to)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FinancialSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub expenses: KindTotals,
    pub revenues: KindTotals,
    pub by_category: Vec<CategoryTotal>,
}

impl FinancialSummary {
    pub fn balance(&self) -> MoneyCents {
        self.revenues.total - self.expenses.total
    }
}

impl Engine {
    pub async fn integration_record(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> ResultEngine<Option<IntegrationRecord>> {
        integrations::Entity::find_by_id((source_type.as_str().to_string(), source_id.trim().to_string()))
            .one(&self.database)
            .await?
            .map(IntegrationRecord::try_from)
            .transpose()
    }

    pub async fn integration_report(&self) -> ResultEngine<IntegrationReport> {
        let records = integrations::Entity::find()
            .order_by_asc(integrations::Column::UpdatedAt)
            .all(&self.database)
            .await?;

        let mut report = IntegrationReport::default();
        for model in records {
            let record = IntegrationRecord::try_from(model)?;
            match record.status {
                IntegrationStatus::Pending => report.pending += 1,
                IntegrationStatus::Processed => {
                    report.processed += 1;
                    if record.needs_recompute {
                        report.stale += 1;
                    }
                }
                IntegrationStatus::Error => {
                    report.errors += 1;
                    report.failures.push(record);
                }
            }
        }
        Ok(report)
    }

    /// Integrates every purchase, then every sale, then every intervention
    /// that has no `PROCESSED` record yet. Failures are collected, they do not
    /// stop the run.
    pub async fn integrate_backlog(&self, actor: &Actor) -> ResultEngine<BacklogReport> {
        let processed: HashSet<(String, String)> = integrations::Entity::find()
            .filter(integrations::Column::Status.eq(IntegrationStatus::Processed.as_str()))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|record| (record.source_type, record.source_id))
            .collect();

        let purchase_ids: Vec<String> = purchases::Entity::find()
            .select_only()
            .column(purchases::Column::Id)
            .order_by_asc(purchases::Column::PurchaseDate)
            .order_by_asc(purchases::Column::Id)
            .into_tuple()
            .all(&self.database)
            .await?;
        let sale_ids: Vec<String> = sales::Entity::find()
            .select_only()
            .column(sales::Column::Id)
            .order_by_asc(sales::Column::Id)
            .into_tuple()
            .all(&self.database)
            .await?;
        let intervention_ids: Vec<String> = interventions::Entity::find()
            .select_only()
            .column(interventions::Column::Id)
            .order_by_asc(interventions::Column::InterventionDate)
            .order_by_asc(interventions::Column::Id)
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut report = BacklogReport::default();
        for (source_type, ids) in [
            (SourceType::Purchase, purchase_ids),
            (SourceType::Sale, sale_ids),
            (SourceType::Intervention, intervention_ids),
        ] {
            for source_id in ids {
                if processed.contains(&(source_type.as_str().to_string(), source_id.clone())) {
                    continue;
                }
                match self.integrate(source_type, &source_id, actor).await {
                    Ok(IntegrationOutcome::Integrated { .. }) => {
                        report.integrated.push((source_type, source_id));
                    }
                    Ok(IntegrationOutcome::AlreadyProcessed) => report.already_processed += 1,
                    Err(err) => report.failures.push(BacklogFailure {
                        source_type,
                        source_id,
                        reason: err.to_string(),
                    }),
                }
            }
        }
        tracing::info!(
            "backlog: {} integrated, {} failed",
            report.integrated.len(),
            report.failures.len()
        );
        Ok(report)
    }

    pub async fn financial_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<FinancialSummary> {
        if from >= to {
            return Err(EngineError::InvalidValue(format!(
                "empty period: {from} .. {to}"
            )));
        }
        let models = ledger::Entity::find()
            .filter(ledger::Column::CompetenceDate.gte(from))
            .filter(ledger::Column::CompetenceDate.lt(to))
            .all(&self.database)
            .await?;

        let mut expenses = KindTotals::default();
        let mut revenues = KindTotals::default();
        let mut by_category: BTreeMap<LedgerCategory, (MoneyCents, u64)> = BTreeMap::new();
        for model in models {
            let entry = LedgerEntry::try_from(model)?;
            if entry.is_expense() {
                expenses.add(entry.amount, entry.settled);
            } else {
                revenues.add(entry.amount, entry.settled);
            }
            let slot = by_category
                .entry(entry.category)
                .or_insert((MoneyCents::ZERO, 0));
            slot.0 += entry.amount;
            slot.1 += 1;
        }

        Ok(FinancialSummary {
            from,
            to,
            expenses,
            revenues,
            by_category: by_category
                .into_iter()
                .map(|(category, (total, count))| CategoryTotal {
                    category,
                    total,
                    count,
                })
                .collect(),
        })
    }

    /// Entries written for one source event, oldest first.
    pub async fn ledger_entries_for_source(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        ledger::Entity::find()
            .filter(ledger::Column::SourceType.eq(source_type.as_str()))
            .filter(ledger::Column::SourceId.eq(source_id.trim()))
            .order_by_asc(ledger::Column::CreatedAt)
            .order_by_asc(ledger::Column::SourceRole)
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }

    pub async fn allocations_for_entry(&self, entry_id: Uuid) -> ResultEngine<Vec<Allocation>> {
        allocations::Entity::find()
            .filter(allocations::Column::LedgerEntryId.eq(entry_id.to_string()))
            .order_by_asc(allocations::Column::EntityId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Allocation::try_from)
            .collect()
    }
}

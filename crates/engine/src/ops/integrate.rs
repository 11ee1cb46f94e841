//! Integration coordinator.
//!
//! Owns the `integration_records` state machine and is the only writer of
//! that table. Each source key is converted at most once: the record's
//! primary key guards the claim and the `(source_type, source_id, role)`
//! index on `ledger_entries` guards the converter's writes, so two racing
//! callers end up with a single set of entries.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Actor, ConversionContext, EngineError, IntegrationStatus, LedgerEntry, LotProfitability,
    PlannedEntry, ResultEngine, SourceType, allocations, convert,
    integrations::{self, encode_entry_ids},
    ledger,
    util::{is_unique_violation, is_unique_violation_error, normalize_required_id},
};

use super::{
    Engine,
    cost_centers::{ensure_lot_cost_center_in, lot_cost_center_in},
    sources::{require_intervention, require_lot, require_purchase, require_sale},
    with_tx,
};

/// State of the lot's profitability once the entries are committed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ProfitabilityRefresh {
    Fresh(LotProfitability),
    /// The recompute failed; the record keeps `needs_recompute` set.
    Stale { reason: String },
}

impl ProfitabilityRefresh {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum IntegrationOutcome {
    Integrated {
        lot_id: String,
        entry_ids: Vec<Uuid>,
        /// The entries were committed by an earlier attempt and adopted.
        adopted: bool,
        profitability: ProfitabilityRefresh,
    },
    AlreadyProcessed,
}

impl IntegrationOutcome {
    pub fn entry_ids(&self) -> &[Uuid] {
        match self {
            Self::Integrated { entry_ids, .. } => entry_ids,
            Self::AlreadyProcessed => &[],
        }
    }

    pub fn is_already_processed(&self) -> bool {
        matches!(self, Self::AlreadyProcessed)
    }
}

enum Claim {
    Claimed { attempt: i32 },
    Taken,
}

struct Converted {
    lot_id: String,
    entry_ids: Vec<Uuid>,
}

impl Engine {
    /// Converts one source event into ledger entries, exactly once.
    ///
    /// Returns [`IntegrationOutcome::AlreadyProcessed`] without writing when
    /// the key was already converted or another caller holds the claim.
    /// A converter failure is recorded as `ERROR` on the integration record
    /// and returned; the record may then be retried.
    pub async fn integrate(
        &self,
        source_type: SourceType,
        source_id: &str,
        actor: &Actor,
    ) -> ResultEngine<IntegrationOutcome> {
        let source_id = normalize_required_id(source_id, source_type.as_str())?;
        let now = Utc::now();

        let attempt = match self.claim(source_type, source_id, actor, now).await? {
            Claim::Taken => {
                tracing::debug!("{} {source_id} already processed", source_type.as_str());
                return Ok(IntegrationOutcome::AlreadyProcessed);
            }
            Claim::Claimed { attempt } => attempt,
        };

        let (converted, adopted) = match self.convert_in_tx(source_type, source_id, actor, now).await {
            Ok(converted) => (converted, false),
            Err(err) if is_unique_violation_error(&err) => {
                match self.committed_entries(source_type, source_id).await? {
                    Some(converted) => {
                        tracing::warn!(
                            "{} {source_id}: adopting {} entries committed by an earlier run",
                            source_type.as_str(),
                            converted.entry_ids.len()
                        );
                        (converted, true)
                    }
                    None => return Err(self.fail(source_type, source_id, err).await),
                }
            }
            Err(err) => return Err(self.fail(source_type, source_id, err).await),
        };

        self.mark_processed(source_type, source_id, &converted).await?;
        tracing::info!(
            "integrated {} {source_id} (attempt {attempt}): {} entries for lot {}",
            source_type.as_str(),
            converted.entry_ids.len(),
            converted.lot_id
        );

        let profitability = self
            .refresh_after_integration(source_type, source_id, &converted.lot_id)
            .await;

        Ok(IntegrationOutcome::Integrated {
            lot_id: converted.lot_id,
            entry_ids: converted.entry_ids,
            adopted,
            profitability,
        })
    }

    pub async fn integrate_purchase(
        &self,
        purchase_id: &str,
        actor: &Actor,
    ) -> ResultEngine<IntegrationOutcome> {
        self.integrate(SourceType::Purchase, purchase_id, actor).await
    }

    pub async fn integrate_sale(&self, sale_id: &str, actor: &Actor) -> ResultEngine<IntegrationOutcome> {
        self.integrate(SourceType::Sale, sale_id, actor).await
    }

    pub async fn integrate_intervention(
        &self,
        intervention_id: &str,
        actor: &Actor,
    ) -> ResultEngine<IntegrationOutcome> {
        self.integrate(SourceType::Intervention, intervention_id, actor)
            .await
    }

    async fn claim(
        &self,
        source_type: SourceType,
        source_id: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<Claim> {
        let existing =
            integrations::Entity::find_by_id((source_type.as_str().to_string(), source_id.to_string()))
                .one(&self.database)
                .await?;

        let Some(model) = existing else {
            let record = integrations::ActiveModel {
                source_type: ActiveValue::Set(source_type.as_str().to_string()),
                source_id: ActiveValue::Set(source_id.to_string()),
                status: ActiveValue::Set(IntegrationStatus::Pending.as_str().to_string()),
                entry_ids: ActiveValue::Set(encode_entry_ids(&[])?),
                lot_id: ActiveValue::Set(None),
                attempts: ActiveValue::Set(1),
                error_message: ActiveValue::Set(None),
                processed_at: ActiveValue::Set(None),
                needs_recompute: ActiveValue::Set(false),
                created_by: ActiveValue::Set(actor.as_stored()),
                updated_at: ActiveValue::Set(now),
            };
            return match integrations::Entity::insert(record)
                .exec_without_returning(&self.database)
                .await
            {
                Ok(_) => Ok(Claim::Claimed { attempt: 1 }),
                Err(err) if is_unique_violation(&err) => {
                    tracing::warn!(
                        "{} {source_id}: claimed concurrently by another caller",
                        source_type.as_str()
                    );
                    Ok(Claim::Taken)
                }
                Err(err) => Err(err.into()),
            };
        };

        if !IntegrationStatus::try_from(model.status.as_str())?.can_retry() {
            return Ok(Claim::Taken);
        }

        // Conditional on the status so a concurrent PROCESSED is never reopened.
        let attempt = model.attempts + 1;
        let updated = integrations::Entity::update_many()
            .col_expr(
                integrations::Column::Status,
                Expr::value(IntegrationStatus::Pending.as_str()),
            )
            .col_expr(integrations::Column::Attempts, Expr::value(attempt))
            .col_expr(
                integrations::Column::ErrorMessage,
                Expr::value(Option::<String>::None),
            )
            .col_expr(integrations::Column::UpdatedAt, Expr::value(now))
            .filter(integrations::Column::SourceType.eq(source_type.as_str()))
            .filter(integrations::Column::SourceId.eq(source_id))
            .filter(integrations::Column::Status.ne(IntegrationStatus::Processed.as_str()))
            .exec(&self.database)
            .await?;
        if updated.rows_affected == 0 {
            return Ok(Claim::Taken);
        }
        Ok(Claim::Claimed { attempt })
    }

    async fn convert_in_tx(
        &self,
        source_type: SourceType,
        source_id: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<Converted> {
        with_tx!(self, |db_tx| {
            self.convert_and_persist(&db_tx, source_type, source_id, actor, now)
                .await
        })
    }

    async fn convert_and_persist(
        &self,
        db_tx: &DatabaseTransaction,
        source_type: SourceType,
        source_id: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ResultEngine<Converted> {
        let ctx = |cost_center_id: Option<Uuid>| ConversionContext {
            arroba_divisor: self.settings.arroba_divisor,
            actor: actor.clone(),
            now,
            cost_center_id,
        };

        let (lot_id, planned) = match source_type {
            SourceType::Purchase => {
                let purchase = require_purchase(db_tx, source_id).await?;
                require_lot(db_tx, &purchase.lot_id).await?;
                let center = ensure_lot_cost_center_in(db_tx, &purchase.lot_code, actor, now).await?;
                let planned = convert::purchase_entries(&purchase, &ctx(Some(center.id)))?;
                (purchase.lot_id, planned)
            }
            SourceType::Sale => {
                let sale = require_sale(db_tx, source_id).await?;
                let lot = require_lot(db_tx, &sale.lot_id).await?;
                let center = lot_cost_center_in(db_tx, &lot.code).await?;
                let planned = convert::sale_entries(&sale, &lot, &ctx(center.map(|c| c.id)))?;
                (sale.lot_id, planned)
            }
            SourceType::Intervention => {
                let intervention = require_intervention(db_tx, source_id).await?;
                let lot = require_lot(db_tx, &intervention.lot_id).await?;
                let center = lot_cost_center_in(db_tx, &lot.code).await?;
                let planned =
                    convert::intervention_entries(&intervention, &ctx(center.map(|c| c.id)))?;
                (intervention.lot_id, planned)
            }
        };

        let entry_ids = persist_planned(db_tx, &planned, self.settings.allocation_tolerance_cents).await?;
        Ok(Converted { lot_id, entry_ids })
    }

    /// Entries already committed for the source, if any.
    async fn committed_entries(
        &self,
        source_type: SourceType,
        source_id: &str,
    ) -> ResultEngine<Option<Converted>> {
        let models = ledger::Entity::find()
            .filter(ledger::Column::SourceType.eq(source_type.as_str()))
            .filter(ledger::Column::SourceId.eq(source_id))
            .order_by_asc(ledger::Column::CreatedAt)
            .all(&self.database)
            .await?;
        let entries = models
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let Some(lot_id) = entries.iter().find_map(|entry| entry.lot_id.clone()) else {
            return Ok(None);
        };
        Ok(Some(Converted {
            lot_id,
            entry_ids: entries.iter().map(|entry| entry.id).collect(),
        }))
    }

    async fn mark_processed(
        &self,
        source_type: SourceType,
        source_id: &str,
        converted: &Converted,
    ) -> ResultEngine<()> {
        let now = Utc::now();
        let record = integrations::ActiveModel {
            source_type: ActiveValue::Set(source_type.as_str().to_string()),
            source_id: ActiveValue::Set(source_id.to_string()),
            status: ActiveValue::Set(IntegrationStatus::Processed.as_str().to_string()),
            entry_ids: ActiveValue::Set(encode_entry_ids(&converted.entry_ids)?),
            lot_id: ActiveValue::Set(Some(converted.lot_id.clone())),
            error_message: ActiveValue::Set(None),
            processed_at: ActiveValue::Set(Some(now)),
            needs_recompute: ActiveValue::Set(true),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        record.update(&self.database).await?;
        Ok(())
    }

    /// Records the failure on the integration record and returns the error
    /// the caller should see.
    async fn fail(&self, source_type: SourceType, source_id: &str, err: EngineError) -> EngineError {
        let err = match err {
            EngineError::Database(db_err) => EngineError::PartialWrite(format!(
                "{} {source_id}: {db_err}",
                source_type.as_str()
            )),
            other => other,
        };
        tracing::error!("integration of {} {source_id} failed: {err}", source_type.as_str());

        let message = err.to_string();
        let recorded = integrations::Entity::update_many()
            .col_expr(
                integrations::Column::Status,
                Expr::value(IntegrationStatus::Error.as_str()),
            )
            .col_expr(integrations::Column::ErrorMessage, Expr::value(Some(message)))
            .col_expr(integrations::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(integrations::Column::SourceType.eq(source_type.as_str()))
            .filter(integrations::Column::SourceId.eq(source_id))
            .filter(integrations::Column::Status.ne(IntegrationStatus::Processed.as_str()))
            .exec(&self.database)
            .await;
        if let Err(record_err) = recorded {
            tracing::error!(
                "could not record failure of {} {source_id}: {record_err}",
                source_type.as_str()
            );
        }
        err
    }

    async fn refresh_after_integration(
        &self,
        source_type: SourceType,
        source_id: &str,
        lot_id: &str,
    ) -> ProfitabilityRefresh {
        match self.recompute_lot_profitability(lot_id).await {
            Ok(profitability) => {
                let cleared = integrations::ActiveModel {
                    source_type: ActiveValue::Set(source_type.as_str().to_string()),
                    source_id: ActiveValue::Set(source_id.to_string()),
                    needs_recompute: ActiveValue::Set(false),
                    ..Default::default()
                }
                .update(&self.database)
                .await;
                if let Err(err) = cleared {
                    tracing::warn!(
                        "profitability of lot {lot_id} is fresh but the stale flag stayed set: {err}"
                    );
                }
                ProfitabilityRefresh::Fresh(profitability)
            }
            Err(err) => {
                tracing::warn!("profitability of lot {lot_id} is stale: {err}");
                ProfitabilityRefresh::Stale {
                    reason: err.to_string(),
                }
            }
        }
    }
}

async fn persist_planned(
    db_tx: &DatabaseTransaction,
    planned: &[PlannedEntry],
    tolerance_cents: i64,
) -> ResultEngine<Vec<Uuid>> {
    let mut entry_ids = Vec::with_capacity(planned.len());
    for item in planned {
        allocations::check_conservation(
            &item.entry,
            std::slice::from_ref(&item.allocation),
            tolerance_cents,
        )?;
        ledger::ActiveModel::from(&item.entry).insert(db_tx).await?;
        allocations::ActiveModel::from(&item.allocation)
            .insert(db_tx)
            .await?;
        entry_ids.push(item.entry.id);
    }
    Ok(entry_ids)
}

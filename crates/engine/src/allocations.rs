//! Allocation of ledger entries to cost-bearing entities.
//!
//! An [`Allocation`] ties one ledger entry to one entity (a lot) with an
//! amount and a percentage in basis points. For every entry the allocated
//! amounts must add up to the entry amount; [`check_conservation`] enforces
//! it before anything is written.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, LedgerEntry, MoneyCents, ResultEngine};

/// Basis points for a full (100%) allocation.
pub const FULL_BP: i64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Lot,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lot => "LOT",
        }
    }
}

impl TryFrom<&str> for EntityType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "LOT" => Ok(Self::Lot),
            other => Err(EngineError::InvalidValue(format!(
                "invalid entity type: {other}"
            ))),
        }
    }
}

/// A cost-bearing entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityRef {
    pub fn lot(lot_id: impl Into<String>) -> Self {
        Self {
            entity_type: EntityType::Lot,
            entity_id: lot_id.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: Uuid,
    pub ledger_entry_id: Uuid,
    pub entity: EntityRef,
    pub allocated_amount: MoneyCents,
    pub percentage_bp: i64,
    pub created_at: DateTime<Utc>,
}

impl Allocation {
    /// Percentage as a float, e.g. `33.34`.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage_bp as f64 / 100.0
    }
}

/// The whole entry goes to one entity.
pub fn single(entry: &LedgerEntry, entity: EntityRef) -> Allocation {
    Allocation {
        id: Uuid::new_v4(),
        ledger_entry_id: entry.id,
        entity,
        allocated_amount: entry.amount,
        percentage_bp: FULL_BP,
        created_at: entry.created_at,
    }
}

/// Splits `total` in `parts` shares that add up to exactly `total`.
///
/// The remainder is handed out one unit at a time to the first shares, so no
/// two shares differ by more than one unit.
pub fn split_evenly(total: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let base = total.div_euclid(n);
    let remainder = total.rem_euclid(n) as usize;
    (0..parts)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// One allocation per entity, splitting amount and percentage evenly.
pub fn split_across(
    entry: &LedgerEntry,
    entities: &[EntityRef],
    created_at: DateTime<Utc>,
) -> Vec<Allocation> {
    let amounts = split_evenly(entry.amount.cents(), entities.len());
    let percentages = split_evenly(FULL_BP, entities.len());
    entities
        .iter()
        .zip(amounts)
        .zip(percentages)
        .map(|((entity, amount), bp)| Allocation {
            id: Uuid::new_v4(),
            ledger_entry_id: entry.id,
            entity: entity.clone(),
            allocated_amount: MoneyCents::new(amount),
            percentage_bp: bp,
            created_at,
        })
        .collect()
}

/// Fails unless the allocations of `entry` add up to its amount within
/// `tolerance_cents` per row.
pub fn check_conservation(
    entry: &LedgerEntry,
    allocations: &[Allocation],
    tolerance_cents: i64,
) -> ResultEngine<()> {
    if allocations.is_empty() {
        return Err(EngineError::AllocationMismatch(format!(
            "entry {} has no allocations",
            entry.id
        )));
    }
    if let Some(foreign) = allocations.iter().find(|a| a.ledger_entry_id != entry.id) {
        return Err(EngineError::AllocationMismatch(format!(
            "allocation {} belongs to entry {}, not {}",
            foreign.id, foreign.ledger_entry_id, entry.id
        )));
    }
    let allocated: MoneyCents = allocations.iter().map(|a| a.allocated_amount).sum();
    let allowed = tolerance_cents.saturating_mul(allocations.len() as i64);
    let drift = (allocated - entry.amount).abs();
    if drift.cents() > allowed {
        return Err(EngineError::AllocationMismatch(format!(
            "entry {} allocates {allocated} of {}",
            entry.id, entry.amount
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub ledger_entry_id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub allocated_amount_minor: i64,
    pub percentage_bp: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ledger::Entity",
        from = "Column::LedgerEntryId",
        to = "super::ledger::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    LedgerEntry,
}

impl Related<super::ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Allocation> for ActiveModel {
    fn from(value: &Allocation) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            ledger_entry_id: ActiveValue::Set(value.ledger_entry_id.to_string()),
            entity_type: ActiveValue::Set(value.entity.entity_type.as_str().to_string()),
            entity_id: ActiveValue::Set(value.entity.entity_id.clone()),
            allocated_amount_minor: ActiveValue::Set(value.allocated_amount.cents()),
            percentage_bp: ActiveValue::Set(value.percentage_bp),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Allocation {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: crate::util::parse_uuid(&model.id, "allocation")?,
            ledger_entry_id: crate::util::parse_uuid(&model.ledger_entry_id, "ledger entry")?,
            entity: EntityRef {
                entity_type: EntityType::try_from(model.entity_type.as_str())?,
                entity_id: model.entity_id,
            },
            allocated_amount: MoneyCents::new(model.allocated_amount_minor),
            percentage_bp: model.percentage_bp,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{Actor, AllocationMethod, ExpenseCategory, LedgerCategory};

    fn shared_expense(cents: i64) -> LedgerEntry {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        LedgerEntry::new(
            LedgerCategory::Expense(ExpenseCategory::Labor),
            "Farm payroll",
            MoneyCents::new(cents),
            at,
            at,
            AllocationMethod::Global,
            Actor::System,
            at,
        )
        .unwrap()
    }

    fn lots(n: usize) -> Vec<EntityRef> {
        (0..n).map(|i| EntityRef::lot(format!("lot-{i}"))).collect()
    }

    #[test]
    fn split_evenly_hands_out_the_remainder() {
        assert_eq!(split_evenly(900_000, 3), vec![300_000, 300_000, 300_000]);
        assert_eq!(split_evenly(100, 3), vec![34, 33, 33]);
        assert_eq!(split_evenly(2, 4), vec![1, 1, 0, 0]);
        assert!(split_evenly(100, 0).is_empty());
    }

    #[test]
    fn split_across_conserves_amount_and_percentage() {
        let entry = shared_expense(1_000_001);
        let allocations = split_across(&entry, &lots(7), entry.created_at);

        assert_eq!(allocations.len(), 7);
        let total: MoneyCents = allocations.iter().map(|a| a.allocated_amount).sum();
        assert_eq!(total, entry.amount);
        assert_eq!(allocations.iter().map(|a| a.percentage_bp).sum::<i64>(), FULL_BP);
        check_conservation(&entry, &allocations, 0).unwrap();
    }

    #[test]
    fn single_allocation_takes_everything() {
        let entry = shared_expense(12_345);
        let allocation = single(&entry, EntityRef::lot("lot-1"));
        assert_eq!(allocation.allocated_amount, entry.amount);
        assert_eq!(allocation.percentage(), 100.0);
    }

    #[test]
    fn conservation_rejects_drift_beyond_tolerance() {
        let entry = shared_expense(10_000);
        let mut allocations = split_across(&entry, &lots(2), entry.created_at);
        allocations[0].allocated_amount += MoneyCents::new(2);

        assert!(check_conservation(&entry, &allocations, 1).is_ok());
        let err = check_conservation(&entry, &allocations, 0).unwrap_err();
        assert!(matches!(err, EngineError::AllocationMismatch(_)));
        assert!(check_conservation(&entry, &[], 1).is_err());
    }
}

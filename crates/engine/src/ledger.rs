//! Ledger entries.
//!
//! A [`LedgerEntry`] is an expense or a revenue. Entries created by the
//! converters carry a [`SourceRef`] pointing back at the business event; the
//! `(source_type, source_id, role)` triple is unique in the store, so each
//! event produces each kind of money movement at most once.
//!
//! Entries are never mutated by the engine after creation. The `settled`
//! flag belongs to the payment workflows.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Actor, EngineError, LedgerCategory, MoneyCents, ResultEngine, SourceType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMethod {
    PerLot,
    PerAnimal,
    /// Shared cost, split over active lots by rateio.
    Global,
}

impl AllocationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerLot => "per_lot",
            Self::PerAnimal => "per_animal",
            Self::Global => "global",
        }
    }
}

impl TryFrom<&str> for AllocationMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "per_lot" => Ok(Self::PerLot),
            "per_animal" => Ok(Self::PerAnimal),
            "global" => Ok(Self::Global),
            other => Err(EngineError::InvalidValue(format!(
                "invalid allocation method: {other}"
            ))),
        }
    }
}

/// What a converter-created entry stands for within its source event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    Purchase,
    Transport,
    Commission,
    Sale,
    Intervention,
}

impl EntryRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Transport => "transport",
            Self::Commission => "commission",
            Self::Sale => "sale",
            Self::Intervention => "intervention",
        }
    }
}

impl TryFrom<&str> for EntryRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "purchase" => Ok(Self::Purchase),
            "transport" => Ok(Self::Transport),
            "commission" => Ok(Self::Commission),
            "sale" => Ok(Self::Sale),
            "intervention" => Ok(Self::Intervention),
            other => Err(EngineError::InvalidValue(format!(
                "invalid entry role: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_type: SourceType,
    pub source_id: String,
    pub role: EntryRole,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub category: LedgerCategory,
    pub description: String,
    pub amount: MoneyCents,
    pub due_date: DateTime<Utc>,
    pub competence_date: DateTime<Utc>,
    /// Paid (expense) or received (revenue).
    pub settled: bool,
    pub allocation_method: AllocationMethod,
    pub source: Option<SourceRef>,
    pub lot_id: Option<String>,
    pub cost_center_id: Option<Uuid>,
    pub counterparty_id: Option<String>,
    pub payer_account_id: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        category: LedgerCategory,
        description: impl Into<String>,
        amount: MoneyCents,
        due_date: DateTime<Utc>,
        competence_date: DateTime<Utc>,
        allocation_method: AllocationMethod,
        created_by: Actor,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount < MoneyCents::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "ledger amount must be >= 0, got {amount}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            category,
            description: description.into(),
            amount,
            due_date,
            competence_date,
            settled: false,
            allocation_method,
            source: None,
            lot_id: None,
            cost_center_id: None,
            counterparty_id: None,
            payer_account_id: None,
            invoice_number: None,
            notes: None,
            created_by,
            created_at,
        })
    }

    #[must_use]
    pub fn is_expense(&self) -> bool {
        self.category.is_expense()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub category: String,
    pub description: String,
    pub amount_minor: i64,
    pub due_date: DateTimeUtc,
    pub competence_date: DateTimeUtc,
    pub settled: bool,
    pub allocation_method: String,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub source_role: Option<String>,
    pub lot_id: Option<String>,
    pub cost_center_id: Option<String>,
    pub counterparty_id: Option<String>,
    pub payer_account_id: Option<String>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::allocations::Entity")]
    Allocations,
}

impl Related<super::allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        let (source_type, source_id, source_role) = match &entry.source {
            Some(source) => (
                Some(source.source_type.as_str().to_string()),
                Some(source.source_id.clone()),
                Some(source.role.as_str().to_string()),
            ),
            None => (None, None, None),
        };
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            kind: ActiveValue::Set(entry.category.kind_str().to_string()),
            category: ActiveValue::Set(entry.category.category_str().to_string()),
            description: ActiveValue::Set(entry.description.clone()),
            amount_minor: ActiveValue::Set(entry.amount.cents()),
            due_date: ActiveValue::Set(entry.due_date),
            competence_date: ActiveValue::Set(entry.competence_date),
            settled: ActiveValue::Set(entry.settled),
            allocation_method: ActiveValue::Set(entry.allocation_method.as_str().to_string()),
            source_type: ActiveValue::Set(source_type),
            source_id: ActiveValue::Set(source_id),
            source_role: ActiveValue::Set(source_role),
            lot_id: ActiveValue::Set(entry.lot_id.clone()),
            cost_center_id: ActiveValue::Set(entry.cost_center_id.map(|id| id.to_string())),
            counterparty_id: ActiveValue::Set(entry.counterparty_id.clone()),
            payer_account_id: ActiveValue::Set(entry.payer_account_id.clone()),
            invoice_number: ActiveValue::Set(entry.invoice_number.clone()),
            notes: ActiveValue::Set(entry.notes.clone()),
            created_by: ActiveValue::Set(entry.created_by.as_stored()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let source = match (model.source_type, model.source_id, model.source_role) {
            (Some(source_type), Some(source_id), Some(role)) => Some(SourceRef {
                source_type: SourceType::try_from(source_type.as_str())?,
                source_id,
                role: EntryRole::try_from(role.as_str())?,
            }),
            (None, None, None) => None,
            _ => {
                return Err(EngineError::InvalidValue(format!(
                    "ledger entry {} has an incomplete source link",
                    model.id
                )));
            }
        };
        let cost_center_id = model
            .cost_center_id
            .as_deref()
            .map(|id| crate::util::parse_uuid(id, "cost center"))
            .transpose()?;
        Ok(Self {
            id: crate::util::parse_uuid(&model.id, "ledger entry")?,
            category: LedgerCategory::parse(&model.kind, &model.category)?,
            description: model.description,
            amount: MoneyCents::new(model.amount_minor),
            due_date: model.due_date,
            competence_date: model.competence_date,
            settled: model.settled,
            allocation_method: AllocationMethod::try_from(model.allocation_method.as_str())?,
            source,
            lot_id: model.lot_id,
            cost_center_id,
            counterparty_id: model.counterparty_id,
            payer_account_id: model.payer_account_id,
            invoice_number: model.invoice_number,
            notes: model.notes,
            created_by: Actor::from_stored(&model.created_by),
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::ExpenseCategory;

    #[test]
    fn new_accepts_zero_but_rejects_negative_amounts() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let zero = LedgerEntry::new(
            LedgerCategory::Revenue(crate::RevenueCategory::CattleSale),
            "Cattle sale - Lot L1",
            MoneyCents::ZERO,
            at,
            at,
            AllocationMethod::PerLot,
            Actor::System,
            at,
        )
        .unwrap();
        assert!(zero.amount.is_zero());

        let err = LedgerEntry::new(
            LedgerCategory::Expense(ExpenseCategory::Labor),
            "payroll",
            MoneyCents::new(-1),
            at,
            at,
            AllocationMethod::Global,
            Actor::System,
            at,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }

    #[test]
    fn model_round_trip_keeps_source_link() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut entry = LedgerEntry::new(
            LedgerCategory::Expense(ExpenseCategory::Transport),
            "Freight - Lot L1",
            MoneyCents::from_units(5_000),
            at,
            at,
            AllocationMethod::PerLot,
            Actor::System,
            at,
        )
        .unwrap();
        entry.source = Some(SourceRef {
            source_type: SourceType::Purchase,
            source_id: "p-1".to_string(),
            role: EntryRole::Transport,
        });
        entry.lot_id = Some("lot-1".to_string());

        let active = ActiveModel::from(&entry);
        let model = Model {
            id: entry.id.to_string(),
            kind: "expense".to_string(),
            category: "transport".to_string(),
            description: entry.description.clone(),
            amount_minor: 500_000,
            due_date: at,
            competence_date: at,
            settled: false,
            allocation_method: "per_lot".to_string(),
            source_type: Some("PURCHASE".to_string()),
            source_id: Some("p-1".to_string()),
            source_role: Some("transport".to_string()),
            lot_id: Some("lot-1".to_string()),
            cost_center_id: None,
            counterparty_id: None,
            payer_account_id: None,
            invoice_number: None,
            notes: None,
            created_by: "system".to_string(),
            created_at: at,
        };
        assert_eq!(active.source_role, ActiveValue::Set(Some("transport".to_string())));
        assert_eq!(LedgerEntry::try_from(model).unwrap(), entry);
    }
}

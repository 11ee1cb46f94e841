//! Integration records, the idempotency ledger.
//!
//! One row per `(source_type, source_id)`, guarded by a unique index. The
//! status moves along a small state machine:
//!
//! ```text
//! (absent) ──claim──▶ PENDING ──ok──▶ PROCESSED
//!                        ▲   └─fail─▶ ERROR
//!                        └───retry──────┘
//! ```
//!
//! `PROCESSED` is terminal. Only the coordinator writes these rows.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Actor, EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Purchase,
    Sale,
    Intervention,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "PURCHASE",
            Self::Sale => "SALE",
            Self::Intervention => "INTERVENTION",
        }
    }
}

impl TryFrom<&str> for SourceType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PURCHASE" => Ok(Self::Purchase),
            "SALE" => Ok(Self::Sale),
            "INTERVENTION" => Ok(Self::Intervention),
            other => Err(EngineError::InvalidValue(format!(
                "invalid source type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationStatus {
    Pending,
    Processed,
    Error,
}

impl IntegrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processed => "PROCESSED",
            Self::Error => "ERROR",
        }
    }

    /// `true` when a new conversion attempt may start from this state.
    #[must_use]
    pub fn can_retry(self) -> bool {
        !matches!(self, Self::Processed)
    }
}

impl TryFrom<&str> for IntegrationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, EngineError> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "PROCESSED" => Ok(Self::Processed),
            "ERROR" => Ok(Self::Error),
            other => Err(EngineError::InvalidValue(format!(
                "invalid integration status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRecord {
    pub source_type: SourceType,
    pub source_id: String,
    pub status: IntegrationStatus,
    pub entry_ids: Vec<Uuid>,
    pub lot_id: Option<String>,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    /// Set while the lot's profitability has not caught up with the entries.
    pub needs_recompute: bool,
    pub created_by: Actor,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "integration_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub source_type: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub source_id: String,
    pub status: String,
    /// JSON array of ledger entry ids.
    pub entry_ids: String,
    pub lot_id: Option<String>,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTimeUtc>,
    pub needs_recompute: bool,
    pub created_by: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn encode_entry_ids(ids: &[Uuid]) -> ResultEngine<String> {
    let raw: Vec<String> = ids.iter().map(Uuid::to_string).collect();
    serde_json::to_string(&raw)
        .map_err(|err| EngineError::InvalidValue(format!("cannot encode entry ids: {err}")))
}

fn decode_entry_ids(raw: &str) -> ResultEngine<Vec<Uuid>> {
    let ids: Vec<String> = serde_json::from_str(raw)
        .map_err(|err| EngineError::InvalidValue(format!("invalid entry ids: {err}")))?;
    ids.iter()
        .map(|id| crate::util::parse_uuid(id, "ledger entry"))
        .collect()
}

impl TryFrom<Model> for IntegrationRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            source_type: SourceType::try_from(model.source_type.as_str())?,
            status: IntegrationStatus::try_from(model.status.as_str())?,
            entry_ids: decode_entry_ids(&model.entry_ids)?,
            source_id: model.source_id,
            lot_id: model.lot_id,
            attempts: model.attempts,
            error_message: model.error_message,
            processed_at: model.processed_at,
            needs_recompute: model.needs_recompute,
            created_by: Actor::from_stored(&model.created_by),
            updated_at: model.updated_at,
        })
    }
}

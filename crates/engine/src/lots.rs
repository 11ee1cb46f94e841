//! Lots, the primary cost-bearing entity.
//!
//! Lots are owned by the herd workflows; the engine only reads them.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Negotiating,
    InTransit,
    Received,
    Quarantine,
    Confined,
    ReadyForSale,
    Sold,
    Cancelled,
}

impl LotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Negotiating => "negotiating",
            Self::InTransit => "in_transit",
            Self::Received => "received",
            Self::Quarantine => "quarantine",
            Self::Confined => "confined",
            Self::ReadyForSale => "ready_for_sale",
            Self::Sold => "sold",
            Self::Cancelled => "cancelled",
        }
    }

    /// `true` once the lot no longer accrues operating days.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Sold | Self::Cancelled)
    }
}

impl TryFrom<&str> for LotStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "negotiating" => Ok(Self::Negotiating),
            "in_transit" => Ok(Self::InTransit),
            "received" => Ok(Self::Received),
            "quarantine" => Ok(Self::Quarantine),
            "confined" => Ok(Self::Confined),
            "ready_for_sale" => Ok(Self::ReadyForSale),
            "sold" => Ok(Self::Sold),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidValue(format!(
                "invalid lot status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: String,
    pub code: String,
    pub status: LotStatus,
    pub initial_quantity: i64,
    pub current_quantity: Option<i64>,
    pub purchase_weight_kg: f64,
    pub current_weight_kg: Option<f64>,
    pub purchase_date: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Lot {
    /// Current head count, falling back to the purchased one.
    #[must_use]
    pub fn animal_count(&self) -> i64 {
        self.current_quantity
            .filter(|q| *q > 0)
            .unwrap_or(self.initial_quantity)
    }

    /// Weight used for per-arroba metrics: current if known, else at purchase.
    #[must_use]
    pub fn reference_weight_kg(&self) -> f64 {
        self.current_weight_kg
            .filter(|w| *w > 0.0)
            .unwrap_or(self.purchase_weight_kg)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "lots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub status: String,
    pub initial_quantity: i64,
    pub current_quantity: Option<i64>,
    pub purchase_weight_kg: f64,
    pub current_weight_kg: Option<f64>,
    pub purchase_date: DateTimeUtc,
    pub closed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Lot {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            status: LotStatus::try_from(model.status.as_str())?,
            id: model.id,
            code: model.code,
            initial_quantity: model.initial_quantity,
            current_quantity: model.current_quantity,
            purchase_weight_kg: model.purchase_weight_kg,
            current_weight_kg: model.current_weight_kg,
            purchase_date: model.purchase_date,
            closed_at: model.closed_at,
        })
    }
}

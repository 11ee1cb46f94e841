//! Veterinary interventions recorded against a lot (read-only).

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub id: String,
    pub lot_id: String,
    /// Free text as typed by the operator, e.g. `VACCINATION`.
    pub intervention_type: String,
    pub total_cost: MoneyCents,
    pub intervention_date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "interventions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub lot_id: String,
    pub intervention_type: String,
    pub total_cost_minor: i64,
    pub intervention_date: DateTimeUtc,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Intervention {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            lot_id: model.lot_id,
            intervention_type: model.intervention_type,
            total_cost: MoneyCents::new(model.total_cost_minor),
            intervention_date: model.intervention_date,
            notes: model.notes,
        }
    }
}

//! Cost centers, one per lot, keyed by a code derived from the lot code.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Actor, EngineError, ResultEngine};

const LOT_PREFIX: &str = "CC_LOT_";

/// `CC_LOT_<lotCode>`; blank lot codes are rejected.
pub fn lot_cost_center_code(lot_code: &str) -> ResultEngine<String> {
    let trimmed = lot_code.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidSource(
            "lot code must not be empty".to_string(),
        ));
    }
    Ok(format!("{LOT_PREFIX}{trimmed}"))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenter {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
}

impl CostCenter {
    pub fn for_lot(lot_code: &str, created_by: Actor, created_at: DateTime<Utc>) -> ResultEngine<Self> {
        let code = lot_cost_center_code(lot_code)?;
        let lot_code = lot_code.trim();
        Ok(Self {
            id: Uuid::new_v4(),
            code,
            name: format!("Lot {lot_code}"),
            description: Some(format!("Cost center of lot {lot_code}")),
            created_by,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cost_centers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CostCenter> for ActiveModel {
    fn from(value: &CostCenter) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            code: ActiveValue::Set(value.code.clone()),
            name: ActiveValue::Set(value.name.clone()),
            description: ActiveValue::Set(value.description.clone()),
            created_by: ActiveValue::Set(value.created_by.as_stored()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for CostCenter {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: crate::util::parse_uuid(&model.id, "cost center")?,
            code: model.code,
            name: model.name,
            description: model.description,
            created_by: Actor::from_stored(&model.created_by),
            created_at: model.created_at,
        })
    }
}

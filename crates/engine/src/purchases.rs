//! Cattle purchases as recorded by the purchasing workflow (read-only).

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub lot_id: String,
    pub lot_code: String,
    pub vendor_id: String,
    pub broker_id: Option<String>,
    pub carrier_id: Option<String>,
    pub payer_account_id: Option<String>,
    pub purchase_weight_kg: f64,
    pub price_per_arroba: MoneyCents,
    pub commission_percentage: Option<f64>,
    pub transport_value: Option<MoneyCents>,
    pub initial_quantity: i64,
    pub purchase_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub lot_id: String,
    pub lot_code: String,
    pub vendor_id: String,
    pub broker_id: Option<String>,
    pub carrier_id: Option<String>,
    pub payer_account_id: Option<String>,
    pub purchase_weight_kg: f64,
    pub price_per_arroba_minor: i64,
    pub commission_percentage: Option<f64>,
    pub transport_value_minor: Option<i64>,
    pub initial_quantity: i64,
    pub purchase_date: DateTimeUtc,
    pub payment_date: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Purchase {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        if !model.purchase_weight_kg.is_finite() || model.purchase_weight_kg < 0.0 {
            return Err(EngineError::InvalidSource(format!(
                "purchase {} has invalid weight",
                model.id
            )));
        }
        Ok(Self {
            id: model.id,
            lot_id: model.lot_id,
            lot_code: model.lot_code,
            vendor_id: model.vendor_id,
            broker_id: model.broker_id,
            carrier_id: model.carrier_id,
            payer_account_id: model.payer_account_id,
            purchase_weight_kg: model.purchase_weight_kg,
            price_per_arroba: MoneyCents::new(model.price_per_arroba_minor),
            commission_percentage: model.commission_percentage,
            transport_value: model.transport_value_minor.map(MoneyCents::new),
            initial_quantity: model.initial_quantity,
            purchase_date: model.purchase_date,
            payment_date: model.payment_date,
        })
    }
}

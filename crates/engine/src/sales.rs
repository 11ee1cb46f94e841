//! Sale records as written by the sales pipeline (read-only).

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    /// Lot of the originating purchase.
    pub lot_id: String,
    pub buyer_id: Option<String>,
    pub slaughter_weight_kg: Option<f64>,
    pub price_per_arroba: Option<MoneyCents>,
    pub invoice_number: Option<String>,
    pub sale_number: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub expected_date: Option<DateTime<Utc>>,
    pub slaughter_date: Option<DateTime<Utc>>,
    pub shipment_date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub lot_id: String,
    pub buyer_id: Option<String>,
    pub slaughter_weight_kg: Option<f64>,
    pub price_per_arroba_minor: Option<i64>,
    pub invoice_number: Option<String>,
    pub sale_number: Option<String>,
    pub payment_date: Option<DateTimeUtc>,
    pub expected_date: Option<DateTimeUtc>,
    pub slaughter_date: Option<DateTimeUtc>,
    pub shipment_date: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Sale {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            lot_id: model.lot_id,
            buyer_id: model.buyer_id,
            slaughter_weight_kg: model.slaughter_weight_kg,
            price_per_arroba: model.price_per_arroba_minor.map(MoneyCents::new),
            invoice_number: model.invoice_number,
            sale_number: model.sale_number,
            payment_date: model.payment_date,
            expected_date: model.expected_date,
            slaughter_date: model.slaughter_date,
            shipment_date: model.shipment_date,
        }
    }
}

use sea_orm::{ConnectionTrait, prelude::*};

use crate::{
    EngineError, Intervention, Lot, Purchase, ResultEngine, Sale, interventions, lots, purchases,
    sales,
};

pub(super) async fn require_purchase<C: ConnectionTrait>(
    conn: &C,
    purchase_id: &str,
) -> ResultEngine<Purchase> {
    let model = purchases::Entity::find_by_id(purchase_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("purchase {purchase_id}")))?;
    Purchase::try_from(model)
}

pub(super) async fn require_sale<C: ConnectionTrait>(conn: &C, sale_id: &str) -> ResultEngine<Sale> {
    let model = sales::Entity::find_by_id(sale_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("sale {sale_id}")))?;
    Ok(Sale::from(model))
}

pub(super) async fn require_intervention<C: ConnectionTrait>(
    conn: &C,
    intervention_id: &str,
) -> ResultEngine<Intervention> {
    let model = interventions::Entity::find_by_id(intervention_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("intervention {intervention_id}")))?;
    Ok(Intervention::from(model))
}

pub(super) async fn require_lot<C: ConnectionTrait>(conn: &C, lot_id: &str) -> ResultEngine<Lot> {
    let model = lots::Entity::find_by_id(lot_id.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("lot {lot_id}")))?;
    Lot::try_from(model)
}

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, prelude::*, sea_query::OnConflict};

use crate::{Actor, CostCenter, EngineError, ResultEngine, cost_centers, lot_cost_center_code};

use super::Engine;

async fn find_by_code<C: ConnectionTrait>(conn: &C, code: &str) -> ResultEngine<Option<CostCenter>> {
    cost_centers::Entity::find()
        .filter(cost_centers::Column::Code.eq(code.to_string()))
        .one(conn)
        .await?
        .map(CostCenter::try_from)
        .transpose()
}

/// Idempotent upsert of the lot's cost center on `conn`.
///
/// A concurrent insert of the same code is not an error: the row that won is
/// read back and returned.
pub(super) async fn ensure_lot_cost_center_in<C: ConnectionTrait>(
    conn: &C,
    lot_code: &str,
    actor: &Actor,
    now: DateTime<Utc>,
) -> ResultEngine<CostCenter> {
    let code = lot_cost_center_code(lot_code)?;
    if let Some(existing) = find_by_code(conn, &code).await? {
        return Ok(existing);
    }

    let center = CostCenter::for_lot(lot_code, actor.clone(), now)?;
    let inserted = cost_centers::Entity::insert(cost_centers::ActiveModel::from(&center))
        .on_conflict(
            OnConflict::column(cost_centers::Column::Code)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    if inserted == 0 {
        tracing::debug!("cost center {code} inserted concurrently, reading it back");
    } else {
        tracing::debug!("cost center {code} created");
    }

    find_by_code(conn, &code)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound(format!("cost center {code}")))
}

/// Cost center of the lot, looked up without creating it. Blank codes have none.
pub(super) async fn lot_cost_center_in<C: ConnectionTrait>(
    conn: &C,
    lot_code: &str,
) -> ResultEngine<Option<CostCenter>> {
    let Ok(code) = lot_cost_center_code(lot_code) else {
        return Ok(None);
    };
    find_by_code(conn, &code).await
}

impl Engine {
    /// Returns the cost center `CC_LOT_<lot_code>`, creating it when missing.
    pub async fn ensure_lot_cost_center(
        &self,
        lot_code: &str,
        actor: &Actor,
    ) -> ResultEngine<CostCenter> {
        ensure_lot_cost_center_in(&self.database, lot_code, actor, Utc::now()).await
    }

    pub async fn cost_center(&self, code: &str) -> ResultEngine<Option<CostCenter>> {
        find_by_code(&self.database, code.trim()).await
    }
}

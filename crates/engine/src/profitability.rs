//! Lot profitability, a cache derived from ledger entries and allocations.
//!
//! [`compute`] is pure: give it the lot and the money lines that reach it and
//! it returns the full aggregate. The engine stores the result keyed by lot
//! id and overwrites it on every recompute, so the table can be dropped and
//! rebuilt at any time.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    CostBucket, EngineError, LedgerCategory, Lot, LotStatus, MoneyCents, ResultEngine,
    RevenueBucket, cost_bucket, revenue_bucket,
};

/// Money reaching a lot, either through an allocation or a direct link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LotLine {
    pub category: LedgerCategory,
    pub amount: MoneyCents,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub purchase: MoneyCents,
    pub transport: MoneyCents,
    pub feed: MoneyCents,
    pub veterinary: MoneyCents,
    pub labor: MoneyCents,
    pub overhead: MoneyCents,
}

impl CostBreakdown {
    fn add(&mut self, bucket: CostBucket, amount: MoneyCents) {
        let slot = match bucket {
            CostBucket::Purchase => &mut self.purchase,
            CostBucket::Transport => &mut self.transport,
            CostBucket::Feed => &mut self.feed,
            CostBucket::Veterinary => &mut self.veterinary,
            CostBucket::Labor => &mut self.labor,
            CostBucket::Overhead => &mut self.overhead,
        };
        *slot += amount;
    }

    #[must_use]
    pub fn total(&self) -> MoneyCents {
        self.purchase + self.transport + self.feed + self.veterinary + self.labor + self.overhead
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerUnit {
    pub cost: MoneyCents,
    pub revenue: MoneyCents,
    pub profit: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LotProfitability {
    pub lot_id: String,
    pub costs: CostBreakdown,
    pub total_cost: MoneyCents,
    pub sale_revenue: MoneyCents,
    pub other_revenue: MoneyCents,
    pub total_revenue: MoneyCents,
    pub gross_profit: MoneyCents,
    pub net_profit: MoneyCents,
    /// Percent of revenue.
    pub profit_margin: f64,
    /// Percent of cost.
    pub roi: f64,
    pub per_animal: PerUnit,
    pub per_arroba: PerUnit,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub days_in_operation: i64,
    pub lot_status: LotStatus,
    pub last_calculated_at: DateTime<Utc>,
}

impl LotProfitability {
    /// Equality of every derived figure, ignoring `last_calculated_at` and the
    /// day count (both depend on when the computation ran).
    #[must_use]
    pub fn same_figures(&self, other: &Self) -> bool {
        self.lot_id == other.lot_id
            && self.costs == other.costs
            && self.total_cost == other.total_cost
            && self.sale_revenue == other.sale_revenue
            && self.other_revenue == other.other_revenue
            && self.total_revenue == other.total_revenue
            && self.gross_profit == other.gross_profit
            && self.net_profit == other.net_profit
            && self.profit_margin == other.profit_margin
            && self.roi == other.roi
            && self.per_animal == other.per_animal
            && self.per_arroba == other.per_arroba
            && self.lot_status == other.lot_status
    }
}

fn per_unit(cost: MoneyCents, revenue: MoneyCents, profit: MoneyCents, units: f64) -> PerUnit {
    PerUnit {
        cost: cost.per(units),
        revenue: revenue.per(units),
        profit: profit.per(units),
    }
}

/// Full profitability of `lot` from the lines that reach it.
pub fn compute(
    lot: &Lot,
    lines: &[LotLine],
    arroba_divisor: f64,
    now: DateTime<Utc>,
) -> LotProfitability {
    let mut costs = CostBreakdown::default();
    let mut sale_revenue = MoneyCents::ZERO;
    let mut other_revenue = MoneyCents::ZERO;

    for line in lines {
        match line.category {
            LedgerCategory::Expense(category) => costs.add(cost_bucket(category), line.amount),
            LedgerCategory::Revenue(category) => match revenue_bucket(category) {
                RevenueBucket::Sale => sale_revenue += line.amount,
                RevenueBucket::Other => other_revenue += line.amount,
            },
        }
    }

    let total_cost = costs.total();
    let total_revenue = sale_revenue + other_revenue;
    let gross_profit = total_revenue - costs.purchase;
    let net_profit = total_revenue - total_cost;

    let animals = lot.animal_count().max(0) as f64;
    let arrobas = if arroba_divisor > 0.0 {
        lot.reference_weight_kg() / arroba_divisor
    } else {
        0.0
    };

    let end_date = lot
        .status
        .is_closed()
        .then(|| lot.closed_at.unwrap_or(now));
    let days_in_operation = (end_date.unwrap_or(now) - lot.purchase_date).num_days().max(0);

    LotProfitability {
        lot_id: lot.id.clone(),
        costs,
        total_cost,
        sale_revenue,
        other_revenue,
        total_revenue,
        gross_profit,
        net_profit,
        profit_margin: net_profit.ratio_percent(total_revenue),
        roi: net_profit.ratio_percent(total_cost),
        per_animal: per_unit(total_cost, total_revenue, net_profit, animals),
        per_arroba: per_unit(total_cost, total_revenue, net_profit, arrobas),
        start_date: lot.purchase_date,
        end_date,
        days_in_operation,
        lot_status: lot.status,
        last_calculated_at: now,
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "lot_profitability")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub lot_id: String,
    pub purchase_cost_minor: i64,
    pub transport_cost_minor: i64,
    pub feed_cost_minor: i64,
    pub veterinary_cost_minor: i64,
    pub labor_cost_minor: i64,
    pub overhead_cost_minor: i64,
    pub total_cost_minor: i64,
    pub sale_revenue_minor: i64,
    pub other_revenue_minor: i64,
    pub total_revenue_minor: i64,
    pub gross_profit_minor: i64,
    pub net_profit_minor: i64,
    pub profit_margin: f64,
    pub roi: f64,
    pub cost_per_animal_minor: i64,
    pub revenue_per_animal_minor: i64,
    pub profit_per_animal_minor: i64,
    pub cost_per_arroba_minor: i64,
    pub revenue_per_arroba_minor: i64,
    pub profit_per_arroba_minor: i64,
    pub start_date: DateTimeUtc,
    pub end_date: Option<DateTimeUtc>,
    pub days_in_operation: i64,
    pub lot_status: String,
    pub last_calculated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&LotProfitability> for ActiveModel {
    fn from(value: &LotProfitability) -> Self {
        Self {
            lot_id: ActiveValue::Set(value.lot_id.clone()),
            purchase_cost_minor: ActiveValue::Set(value.costs.purchase.cents()),
            transport_cost_minor: ActiveValue::Set(value.costs.transport.cents()),
            feed_cost_minor: ActiveValue::Set(value.costs.feed.cents()),
            veterinary_cost_minor: ActiveValue::Set(value.costs.veterinary.cents()),
            labor_cost_minor: ActiveValue::Set(value.costs.labor.cents()),
            overhead_cost_minor: ActiveValue::Set(value.costs.overhead.cents()),
            total_cost_minor: ActiveValue::Set(value.total_cost.cents()),
            sale_revenue_minor: ActiveValue::Set(value.sale_revenue.cents()),
            other_revenue_minor: ActiveValue::Set(value.other_revenue.cents()),
            total_revenue_minor: ActiveValue::Set(value.total_revenue.cents()),
            gross_profit_minor: ActiveValue::Set(value.gross_profit.cents()),
            net_profit_minor: ActiveValue::Set(value.net_profit.cents()),
            profit_margin: ActiveValue::Set(value.profit_margin),
            roi: ActiveValue::Set(value.roi),
            cost_per_animal_minor: ActiveValue::Set(value.per_animal.cost.cents()),
            revenue_per_animal_minor: ActiveValue::Set(value.per_animal.revenue.cents()),
            profit_per_animal_minor: ActiveValue::Set(value.per_animal.profit.cents()),
            cost_per_arroba_minor: ActiveValue::Set(value.per_arroba.cost.cents()),
            revenue_per_arroba_minor: ActiveValue::Set(value.per_arroba.revenue.cents()),
            profit_per_arroba_minor: ActiveValue::Set(value.per_arroba.profit.cents()),
            start_date: ActiveValue::Set(value.start_date),
            end_date: ActiveValue::Set(value.end_date),
            days_in_operation: ActiveValue::Set(value.days_in_operation),
            lot_status: ActiveValue::Set(value.lot_status.as_str().to_string()),
            last_calculated_at: ActiveValue::Set(value.last_calculated_at),
        }
    }
}

impl TryFrom<Model> for LotProfitability {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            costs: CostBreakdown {
                purchase: MoneyCents::new(model.purchase_cost_minor),
                transport: MoneyCents::new(model.transport_cost_minor),
                feed: MoneyCents::new(model.feed_cost_minor),
                veterinary: MoneyCents::new(model.veterinary_cost_minor),
                labor: MoneyCents::new(model.labor_cost_minor),
                overhead: MoneyCents::new(model.overhead_cost_minor),
            },
            total_cost: MoneyCents::new(model.total_cost_minor),
            sale_revenue: MoneyCents::new(model.sale_revenue_minor),
            other_revenue: MoneyCents::new(model.other_revenue_minor),
            total_revenue: MoneyCents::new(model.total_revenue_minor),
            gross_profit: MoneyCents::new(model.gross_profit_minor),
            net_profit: MoneyCents::new(model.net_profit_minor),
            profit_margin: model.profit_margin,
            roi: model.roi,
            per_animal: PerUnit {
                cost: MoneyCents::new(model.cost_per_animal_minor),
                revenue: MoneyCents::new(model.revenue_per_animal_minor),
                profit: MoneyCents::new(model.profit_per_animal_minor),
            },
            per_arroba: PerUnit {
                cost: MoneyCents::new(model.cost_per_arroba_minor),
                revenue: MoneyCents::new(model.revenue_per_arroba_minor),
                profit: MoneyCents::new(model.profit_per_arroba_minor),
            },
            start_date: model.start_date,
            end_date: model.end_date,
            days_in_operation: model.days_in_operation,
            lot_status: LotStatus::try_from(model.lot_status.as_str())?,
            last_calculated_at: model.last_calculated_at,
            lot_id: model.lot_id,
        })
    }
}

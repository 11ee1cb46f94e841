pub use actor::Actor;
pub use allocations::{Allocation, EntityRef, EntityType, FULL_BP};
pub use categories::{
    CostBucket, ExpenseCategory, LedgerCategory, RevenueBucket, RevenueCategory,
    category_for_intervention, cost_bucket, revenue_bucket,
};
pub use commands::SharedExpenseCmd;
pub use convert::{ConversionContext, PlannedEntry};
pub use cost_centers::{CostCenter, lot_cost_center_code};
pub use error::EngineError;
pub use integrations::{IntegrationRecord, IntegrationStatus, SourceType};
pub use interventions::Intervention;
pub use ledger::{AllocationMethod, EntryRole, LedgerEntry, SourceRef};
pub use lots::{Lot, LotStatus};
pub use money::MoneyCents;
pub use ops::{
    BacklogFailure, BacklogReport, CategoryTotal, Engine, EngineBuilder, FinancialSummary,
    IntegrationOutcome, IntegrationReport, KindTotals, ProfitabilityRefresh, RateioOutcome,
    RateioReport, RefreshReport,
};
pub use profitability::{CostBreakdown, LotLine, LotProfitability, PerUnit};
pub use purchases::Purchase;
pub use sales::Sale;
pub use settings::{ARROBA_KG, EngineSettings};

mod actor;
pub mod allocations;
mod categories;
mod commands;
pub mod convert;
mod cost_centers;
mod error;
mod integrations;
mod interventions;
mod ledger;
mod lots;
mod money;
mod ops;
pub mod profitability;
mod purchases;
mod sales;
mod settings;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;

use sea_orm::DatabaseConnection;

use crate::{EngineSettings, ResultEngine};

mod cost_centers;
mod integrate;
mod profitability;
mod rateio;
mod reports;
mod sources;

pub use integrate::{IntegrationOutcome, ProfitabilityRefresh};
pub use profitability::RefreshReport;
pub use rateio::{RateioOutcome, RateioReport};
pub use reports::{
    BacklogFailure, BacklogReport, CategoryTotal, FinancialSummary, IntegrationReport, KindTotals,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    tracing::error!("rollback failed after {err}: {rollback_err}");
                }
                Err(err)
            }
        }
    }};
}

pub(crate) use with_tx;

/// Stateless over its connection: every operation takes `&self`, so one
/// engine can be shared by concurrent callers.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    settings: EngineSettings,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    settings: EngineSettings,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the default tunables.
    pub fn settings(mut self, settings: EngineSettings) -> EngineBuilder {
        self.settings = settings;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        self.settings.validate()?;
        Ok(Engine {
            database: self.database,
            settings: self.settings,
        })
    }
}

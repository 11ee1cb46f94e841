//! Engine tunables.
//!
//! The binary loads these from its `[engine]` settings section; tests and
//! library callers usually rely on [`EngineSettings::default`].

use serde::Deserialize;

use crate::{EngineError, LotStatus, ResultEngine};

/// Kilograms per arroba, the pricing unit for cattle.
pub const ARROBA_KG: f64 = 15.0;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Converts live weight (kg) to the pricing unit.
    pub arroba_divisor: f64,
    /// Lot statuses that take part in global rateio.
    pub active_lot_statuses: Vec<LotStatus>,
    /// Allowed drift per allocation row, in cents.
    pub allocation_tolerance_cents: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            arroba_divisor: ARROBA_KG,
            active_lot_statuses: vec![
                LotStatus::Quarantine,
                LotStatus::Confined,
                LotStatus::ReadyForSale,
            ],
            allocation_tolerance_cents: 1,
        }
    }
}

impl EngineSettings {
    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if !(self.arroba_divisor.is_finite() && self.arroba_divisor > 0.0) {
            return Err(EngineError::InvalidValue(format!(
                "arroba_divisor must be > 0, got {}",
                self.arroba_divisor
            )));
        }
        if self.allocation_tolerance_cents < 0 {
            return Err(EngineError::InvalidValue(
                "allocation_tolerance_cents must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

//! Financial categories and the fixed tables that map them.
//!
//! Three lookups live here and nowhere else:
//! - ledger category → profitability bucket ([`cost_bucket`], [`revenue_bucket`])
//! - free-text intervention type → expense category ([`category_for_intervention`])

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    CattlePurchase,
    Transport,
    Commission,
    CattleFeed,
    Veterinary,
    Medicine,
    Vaccine,
    Labor,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CattlePurchase => "cattle_purchase",
            Self::Transport => "transport",
            Self::Commission => "commission",
            Self::CattleFeed => "cattle_feed",
            Self::Veterinary => "veterinary",
            Self::Medicine => "medicine",
            Self::Vaccine => "vaccine",
            Self::Labor => "labor",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for ExpenseCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cattle_purchase" => Ok(Self::CattlePurchase),
            "transport" => Ok(Self::Transport),
            "commission" => Ok(Self::Commission),
            "cattle_feed" => Ok(Self::CattleFeed),
            "veterinary" => Ok(Self::Veterinary),
            "medicine" => Ok(Self::Medicine),
            "vaccine" => Ok(Self::Vaccine),
            "labor" => Ok(Self::Labor),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidValue(format!(
                "invalid expense category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueCategory {
    CattleSale,
    Other,
}

impl RevenueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CattleSale => "cattle_sale",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for RevenueCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cattle_sale" => Ok(Self::CattleSale),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidValue(format!(
                "invalid revenue category: {other}"
            ))),
        }
    }
}

/// Kind and category of a ledger entry in one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum LedgerCategory {
    Expense(ExpenseCategory),
    Revenue(RevenueCategory),
}

impl LedgerCategory {
    /// Stored `kind` column value.
    pub fn kind_str(self) -> &'static str {
        match self {
            Self::Expense(_) => "expense",
            Self::Revenue(_) => "revenue",
        }
    }

    /// Stored `category` column value.
    pub fn category_str(self) -> &'static str {
        match self {
            Self::Expense(c) => c.as_str(),
            Self::Revenue(c) => c.as_str(),
        }
    }

    pub fn parse(kind: &str, category: &str) -> ResultEngine<Self> {
        match kind {
            "expense" => Ok(Self::Expense(ExpenseCategory::try_from(category)?)),
            "revenue" => Ok(Self::Revenue(RevenueCategory::try_from(category)?)),
            other => Err(EngineError::InvalidValue(format!(
                "invalid ledger kind: {other}"
            ))),
        }
    }

    #[must_use]
    pub fn is_expense(self) -> bool {
        matches!(self, Self::Expense(_))
    }
}

/// Cost buckets of the lot profitability breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBucket {
    Purchase,
    Transport,
    Feed,
    Veterinary,
    Labor,
    Overhead,
}

/// Revenue buckets of the lot profitability breakdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueBucket {
    Sale,
    Other,
}

pub fn cost_bucket(category: ExpenseCategory) -> CostBucket {
    match category {
        ExpenseCategory::CattlePurchase => CostBucket::Purchase,
        ExpenseCategory::Transport => CostBucket::Transport,
        ExpenseCategory::CattleFeed => CostBucket::Feed,
        ExpenseCategory::Veterinary | ExpenseCategory::Medicine | ExpenseCategory::Vaccine => {
            CostBucket::Veterinary
        }
        ExpenseCategory::Labor => CostBucket::Labor,
        ExpenseCategory::Commission | ExpenseCategory::Other => CostBucket::Overhead,
    }
}

pub fn revenue_bucket(category: RevenueCategory) -> RevenueBucket {
    match category {
        RevenueCategory::CattleSale => RevenueBucket::Sale,
        RevenueCategory::Other => RevenueBucket::Other,
    }
}

const INTERVENTION_CATEGORIES: &[(&str, ExpenseCategory)] = &[
    ("VACCINATION", ExpenseCategory::Vaccine),
    ("DEWORMING", ExpenseCategory::Medicine),
    ("TREATMENT", ExpenseCategory::Medicine),
    ("SURGERY", ExpenseCategory::Veterinary),
    ("EXAMINATION", ExpenseCategory::Veterinary),
    ("QUARANTINE", ExpenseCategory::Veterinary),
];

/// Maps an intervention type to its expense category; unknown types are
/// veterinary.
pub fn category_for_intervention(intervention_type: &str) -> ExpenseCategory {
    let normalized = intervention_type.trim().to_ascii_uppercase();
    INTERVENTION_CATEGORIES
        .iter()
        .find_map(|(name, category)| (*name == normalized).then_some(*category))
        .unwrap_or(ExpenseCategory::Veterinary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervention_types_map_through_the_table() {
        assert_eq!(category_for_intervention("VACCINATION"), ExpenseCategory::Vaccine);
        assert_eq!(category_for_intervention(" deworming "), ExpenseCategory::Medicine);
        assert_eq!(category_for_intervention("Treatment"), ExpenseCategory::Medicine);
        assert_eq!(category_for_intervention("SURGERY"), ExpenseCategory::Veterinary);
        assert_eq!(category_for_intervention("hoof trimming"), ExpenseCategory::Veterinary);
    }

    #[test]
    fn unmapped_expenses_fall_into_overhead() {
        assert_eq!(cost_bucket(ExpenseCategory::CattlePurchase), CostBucket::Purchase);
        assert_eq!(cost_bucket(ExpenseCategory::Vaccine), CostBucket::Veterinary);
        assert_eq!(cost_bucket(ExpenseCategory::Medicine), CostBucket::Veterinary);
        assert_eq!(cost_bucket(ExpenseCategory::Commission), CostBucket::Overhead);
        assert_eq!(cost_bucket(ExpenseCategory::Other), CostBucket::Overhead);
        assert_eq!(revenue_bucket(RevenueCategory::Other), RevenueBucket::Other);
    }

    #[test]
    fn ledger_category_parses_stored_columns() {
        let category = LedgerCategory::parse("expense", "transport").unwrap();
        assert_eq!(category, LedgerCategory::Expense(ExpenseCategory::Transport));
        assert_eq!(category.kind_str(), "expense");
        assert!(LedgerCategory::parse("revenue", "transport").is_err());
        assert!(LedgerCategory::parse("refund", "other").is_err());
    }
}

//! Command structs for engine write operations.
//!
//! These types group parameters for writes that do not come from a source
//! event, keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};

use crate::{ExpenseCategory, MoneyCents};

/// Record a farm-wide expense to be split among active lots by rateio.
#[derive(Clone, Debug)]
pub struct SharedExpenseCmd {
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: MoneyCents,
    pub competence_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub counterparty_id: Option<String>,
    pub payer_account_id: Option<String>,
    pub notes: Option<String>,
}

impl SharedExpenseCmd {
    #[must_use]
    pub fn new(
        category: ExpenseCategory,
        description: impl Into<String>,
        amount: MoneyCents,
        competence_date: DateTime<Utc>,
    ) -> Self {
        Self {
            category,
            description: description.into(),
            amount,
            competence_date,
            due_date: None,
            counterparty_id: None,
            payer_account_id: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    #[must_use]
    pub fn counterparty_id(mut self, id: impl Into<String>) -> Self {
        self.counterparty_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn payer_account_id(mut self, id: impl Into<String>) -> Self {
        self.payer_account_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

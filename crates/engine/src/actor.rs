//! Provenance of engine writes.
//!
//! Every ledger entry, integration record and cost center created by the
//! engine stores the [`Actor`] that triggered it, so machine-generated rows
//! can be told apart from operator-driven ones.

use std::fmt;

use serde::{Deserialize, Serialize};

const SYSTEM: &str = "system";
const USER_PREFIX: &str = "user:";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// Background jobs and automatic workflow hooks.
    System,
    /// An operator acting through some user-facing surface.
    User(String),
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// Stored representation (`system` or `user:<id>`).
    pub fn as_stored(&self) -> String {
        match self {
            Self::System => SYSTEM.to_string(),
            Self::User(id) => format!("{USER_PREFIX}{id}"),
        }
    }

    /// Parses the stored representation back. Unknown shapes are treated as
    /// user ids so that rows written by older workflows stay readable.
    pub fn from_stored(value: &str) -> Self {
        if value == SYSTEM {
            return Self::System;
        }
        match value.strip_prefix(USER_PREFIX) {
            Some(id) => Self::User(id.to_string()),
            None => Self::User(value.to_string()),
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_stored())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_form_round_trips() {
        assert_eq!(Actor::System.as_stored(), "system");
        assert_eq!(Actor::from_stored("system"), Actor::System);
        assert_eq!(Actor::user("ana").as_stored(), "user:ana");
        assert_eq!(Actor::from_stored("user:ana"), Actor::user("ana"));
        assert_eq!(Actor::from_stored("legacy"), Actor::user("legacy"));
    }
}

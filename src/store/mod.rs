//! Persistence boundary for the single `resource(id, text)` table.
//!
//! Handlers never build SQL. They pick a [`Statement`], which carries a fixed
//! parameterized query plus its bound values, and hand it to a
//! [`ResourceStore`].

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use memory::MemoryStore;

/// A row of the resource table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub id: u64,
    pub text: String,
}

/// A bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Int(u64),
    Text(String),
}

/// Every statement the service issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert { text: String },
    SelectAll,
    Update { id: u64, text: String },
    Delete { id: u64 },
}

impl Statement {
    pub fn sql(&self) -> &'static str {
        match self {
            Statement::Insert { .. } => "INSERT INTO resource (text) VALUES (?)",
            Statement::SelectAll => "SELECT id, text FROM resource",
            Statement::Update { .. } => "UPDATE resource SET text = ? WHERE id = ?",
            Statement::Delete { .. } => "DELETE FROM resource WHERE id = ?",
        }
    }

    /// Values bound to the `?` placeholders, in order.
    pub fn params(&self) -> Vec<Param> {
        match self {
            Statement::Insert { text } => vec![Param::Text(text.clone())],
            Statement::SelectAll => Vec::new(),
            Statement::Update { id, text } => vec![Param::Text(text.clone()), Param::Int(*id)],
            Statement::Delete { id } => vec![Param::Int(*id)],
        }
    }
}

/// Result of executing a [`Statement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Rows(Vec<Resource>),
    Inserted { id: u64 },
    Affected(u64),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("unexpected outcome for statement: {0}")]
    UnexpectedOutcome(&'static str),
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Cheap reachability check, used at startup.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn execute(&self, statement: Statement) -> Result<QueryOutcome, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_are_parameterized() {
        let update = Statement::Update {
            id: 7,
            text: "'; DROP TABLE resource; --".into(),
        };
        assert_eq!(update.sql().matches('?').count(), update.params().len());
        assert!(!update.sql().contains("DROP"));

        for stmt in [
            Statement::Insert { text: "x".into() },
            Statement::SelectAll,
            Statement::Delete { id: 1 },
        ] {
            assert_eq!(stmt.sql().matches('?').count(), stmt.params().len());
        }
    }
}

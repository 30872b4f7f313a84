// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph store seam
//!
//! Trait contract between the transform engine and the externally-provided
//! graph database driver: named connection lookup, sessions, managed
//! read/write transactions, statement results, and the result summary with
//! its notifications. The engine never speaks the wire protocol itself; a
//! driver adapter implements these traits.

use crate::error::Result;
use crate::value::{GraphValue, ParameterMap};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by a graph driver adapter
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection failure: {0}")]
    Connection(String),

    #[error("Session failure: {0}")]
    Session(String),

    #[error("Statement failure: {0}")]
    Statement(String),

    #[error("Transaction failure: {0}")]
    Transaction(String),

    /// Transient connectivity loss; the only retryable failure class
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ClientError {
    /// Transient failures are eligible for the single reconnect-retry
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::ServiceUnavailable(_))
    }
}

/// Looks up a named, externally-configured connection.
///
/// Connection persistence and configuration live outside the engine; the
/// transform only resolves its configured connection identifier here at
/// initialization.
pub trait ConnectionRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn GraphClient>>;
}

/// An open graph database driver able to hand out sessions
pub trait GraphClient: Send + Sync {
    /// Connection name, used in log and error context
    fn name(&self) -> &str;

    /// Open a new session against the store
    fn open_session(&self) -> std::result::Result<Box<dyn GraphSession>, ClientError>;
}

/// A unit of transaction work: runs statements against the open transaction
/// and reports how many inputs it processed.
pub type TransactionWork<'a> =
    &'a mut dyn FnMut(&mut dyn GraphTransaction) -> Result<usize>;

/// An open session owning managed transaction execution.
///
/// The work closure runs exactly once inside the transaction; any error it
/// returns aborts the whole transaction with no partial commit.
pub trait GraphSession {
    fn read_transaction(&mut self, work: TransactionWork<'_>) -> Result<usize>;

    fn write_transaction(&mut self, work: TransactionWork<'_>) -> Result<usize>;

    /// Close the session, releasing its connection
    fn close(&mut self);
}

/// An open transaction accepting parameterized statements
pub trait GraphTransaction {
    fn run<'t>(
        &'t mut self,
        statement: &str,
        parameters: &ParameterMap,
    ) -> std::result::Result<Box<dyn StatementResult + 't>, ClientError>;
}

/// One record of a statement result: named values in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Vec<String>,
    values: Vec<GraphValue>,
}

impl Record {
    /// Create a record; keys and values are paired by position
    pub fn new(keys: Vec<String>, values: Vec<GraphValue>) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self { keys, values }
    }

    /// Value bound to a name, `None` when the result has no such column
    pub fn get(&self, name: &str) -> Option<&GraphValue> {
        self.keys
            .iter()
            .position(|k| k == name)
            .map(|i| &self.values[i])
    }

    /// Column names in declaration order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Values in declaration order
    pub fn values(&self) -> &[GraphValue] {
        &self.values
    }
}

/// A streamed statement result: records first, then the summary.
///
/// `consume` discards any unread records and must be called at most once,
/// after iteration is finished.
pub trait StatementResult {
    fn next_record(&mut self) -> std::result::Result<Option<Record>, ClientError>;

    fn consume(&mut self) -> std::result::Result<ResultSummary, ClientError>;
}

/// Execution summary returned after a result is fully consumed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    pub notifications: Vec<Notification>,
}

/// A server-side notification attached to a result summary
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub code: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub position: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_service_unavailable_is_transient() {
        assert!(ClientError::ServiceUnavailable("timed out".into()).is_transient());
        assert!(!ClientError::Statement("syntax".into()).is_transient());
        assert!(!ClientError::Transaction("deadlock".into()).is_transient());
    }

    #[test]
    fn record_lookup_is_by_name() {
        let record = Record::new(
            vec!["a".into(), "b".into()],
            vec![GraphValue::Integer(1), GraphValue::Integer(2)],
        );
        assert_eq!(record.get("b"), Some(&GraphValue::Integer(2)));
        assert_eq!(record.get("c"), None);
    }
}

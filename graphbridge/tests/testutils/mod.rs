//! Test utilities for GraphBridge integration tests
//!
//! The mock store scripts statement results and failures and records every
//! session, transaction, and statement the engine issues. All tests drive
//! the engine through its public API only.

pub mod mock_store;

use graphbridge::{Result, Row, RowSchema, RowSink, RowSource};
use std::collections::VecDeque;

/// Row source backed by a fixed list of rows
pub struct VecRowSource {
    rows: VecDeque<Row>,
}

impl VecRowSource {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into(),
        }
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }
}

/// Row sink collecting everything pushed at it
#[derive(Default)]
pub struct CollectingSink {
    pub rows: Vec<Row>,
    pub schemas: Vec<RowSchema>,
}

impl RowSink for CollectingSink {
    fn put_row(&mut self, schema: &RowSchema, row: Row) -> Result<()> {
        self.schemas.push(schema.clone());
        self.rows.push(row);
        Ok(())
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Write-path buffers
//!
//! The two write strategies own disjoint buffer types and never interleave:
//! the per-row path accumulates [`PendingStatement`]s flushed as one shared
//! transaction, the unwind path accumulates raw parameter maps flushed as a
//! single bulk list statement. The active strategy is chosen once, at
//! configuration validation.

use crate::config::WriteMode;
use crate::row::Row;
use crate::value::{GraphValue, ParameterMap};

/// One buffered statement awaiting its flush, with the row that produced it
#[derive(Debug, Clone)]
pub struct PendingStatement {
    pub row: Row,
    pub statement: String,
    pub parameters: ParameterMap,
}

/// Per-row write buffer; holds statements until the batch threshold
#[derive(Debug, Default)]
pub struct StatementBuffer {
    statements: Vec<PendingStatement>,
}

impl StatementBuffer {
    pub fn new() -> Self {
        Self {
            statements: Vec::new(),
        }
    }

    /// Buffer one statement
    pub fn push(&mut self, statement: PendingStatement) {
        self.statements.push(statement);
    }

    /// Number of buffered statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Drain the buffer for a flush.
    ///
    /// The buffer is empty afterwards regardless of what the flush does
    /// with the drained statements.
    pub fn take(&mut self) -> Vec<PendingStatement> {
        std::mem::take(&mut self.statements)
    }
}

/// Bulk write buffer; accumulates one parameter map per row under a bind name
#[derive(Debug)]
pub struct UnwindAccumulator {
    bind_name: String,
    maps: Vec<ParameterMap>,
}

impl UnwindAccumulator {
    pub fn new(bind_name: &str) -> Self {
        Self {
            bind_name: bind_name.to_string(),
            maps: Vec::new(),
        }
    }

    /// The parameter name the collected list is bound under
    pub fn bind_name(&self) -> &str {
        &self.bind_name
    }

    /// Accumulate one row's parameter map
    pub fn push(&mut self, parameters: ParameterMap) {
        self.maps.push(parameters);
    }

    /// Number of accumulated entries this cycle
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// True when nothing is accumulated
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Drain the accumulated maps into the single flush parameter:
    /// `{bind_name: [map, map, ...]}`.
    ///
    /// List and counter are reset regardless of the flush outcome. Returns
    /// the parameter map and the number of entries it carries.
    pub fn take(&mut self) -> (ParameterMap, usize) {
        let maps = std::mem::take(&mut self.maps);
        let count = maps.len();
        let list = GraphValue::List(maps.into_iter().map(ParameterMap::into_map_value).collect());
        let mut parameters = ParameterMap::new();
        parameters.insert(&self.bind_name, list);
        (parameters, count)
    }
}

/// The active write strategy; exactly one per run, owning its own buffer
#[derive(Debug)]
pub enum WriteStrategy {
    PerRow(StatementBuffer),
    Unwind(UnwindAccumulator),
}

impl WriteStrategy {
    /// Build the strategy chosen at configuration validation
    pub fn for_mode(mode: &WriteMode) -> Self {
        match mode {
            WriteMode::PerRow => WriteStrategy::PerRow(StatementBuffer::new()),
            WriteMode::Unwind { bind_name } => {
                WriteStrategy::Unwind(UnwindAccumulator::new(bind_name))
            }
        }
    }

    /// Entries waiting for the next flush
    pub fn pending(&self) -> usize {
        match self {
            WriteStrategy::PerRow(buffer) => buffer.len(),
            WriteStrategy::Unwind(accumulator) => accumulator.len(),
        }
    }

    /// True when no entry awaits a flush
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_buffer_is_empty_after_take() {
        let mut buffer = StatementBuffer::new();
        buffer.push(PendingStatement {
            row: Row::new(vec![]),
            statement: "RETURN 1".to_string(),
            parameters: ParameterMap::new(),
        });
        assert_eq!(buffer.len(), 1);
        let drained = buffer.take();
        assert_eq!(drained.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn unwind_take_binds_the_list_and_resets() {
        let mut accumulator = UnwindAccumulator::new("rows");
        for i in 0..3 {
            let mut map = ParameterMap::new();
            map.insert("id", GraphValue::Integer(i));
            accumulator.push(map);
        }

        let (parameters, count) = accumulator.take();
        assert_eq!(count, 3);
        assert!(accumulator.is_empty());
        match parameters.get("rows") {
            Some(GraphValue::List(items)) => assert_eq!(items.len(), 3),
            other => panic!("expected the bound list, got {:?}", other),
        }
    }
}

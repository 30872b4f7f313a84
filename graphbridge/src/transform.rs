// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The graph query transform
//!
//! Orchestrates one run: initialization (validate settings, resolve the
//! connection, resolve field indexes, open the session), streaming (pull
//! rows, route them to the active write strategy, flush on the batch
//! threshold), the final drain at end-of-input, and disposal with its
//! safety-net flush and session close. Without upstream input the transform
//! runs its single composed statement once and terminates.
//!
//! All mutable run state is owned here and passed by exclusive reference;
//! parallel copies of the transform each own an independent instance. A
//! fatal error increments the error counter and raises the shared stop
//! signal; the stop signal suppresses every flush except the final wrap-up.

use crate::buffer::{PendingStatement, WriteStrategy};
use crate::client::{ConnectionRegistry, GraphTransaction};
use crate::config::{GraphQuerySettings, ResultMode, StatementSource};
use crate::error::{BridgeError, Result};
use crate::mapper::ParameterMapper;
use crate::materialize::ResultMaterializer;
use crate::row::{FieldMeta, Row, RowSchema, RowSink, RowSource, TabularType, TabularValue};
use crate::runner::{LineCounters, SessionHolder, TransactionRunner, RECONNECT_COOLDOWN};
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Run state living from a successful `init` until disposal
struct ActiveState {
    has_input: bool,
    batch_size: usize,
    statement_field_index: Option<usize>,
    current_statement: String,
    mapper: ParameterMapper,
    strategy: WriteStrategy,
    runner: TransactionRunner,
    holder: SessionHolder,
    counters: LineCounters,
    materializer: ResultMaterializer,
    output_done: bool,
}

impl ActiveState {
    fn flush(&mut self, sink: &mut dyn RowSink) -> Result<()> {
        match &self.strategy {
            WriteStrategy::PerRow(_) => self.flush_statements(sink),
            WriteStrategy::Unwind(_) => self.flush_unwind(sink),
        }
    }

    /// Execute every buffered statement inside one transaction, in
    /// insertion order. The buffer is drained up front: it is empty after
    /// the flush whatever the outcome.
    ///
    /// Results stream to the sink while the transaction is still open, so a
    /// later statement's failure rolls back graph work whose output rows
    /// were already emitted downstream.
    fn flush_statements(&mut self, sink: &mut dyn RowSink) -> Result<()> {
        let statements = match &mut self.strategy {
            WriteStrategy::PerRow(buffer) => buffer.take(),
            WriteStrategy::Unwind(_) => return Ok(()),
        };
        if statements.is_empty() {
            return Ok(());
        }
        let count = statements.len();

        let ActiveState {
            holder,
            counters,
            materializer,
            runner,
            ..
        } = self;
        let materializer = &*materializer;

        let mut work = |tx: &mut dyn GraphTransaction| -> Result<usize> {
            for pending in &statements {
                let mut result = tx.run(&pending.statement, &pending.parameters)?;
                materializer.materialize(result.as_mut(), &pending.row, false, sink)?;
            }
            Ok(count)
        };

        runner
            .execute(holder, counters, &mut work)
            .map_err(|e| {
                error!("batch of {} statements failed: {}", count, e);
                e
            })?;
        Ok(())
    }

    /// Execute the single bulk statement binding the accumulated list.
    ///
    /// List and counter reset whatever the outcome; a failure closes the
    /// session and is fatal for the run.
    fn flush_unwind(&mut self, sink: &mut dyn RowSink) -> Result<()> {
        let (parameters, count) = match &mut self.strategy {
            WriteStrategy::Unwind(accumulator) => accumulator.take(),
            WriteStrategy::PerRow(_) => return Ok(()),
        };
        if count == 0 {
            return Ok(());
        }
        let statement = self.current_statement.clone();

        let ActiveState {
            holder,
            counters,
            materializer,
            runner,
            ..
        } = self;
        let materializer = &*materializer;
        let origin = Row::new(vec![]);

        let mut work = |tx: &mut dyn GraphTransaction| -> Result<usize> {
            let mut result = tx.run(&statement, &parameters)?;
            materializer.materialize(result.as_mut(), &origin, true, sink)?;
            Ok(count)
        };

        match runner.execute(holder, counters, &mut work) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("bulk write of {} list entries failed: {}", count, e);
                holder.close();
                Err(e)
            }
        }
    }

    /// Flush any buffered remainder, unless the run was stopped
    fn wrap_up(&mut self, stopped: bool, sink: &mut dyn RowSink) -> Result<()> {
        if stopped || self.strategy.is_empty() {
            return Ok(());
        }
        self.flush(sink)
    }
}

/// A pipeline transform executing parameterized graph statements per row
pub struct GraphQueryTransform {
    settings: GraphQuerySettings,
    pipeline_name: String,
    transform_name: String,
    stop: Arc<AtomicBool>,
    reconnect_cooldown: Duration,
    errors: u64,
    state: Option<ActiveState>,
    disposed: bool,
}

impl GraphQueryTransform {
    pub fn new(settings: GraphQuerySettings, pipeline_name: &str, transform_name: &str) -> Self {
        Self {
            settings,
            pipeline_name: pipeline_name.to_string(),
            transform_name: transform_name.to_string(),
            stop: Arc::new(AtomicBool::new(false)),
            reconnect_cooldown: RECONNECT_COOLDOWN,
            errors: 0,
            state: None,
            disposed: false,
        }
    }

    /// Override the reconnect cool-down pause; tests pass zero
    pub fn with_reconnect_cooldown(mut self, cooldown: Duration) -> Self {
        self.reconnect_cooldown = cooldown;
        self
    }

    /// Share the transform's stop signal with an existing one, letting the
    /// host stop several parallel copies together
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// The shared stop signal
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Raise the global stop: in-flight work finishes its current
    /// transaction, further flushes are suppressed beyond the final wrap-up
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Fatal errors seen so far
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Input/output line accounting
    pub fn counters(&self) -> LineCounters {
        self.state
            .as_ref()
            .map(|state| state.counters)
            .unwrap_or_default()
    }

    /// The extended output schema; available after `init`
    pub fn output_schema(&self) -> Option<&RowSchema> {
        self.state
            .as_ref()
            .map(|state| state.materializer.output_schema())
    }

    /// Initialize the run: validate the settings, resolve the named
    /// connection, build the output schema, resolve field indexes, and open
    /// the session. `input_schema` is `None` when no upstream transform
    /// feeds this one.
    pub fn init(
        &mut self,
        registry: &dyn ConnectionRegistry,
        input_schema: Option<&RowSchema>,
    ) -> Result<()> {
        match self.init_inner(registry, input_schema) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn init_inner(
        &mut self,
        registry: &dyn ConnectionRegistry,
        input_schema: Option<&RowSchema>,
    ) -> Result<()> {
        if self.state.is_some() {
            return Err(BridgeError::Execution(
                "transform is already initialized".to_string(),
            ));
        }

        let has_input = input_schema.is_some();
        let plan = self.settings.validate(has_input)?;

        let client = registry.resolve(&plan.connection).ok_or_else(|| {
            BridgeError::Configuration(format!(
                "connection '{}' could not be found",
                plan.connection
            ))
        })?;

        let mut output_schema = input_schema.cloned().unwrap_or_default();
        match &plan.result_mode {
            ResultMode::OpaqueGraph { field_name } => {
                output_schema.add_field(FieldMeta::new(field_name, TabularType::Graph));
            }
            ResultMode::Flattened(returns) => {
                for spec in returns {
                    output_schema.add_field(FieldMeta::new(&spec.name, spec.target_type));
                }
            }
        }

        let empty_schema = RowSchema::new();
        let mapper =
            ParameterMapper::resolve(&plan.mappings, input_schema.unwrap_or(&empty_schema))?;

        let (statement_field_index, current_statement) = match &plan.statement_source {
            StatementSource::Literal(text) => (None, text.clone()),
            StatementSource::FromField(field) => {
                let schema = input_schema.ok_or_else(|| {
                    BridgeError::Configuration(
                        "statement-from-field requires upstream input".to_string(),
                    )
                })?;
                let index = schema.index_of(field).ok_or_else(|| {
                    BridgeError::Configuration(format!(
                        "unable to find statement field '{}'",
                        field
                    ))
                })?;
                (Some(index), String::new())
            }
        };

        let input_width = input_schema.map(|schema| schema.len()).unwrap_or(0);
        let materializer = ResultMaterializer::new(
            output_schema,
            plan.result_mode.clone(),
            has_input,
            input_width,
            &self.pipeline_name,
            &self.transform_name,
        );

        let mut holder = SessionHolder::new(client).with_cooldown(self.reconnect_cooldown);
        holder.open()?;

        info!(
            "transform '{}' initialized on connection '{}' (batch size {})",
            self.transform_name, plan.connection, plan.batch_size
        );

        self.state = Some(ActiveState {
            has_input,
            batch_size: plan.batch_size,
            statement_field_index,
            current_statement,
            mapper,
            strategy: WriteStrategy::for_mode(&plan.write_mode),
            runner: TransactionRunner::new(plan.read_only, plan.retry_on_disconnect),
            holder,
            counters: LineCounters::default(),
            materializer,
            output_done: false,
        });
        Ok(())
    }

    /// Process one cycle: pull a row (when there is upstream input), map it,
    /// route it to the active buffer, flush on the batch threshold.
    ///
    /// Returns `Ok(true)` while more cycles are expected, `Ok(false)` once
    /// the stream is drained, or immediately after the single statement in
    /// no-input mode.
    pub fn process_row(
        &mut self,
        source: &mut dyn RowSource,
        sink: &mut dyn RowSink,
    ) -> Result<bool> {
        match self.process_row_inner(source, sink) {
            Ok(more) => Ok(more),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn process_row_inner(
        &mut self,
        source: &mut dyn RowSource,
        sink: &mut dyn RowSink,
    ) -> Result<bool> {
        let stopped = self.is_stopped();
        let state = match &mut self.state {
            Some(state) => state,
            None => {
                return Err(BridgeError::Execution(
                    "process_row called before init".to_string(),
                ))
            }
        };
        if state.output_done {
            return Ok(false);
        }
        if stopped {
            state.output_done = true;
            return Ok(false);
        }

        let row = if state.has_input {
            match source.next_row()? {
                Some(row) => row,
                None => {
                    state.wrap_up(false, sink)?;
                    state.output_done = true;
                    return Ok(false);
                }
            }
        } else {
            Row::new(vec![])
        };

        if let Some(index) = state.statement_field_index {
            state.current_statement = match row.get(index) {
                Some(TabularValue::String(text)) => text.clone(),
                Some(other) => {
                    return Err(BridgeError::Execution(format!(
                        "statement field holds a {} value, expected a string",
                        other.type_name()
                    )))
                }
                None => {
                    return Err(BridgeError::Execution(
                        "statement field is missing from the row".to_string(),
                    ))
                }
            };
        }

        let parameters = state.mapper.map_row(&row)?;

        let flush_now = match &mut state.strategy {
            WriteStrategy::Unwind(accumulator) => {
                accumulator.push(parameters);
                accumulator.len() >= state.batch_size
            }
            WriteStrategy::PerRow(buffer) => {
                buffer.push(PendingStatement {
                    row,
                    statement: state.current_statement.clone(),
                    parameters,
                });
                buffer.len() >= state.batch_size || !state.has_input
            }
        };
        if flush_now {
            state.flush(sink)?;
        }

        if state.has_input {
            Ok(true)
        } else {
            state.output_done = true;
            Ok(false)
        }
    }

    /// Host signal that a pipeline batch boundary was reached: flush any
    /// buffered remainder so the batch commits as a unit
    pub fn on_batch_boundary(&mut self, sink: &mut dyn RowSink) -> Result<()> {
        let stopped = self.is_stopped();
        let result = match &mut self.state {
            Some(state) => state.wrap_up(stopped, sink),
            None => Ok(()),
        };
        result.map_err(|e| self.fail(e))
    }

    /// Tear the run down: safety-net flush of any remainder, then close the
    /// session. Idempotent.
    pub fn dispose(&mut self, sink: &mut dyn RowSink) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        let stopped = self.is_stopped();
        let result = match &mut self.state {
            Some(state) => {
                let flushed = state.wrap_up(stopped, sink);
                state.holder.close();
                flushed
            }
            None => Ok(()),
        };
        self.disposed = true;
        result.map_err(|e| self.fail(e))
    }

    /// Drive the whole run: cycles until the stream drains or a fatal error
    /// stops it, then disposes. The first error wins over disposal errors.
    pub fn run(&mut self, source: &mut dyn RowSource, sink: &mut dyn RowSink) -> Result<()> {
        let outcome = loop {
            match self.process_row(source, sink) {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let disposal = self.dispose(sink);
        outcome.and(disposal)
    }

    fn fail(&mut self, e: BridgeError) -> BridgeError {
        self.errors += 1;
        self.request_stop();
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    struct NoRows;

    impl RowSource for NoRows {
        fn next_row(&mut self) -> Result<Option<Row>> {
            Ok(None)
        }
    }

    struct NullSink;

    impl RowSink for NullSink {
        fn put_row(&mut self, _schema: &RowSchema, _row: Row) -> Result<()> {
            Ok(())
        }
    }

    fn settings() -> GraphQuerySettings {
        serde_json::from_str(r#"{"connection": "graph", "statement": "RETURN 1"}"#).unwrap()
    }

    #[test]
    fn process_row_before_init_is_an_error() {
        let mut transform = GraphQueryTransform::new(settings(), "pipeline", "transform");
        let result = transform.process_row(&mut NoRows, &mut NullSink);
        assert!(matches!(result, Err(BridgeError::Execution(_))));
        assert_eq!(transform.errors(), 1);
        assert!(transform.is_stopped());
    }

    #[test]
    fn dispose_without_init_is_a_no_op() {
        let mut transform = GraphQueryTransform::new(settings(), "pipeline", "transform");
        assert!(transform.dispose(&mut NullSink).is_ok());
        assert!(transform.dispose(&mut NullSink).is_ok());
        assert_eq!(transform.errors(), 0);
    }
}

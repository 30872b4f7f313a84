// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result-to-row materialization
//!
//! Consumes one statement result and pushes output rows to the sink: either
//! a single row carrying the whole result as one opaque graph value, or one
//! row per record with each declared return value converted to its target
//! tabular type. After the records are consumed the execution summary is
//! inspected; a summary with notifications escalates to a fatal error, but
//! rows already pushed stay pushed.

use crate::client::StatementResult;
use crate::codec::convert_to_tabular;
use crate::config::ResultMode;
use crate::error::{BridgeError, Result};
use crate::row::{Row, RowSchema, RowSink, TabularValue};
use crate::value::{GraphData, GraphValue};
use log::error;

/// Materializes statement results into output rows
#[derive(Debug, Clone)]
pub struct ResultMaterializer {
    output_schema: RowSchema,
    result_mode: ResultMode,
    has_input: bool,
    input_width: usize,
    source_pipeline: String,
    source_transform: String,
}

impl ResultMaterializer {
    pub fn new(
        output_schema: RowSchema,
        result_mode: ResultMode,
        has_input: bool,
        input_width: usize,
        source_pipeline: &str,
        source_transform: &str,
    ) -> Self {
        Self {
            output_schema,
            result_mode,
            has_input,
            input_width,
            source_pipeline: source_pipeline.to_string(),
            source_transform: source_transform.to_string(),
        }
    }

    /// The extended output schema rows are pushed under
    pub fn output_schema(&self) -> &RowSchema {
        &self.output_schema
    }

    /// Consume one result and push its output rows.
    ///
    /// `standalone` marks bulk-write results whose rows correlate to no
    /// single input row: they are freshly allocated and appended values
    /// start at index 0. Row-correlated output copies the originating row
    /// and appends after the input fields.
    pub fn materialize(
        &self,
        result: &mut dyn StatementResult,
        origin: &Row,
        standalone: bool,
        sink: &mut dyn RowSink,
    ) -> Result<()> {
        let append_from = if self.has_input && !standalone {
            self.input_width
        } else {
            0
        };

        match &self.result_mode {
            ResultMode::OpaqueGraph { .. } => {
                let mut data = GraphData::new(&self.source_pipeline, &self.source_transform);
                while let Some(record) = result.next_record()? {
                    for value in record.values() {
                        data.absorb(value);
                    }
                }

                let mut output = self.base_row(origin, standalone);
                output.set(append_from, TabularValue::Graph(data));
                sink.put_row(&self.output_schema, output)?;
            }
            ResultMode::Flattened(returns) => {
                while let Some(record) = result.next_record()? {
                    let mut output = self.base_row(origin, standalone);
                    let mut index = append_from;
                    for spec in returns {
                        let value = record.get(&spec.name).unwrap_or(&GraphValue::Null);
                        let converted =
                            convert_to_tabular(value, spec.target_type, spec.source_hint).map_err(
                                |e| BridgeError::Conversion {
                                    name: spec.name.clone(),
                                    target: spec.target_type.description().to_string(),
                                    reason: e.to_string(),
                                },
                            )?;
                        output.set(index, converted);
                        index += 1;
                    }
                    sink.put_row(&self.output_schema, output)?;
                }
            }
        }

        self.check_summary(result)
    }

    fn base_row(&self, origin: &Row, standalone: bool) -> Row {
        if standalone {
            Row::allocate(self.output_schema.len())
        } else {
            origin.resized_copy(self.output_schema.len())
        }
    }

    /// Inspect the execution summary once the records are consumed.
    ///
    /// Every notification is logged; any notification flags the result as
    /// errored and escalates.
    fn check_summary(&self, result: &mut dyn StatementResult) -> Result<()> {
        let summary = result.consume()?;
        if summary.notifications.is_empty() {
            return Ok(());
        }
        for notification in &summary.notifications {
            error!("{} ({})", notification.title, notification.severity);
            error!(
                "{} : {}, position {}",
                notification.code,
                notification.description,
                notification.position.as_deref().unwrap_or("unknown")
            );
        }
        Err(BridgeError::QueryWarnings {
            count: summary.notifications.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, Notification, Record, ResultSummary};
    use crate::config::ResolvedReturn;
    use crate::row::{FieldMeta, TabularType};
    use crate::value::GraphNode;

    struct ScriptedResult {
        records: Vec<Record>,
        summary: ResultSummary,
    }

    impl StatementResult for ScriptedResult {
        fn next_record(&mut self) -> std::result::Result<Option<Record>, ClientError> {
            if self.records.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.records.remove(0)))
            }
        }

        fn consume(&mut self) -> std::result::Result<ResultSummary, ClientError> {
            Ok(std::mem::take(&mut self.summary))
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        rows: Vec<Row>,
    }

    impl RowSink for CollectingSink {
        fn put_row(&mut self, _schema: &RowSchema, row: Row) -> Result<()> {
            self.rows.push(row);
            Ok(())
        }
    }

    fn flattened_materializer() -> ResultMaterializer {
        let output_schema = RowSchema::from_fields(vec![
            FieldMeta::new("id", TabularType::Integer),
            FieldMeta::new("name", TabularType::String),
        ]);
        ResultMaterializer::new(
            output_schema,
            ResultMode::Flattened(vec![ResolvedReturn {
                name: "name".to_string(),
                target_type: TabularType::String,
                source_hint: None,
            }]),
            true,
            1,
            "pipeline",
            "transform",
        )
    }

    #[test]
    fn flattened_mode_emits_one_row_per_record() {
        let materializer = flattened_materializer();
        let mut result = ScriptedResult {
            records: vec![
                Record::new(vec!["name".into()], vec![GraphValue::String("a".into())]),
                Record::new(vec!["name".into()], vec![GraphValue::String("b".into())]),
            ],
            summary: ResultSummary::default(),
        };
        let mut sink = CollectingSink::default();
        let origin = Row::new(vec![TabularValue::Integer(9)]);

        materializer
            .materialize(&mut result, &origin, false, &mut sink)
            .unwrap();

        assert_eq!(sink.rows.len(), 2);
        // input field copied, return value appended after it
        assert_eq!(sink.rows[0].get(0), Some(&TabularValue::Integer(9)));
        assert_eq!(
            sink.rows[1].get(1),
            Some(&TabularValue::String("b".into()))
        );
    }

    #[test]
    fn opaque_mode_emits_exactly_one_row() {
        let output_schema = RowSchema::from_fields(vec![FieldMeta::new("graph", TabularType::Graph)]);
        let materializer = ResultMaterializer::new(
            output_schema,
            ResultMode::OpaqueGraph {
                field_name: "graph".to_string(),
            },
            false,
            0,
            "pipeline",
            "transform",
        );
        let mut result = ScriptedResult {
            records: vec![
                Record::new(
                    vec!["n".into()],
                    vec![GraphValue::Node(GraphNode::new("n1".into()))],
                ),
                Record::new(
                    vec!["n".into()],
                    vec![GraphValue::Node(GraphNode::new("n2".into()))],
                ),
            ],
            summary: ResultSummary::default(),
        };
        let mut sink = CollectingSink::default();

        materializer
            .materialize(&mut result, &Row::new(vec![]), false, &mut sink)
            .unwrap();

        assert_eq!(sink.rows.len(), 1);
        match sink.rows[0].get(0) {
            Some(TabularValue::Graph(data)) => {
                assert_eq!(data.nodes.len(), 2);
                assert_eq!(data.source_transform, "transform");
            }
            other => panic!("expected an opaque graph value, got {:?}", other),
        }
    }

    #[test]
    fn notifications_escalate_after_rows_are_emitted() {
        let materializer = flattened_materializer();
        let mut result = ScriptedResult {
            records: vec![Record::new(
                vec!["name".into()],
                vec![GraphValue::String("a".into())],
            )],
            summary: ResultSummary {
                notifications: vec![Notification {
                    code: "Neo.ClientNotification.Statement.CartesianProduct".to_string(),
                    title: "cartesian product".to_string(),
                    description: "the statement builds a cartesian product".to_string(),
                    severity: "WARNING".to_string(),
                    position: None,
                }],
            },
        };
        let mut sink = CollectingSink::default();
        let origin = Row::new(vec![TabularValue::Integer(1)]);

        let outcome = materializer.materialize(&mut result, &origin, false, &mut sink);
        assert!(matches!(
            outcome,
            Err(BridgeError::QueryWarnings { count: 1 })
        ));
        // already-emitted rows are not retracted
        assert_eq!(sink.rows.len(), 1);
    }

    #[test]
    fn missing_result_column_reads_as_null() {
        let materializer = flattened_materializer();
        let mut result = ScriptedResult {
            records: vec![Record::new(
                vec!["other".into()],
                vec![GraphValue::Integer(5)],
            )],
            summary: ResultSummary::default(),
        };
        let mut sink = CollectingSink::default();
        let origin = Row::new(vec![TabularValue::Integer(1)]);

        materializer
            .materialize(&mut result, &origin, false, &mut sink)
            .unwrap();
        assert_eq!(sink.rows[0].get(1), Some(&TabularValue::Null));
    }
}

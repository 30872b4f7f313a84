// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transform settings and configuration validation
//!
//! Raw settings arrive from the host (already variable-substituted) and are
//! validated once into a [`ResolvedPlan`]: type names parsed against the
//! closed enumerations, the write strategy and result mode chosen, the batch
//! size checked. Everything the per-row hot path needs is resolved here so
//! no name lookup ever happens per row.

use crate::codec::PropertyType;
use crate::error::{BridgeError, Result};
use crate::row::TabularType;
use serde::{Deserialize, Serialize};

fn default_batch_size() -> usize {
    1
}

/// One declared parameter mapping: row field to named statement parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    /// Statement parameter name
    pub parameter: String,
    /// Source field name in the input row
    pub field: String,
    /// Graph property type name, parsed against [`PropertyType`]
    pub property_type: String,
}

/// One declared return value: result column to appended output field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnValueSpec {
    /// Result column name, also the output field name
    pub name: String,
    /// Target tabular type of the appended output field
    pub target_type: TabularType,
    /// Optional graph-side source type for temporal disambiguation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

/// Raw transform settings as configured by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQuerySettings {
    /// Named connection to resolve at initialization
    pub connection: String,

    /// Literal statement text; ignored when `statement_from_field` is set
    #[serde(default)]
    pub statement: String,

    /// Read the statement text from an input field, per row
    #[serde(default)]
    pub statement_from_field: bool,

    /// Input field carrying the statement text
    #[serde(default)]
    pub statement_field: String,

    /// Rows per transaction (per-row mode) or per bulk write (unwind mode)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Execute inside read transactions instead of write transactions
    #[serde(default)]
    pub read_only: bool,

    /// Retry once after a reconnect on transient connectivity failure
    #[serde(default)]
    pub retry_on_disconnect: bool,

    /// Accumulate parameter maps and write them as one bulk list statement
    #[serde(default)]
    pub use_unwind: bool,

    /// Parameter name the bulk list is bound under; the statement text must
    /// reference it (caller contract, not validated here)
    #[serde(default)]
    pub unwind_bind_name: String,

    /// Return each whole statement result as one opaque graph value
    #[serde(default)]
    pub return_graph: bool,

    /// Output field carrying the opaque graph value
    #[serde(default)]
    pub return_graph_field: String,

    /// Ordered parameter mappings
    #[serde(default)]
    pub parameter_mappings: Vec<ParameterMapping>,

    /// Ordered return value specs
    #[serde(default)]
    pub return_values: Vec<ReturnValueSpec>,
}

/// A parameter mapping with its property type parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMapping {
    pub parameter: String,
    pub field: String,
    pub property_type: PropertyType,
}

/// A return spec with its source hint parsed
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReturn {
    pub name: String,
    pub target_type: TabularType,
    pub source_hint: Option<PropertyType>,
}

/// Where the statement text comes from
#[derive(Debug, Clone, PartialEq)]
pub enum StatementSource {
    Literal(String),
    FromField(String),
}

/// Which write strategy runs this transform; exactly one per run
#[derive(Debug, Clone, PartialEq)]
pub enum WriteMode {
    /// One buffered statement per row, flushed as a shared transaction
    PerRow,
    /// Parameter maps accumulated into one bulk list statement
    Unwind { bind_name: String },
}

/// How statement results become output rows
#[derive(Debug, Clone, PartialEq)]
pub enum ResultMode {
    /// One opaque graph value per statement, appended under this field name
    OpaqueGraph { field_name: String },
    /// N typed columns per record, in declared order
    Flattened(Vec<ResolvedReturn>),
}

/// Fully validated execution plan
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    pub connection: String,
    pub statement_source: StatementSource,
    pub batch_size: usize,
    pub read_only: bool,
    pub retry_on_disconnect: bool,
    pub write_mode: WriteMode,
    pub result_mode: ResultMode,
    pub mappings: Vec<ResolvedMapping>,
}

impl GraphQuerySettings {
    /// Validate the settings into an execution plan.
    ///
    /// `has_input` states whether an upstream transform feeds this one;
    /// statement-from-field only works with upstream input.
    pub fn validate(&self, has_input: bool) -> Result<ResolvedPlan> {
        if self.connection.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "a graph connection must be specified".to_string(),
            ));
        }

        if self.batch_size < 1 {
            return Err(BridgeError::Configuration(format!(
                "batch size must be at least 1, got {}",
                self.batch_size
            )));
        }

        let statement_source = if self.statement_from_field {
            if self.statement_field.trim().is_empty() {
                return Err(BridgeError::Configuration(
                    "statement-from-field is set but no statement field is named".to_string(),
                ));
            }
            if !has_input {
                return Err(BridgeError::Configuration(
                    "statement-from-field requires upstream input".to_string(),
                ));
            }
            StatementSource::FromField(self.statement_field.clone())
        } else {
            if self.statement.trim().is_empty() {
                return Err(BridgeError::Configuration(
                    "no statement text configured".to_string(),
                ));
            }
            StatementSource::Literal(self.statement.clone())
        };

        let write_mode = if self.use_unwind {
            if self.unwind_bind_name.trim().is_empty() {
                return Err(BridgeError::Configuration(
                    "unwind mode is set but no bind name is configured".to_string(),
                ));
            }
            WriteMode::Unwind {
                bind_name: self.unwind_bind_name.clone(),
            }
        } else {
            WriteMode::PerRow
        };

        let mut mappings = Vec::with_capacity(self.parameter_mappings.len());
        for mapping in &self.parameter_mappings {
            let property_type = PropertyType::parse(&mapping.property_type).ok_or_else(|| {
                BridgeError::UnknownPropertyType {
                    name: mapping.property_type.clone(),
                    field: mapping.field.clone(),
                }
            })?;
            mappings.push(ResolvedMapping {
                parameter: mapping.parameter.clone(),
                field: mapping.field.clone(),
                property_type,
            });
        }

        let result_mode = if self.return_graph {
            if self.return_graph_field.trim().is_empty() {
                return Err(BridgeError::Configuration(
                    "return-graph is set but no output field is named".to_string(),
                ));
            }
            ResultMode::OpaqueGraph {
                field_name: self.return_graph_field.clone(),
            }
        } else {
            let mut returns = Vec::with_capacity(self.return_values.len());
            for spec in &self.return_values {
                let source_hint = match &spec.source_type {
                    Some(name) if !name.trim().is_empty() => {
                        Some(PropertyType::parse(name).ok_or_else(|| {
                            BridgeError::Configuration(format!(
                                "unknown source type '{}' for return value '{}'",
                                name, spec.name
                            ))
                        })?)
                    }
                    _ => None,
                };
                returns.push(ResolvedReturn {
                    name: spec.name.clone(),
                    target_type: spec.target_type,
                    source_hint,
                });
            }
            ResultMode::Flattened(returns)
        };

        Ok(ResolvedPlan {
            connection: self.connection.clone(),
            statement_source,
            batch_size: self.batch_size,
            read_only: self.read_only,
            retry_on_disconnect: self.retry_on_disconnect,
            write_mode,
            result_mode,
            mappings,
        })
    }
}

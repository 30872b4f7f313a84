// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Tabular row model and host-pipeline seams
//!
//! The row side of the bridge: field metadata, schemas, row values, and the
//! pull-source / push-sink traits the host pipeline engine implements.

use crate::error::Result;
use crate::value::GraphData;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tabular value types understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabularType {
    String,
    Integer,
    Number,
    BigNumber,
    Boolean,
    Date,
    Timestamp,
    Binary,
    /// Opaque graph column carrying an entire statement result
    Graph,
}

impl TabularType {
    /// Human-readable type description used in conversion errors
    pub fn description(&self) -> &'static str {
        match self {
            TabularType::String => "String",
            TabularType::Integer => "Integer",
            TabularType::Number => "Number",
            TabularType::BigNumber => "BigNumber",
            TabularType::Boolean => "Boolean",
            TabularType::Date => "Date",
            TabularType::Timestamp => "Timestamp",
            TabularType::Binary => "Binary",
            TabularType::Graph => "Graph",
        }
    }
}

impl fmt::Display for TabularType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// One tabular value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TabularValue {
    Null,
    String(String),
    Integer(i64),
    Number(f64),
    BigNumber(BigDecimal),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Binary(Vec<u8>),
    Graph(GraphData),
}

impl TabularValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, TabularValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            TabularValue::Null => "Null",
            TabularValue::String(_) => "String",
            TabularValue::Integer(_) => "Integer",
            TabularValue::Number(_) => "Number",
            TabularValue::BigNumber(_) => "BigNumber",
            TabularValue::Boolean(_) => "Boolean",
            TabularValue::Date(_) => "Date",
            TabularValue::Timestamp(_) => "Timestamp",
            TabularValue::Binary(_) => "Binary",
            TabularValue::Graph(_) => "Graph",
        }
    }
}

/// Metadata for one field in a row schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    pub field_type: TabularType,
}

impl FieldMeta {
    pub fn new(name: &str, field_type: TabularType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
        }
    }
}

/// Ordered field metadata describing a row layout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowSchema {
    fields: Vec<FieldMeta>,
}

impl RowSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create a schema from an ordered field list
    pub fn from_fields(fields: Vec<FieldMeta>) -> Self {
        Self { fields }
    }

    /// Append a field to the schema
    pub fn add_field(&mut self, field: FieldMeta) {
        self.fields.push(field);
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field metadata at an index
    pub fn field(&self, index: usize) -> Option<&FieldMeta> {
        self.fields.get(index)
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    /// Index of a field by name, `None` when absent
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// One row of tabular values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: Vec<TabularValue>,
}

impl Row {
    /// Create a row from its values
    pub fn new(values: Vec<TabularValue>) -> Self {
        Self { values }
    }

    /// Allocate a row of the given width, all values null
    pub fn allocate(width: usize) -> Self {
        Self {
            values: vec![TabularValue::Null; width],
        }
    }

    /// Copy this row into a wider (or narrower) allocation, padding new
    /// positions with null
    pub fn resized_copy(&self, width: usize) -> Self {
        let mut values = self.values.clone();
        values.resize(width, TabularValue::Null);
        Self { values }
    }

    /// Value at an index
    pub fn get(&self, index: usize) -> Option<&TabularValue> {
        self.values.get(index)
    }

    /// Overwrite the value at an index; out-of-range writes are rejected
    pub fn set(&mut self, index: usize, value: TabularValue) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Row width
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-width row
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// All values in field order
    pub fn values(&self) -> &[TabularValue] {
        &self.values
    }
}

/// Pull-style row source implemented by the host pipeline.
///
/// `Ok(None)` signals end-of-stream.
pub trait RowSource {
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Push-style row sink implemented by the host pipeline
pub trait RowSink {
    fn put_row(&mut self, schema: &RowSchema, row: Row) -> Result<()>;
}

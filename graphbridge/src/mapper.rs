// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row-to-parameter mapping
//!
//! Builds the named parameter map of one statement from the selected fields
//! of one row. Field indexes are resolved once against the input schema
//! before the first row; an unresolved field is a setup error, not a per-row
//! error. Mapping a row is a pure function of the row and the resolved
//! bindings.

use crate::codec::PropertyType;
use crate::config::ResolvedMapping;
use crate::error::{BridgeError, Result};
use crate::row::{Row, RowSchema, TabularValue};
use crate::value::ParameterMap;

/// One mapping bound to its field index
#[derive(Debug, Clone)]
struct MappingBinding {
    parameter: String,
    field_name: String,
    field_index: usize,
    property_type: PropertyType,
}

/// Converts a row's selected fields into a statement parameter map
#[derive(Debug, Clone)]
pub struct ParameterMapper {
    bindings: Vec<MappingBinding>,
}

impl ParameterMapper {
    /// Resolve the declared mappings against the input schema.
    ///
    /// Fails with [`BridgeError::FieldNotFound`] when a mapping names a
    /// field the schema does not carry.
    pub fn resolve(mappings: &[ResolvedMapping], schema: &RowSchema) -> Result<Self> {
        let mut bindings = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            let field_index =
                schema
                    .index_of(&mapping.field)
                    .ok_or_else(|| BridgeError::FieldNotFound {
                        field: mapping.field.clone(),
                    })?;
            bindings.push(MappingBinding {
                parameter: mapping.parameter.clone(),
                field_name: mapping.field.clone(),
                field_index,
                property_type: mapping.property_type,
            });
        }
        Ok(Self { bindings })
    }

    /// Build the parameter map for one row, in declared mapping order
    pub fn map_row(&self, row: &Row) -> Result<ParameterMap> {
        let mut parameters = ParameterMap::new();
        for binding in &self.bindings {
            let value = row.get(binding.field_index).unwrap_or(&TabularValue::Null);
            let converted = binding
                .property_type
                .convert_from_tabular(value)
                .map_err(|e| BridgeError::Conversion {
                    name: binding.field_name.clone(),
                    target: binding.property_type.name().to_string(),
                    reason: e.to_string(),
                })?;
            parameters.insert(&binding.parameter, converted);
        }
        Ok(parameters)
    }

    /// Number of resolved bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True when no mapping is declared
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Type-directed conversion between tabular and graph values
//!
//! Writes dispatch on the declared graph property type; reads dispatch on
//! the target tabular type declared by a return spec, with an optional
//! source-type hint to disambiguate temporal values. Both directions work on
//! closed enumerations: unknown type names are rejected when the
//! configuration is validated, never per row.

use crate::row::{TabularType, TabularValue};
use crate::value::GraphValue;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Conversion failure; callers wrap it with the field or return-value context
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("conversion from graph type {from} to {to} is not supported")]
    Unsupported { from: String, to: String },

    #[error("value of type {from} does not coerce to {to}")]
    Uncoercible { from: String, to: String },

    #[error("malformed value: {0}")]
    Malformed(String),
}

/// Closed set of graph property types a parameter mapping may declare.
///
/// Also doubles as the source-type hint vocabulary of return specs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Time,
    LocalTime,
    DateTime,
    LocalDateTime,
    Duration,
    ByteArray,
    List,
    Map,
}

impl PropertyType {
    /// Parse a configured type name; `None` for unrecognized names.
    ///
    /// Called once at configuration validation.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "String" => Some(PropertyType::String),
            "Integer" => Some(PropertyType::Integer),
            "Float" => Some(PropertyType::Float),
            "Boolean" => Some(PropertyType::Boolean),
            "Date" => Some(PropertyType::Date),
            "Time" => Some(PropertyType::Time),
            "LocalTime" => Some(PropertyType::LocalTime),
            "DateTime" => Some(PropertyType::DateTime),
            "LocalDateTime" => Some(PropertyType::LocalDateTime),
            "Duration" => Some(PropertyType::Duration),
            "ByteArray" => Some(PropertyType::ByteArray),
            "List" => Some(PropertyType::List),
            "Map" => Some(PropertyType::Map),
            _ => None,
        }
    }

    /// Canonical configuration name
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::String => "String",
            PropertyType::Integer => "Integer",
            PropertyType::Float => "Float",
            PropertyType::Boolean => "Boolean",
            PropertyType::Date => "Date",
            PropertyType::Time => "Time",
            PropertyType::LocalTime => "LocalTime",
            PropertyType::DateTime => "DateTime",
            PropertyType::LocalDateTime => "LocalDateTime",
            PropertyType::Duration => "Duration",
            PropertyType::ByteArray => "ByteArray",
            PropertyType::List => "List",
            PropertyType::Map => "Map",
        }
    }

    /// Convert one tabular value into this graph property type (write path).
    ///
    /// A null tabular value is always a graph null.
    pub fn convert_from_tabular(
        &self,
        value: &TabularValue,
    ) -> std::result::Result<GraphValue, CodecError> {
        if value.is_null() {
            return Ok(GraphValue::Null);
        }
        match self {
            PropertyType::String => to_graph_string(value),
            PropertyType::Integer => to_graph_integer(value),
            PropertyType::Float => to_graph_float(value),
            PropertyType::Boolean => to_graph_boolean(value),
            PropertyType::Date => to_graph_date(value),
            PropertyType::Time => to_graph_time(value),
            PropertyType::LocalTime => to_graph_local_time(value),
            PropertyType::DateTime => to_graph_date_time(value),
            PropertyType::LocalDateTime => to_graph_local_date_time(value),
            PropertyType::Duration => to_graph_duration(value),
            PropertyType::ByteArray => to_graph_bytes(value),
            PropertyType::List => to_graph_list(value),
            PropertyType::Map => to_graph_map(value),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn uncoercible(value: &TabularValue, to: &PropertyType) -> CodecError {
    CodecError::Uncoercible {
        from: value.type_name().to_string(),
        to: to.name().to_string(),
    }
}

fn to_graph_string(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let rendered = match value {
        TabularValue::String(s) => s.clone(),
        TabularValue::Integer(i) => i.to_string(),
        TabularValue::Number(n) => n.to_string(),
        TabularValue::BigNumber(d) => d.to_string(),
        TabularValue::Boolean(b) => b.to_string(),
        TabularValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        TabularValue::Timestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        _ => return Err(uncoercible(value, &PropertyType::String)),
    };
    Ok(GraphValue::String(rendered))
}

fn to_graph_integer(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let converted = match value {
        TabularValue::Integer(i) => *i,
        TabularValue::Number(n) => n.round() as i64,
        TabularValue::BigNumber(d) => d
            .to_i64()
            .ok_or_else(|| CodecError::Malformed(format!("decimal {} out of i64 range", d)))?,
        TabularValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| CodecError::Malformed(format!("'{}' is not an integer: {}", s, e)))?,
        TabularValue::Boolean(b) => i64::from(*b),
        TabularValue::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default(),
        TabularValue::Timestamp(ts) => ts.and_utc().timestamp_millis(),
        _ => return Err(uncoercible(value, &PropertyType::Integer)),
    };
    Ok(GraphValue::Integer(converted))
}

fn to_graph_float(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let converted = match value {
        TabularValue::Number(n) => *n,
        TabularValue::Integer(i) => *i as f64,
        TabularValue::BigNumber(d) => d
            .to_f64()
            .ok_or_else(|| CodecError::Malformed(format!("decimal {} out of f64 range", d)))?,
        TabularValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| CodecError::Malformed(format!("'{}' is not a number: {}", s, e)))?,
        _ => return Err(uncoercible(value, &PropertyType::Float)),
    };
    Ok(GraphValue::Float(converted))
}

fn to_graph_boolean(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let converted = match value {
        TabularValue::Boolean(b) => *b,
        TabularValue::Integer(i) => *i != 0,
        TabularValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "y" | "yes" | "1" => true,
            "false" | "n" | "no" | "0" => false,
            other => {
                return Err(CodecError::Malformed(format!(
                    "'{}' is not a boolean",
                    other
                )))
            }
        },
        _ => return Err(uncoercible(value, &PropertyType::Boolean)),
    };
    Ok(GraphValue::Boolean(converted))
}

fn to_graph_date(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let converted = match value {
        TabularValue::Date(d) => *d,
        TabularValue::Timestamp(ts) => ts.date(),
        TabularValue::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| CodecError::Malformed(format!("'{}' is not a date: {}", s, e)))?,
        _ => return Err(uncoercible(value, &PropertyType::Date)),
    };
    Ok(GraphValue::Date(converted))
}

fn parse_local_time(s: &str) -> std::result::Result<NaiveTime, CodecError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S"))
        .map_err(|e| CodecError::Malformed(format!("'{}' is not a time: {}", s, e)))
}

fn to_graph_time(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let time = match value {
        TabularValue::Timestamp(ts) => ts.time(),
        TabularValue::String(s) => parse_local_time(s)?,
        _ => return Err(uncoercible(value, &PropertyType::Time)),
    };
    Ok(GraphValue::Time {
        time,
        offset_seconds: 0,
    })
}

fn to_graph_local_time(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let time = match value {
        TabularValue::Timestamp(ts) => ts.time(),
        TabularValue::String(s) => parse_local_time(s)?,
        _ => return Err(uncoercible(value, &PropertyType::LocalTime)),
    };
    Ok(GraphValue::LocalTime(time))
}

fn to_graph_date_time(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let converted = match value {
        TabularValue::Timestamp(ts) => {
            GraphValue::DateTime(ts.and_utc().fixed_offset())
        }
        TabularValue::Date(d) => {
            let midnight = d
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| CodecError::Malformed(format!("invalid date {}", d)))?;
            GraphValue::DateTime(midnight.and_utc().fixed_offset())
        }
        TabularValue::String(s) => {
            let parsed: DateTime<FixedOffset> = DateTime::parse_from_rfc3339(s.trim())
                .map_err(|e| CodecError::Malformed(format!("'{}' is not a datetime: {}", s, e)))?;
            GraphValue::DateTime(parsed)
        }
        _ => return Err(uncoercible(value, &PropertyType::DateTime)),
    };
    Ok(converted)
}

fn to_graph_local_date_time(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    let converted = match value {
        TabularValue::Timestamp(ts) => *ts,
        TabularValue::Date(d) => d
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CodecError::Malformed(format!("invalid date {}", d)))?,
        TabularValue::String(s) => {
            NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%dT%H:%M:%S"))
                .map_err(|e| {
                    CodecError::Malformed(format!("'{}' is not a local datetime: {}", s, e))
                })?
        }
        _ => return Err(uncoercible(value, &PropertyType::LocalDateTime)),
    };
    Ok(GraphValue::LocalDateTime(converted))
}

fn to_graph_duration(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    // Integers and numbers are treated as millisecond counts
    let millis = match value {
        TabularValue::Integer(i) => *i,
        TabularValue::Number(n) => n.round() as i64,
        _ => return Err(uncoercible(value, &PropertyType::Duration)),
    };
    Ok(GraphValue::Duration {
        months: 0,
        days: 0,
        seconds: millis / 1000,
        nanos: ((millis % 1000) * 1_000_000) as i32,
    })
}

fn to_graph_bytes(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    match value {
        TabularValue::Binary(bytes) => Ok(GraphValue::Bytes(bytes.clone())),
        _ => Err(uncoercible(value, &PropertyType::ByteArray)),
    }
}

fn json_to_graph(json: &serde_json::Value) -> std::result::Result<GraphValue, CodecError> {
    let converted = match json {
        serde_json::Value::Null => GraphValue::Null,
        serde_json::Value::Bool(b) => GraphValue::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                GraphValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                GraphValue::Float(f)
            } else {
                return Err(CodecError::Malformed(format!("number {} out of range", n)));
            }
        }
        serde_json::Value::String(s) => GraphValue::String(s.clone()),
        serde_json::Value::Array(items) => GraphValue::List(
            items
                .iter()
                .map(json_to_graph)
                .collect::<std::result::Result<Vec<_>, _>>()?,
        ),
        serde_json::Value::Object(entries) => GraphValue::Map(
            entries
                .iter()
                .map(|(k, v)| json_to_graph(v).map(|gv| (k.clone(), gv)))
                .collect::<std::result::Result<_, _>>()?,
        ),
    };
    Ok(converted)
}

fn to_graph_list(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    match value {
        TabularValue::String(s) => {
            let json: serde_json::Value = serde_json::from_str(s)
                .map_err(|e| CodecError::Malformed(format!("'{}' is not a JSON list: {}", s, e)))?;
            match json_to_graph(&json)? {
                list @ GraphValue::List(_) => Ok(list),
                other => Err(CodecError::Malformed(format!(
                    "expected a JSON list, got {}",
                    other.type_name()
                ))),
            }
        }
        _ => Err(uncoercible(value, &PropertyType::List)),
    }
}

fn to_graph_map(value: &TabularValue) -> std::result::Result<GraphValue, CodecError> {
    match value {
        TabularValue::String(s) => {
            let json: serde_json::Value = serde_json::from_str(s)
                .map_err(|e| CodecError::Malformed(format!("'{}' is not a JSON map: {}", s, e)))?;
            match json_to_graph(&json)? {
                map @ GraphValue::Map(_) => Ok(map),
                other => Err(CodecError::Malformed(format!(
                    "expected a JSON map, got {}",
                    other.type_name()
                ))),
            }
        }
        _ => Err(uncoercible(value, &PropertyType::Map)),
    }
}

/// Convert one record value to the target tabular type (read path).
///
/// Dispatch is by the target type; `source_hint` disambiguates temporal
/// values when the target is a date. A graph null is always a tabular null,
/// no conversion attempted.
pub fn convert_to_tabular(
    value: &GraphValue,
    target: TabularType,
    source_hint: Option<PropertyType>,
) -> std::result::Result<TabularValue, CodecError> {
    if value.is_null() {
        return Ok(TabularValue::Null);
    }

    let uncoercible = || CodecError::Uncoercible {
        from: value.type_name().to_string(),
        to: target.description().to_string(),
    };

    match target {
        TabularType::String => value
            .coerce_string()
            .map(TabularValue::String)
            .ok_or_else(uncoercible),
        TabularType::Integer => value
            .as_integer()
            .map(TabularValue::Integer)
            .ok_or_else(uncoercible),
        TabularType::Number => value
            .as_float()
            .map(TabularValue::Number)
            .ok_or_else(uncoercible),
        TabularType::Boolean => value
            .as_boolean()
            .map(TabularValue::Boolean)
            .ok_or_else(uncoercible),
        TabularType::BigNumber => {
            let rendered = value.coerce_string().ok_or_else(uncoercible)?;
            let decimal = BigDecimal::from_str(&rendered).map_err(|e| {
                CodecError::Malformed(format!("'{}' is not a decimal: {}", rendered, e))
            })?;
            Ok(TabularValue::BigNumber(decimal))
        }
        TabularType::Date => match source_hint {
            Some(PropertyType::LocalDateTime) => value
                .as_local_date_time()
                .map(|dt| TabularValue::Date(dt.date()))
                .ok_or_else(uncoercible),
            Some(PropertyType::Date) | None => value
                .as_local_date()
                .map(TabularValue::Date)
                .ok_or_else(uncoercible),
            Some(other) => Err(CodecError::Unsupported {
                from: other.name().to_string(),
                to: TabularType::Date.description().to_string(),
            }),
        },
        TabularType::Timestamp => value
            .as_local_date_time()
            .map(TabularValue::Timestamp)
            .ok_or_else(uncoercible),
        TabularType::Binary | TabularType::Graph => Err(CodecError::Unsupported {
            from: value.type_name().to_string(),
            to: target.description().to_string(),
        }),
    }
}

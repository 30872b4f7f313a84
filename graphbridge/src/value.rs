// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph-side value model
//!
//! Values crossing the statement boundary in either direction: parameters
//! written with a statement, and record values read back from a result.
//! Scalars, temporal values, collections, and the graph entities
//! (node/relationship/path) that make up an opaque result payload.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A node returned by the graph store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: HashMap<String, GraphValue>,
}

impl GraphNode {
    /// Create a new node with the given id
    pub fn new(id: String) -> Self {
        Self {
            id,
            labels: Vec::new(),
            properties: HashMap::new(),
        }
    }

    /// Create a new node with id and labels
    pub fn with_labels(id: String, labels: Vec<String>) -> Self {
        Self {
            id,
            labels,
            properties: HashMap::new(),
        }
    }
}

/// A relationship returned by the graph store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub id: String,
    pub from_node: String,
    pub to_node: String,
    pub rel_type: String,
    pub properties: HashMap<String, GraphValue>,
}

impl GraphRelationship {
    /// Create a new relationship
    pub fn new(id: String, from_node: String, to_node: String, rel_type: String) -> Self {
        Self {
            id,
            from_node,
            to_node,
            rel_type,
            properties: HashMap::new(),
        }
    }
}

/// A path returned by the graph store: alternating nodes and relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRelationship>,
}

impl GraphPath {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Path length in relationships
    pub fn length(&self) -> usize {
        self.relationships.len()
    }
}

impl Default for GraphPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Value types crossing the graph statement boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<GraphValue>),
    Map(HashMap<String, GraphValue>),
    Date(NaiveDate),
    LocalTime(NaiveTime),
    Time {
        time: NaiveTime,
        offset_seconds: i32,
    },
    LocalDateTime(NaiveDateTime),
    DateTime(DateTime<FixedOffset>),
    /// Datetime in a named timezone; stored as the zone name plus UTC instant
    ZonedDateTime(String, DateTime<Utc>),
    Duration {
        months: i64,
        days: i64,
        seconds: i64,
        nanos: i32,
    },
    Node(GraphNode),
    Relationship(GraphRelationship),
    Path(GraphPath),
}

impl GraphValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, GraphValue::Null)
    }

    /// Extract as boolean if possible
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            GraphValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract as 64-bit integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            GraphValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract as double, widening integers the way the driver does
    pub fn as_float(&self) -> Option<f64> {
        match self {
            GraphValue::Float(f) => Some(*f),
            GraphValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Coerce a scalar or temporal value to its string rendering.
    ///
    /// Structural values (list, map, node, relationship, path) and nulls do
    /// not coerce.
    pub fn coerce_string(&self) -> Option<String> {
        match self {
            GraphValue::String(s) => Some(s.clone()),
            GraphValue::Boolean(b) => Some(b.to_string()),
            GraphValue::Integer(i) => Some(i.to_string()),
            GraphValue::Float(f) => Some(f.to_string()),
            GraphValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            GraphValue::LocalTime(t) => Some(t.format("%H:%M:%S%.f").to_string()),
            GraphValue::Time {
                time,
                offset_seconds,
            } => {
                let offset = FixedOffset::east_opt(*offset_seconds)
                    .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
                Some(format!("{}{}", time.format("%H:%M:%S%.f"), offset))
            }
            GraphValue::LocalDateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            GraphValue::DateTime(dt) => Some(dt.to_rfc3339()),
            GraphValue::ZonedDateTime(tz_name, dt) => Some(match self.zone_local() {
                Some(local) => format!("{}[{}]", local.format("%Y-%m-%dT%H:%M:%S%.f"), tz_name),
                None => format!("{}[{}]", dt.to_rfc3339(), tz_name),
            }),
            _ => None,
        }
    }

    /// Extract as local date if possible
    pub fn as_local_date(&self) -> Option<NaiveDate> {
        match self {
            GraphValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Extract as local date-time if possible
    pub fn as_local_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            GraphValue::LocalDateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Wall-clock time of a named-zone datetime, resolved through the tz
    /// database. `None` when the value is not a named-zone datetime or the
    /// zone name is unknown.
    pub fn zone_local(&self) -> Option<NaiveDateTime> {
        match self {
            GraphValue::ZonedDateTime(tz_name, dt) => {
                let tz = chrono_tz::Tz::from_str(tz_name).ok()?;
                Some(tz.from_utc_datetime(&dt.naive_utc()).naive_local())
            }
            _ => None,
        }
    }

    /// Extract as node if possible
    pub fn as_node(&self) -> Option<&GraphNode> {
        match self {
            GraphValue::Node(n) => Some(n),
            _ => None,
        }
    }

    /// Extract as relationship if possible
    pub fn as_relationship(&self) -> Option<&GraphRelationship> {
        match self {
            GraphValue::Relationship(r) => Some(r),
            _ => None,
        }
    }

    /// Extract as path if possible
    pub fn as_path(&self) -> Option<&GraphPath> {
        match self {
            GraphValue::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            GraphValue::Null => "Null",
            GraphValue::Boolean(_) => "Boolean",
            GraphValue::Integer(_) => "Integer",
            GraphValue::Float(_) => "Float",
            GraphValue::String(_) => "String",
            GraphValue::Bytes(_) => "Bytes",
            GraphValue::List(_) => "List",
            GraphValue::Map(_) => "Map",
            GraphValue::Date(_) => "Date",
            GraphValue::LocalTime(_) => "LocalTime",
            GraphValue::Time { .. } => "Time",
            GraphValue::LocalDateTime(_) => "LocalDateTime",
            GraphValue::DateTime(_) => "DateTime",
            GraphValue::ZonedDateTime(_, _) => "ZonedDateTime",
            GraphValue::Duration { .. } => "Duration",
            GraphValue::Node(_) => "Node",
            GraphValue::Relationship(_) => "Relationship",
            GraphValue::Path(_) => "Path",
        }
    }
}

impl fmt::Display for GraphValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphValue::Null => write!(f, "null"),
            GraphValue::Boolean(b) => write!(f, "{}", b),
            GraphValue::Integer(i) => write!(f, "{}", i),
            GraphValue::Float(v) => write!(f, "{}", v),
            GraphValue::String(s) => write!(f, "\"{}\"", s),
            GraphValue::Bytes(b) => write!(f, "BYTES[{}]", b.len()),
            GraphValue::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            GraphValue::Map(map) => {
                write!(f, "{{")?;
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, map[*key])?;
                }
                write!(f, "}}")
            }
            GraphValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            GraphValue::LocalTime(t) => write!(f, "{}", t.format("%H:%M:%S")),
            GraphValue::Time {
                time,
                offset_seconds,
            } => write!(f, "{}+{}s", time.format("%H:%M:%S"), offset_seconds),
            GraphValue::LocalDateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            GraphValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S %:z")),
            GraphValue::ZonedDateTime(tz_name, dt) => {
                write!(f, "{} {}", dt.format("%Y-%m-%dT%H:%M:%S"), tz_name)
            }
            GraphValue::Duration {
                months,
                days,
                seconds,
                nanos,
            } => write!(f, "P{}M{}DT{}.{:09}S", months, days, seconds, nanos),
            GraphValue::Node(node) => {
                write!(f, "NODE({}, [{}])", node.id, node.labels.join(", "))
            }
            GraphValue::Relationship(rel) => write!(
                f,
                "REL({}, {}-[{}]->{})",
                rel.id, rel.from_node, rel.rel_type, rel.to_node
            ),
            GraphValue::Path(path) => write!(
                f,
                "PATH({} nodes, {} relationships)",
                path.nodes.len(),
                path.relationships.len()
            ),
        }
    }
}

/// Ordered name-to-value map binding the parameters of one statement.
///
/// Entry order follows the declared mapping order; inserting an existing
/// name overwrites the value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterMap {
    entries: Vec<(String, GraphValue)>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Bind a parameter, overwriting an existing binding of the same name
    pub fn insert(&mut self, name: &str, value: GraphValue) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Bound value by name
    pub fn get(&self, name: &str) -> Option<&GraphValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bindings in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GraphValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Collapse into a graph map value, e.g. as one entry of an unwind list
    pub fn into_map_value(self) -> GraphValue {
        GraphValue::Map(self.entries.into_iter().collect())
    }
}

/// Opaque graph payload carried through the pipeline as a single column.
///
/// Collects every node, relationship, and path entity found in a statement
/// result, tagged with the pipeline and transform that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub source_pipeline: String,
    pub source_transform: String,
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRelationship>,
}

impl GraphData {
    pub fn new(source_pipeline: &str, source_transform: &str) -> Self {
        Self {
            source_pipeline: source_pipeline.to_string(),
            source_transform: source_transform.to_string(),
            nodes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Fold one record value into the payload, recursing into lists and
    /// unrolling paths. Scalar values carry no graph entities and are
    /// skipped.
    pub fn absorb(&mut self, value: &GraphValue) {
        match value {
            GraphValue::Node(node) => self.nodes.push(node.clone()),
            GraphValue::Relationship(rel) => self.relationships.push(rel.clone()),
            GraphValue::Path(path) => {
                self.nodes.extend(path.nodes.iter().cloned());
                self.relationships.extend(path.relationships.iter().cloned());
            }
            GraphValue::List(items) => {
                for item in items {
                    self.absorb(item);
                }
            }
            GraphValue::Map(entries) => {
                let mut keys: Vec<_> = entries.keys().collect();
                keys.sort();
                for key in keys {
                    self.absorb(&entries[key]);
                }
            }
            _ => {}
        }
    }

    /// True when no graph entity was collected
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transform error types

use crate::client::ClientError;
use thiserror::Error;

/// Errors raised by the transform engine
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unable to find parameter field '{field}' in the input row")]
    FieldNotFound { field: String },

    #[error("Unknown graph property type '{name}' for field '{field}'")]
    UnknownPropertyType { name: String, field: String },

    #[error("Unable to convert value '{name}' to {target}: {reason}")]
    Conversion {
        name: String,
        target: String,
        reason: String,
    },

    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Statement raised {count} notification(s) in its result summary")]
    QueryWarnings { count: usize },

    #[error("Execution error: {0}")]
    Execution(String),
}

impl BridgeError {
    /// A transient failure is eligible for the single reconnect-retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Client(e) if e.is_transient())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(error: serde_json::Error) -> Self {
        BridgeError::Configuration(error.to_string())
    }
}

/// Result type for transform operations
pub type Result<T> = std::result::Result<T, BridgeError>;

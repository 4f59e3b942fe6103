use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::db::DatabaseError;

/// What was wrong with a piece of caller-supplied input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingAssignees,
    MissingStartDate,
    MissingQuantity,
    InvalidQuantity,
    InvalidDateRange,
    InvalidPercent,
    UnknownItemId,
    DuplicateItemId,
    UnknownWorker,
    DuplicateWorker,
    MissingTitle,
    Archived,
}

/// A single validation failure, optionally tied to an item by title.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            item: None,
            kind,
            message: message.into(),
        }
    }

    pub fn for_item(item: &str, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            item: Some(item.to_string()),
            kind,
            message: message.into(),
        }
    }
}

/// Every issue found in one request, so callers can fix them in one pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationErrors(pub Vec<ValidationIssue>);

impl ValidationErrors {
    pub fn push(&mut self, issue: ValidationIssue) {
        self.0.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.0
    }

    pub fn has(&self, kind: IssueKind) -> bool {
        self.0.iter().any(|i| i.kind == kind)
    }

    /// `Ok(())` when nothing was collected, the error otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(SchedulingError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|i| match &i.item {
                Some(item) => format!("'{}': {}", item, i.message),
                None => i.message.clone(),
            })
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl From<ValidationIssue> for SchedulingError {
    fn from(issue: ValidationIssue) -> Self {
        SchedulingError::Validation(ValidationErrors(vec![issue]))
    }
}

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Refused: {0}")]
    ConflictPolicy(String),

    #[error("Caller identity is missing")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl SchedulingError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        SchedulingError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid template '{key}': {reason}")]
    InvalidTemplate { key: String, reason: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, SchedulingError>;

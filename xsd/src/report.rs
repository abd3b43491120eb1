use crate::info::SchemaInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One diagnostic. `line` and `column` are 1-based; `0` means the position is unknown (e.g. for
/// schema-level messages).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

/// Result of validating one document. Built fresh by every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    pub(crate) fn from_issues(errors: Vec<ValidationIssue>, warnings: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn error_messages(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.message.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub error_count: usize,
    pub warning_count: usize,
    /// Present when the document is invalid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_info: Option<SchemaInfo>,
    /// Position in the input of a batch validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_index: Option<usize>,
}

impl ValidationReport {
    pub(crate) fn new(
        outcome: ValidationOutcome,
        suggestions: Vec<String>,
        schema_info: Option<SchemaInfo>,
    ) -> Self {
        Self {
            valid: outcome.valid,
            error_count: outcome.errors.len(),
            warning_count: outcome.warnings.len(),
            suggestions: (!outcome.valid).then_some(suggestions),
            errors: outcome.errors,
            warnings: outcome.warnings,
            schema_info,
            document_index: None,
        }
    }
}

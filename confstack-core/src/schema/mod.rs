//! Schema introspection and validation backends.
//!
//! Every backend turns its native schema document into a [`SchemaNode`] tree
//! for key derivation and validates merged data against the same document.

pub mod json_schema;
pub mod keys;
pub mod registry;
pub mod shorthand;

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

pub use json_schema::JsonSchemaProvider;
pub use keys::{derive_keys, derive_keys_for, LogicalKey};
pub use registry::SchemaProviderRegistry;
pub use shorthand::ShorthandProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Leaf,
    Container(Vec<SchemaField>),
}

/// A named child of a container node. `name` never carries an optionality
/// marker; providers record optionality in `optional` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub optional: bool,
    pub node: SchemaNode,
}

impl SchemaField {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            node: SchemaNode::Leaf,
        }
    }

    pub fn container(name: impl Into<String>, fields: Vec<SchemaField>) -> Self {
        Self {
            name: name.into(),
            optional: false,
            node: SchemaNode::Container(fields),
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(Value),
    Invalid(ValidationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// JSON pointer into the validated value; empty for the root.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub provider: String,
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed", self.provider)?;
        let details = self
            .issues
            .iter()
            .map(|issue| {
                if issue.path.is_empty() {
                    issue.message.clone()
                } else {
                    format!("{}: {}", issue.path, issue.message)
                }
            })
            .collect::<Vec<_>>();
        if !details.is_empty() {
            write!(f, ": {}", details.join("; "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

pub trait SchemaProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Builds the field tree of `schema`. The root must be a container.
    fn introspect(&self, schema: &Value) -> Result<SchemaNode>;

    /// `Err` is reserved for schemas the backend cannot use at all; data that
    /// does not satisfy the schema is reported as [`ValidationOutcome::Invalid`].
    fn validate(&self, schema: &Value, input: &Value) -> Result<ValidationOutcome>;
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn pointer_of(path: &[String]) -> String {
    path.iter()
        .map(|segment| format!("/{}", segment.replace('~', "~0").replace('/', "~1")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{pointer_of, ValidationError, ValidationIssue};

    #[test]
    fn display_lists_every_issue_with_its_path() {
        let error = ValidationError {
            provider: "shorthand".to_owned(),
            issues: vec![
                ValidationIssue {
                    path: "/port".to_owned(),
                    message: "expected number, received string".to_owned(),
                },
                ValidationIssue {
                    path: String::new(),
                    message: "root problem".to_owned(),
                },
            ],
        };

        assert_eq!(
            error.to_string(),
            "shorthand validation failed: /port: expected number, received string; root problem"
        );
    }

    #[test]
    fn pointer_escapes_reserved_characters() {
        let path = vec!["a/b".to_owned(), "c~d".to_owned()];
        assert_eq!(pointer_of(&path), "/a~1b/c~0d");
    }
}

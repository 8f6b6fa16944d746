use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::{
    pointer_of, value_kind, SchemaField, SchemaNode, SchemaProvider, ValidationError,
    ValidationIssue, ValidationOutcome,
};

pub const NAME: &str = "shorthand";

const OPTIONAL_MARKER: char = '?';

/// Compact definitions such as
/// `{"db": {"url": "string"}, "port": "number", "debug?": "boolean"}`.
///
/// A trailing `?` marks a field optional. Leaf types are `string`, `number`,
/// `integer`, `boolean`, `any` and their `[]` array forms. Unknown input
/// fields are dropped from the validated output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShorthandProvider;

impl SchemaProvider for ShorthandProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn introspect(&self, schema: &Value) -> Result<SchemaNode> {
        let definition = root_definition(schema)?;
        Ok(SchemaNode::Container(fields_of(definition, &[])?))
    }

    fn validate(&self, schema: &Value, input: &Value) -> Result<ValidationOutcome> {
        let definition = root_definition(schema)?;
        // Surface definition problems as schema errors before looking at data.
        fields_of(definition, &[])?;

        let mut issues = Vec::new();
        let output = match input {
            Value::Object(map) => check_object(definition, Some(map), &mut Vec::new(), &mut issues),
            other => {
                issues.push(ValidationIssue {
                    path: String::new(),
                    message: format!("expected object, received {}", value_kind(other)),
                });
                Map::new()
            }
        };

        if issues.is_empty() {
            Ok(ValidationOutcome::Valid(Value::Object(output)))
        } else {
            Ok(ValidationOutcome::Invalid(ValidationError {
                provider: NAME.to_owned(),
                issues,
            }))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    String,
    Number,
    Integer,
    Boolean,
    Any,
}

impl Scalar {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Any => "any",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LeafType {
    scalar: Scalar,
    array: bool,
}

impl LeafType {
    fn parse(definition: &str) -> Option<Self> {
        let trimmed = definition.trim();
        match trimmed.strip_suffix("[]") {
            Some(item) => Scalar::parse(item.trim()).map(|scalar| Self {
                scalar,
                array: true,
            }),
            None => Scalar::parse(trimmed).map(|scalar| Self {
                scalar,
                array: false,
            }),
        }
    }
}

fn root_definition(schema: &Value) -> Result<&Map<String, Value>> {
    schema.as_object().ok_or_else(|| {
        Error::Schema(format!(
            "shorthand schema must be an object, got {}",
            value_kind(schema)
        ))
    })
}

fn split_marker(raw: &str) -> (&str, bool) {
    match raw.strip_suffix(OPTIONAL_MARKER) {
        Some(name) => (name, true),
        None => (raw, false),
    }
}

fn fields_of(definition: &Map<String, Value>, parent: &[String]) -> Result<Vec<SchemaField>> {
    let mut fields = Vec::with_capacity(definition.len());
    for (raw_name, child) in definition {
        let (name, optional) = split_marker(raw_name);
        let mut path = parent.to_vec();
        path.push(name.to_owned());

        if name.is_empty() {
            return Err(Error::Schema(format!(
                "empty field name in shorthand schema at '{}'",
                parent.join(".")
            )));
        }

        let node = match child {
            Value::Object(nested) => SchemaNode::Container(fields_of(nested, &path)?),
            Value::String(kind) => {
                if LeafType::parse(kind).is_none() {
                    return Err(Error::Schema(format!(
                        "unknown type '{kind}' for field '{}'",
                        path.join(".")
                    )));
                }
                SchemaNode::Leaf
            }
            other => {
                return Err(Error::Schema(format!(
                    "field '{}' must be a type name or a nested object, got {}",
                    path.join("."),
                    value_kind(other)
                )))
            }
        };

        fields.push(SchemaField {
            name: name.to_owned(),
            optional,
            node,
        });
    }
    Ok(fields)
}

fn check_object(
    definition: &Map<String, Value>,
    input: Option<&Map<String, Value>>,
    path: &mut Vec<String>,
    issues: &mut Vec<ValidationIssue>,
) -> Map<String, Value> {
    let mut output = Map::new();
    for (raw_name, child) in definition {
        let (name, optional) = split_marker(raw_name);
        path.push(name.to_owned());

        let value = input
            .and_then(|map| map.get(name))
            .filter(|value| !value.is_null());
        match (value, child) {
            (None, _) => {
                if !optional {
                    issues.push(issue(path, "required field is missing".to_owned()));
                }
            }
            (Some(Value::Object(map)), Value::Object(nested)) => {
                let checked = check_object(nested, Some(map), path, issues);
                output.insert(name.to_owned(), Value::Object(checked));
            }
            (Some(other), Value::Object(_)) => {
                issues.push(issue(
                    path,
                    format!("expected object, received {}", value_kind(other)),
                ));
            }
            (Some(value), Value::String(kind)) => {
                // fields_of already rejected unknown type names
                if let Some(leaf) = LeafType::parse(kind) {
                    match check_leaf(leaf, value) {
                        Ok(checked) => {
                            output.insert(name.to_owned(), checked);
                        }
                        Err(message) => issues.push(issue(path, message)),
                    }
                }
            }
            (Some(_), _) => {}
        }

        path.pop();
    }
    output
}

fn issue(path: &[String], message: String) -> ValidationIssue {
    ValidationIssue {
        path: pointer_of(path),
        message,
    }
}

fn check_leaf(leaf: LeafType, value: &Value) -> std::result::Result<Value, String> {
    if !leaf.array {
        return check_scalar(leaf.scalar, value);
    }

    let items = match value {
        Value::Array(items) => items.clone(),
        Value::String(text) if text.trim_start().starts_with('[') => {
            match serde_json::from_str::<Value>(text) {
                Ok(Value::Array(items)) => items,
                _ => return Err(format!("expected {}[], received malformed array text", leaf.scalar.label())),
            }
        }
        Value::String(text) if text.trim().is_empty() => Vec::new(),
        Value::String(text) => text
            .split(',')
            .map(|item| Value::String(item.trim().to_owned()))
            .collect(),
        other => {
            return Err(format!(
                "expected {}[], received {}",
                leaf.scalar.label(),
                value_kind(other)
            ))
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            check_scalar(leaf.scalar, item).map_err(|message| format!("item {index}: {message}"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn check_scalar(scalar: Scalar, value: &Value) -> std::result::Result<Value, String> {
    let mismatch = || format!("expected {}, received {}", scalar.label(), value_kind(value));

    match (scalar, value) {
        (Scalar::Any, value) => Ok(value.clone()),
        (Scalar::String, Value::String(_)) => Ok(value.clone()),
        (Scalar::String, Value::Number(number)) => Ok(Value::String(number.to_string())),
        (Scalar::String, Value::Bool(flag)) => Ok(Value::String(flag.to_string())),
        (Scalar::Number, Value::Number(_)) => Ok(value.clone()),
        (Scalar::Number, Value::String(text)) => {
            let trimmed = text.trim();
            if let Ok(integer) = trimmed.parse::<i64>() {
                return Ok(Value::from(integer));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("expected number, received non-numeric string '{text}'"))
        }
        (Scalar::Integer, Value::Number(number)) if number.is_i64() || number.is_u64() => {
            Ok(value.clone())
        }
        (Scalar::Integer, Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected integer, received non-integer string '{text}'")),
        (Scalar::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (Scalar::Boolean, Value::String(text)) => match text.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("expected boolean, received string '{text}'")),
        },
        _ => Err(mismatch()),
    }
}

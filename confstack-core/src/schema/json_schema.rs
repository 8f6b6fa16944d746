use jsonschema::JSONSchema;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::{
    SchemaField, SchemaNode, SchemaProvider, ValidationError, ValidationIssue, ValidationOutcome,
};

pub const NAME: &str = "json-schema";

/// JSON Schema documents validated with the `jsonschema` crate.
///
/// Objects with `properties` become containers, everything else is a leaf.
/// Local `$ref`s are followed; a reference that leads back into the walk that
/// is currently expanding it is rejected as a cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaProvider;

impl SchemaProvider for JsonSchemaProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn introspect(&self, schema: &Value) -> Result<SchemaNode> {
        let mut walker = RefWalker::new(schema);
        match walker.node(schema)? {
            // A bare `{"type": "object"}` root is an object with no declared fields.
            SchemaNode::Leaf if declared_types(walker.follow_refs(schema)?.0).contains(&"object") => {
                Ok(SchemaNode::Container(Vec::new()))
            }
            node => Ok(node),
        }
    }

    fn validate(&self, schema: &Value, input: &Value) -> Result<ValidationOutcome> {
        let compiled = JSONSchema::compile(schema)
            .map_err(|err| Error::Schema(format!("failed to compile JSON schema: {err}")))?;

        let coerced = RefWalker::new(schema).coerce(schema, input.clone());
        let issues = match compiled.validate(&coerced) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|err| ValidationIssue {
                    path: err.instance_path.to_string(),
                    message: err.to_string(),
                })
                .collect::<Vec<_>>(),
        };

        if issues.is_empty() {
            Ok(ValidationOutcome::Valid(coerced))
        } else {
            Ok(ValidationOutcome::Invalid(ValidationError {
                provider: NAME.to_owned(),
                issues,
            }))
        }
    }
}

struct RefWalker<'a> {
    document: &'a Value,
    expanding: Vec<&'a str>,
}

impl<'a> RefWalker<'a> {
    fn new(document: &'a Value) -> Self {
        Self {
            document,
            expanding: Vec::new(),
        }
    }

    fn node(&mut self, schema: &'a Value) -> Result<SchemaNode> {
        let (resolved, pushed) = self.follow_refs(schema)?;

        let node = match resolved.get("properties") {
            Some(Value::Object(properties)) => {
                let required = required_fields(resolved);
                let mut fields = Vec::with_capacity(properties.len());
                for (name, child) in properties {
                    fields.push(SchemaField {
                        name: name.clone(),
                        optional: !required.contains(&name.as_str()),
                        node: self.node(child)?,
                    });
                }
                SchemaNode::Container(fields)
            }
            Some(_) => {
                return Err(Error::Schema(
                    "'properties' must be an object mapping field names to schemas".to_owned(),
                ))
            }
            None => SchemaNode::Leaf,
        };

        self.release(pushed);
        Ok(node)
    }

    fn coerce(&mut self, schema: &'a Value, value: Value) -> Value {
        let Ok((resolved, pushed)) = self.follow_refs(schema) else {
            return value;
        };

        let coerced = match value {
            Value::Object(map) => match resolved.get("properties").and_then(Value::as_object) {
                Some(properties) => Value::Object(
                    map.into_iter()
                        .map(|(key, value)| {
                            let value = match properties.get(&key) {
                                Some(child) => self.coerce(child, value),
                                None => value,
                            };
                            (key, value)
                        })
                        .collect::<Map<String, Value>>(),
                ),
                None => Value::Object(map),
            },
            Value::Array(items) => match resolved.get("items") {
                Some(item_schema) if item_schema.is_object() => Value::Array(
                    items
                        .into_iter()
                        .map(|item| self.coerce(item_schema, item))
                        .collect(),
                ),
                _ => Value::Array(items),
            },
            Value::String(text) => coerce_string(resolved, text),
            other => other,
        };

        self.release(pushed);
        coerced
    }

    /// On error the expansion stack is left as it was on entry.
    fn follow_refs(&mut self, schema: &'a Value) -> Result<(&'a Value, usize)> {
        let start = self.expanding.len();
        let followed = self.expand_refs(schema);
        if followed.is_err() {
            self.expanding.truncate(start);
        }
        followed
    }

    fn expand_refs(&mut self, mut schema: &'a Value) -> Result<(&'a Value, usize)> {
        let mut pushed = 0;
        while let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if self.expanding.contains(&reference) {
                return Err(Error::Schema(format!(
                    "cyclic schema reference '{reference}'"
                )));
            }
            let pointer = reference.strip_prefix('#').ok_or_else(|| {
                Error::Schema(format!(
                    "only document-local references are supported, got '{reference}'"
                ))
            })?;
            schema = self.document.pointer(pointer).ok_or_else(|| {
                Error::Schema(format!("unresolvable schema reference '{reference}'"))
            })?;
            self.expanding.push(reference);
            pushed += 1;
        }
        Ok((schema, pushed))
    }

    fn release(&mut self, pushed: usize) {
        let keep = self.expanding.len().saturating_sub(pushed);
        self.expanding.truncate(keep);
    }
}

fn required_fields(schema: &Value) -> Vec<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(kind)) => vec![kind.as_str()],
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Flat sources only produce strings; convert them when the schema asks for
/// another scalar and the text parses as one.
fn coerce_string(schema: &Value, text: String) -> Value {
    let types = declared_types(schema);
    if types.is_empty() || types.contains(&"string") {
        return Value::String(text);
    }

    let trimmed = text.trim();
    if types.contains(&"integer") || types.contains(&"number") {
        if let Ok(integer) = trimmed.parse::<i64>() {
            return Value::from(integer);
        }
    }
    if types.contains(&"number") {
        if let Some(number) = trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return Value::Number(number);
        }
    }
    if types.contains(&"boolean") {
        match trimmed {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
    }
    if (types.contains(&"array") && trimmed.starts_with('['))
        || (types.contains(&"object") && trimmed.starts_with('{'))
    {
        if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
            return parsed;
        }
    }

    Value::String(text)
}

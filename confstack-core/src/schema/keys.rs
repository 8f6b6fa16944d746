use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{SchemaField, SchemaNode, SchemaProvider};

/// Flat identifier plus object path addressing one schema field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalKey {
    pub key: String,
    pub path: Vec<String>,
    pub is_container: bool,
}

impl LogicalKey {
    pub fn leaf(key: impl Into<String>, path: &[&str]) -> Self {
        Self {
            key: key.into(),
            path: path.iter().map(|segment| (*segment).to_owned()).collect(),
            is_container: false,
        }
    }

    pub fn container(key: impl Into<String>, path: &[&str]) -> Self {
        Self {
            is_container: true,
            ..Self::leaf(key, path)
        }
    }

    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

pub fn derive_keys_for(provider: &dyn SchemaProvider, schema: &Value) -> Result<Vec<LogicalKey>> {
    let root = provider.introspect(schema)?;
    derive_keys(&root)
}

pub fn derive_keys(root: &SchemaNode) -> Result<Vec<LogicalKey>> {
    let SchemaNode::Container(fields) = root else {
        return Err(Error::Schema(
            "schema root must be an object with named fields".to_owned(),
        ));
    };

    let mut deriver = KeyDeriver::default();
    deriver.walk(fields, "", &[])?;
    Ok(deriver.keys)
}

#[derive(Default)]
struct KeyDeriver {
    keys: Vec<LogicalKey>,
    seen: HashSet<String>,
}

impl KeyDeriver {
    fn walk(&mut self, fields: &[SchemaField], parent_key: &str, parent_path: &[String]) -> Result<()> {
        for field in fields {
            let identifier = field.name.as_str();
            if identifier.is_empty() {
                let location = if parent_key.is_empty() { "<root>" } else { parent_key };
                return Err(Error::Schema(format!(
                    "field with an empty name under {location}"
                )));
            }

            let current_key = if parent_key.is_empty() {
                identifier.to_uppercase()
            } else {
                format!("{parent_key}_{}", identifier.to_uppercase())
            };
            let mut current_path = parent_path.to_vec();
            current_path.push(identifier.to_owned());

            if !self.seen.insert(current_key.clone()) {
                return Err(Error::Schema(format!(
                    "field '{}' derives key '{current_key}' which is already taken by another field",
                    current_path.join(".")
                )));
            }

            match &field.node {
                SchemaNode::Container(children) => {
                    self.keys.push(LogicalKey {
                        key: current_key.clone(),
                        path: current_path.clone(),
                        is_container: true,
                    });
                    self.walk(children, &current_key, &current_path)?;
                }
                SchemaNode::Leaf => self.keys.push(LogicalKey {
                    key: current_key,
                    path: current_path,
                    is_container: false,
                }),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{derive_keys, LogicalKey};
    use crate::schema::{SchemaField, SchemaNode};

    fn example_schema() -> SchemaNode {
        SchemaNode::Container(vec![
            SchemaField::container("db", vec![SchemaField::leaf("url")]),
            SchemaField::leaf("port"),
        ])
    }

    #[test]
    fn derives_container_then_leaves_in_declared_order() {
        let keys = derive_keys(&example_schema()).expect("keys should derive");

        assert_eq!(
            keys,
            vec![
                LogicalKey::container("DB", &["db"]),
                LogicalKey::leaf("DB_URL", &["db", "url"]),
                LogicalKey::leaf("PORT", &["port"]),
            ]
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let schema = example_schema();
        let first = derive_keys(&schema).expect("keys should derive");
        let second = derive_keys(&schema).expect("keys should derive");
        assert_eq!(first, second);
    }

    #[test]
    fn keeps_original_case_in_path_and_uppercases_key() {
        let schema = SchemaNode::Container(vec![
            SchemaField::leaf("NODE_ENV"),
            SchemaField::container(
                "nested",
                vec![SchemaField::container(
                    "fooBar",
                    vec![SchemaField::leaf("baz").optional()],
                )],
            ),
        ]);

        let keys = derive_keys(&schema).expect("keys should derive");
        let flat = keys
            .iter()
            .map(|key| (key.key.as_str(), key.dotted_path(), key.is_container))
            .collect::<Vec<_>>();

        assert_eq!(
            flat,
            vec![
                ("NODE_ENV", "NODE_ENV".to_owned(), false),
                ("NESTED", "nested".to_owned(), true),
                ("NESTED_FOOBAR", "nested.fooBar".to_owned(), true),
                ("NESTED_FOOBAR_BAZ", "nested.fooBar.baz".to_owned(), false),
            ]
        );
    }

    #[test]
    fn rejects_leaf_root() {
        let error = derive_keys(&SchemaNode::Leaf).expect_err("leaf root must fail");
        assert!(error.to_string().contains("schema root must be an object"));
    }

    #[test]
    fn rejects_colliding_keys() {
        let schema = SchemaNode::Container(vec![
            SchemaField::leaf("a_b"),
            SchemaField::container("a", vec![SchemaField::leaf("b")]),
        ]);

        let error = derive_keys(&schema).expect_err("collision must fail");
        assert!(error.to_string().contains("already taken"));
    }

    #[test]
    fn rejects_empty_field_names() {
        let schema = SchemaNode::Container(vec![SchemaField::container(
            "db",
            vec![SchemaField::leaf("")],
        )]);

        let error = derive_keys(&schema).expect_err("empty name must fail");
        assert!(error.to_string().contains("empty name under DB"));
    }

    #[test]
    fn empty_container_still_gets_its_own_key() {
        let schema = SchemaNode::Container(vec![SchemaField::container("extra", Vec::new())]);
        let keys = derive_keys(&schema).expect("keys should derive");
        assert_eq!(keys, vec![LogicalKey::container("EXTRA", &["extra"])]);
    }
}

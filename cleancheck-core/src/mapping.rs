//! The private mapping file: original value to substitute, per category.
//!
//! The expected shape is an object of objects with string leaves:
//!
//! ```json
//! { "hostname_map": { "host1.example.com": "host0.obfuscateddomain0.com" },
//!   "ip_map": { "10.0.0.5": "100.0.0.1" } }
//! ```
//!
//! Parsing is permissive so that a malformed category can be reported as a
//! violation next to the empty entries instead of failing the whole check.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use crate::errors::VerifyError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingViolation {
    EmptyKey { category: String },
    EmptyValue { category: String, key: String },
    /// Leaf that is not a string.
    NonStringValue { category: String, key: String },
    /// Category that is not an object.
    NotAnObject { category: String },
}

impl fmt::Display for MappingViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingViolation::EmptyKey { category } => write!(f, "Empty key found in {}", category),
            MappingViolation::EmptyValue { category, key } => {
                write!(f, "{} mapping for '{}' empty", category, key)
            }
            MappingViolation::NonStringValue { category, key } => {
                write!(f, "{} mapping for '{}' is not a string", category, key)
            }
            MappingViolation::NotAnObject { category } => {
                write!(f, "{} is not a mapping object", category)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrivateMap {
    root: Map<String, Value>,
}

impl PrivateMap {
    pub fn load(path: &Path) -> Result<Self, VerifyError> {
        let text = std::fs::read_to_string(path)?;
        let map = Self::parse(&text).map_err(|source| VerifyError::MappingParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded mapping {} with {} categories.", path.display(), map.root.len());
        Ok(map)
    }

    /// Parses mapping JSON. The top level must be an object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let root: Map<String, Value> = serde_json::from_str(text)?;
        Ok(Self { root })
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// Total number of entries across all object categories.
    pub fn len(&self) -> usize {
        self.root
            .values()
            .filter_map(Value::as_object)
            .map(Map::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every empty key, empty value and malformed entry, in key order.
    pub fn empty_entries(&self) -> Vec<MappingViolation> {
        let mut violations = Vec::new();
        for (category, entries) in &self.root {
            let Some(entries) = entries.as_object() else {
                violations.push(MappingViolation::NotAnObject {
                    category: category.clone(),
                });
                continue;
            };
            for (key, value) in entries {
                if key.is_empty() {
                    violations.push(MappingViolation::EmptyKey {
                        category: category.clone(),
                    });
                }
                match value.as_str() {
                    Some("") => violations.push(MappingViolation::EmptyValue {
                        category: category.clone(),
                        key: key.clone(),
                    }),
                    Some(_) => {}
                    None => violations.push(MappingViolation::NonStringValue {
                        category: category.clone(),
                        key: key.clone(),
                    }),
                }
            }
        }
        violations
    }
}

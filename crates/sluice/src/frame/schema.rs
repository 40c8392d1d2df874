//! Ordered column-name to column-type mapping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};

use super::value::ColumnType;

/// The declared schema of a frame: column names mapped to types, in
/// declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: IndexMap<String, ColumnType>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field addition.
    pub fn with_field(mut self, name: impl Into<String>, dtype: ColumnType) -> Self {
        self.fields.insert(name.into(), dtype);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, dtype: ColumnType) {
        self.fields.insert(name.into(), dtype);
    }

    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Merge another schema into this one. A column declared in both with
    /// different types is a conflict.
    pub fn merge(&mut self, other: &Schema) -> Result<()> {
        for (name, dtype) in other.iter() {
            match self.fields.get(name) {
                Some(existing) if *existing != dtype => {
                    return Err(SluiceError::SchemaConflict {
                        column: name.to_string(),
                        message: format!("declared as both {} and {}", existing, dtype),
                    });
                }
                Some(_) => {}
                None => {
                    self.fields.insert(name.to_string(), dtype);
                }
            }
        }
        Ok(())
    }

    /// Non-mutating union of two schemas.
    pub fn union(&self, other: &Schema) -> Result<Schema> {
        let mut merged = self.clone();
        merged.merge(other)?;
        Ok(merged)
    }
}

impl FromIterator<(String, ColumnType)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, ColumnType)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

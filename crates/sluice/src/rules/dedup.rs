//! Perceptual-hash duplicate resolution.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::{ColumnType, Frame, Value};

use super::{ColumnRef, ContextFn, Matcher, Rule};

/// Policy for picking survivors among rows sharing a hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateResolver {
    /// Drop every member of a conflicting group. The conservative default.
    #[default]
    IgnoreAll,
    /// Keep the member(s) with the greatest `mtime`.
    Newest,
    /// Keep the member(s) with the smallest `mtime`.
    Oldest,
    /// Keep the member(s) with the greatest byte `size`.
    Size,
}

impl DuplicateResolver {
    /// The extra column the policy compares on, if any.
    fn tiebreak_column(&self) -> Option<&'static str> {
        match self {
            DuplicateResolver::IgnoreAll => None,
            DuplicateResolver::Newest | DuplicateResolver::Oldest => Some("mtime"),
            DuplicateResolver::Size => Some("size"),
        }
    }

    fn keeps_max(&self) -> bool {
        matches!(self, DuplicateResolver::Newest | DuplicateResolver::Size)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DuplicateConfig {
    resolver: DuplicateResolver,
}

/// Groups candidate rows by `hash` and applies the resolver to every group
/// with more than one member. Needs the context matcher signature because
/// duplicates are a cross-row property.
///
/// Rows with a null hash pass through ungrouped. Ties at the resolver's
/// extreme all survive; a group whose tiebreak column is entirely null
/// keeps nothing, like `ignore_all`.
#[derive(Debug)]
pub struct DuplicateRule {
    resolver: DuplicateResolver,
}

impl DuplicateRule {
    pub const NAME: &'static str = "duplicates";

    pub fn new(resolver: DuplicateResolver) -> Self {
        Self { resolver }
    }

    pub fn from_config(params: &serde_json::Value) -> Result<Box<dyn Rule>> {
        let config: DuplicateConfig = serde_json::from_value(params.clone())
            .map_err(|e| crate::error::SluiceError::Config(format!("duplicates: {}", e)))?;
        Ok(Box::new(Self::new(config.resolver)))
    }

    pub fn default_config() -> serde_json::Value {
        serde_json::json!({ "resolver": "ignore_all" })
    }
}

fn resolve(frame: &Frame, resolver: DuplicateResolver) -> Result<Frame> {
    let hashes = frame.column("hash")?;

    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for row in 0..frame.height() {
        if let Some(Value::Str(hash)) = hashes.get(row) {
            groups.entry(hash).or_default().push(row);
        }
    }

    let mut keep = vec![true; frame.height()];
    for rows in groups.values() {
        if rows.len() < 2 {
            continue;
        }
        match resolver.tiebreak_column() {
            None => {
                for &row in rows {
                    keep[row] = false;
                }
            }
            Some(column) => {
                let tiebreak = frame.column(column)?;
                let mut extreme: Option<Value> = None;
                for &row in rows {
                    let Some(value) = tiebreak.get(row) else {
                        continue;
                    };
                    let wins = match &extreme {
                        None => true,
                        Some(current) => {
                            let ordering = Value::compare(&value, current);
                            if resolver.keeps_max() {
                                matches!(ordering, Some(std::cmp::Ordering::Greater))
                            } else {
                                matches!(ordering, Some(std::cmp::Ordering::Less))
                            }
                        }
                    };
                    if wins {
                        extreme = Some(value);
                    }
                }
                for &row in rows {
                    keep[row] = match (&extreme, tiebreak.get(row)) {
                        (Some(best), Some(value)) => {
                            Value::compare(&value, best)
                                == Some(std::cmp::Ordering::Equal)
                        }
                        _ => false,
                    };
                }
            }
        }
    }

    Ok(frame.filter(&keep))
}

impl Rule for DuplicateRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn requires(&self) -> Vec<ColumnRef> {
        let mut columns = vec![ColumnRef::new("hash", ColumnType::Str)];
        if let Some(extra) = self.resolver.tiebreak_column() {
            columns.push(ColumnRef::untyped(extra));
        }
        columns
    }

    fn matcher(&self) -> Matcher {
        let resolver = self.resolver;
        let func: ContextFn = Arc::new(move |candidates, _full| resolve(candidates, resolver));
        Matcher::Context(func)
    }
}

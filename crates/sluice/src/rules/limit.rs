//! Total-count cap on the surviving set.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Result, SluiceError};

use super::{ColumnRef, ContextFn, Matcher, Rule};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LimitConfig {
    limit: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self { limit: 1000 }
    }
}

/// Keeps only the first `limit` surviving rows, in their current order.
/// Needs the context matcher signature because the cut-off depends on how
/// many rows are left, not on any single row.
#[derive(Debug)]
pub struct LimitRule {
    limit: usize,
}

impl LimitRule {
    pub const NAME: &'static str = "limit";

    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(SluiceError::Config(
                "limit: a zero limit would reject everything".to_string(),
            ));
        }
        Ok(Self { limit })
    }

    pub fn from_config(params: &serde_json::Value) -> Result<Box<dyn Rule>> {
        let config: LimitConfig = serde_json::from_value(params.clone())
            .map_err(|e| SluiceError::Config(format!("limit: {}", e)))?;
        Ok(Box::new(Self::new(config.limit)?))
    }

    pub fn default_config() -> serde_json::Value {
        serde_json::json!({ "limit": 1000 })
    }
}

impl Rule for LimitRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn requires(&self) -> Vec<ColumnRef> {
        Vec::new()
    }

    fn matcher(&self) -> Matcher {
        let limit = self.limit;
        let func: ContextFn = Arc::new(move |candidates, _full| Ok(candidates.head(limit)));
        Matcher::Context(func)
    }
}

//! Modification-time window rule.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{Result, SluiceError};
use crate::frame::{ColumnType, Expr, Value};

use super::{ColumnRef, Matcher, Rule};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModifiedConfig {
    after: Option<String>,
    before: Option<String>,
}

/// Admits rows whose `mtime` falls inside an open `(after, before)` window.
/// At least one bound must be given; `after` later than `before` is a
/// configuration error.
#[derive(Debug)]
pub struct ModifiedRule {
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
}

impl ModifiedRule {
    pub const NAME: &'static str = "modified";

    pub fn new(after: Option<DateTime<Utc>>, before: Option<DateTime<Utc>>) -> Result<Self> {
        match (after, before) {
            (None, None) => {
                return Err(SluiceError::Config(
                    "modified: at least one of 'after'/'before' is required".to_string(),
                ));
            }
            (Some(a), Some(b)) if a > b => {
                return Err(SluiceError::Config(format!(
                    "modified: 'after' ({}) is later than 'before' ({})",
                    a.to_rfc3339(),
                    b.to_rfc3339()
                )));
            }
            _ => {}
        }
        Ok(Self { after, before })
    }

    pub fn from_config(params: &serde_json::Value) -> Result<Box<dyn Rule>> {
        let config: ModifiedConfig = serde_json::from_value(params.clone())
            .map_err(|e| SluiceError::Config(format!("modified: {}", e)))?;
        let after = config.after.as_deref().map(parse_time).transpose()?;
        let before = config.before.as_deref().map(parse_time).transpose()?;
        Ok(Box::new(Self::new(after, before)?))
    }

    pub fn default_config() -> serde_json::Value {
        serde_json::json!({ "after": "1980-01-01", "before": "2100-01-01" })
    }
}

/// Accepts RFC 3339, a bare date, or a bare year.
fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        Some(date)
    } else {
        text.parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
    };
    let date = date.ok_or_else(|| {
        SluiceError::Config(format!("modified: cannot parse timestamp '{}'", text))
    })?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
        SluiceError::Config(format!("modified: cannot parse timestamp '{}'", text))
    })?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

impl Rule for ModifiedRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn requires(&self) -> Vec<ColumnRef> {
        vec![ColumnRef::new("mtime", ColumnType::Timestamp)]
    }

    fn matcher(&self) -> Matcher {
        let mut exprs = Vec::new();
        if let Some(after) = self.after {
            exprs.push(Expr::col("mtime").gt(Expr::lit(Value::from_datetime(after))));
        }
        if let Some(before) = self.before {
            exprs.push(Expr::col("mtime").lt(Expr::lit(Value::from_datetime(before))));
        }
        // The constructor guarantees at least one bound.
        Matcher::Fast(Expr::all(exprs).unwrap_or_else(|_| Expr::lit(true)))
    }
}

//! Path allow/deny list rule.

use serde::Deserialize;

use crate::error::{Result, SluiceError};
use crate::frame::{ColumnType, Expr};
use crate::ledger::PATH_COLUMN;

use super::{ColumnRef, Matcher, Rule};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PathListConfig {
    whitelist: Vec<String>,
    blacklist: Vec<String>,
}

/// Admits rows whose path contains at least one whitelist substring (when a
/// whitelist is given) and none of the blacklist substrings. Both lists
/// empty is a configuration error.
#[derive(Debug)]
pub struct PathListRule {
    whitelist: Vec<String>,
    blacklist: Vec<String>,
}

impl PathListRule {
    pub const NAME: &'static str = "path_list";

    pub fn new(whitelist: Vec<String>, blacklist: Vec<String>) -> Result<Self> {
        if whitelist.is_empty() && blacklist.is_empty() {
            return Err(SluiceError::Config(
                "path_list: whitelist and blacklist cannot both be empty".to_string(),
            ));
        }
        Ok(Self {
            whitelist,
            blacklist,
        })
    }

    pub fn from_config(params: &serde_json::Value) -> Result<Box<dyn Rule>> {
        let config: PathListConfig = serde_json::from_value(params.clone())
            .map_err(|e| SluiceError::Config(format!("path_list: {}", e)))?;
        Ok(Box::new(Self::new(config.whitelist, config.blacklist)?))
    }

    pub fn default_config() -> serde_json::Value {
        serde_json::json!({ "whitelist": [], "blacklist": [] })
    }
}

impl Rule for PathListRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn requires(&self) -> Vec<ColumnRef> {
        vec![ColumnRef::new(PATH_COLUMN, ColumnType::Str)]
    }

    fn matcher(&self) -> Matcher {
        let mut exprs = Vec::new();
        if !self.whitelist.is_empty() {
            let any = self
                .whitelist
                .iter()
                .map(|item| Expr::col(PATH_COLUMN).contains(item.clone()))
                .collect();
            if let Ok(expr) = Expr::any(any) {
                exprs.push(expr);
            }
        }
        for item in &self.blacklist {
            exprs.push(Expr::col(PATH_COLUMN).contains(item.clone()).not());
        }
        // The constructor guarantees at least one list entry.
        Matcher::Fast(Expr::all(exprs).unwrap_or_else(|_| Expr::lit(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, Frame, Value};

    fn frame() -> Frame {
        let paths = ["/data/keep/a.png", "/data/keep/junk_b.png", "/data/other/c.png"]
            .iter()
            .map(|p| Some(Value::from(*p)))
            .collect();
        Frame::from_columns([(
            PATH_COLUMN.to_string(),
            Column::from_values(ColumnType::Str, paths).unwrap(),
        )])
        .unwrap()
    }

    fn mask(rule: &PathListRule) -> Vec<bool> {
        let Matcher::Fast(expr) = rule.matcher() else {
            panic!("expected fast matcher");
        };
        expr.mask(&frame()).unwrap()
    }

    #[test]
    fn test_whitelist_admits_any_match() {
        let rule = PathListRule::new(vec!["/keep/".into(), "/other/".into()], vec![]).unwrap();
        assert_eq!(mask(&rule), vec![true, true, true]);

        let rule = PathListRule::new(vec!["/keep/".into()], vec![]).unwrap();
        assert_eq!(mask(&rule), vec![true, true, false]);
    }

    #[test]
    fn test_blacklist_rejects_matches() {
        let rule = PathListRule::new(vec![], vec!["junk".into()]).unwrap();
        assert_eq!(mask(&rule), vec![true, false, true]);
    }

    #[test]
    fn test_lists_combine() {
        let rule = PathListRule::new(vec!["/keep/".into()], vec!["junk".into()]).unwrap();
        assert_eq!(mask(&rule), vec![true, false, false]);
    }

    #[test]
    fn test_both_empty_is_config_error() {
        assert!(PathListRule::new(vec![], vec![]).is_err());
    }
}

//! Rules - predicate units that admit or reject ledger rows.
//!
//! A rule exposes a matcher of one of two kinds. Fast matchers are pure
//! vectorized expressions over computed columns; the filter engine merges
//! runs of them into a single AND-expression. Context matchers get the
//! whole ledger alongside the surviving candidates, for predicates that
//! need cross-row information such as duplicate resolution.

mod dedup;
mod image;
mod limit;
mod paths;
mod time;

pub use dedup::{DuplicateResolver, DuplicateRule};
// `self::` disambiguates from the `image` crate.
pub use self::image::{ChannelRule, ResolutionRule};
pub use limit::LimitRule;
pub use paths::PathListRule;
pub use time::ModifiedRule;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::frame::{ColumnType, Expr, Frame};

/// A full-table-aware matcher: `(surviving candidates, full ledger)` to a
/// narrowed candidate frame.
pub type ContextFn = Arc<dyn Fn(&Frame, &Frame) -> Result<Frame> + Send + Sync>;

/// How a rule decides which rows pass.
#[derive(Clone)]
pub enum Matcher {
    /// A vectorized expression; mergeable with adjacent fast matchers.
    Fast(Expr),
    /// A function over the candidate frame and the full ledger.
    Context(ContextFn),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Fast(expr) => f.debug_tuple("Fast").field(expr).finish(),
            Matcher::Context(_) => f.write_str("Context(..)"),
        }
    }
}

/// A column a rule reads. Advisory metadata for diagnostics and config
/// tooling; not enforced at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub name: String,
    pub dtype: Option<ColumnType>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype: Some(dtype),
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: None,
        }
    }
}

/// A named predicate over ledger rows.
pub trait Rule: fmt::Debug + Send + Sync {
    /// The configuration keyword this rule registers under.
    fn name(&self) -> &'static str;

    /// Columns the matcher reads.
    fn requires(&self) -> Vec<ColumnRef>;

    /// The matcher deciding which candidate rows pass.
    fn matcher(&self) -> Matcher;
}

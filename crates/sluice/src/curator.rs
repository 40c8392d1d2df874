//! The top-level orchestrator tying the ledger, producers, and rules
//! together.

use std::path::Path;

use tracing::warn;

use crate::error::Result;
use crate::filter::{FilterOptions, filter_paths};
use crate::frame::Schema;
use crate::ledger::Ledger;
use crate::populate::{CancelToken, PopulateOptions, PopulateReport, populate};
use crate::producer::{Producer, ProducerSet};
use crate::rules::Rule;

/// Curates a file collection: ingests discovered paths, fills attribute
/// columns incrementally, and filters the collection through rules.
///
/// Producers and rules are registered in the order they should run; the
/// caller usually builds both from configuration via
/// [`Registry`](crate::Registry).
pub struct Curator {
    ledger: Ledger,
    producers: ProducerSet,
    rules: Vec<Box<dyn Rule>>,
}

impl Curator {
    /// Open a curator over the store at `path` (created on first save).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_ledger(Ledger::load(path)?))
    }

    /// A curator with no backing file, for tests and one-shot runs.
    pub fn in_memory() -> Self {
        Self::with_ledger(Ledger::in_memory())
    }

    fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger,
            producers: ProducerSet::new(),
            rules: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Register a producer. Declaring a column another producer already
    /// owns is a schema conflict.
    pub fn add_producer(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        self.producers.add(producer)
    }

    /// Register a producer that takes over columns an earlier producer
    /// declared.
    pub fn add_producer_overwriting(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        self.producers.add_overwriting(producer)
    }

    /// Register a rule. An unmet requirement only warns: `requires` is
    /// advisory, and the column may exist from an earlier run.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        for required in rule.requires() {
            if !self.producers.supplies(&required.name)
                && !self.ledger.frame().has_column(&required.name)
            {
                warn!(
                    rule = rule.name(),
                    column = %required.name,
                    "no registered producer supplies a required column"
                );
            }
        }
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    /// The union of the ledger's current schema and every registered
    /// producer's declared columns.
    pub fn declared_schema(&self) -> Result<Schema> {
        self.ledger.schema().union(&self.producers.schema())
    }

    /// Ingest discovered paths; returns whether anything new was added.
    pub fn add_paths<I, S>(&mut self, paths: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ledger.add_paths(paths)
    }

    /// Fill missing attribute columns. See [`populate`](crate::populate()).
    pub fn populate(
        &mut self,
        options: &PopulateOptions,
        cancel: &CancelToken,
    ) -> Result<PopulateReport> {
        populate(&mut self.ledger, &self.producers, options, cancel)
    }

    /// Narrow `candidates` through the registered rules. See
    /// [`filter_paths`](crate::filter_paths).
    pub fn filter(&self, candidates: &[String], options: &FilterOptions) -> Result<Vec<String>> {
        filter_paths(&self.ledger, &self.rules, candidates, options)
    }

    /// Flush the ledger to its backing store.
    pub fn save(&self) -> Result<()> {
        self.ledger.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColumnType, Value};
    use crate::ledger::PATH_COLUMN;
    use crate::producer::{Stage, StageOutput};
    use std::sync::Arc;

    #[derive(Debug)]
    struct PathLenProducer;
    impl Producer for PathLenProducer {
        fn name(&self) -> &'static str {
            "path_len"
        }
        fn produces(&self) -> Schema {
            Schema::new().with_field("path_len", ColumnType::Int)
        }
        fn stages(&self) -> Vec<Stage> {
            vec![Stage::new(vec![StageOutput::new(
                "path_len",
                ColumnType::Int,
                &[PATH_COLUMN],
                Arc::new(|view| Ok(Some(Value::Int(view.path()?.len() as i64)))),
            )])]
        }
    }

    #[test]
    fn test_end_to_end_in_memory() {
        let mut curator = Curator::in_memory();
        curator.add_producer(Box::new(PathLenProducer)).unwrap();
        curator.add_paths(["aa.png", "b.png"]).unwrap();
        curator
            .populate(&PopulateOptions::default(), &CancelToken::new())
            .unwrap();

        let kept = curator
            .filter(
                &["aa.png".to_string(), "b.png".to_string()],
                &FilterOptions::default(),
            )
            .unwrap();
        assert_eq!(kept, vec!["aa.png".to_string(), "b.png".to_string()]);

        let row = curator.ledger().row("aa.png").unwrap();
        assert_eq!(row.get("path_len"), Some(&Some(Value::Int(6))));
    }

    #[test]
    fn test_conflicting_producers_are_rejected() {
        let mut curator = Curator::in_memory();
        curator.add_producer(Box::new(PathLenProducer)).unwrap();
        assert!(curator.add_producer(Box::new(PathLenProducer)).is_err());
        curator
            .add_producer_overwriting(Box::new(PathLenProducer))
            .unwrap();
    }
}

//! Producers - named units that compute and fill ledger columns.
//!
//! A producer declares the columns it `produces` and an ordered pipeline of
//! stages that fill them. Splitting a producer into stages lets one
//! expensive per-file operation (a stat call, an image decode) land in an
//! intermediate struct column that later stages project into scalar columns
//! without repeating the IO.

mod file_info;
mod image_hash;
mod image_shape;

pub use file_info::FileInfoProducer;
pub use image_hash::{HashAlgorithm, ImageHashProducer};
pub use image_shape::ImageShapeProducer;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Result, SluiceError};
use crate::frame::{ColumnType, Frame, Schema, Value};
use crate::ledger::PATH_COLUMN;

/// One row of a chunk as seen by a stage computation.
pub struct RowView<'a> {
    frame: &'a Frame,
    row: usize,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(frame: &'a Frame, row: usize) -> Self {
        Self { frame, row }
    }

    /// The row's path. Every chunk carries the key column.
    pub fn path(&self) -> Result<String> {
        match self.frame.get(PATH_COLUMN, self.row) {
            Some(Value::Str(path)) => Ok(path),
            _ => Err(SluiceError::row("row has no path")),
        }
    }

    /// A cell of this row; `Ok(None)` for a null slot. The column must
    /// exist in the chunk (the path column or an earlier stage's output).
    pub fn value(&self, column: &str) -> Result<Option<Value>> {
        Ok(self.frame.column(column)?.get(self.row))
    }
}

/// A stage computation: reads one row, returns the cell value for the
/// stage's output column. `Ok(None)` is a genuine null, not a failure.
pub type StageFn = Arc<dyn Fn(&RowView<'_>) -> Result<Option<Value>> + Send + Sync>;

/// One output column of a stage.
#[derive(Clone)]
pub struct StageOutput {
    pub column: String,
    pub dtype: ColumnType,
    /// Columns the computation reads: the path column and/or outputs of
    /// earlier stages. Lets the engine prune intermediates nothing needs.
    pub inputs: Vec<String>,
    pub compute: StageFn,
}

impl StageOutput {
    pub fn new(
        column: impl Into<String>,
        dtype: ColumnType,
        inputs: &[&str],
        compute: StageFn,
    ) -> Self {
        Self {
            column: column.into(),
            dtype,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            compute,
        }
    }
}

impl fmt::Debug for StageOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageOutput")
            .field("column", &self.column)
            .field("dtype", &self.dtype)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// A pipeline step: the columns computed together at this position.
#[derive(Debug, Clone, Default)]
pub struct Stage {
    pub outputs: Vec<StageOutput>,
}

impl Stage {
    pub fn new(outputs: Vec<StageOutput>) -> Self {
        Self { outputs }
    }
}

/// A named unit that computes one or more ledger columns.
pub trait Producer: fmt::Debug + Send + Sync {
    /// The configuration keyword this producer registers under.
    fn name(&self) -> &'static str;

    /// The columns this producer fills, with their types. Intermediate
    /// stage outputs are not part of this schema; they are projected away
    /// after the final stage.
    fn produces(&self) -> Schema;

    /// The ordered computation pipeline.
    fn stages(&self) -> Vec<Stage>;
}

/// The set of active producers, with column-ownership conflict checking.
#[derive(Default)]
pub struct ProducerSet {
    producers: Vec<Box<dyn Producer>>,
    /// Column name to owning producer name.
    owners: IndexMap<String, String>,
}

impl ProducerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Producer> {
        self.producers.iter().map(|p| p.as_ref())
    }

    /// Whether some registered producer declares this column.
    pub fn supplies(&self, column: &str) -> bool {
        self.owners.contains_key(column)
    }

    /// Add a producer; a column already declared by another producer is a
    /// schema conflict.
    pub fn add(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        self.insert(producer, false)
    }

    /// Add a producer, explicitly allowing it to take over columns another
    /// producer declared. The later producer's stages win.
    pub fn add_overwriting(&mut self, producer: Box<dyn Producer>) -> Result<()> {
        self.insert(producer, true)
    }

    fn insert(&mut self, producer: Box<dyn Producer>, allow_overwrite: bool) -> Result<()> {
        validate_stages(producer.as_ref())?;
        let name = producer.name().to_string();
        for (column, _) in producer.produces().iter() {
            if let Some(existing) = self.owners.get(column) {
                if !allow_overwrite {
                    return Err(SluiceError::SchemaConflict {
                        column: column.to_string(),
                        message: format!(
                            "already produced by '{}' (requested by '{}')",
                            existing, name
                        ),
                    });
                }
            }
            self.owners.insert(column.to_string(), name.clone());
        }
        self.producers.push(producer);
        Ok(())
    }

    /// Union of every producer's declared columns.
    pub fn schema(&self) -> Schema {
        let mut schema = Schema::new();
        for producer in &self.producers {
            for (name, dtype) in producer.produces().iter() {
                schema.insert(name, dtype);
            }
        }
        schema
    }

    /// Merge all producers' pipelines by stage position: stage `i` of the
    /// combined pipeline holds every producer's stage-`i` outputs. When two
    /// producers emit the same column at the same position (overwrite
    /// registration), the later one wins.
    pub fn combined_stages(&self) -> Vec<Stage> {
        let mut merged: Vec<IndexMap<String, StageOutput>> = Vec::new();
        for producer in &self.producers {
            for (position, stage) in producer.stages().into_iter().enumerate() {
                if merged.len() <= position {
                    merged.resize_with(position + 1, IndexMap::new);
                }
                for output in stage.outputs {
                    merged[position].insert(output.column.clone(), output);
                }
            }
        }
        merged
            .into_iter()
            .map(|outputs| Stage::new(outputs.into_values().collect()))
            .collect()
    }
}

/// Check the stage invariants: declared `produces` must equal the union of
/// the final stage's output columns, with matching types, and every stage
/// input must be the path column or an earlier output.
fn validate_stages(producer: &dyn Producer) -> Result<()> {
    let stages = producer.stages();
    let produces = producer.produces();
    let name = producer.name();

    let last = stages.last().ok_or_else(|| {
        SluiceError::Config(format!("producer '{}' declares no stages", name))
    })?;

    let mut final_columns: HashSet<&str> = HashSet::new();
    for output in &last.outputs {
        final_columns.insert(output.column.as_str());
        match produces.get(&output.column) {
            Some(declared) if declared == output.dtype => {}
            Some(declared) => {
                return Err(SluiceError::Config(format!(
                    "producer '{}' declares column '{}' as {} but its final stage emits {}",
                    name, output.column, declared, output.dtype
                )));
            }
            None => {
                return Err(SluiceError::Config(format!(
                    "producer '{}' emits undeclared column '{}' in its final stage",
                    name, output.column
                )));
            }
        }
    }
    for declared in produces.names() {
        if !final_columns.contains(declared) {
            return Err(SluiceError::Config(format!(
                "producer '{}' declares column '{}' but its final stage never emits it",
                name, declared
            )));
        }
    }

    let mut available: HashSet<String> = HashSet::from([PATH_COLUMN.to_string()]);
    for stage in &stages {
        for output in &stage.outputs {
            for input in &output.inputs {
                if !available.contains(input) {
                    return Err(SluiceError::Config(format!(
                        "producer '{}': column '{}' reads '{}' before any stage produces it",
                        name, output.column, input
                    )));
                }
            }
        }
        for output in &stage.outputs {
            available.insert(output.column.clone());
        }
    }

    Ok(())
}

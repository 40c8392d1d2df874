//! The persistent, path-keyed attribute table.

mod store;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::frame::{Column, ColumnType, Frame, Schema, Value};

/// Name of the key column every ledger carries.
pub const PATH_COLUMN: &str = "path";

/// The ledger: one row per known file, keyed by absolute path, holding every
/// computed attribute column.
///
/// A ledger loads at construction (an absent store file starts empty with
/// the base `{path}` schema), grows monotonically - columns are only ever
/// added and backfilled, never removed - and is flushed to disk at
/// checkpoints and on explicit [`Ledger::save`].
#[derive(Debug)]
pub struct Ledger {
    frame: Frame,
    store_path: Option<PathBuf>,
}

impl Ledger {
    /// The schema every ledger starts from.
    pub fn base_schema() -> Schema {
        Schema::new().with_field(PATH_COLUMN, ColumnType::Str)
    }

    /// Open a ledger backed by `path`. Reads the persisted store if present;
    /// otherwise starts empty. An unreadable existing file is a fatal
    /// [`CorruptStore`](crate::SluiceError::CorruptStore).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let frame = match store::load_frame(path)? {
            Some(frame) => {
                // Older stores may lack newer columns; the key column
                // itself is non-negotiable.
                if frame.column_opt(PATH_COLUMN).map(|c| c.dtype())
                    != Some(ColumnType::Str)
                {
                    return Err(crate::error::SluiceError::CorruptStore {
                        path: path.to_path_buf(),
                        message: "store has no path column".to_string(),
                    });
                }
                debug!(rows = frame.height(), store = %path.display(), "loaded ledger");
                frame
            }
            None => Frame::empty(&Self::base_schema()),
        };
        Ok(Self {
            frame,
            store_path: Some(path.to_path_buf()),
        })
    }

    /// A ledger with no backing file. Checkpoints skip persistence.
    pub fn in_memory() -> Self {
        Self {
            frame: Frame::empty(&Self::base_schema()),
            store_path: None,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.store_path.is_some()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn schema(&self) -> Schema {
        self.frame.schema()
    }

    /// All known paths, in row order.
    pub fn paths(&self) -> Result<Vec<String>> {
        let col = self.frame.column(PATH_COLUMN)?;
        Ok((0..col.len())
            .filter_map(|i| col.get(i).and_then(|v| v.as_str().map(String::from)))
            .collect())
    }

    /// Map from path to row index.
    pub(crate) fn path_index(&self) -> Result<HashMap<String, usize>> {
        let col = self.frame.column(PATH_COLUMN)?;
        let mut index = HashMap::with_capacity(col.len());
        for row in 0..col.len() {
            if let Some(Value::Str(path)) = col.get(row) {
                index.insert(path, row);
            }
        }
        Ok(index)
    }

    /// Insert any paths not already present, null-filling every other
    /// column. Existing rows are never touched. Returns whether anything
    /// was inserted; calling twice with the same set is a no-op the second
    /// time.
    pub fn add_paths<I, S>(&mut self, paths: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: HashSet<String> = self.paths()?.into_iter().collect();
        let mut fresh: Vec<Option<Value>> = Vec::new();
        for path in paths {
            let path = path.into();
            if seen.insert(path.clone()) {
                fresh.push(Some(Value::Str(path)));
            }
        }
        if fresh.is_empty() {
            return Ok(false);
        }

        debug!(new_rows = fresh.len(), "ingesting paths");
        let incoming = Frame::from_columns([(
            PATH_COLUMN.to_string(),
            Column::from_values(ColumnType::Str, fresh)?,
        )])?;
        self.frame.append(&incoming)?;
        Ok(true)
    }

    /// Non-destructively extend the table so every declared column exists.
    /// Idempotent.
    pub fn comply_to_schema(&mut self, schema: &Schema) -> Result<()> {
        self.frame.align_to(schema)
    }

    /// Row indices where at least one of the given columns is null.
    /// Columns the ledger does not hold yet count as null everywhere.
    pub fn unfinished_indices(&self, schema: &Schema) -> Vec<usize> {
        let mut any_missing = false;
        let tracked: Vec<&Column> = schema
            .names()
            .filter_map(|name| {
                let col = self.frame.column_opt(name);
                if col.is_none() {
                    any_missing = true;
                }
                col
            })
            .collect();

        (0..self.frame.height())
            .filter(|&row| any_missing || tracked.iter().any(|col| col.is_null(row)))
            .collect()
    }

    /// Merge a computed chunk back in by path-keyed upsert: non-null
    /// incoming cells overwrite, incoming nulls never erase computed
    /// values, and unknown paths are appended. Re-merging the same chunk is
    /// idempotent.
    pub fn merge_chunk(&mut self, chunk: &Frame) -> Result<()> {
        let target = self.frame.schema().union(&chunk.schema())?;
        self.frame.align_to(&target)?;

        let index = self.path_index()?;
        let mut appended: Vec<usize> = Vec::new();
        for row in 0..chunk.height() {
            let path = match chunk.get(PATH_COLUMN, row) {
                Some(Value::Str(p)) => p,
                _ => {
                    return Err(crate::error::SluiceError::Frame(
                        "chunk row has no path".to_string(),
                    ));
                }
            };
            match index.get(&path) {
                Some(&at) => {
                    for name in chunk.column_names() {
                        if name == PATH_COLUMN {
                            continue;
                        }
                        if let Some(value) = chunk.get(name, row) {
                            self.frame.set(name, at, Some(value))?;
                        }
                    }
                }
                None => appended.push(row),
            }
        }

        if !appended.is_empty() {
            let extra = chunk.take(&appended);
            self.frame.append(&extra)?;
        }
        Ok(())
    }

    /// Flush to the backing store. A no-op error for in-memory ledgers.
    pub fn save(&self) -> Result<()> {
        match &self.store_path {
            Some(path) => store::save_frame(path, &self.frame),
            None => Err(crate::error::SluiceError::Config(
                "cannot save an in-memory ledger".to_string(),
            )),
        }
    }

    /// Read access to one row's attributes, for the output stage.
    pub fn row(&self, path: &str) -> Option<IndexMap<String, Option<Value>>> {
        let index = self.path_index().ok()?;
        index.get(path).map(|&row| self.frame.row_values(row))
    }
}

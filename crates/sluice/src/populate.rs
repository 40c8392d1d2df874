//! The population engine: incremental, checkpointed column computation.
//!
//! The engine finds rows with missing attribute values, groups them by
//! *null signature* (exactly which tracked columns are still null), prunes
//! each group's stage pipeline down to what that group actually needs, and
//! processes the groups in fixed-size chunks. Completed chunks accumulate
//! and are periodically merged back into the ledger and flushed to disk, so
//! a crash only ever costs the work since the last checkpoint.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::frame::{Column, Frame, Schema, Value};
use crate::ledger::{Ledger, PATH_COLUMN};
use crate::producer::{ProducerSet, RowView, Stage};

/// Tuning for a populate run. All externally supplied; the defaults are
/// documented fallbacks, not policy baked into the engine.
#[derive(Debug, Clone)]
pub struct PopulateOptions {
    /// Rows per chunk.
    pub chunk_size: usize,
    /// Checkpoint after this many completed chunks.
    pub checkpoint_chunks: usize,
    /// Checkpoint after this much wall-clock time, whichever comes first.
    pub checkpoint_interval: Duration,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            checkpoint_chunks: 8,
            checkpoint_interval: Duration::from_secs(60),
        }
    }
}

/// One failed cell computation. The cell stays null and the run continues.
#[derive(Debug, Clone)]
pub struct RowFailure {
    pub path: String,
    pub column: String,
    pub message: String,
}

/// What a populate run accomplished.
#[derive(Debug, Clone, Default)]
pub struct PopulateReport {
    /// Rows pushed through the pipeline (some cells may have failed).
    pub rows_processed: usize,
    pub chunks_completed: usize,
    /// Checkpoints flushed before the final merge.
    pub checkpoints: usize,
    /// True when the run stopped at a cancellation signal. Accumulated
    /// work was still merged and saved.
    pub cancelled: bool,
    pub failures: Vec<RowFailure>,
}

impl PopulateReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Cooperative cancellation flag, polled between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fill every missing producer column in the ledger.
///
/// Runs to completion (or cancellation), checkpointing along the way, and
/// unconditionally merges and saves whatever finished. Per-row computation
/// failures leave the cell null and are reported, never propagated.
pub fn populate(
    ledger: &mut Ledger,
    producers: &ProducerSet,
    options: &PopulateOptions,
    cancel: &CancelToken,
) -> Result<PopulateReport> {
    let mut report = PopulateReport::default();

    let target_schema = ledger.schema().union(&producers.schema())?;
    ledger.comply_to_schema(&target_schema)?;

    let unfinished = ledger.unfinished_indices(&target_schema);
    if unfinished.is_empty() {
        debug!("ledger is fully populated");
        return Ok(report);
    }
    info!(rows = unfinished.len(), "populating unfinished rows");

    let all_stages = producers.combined_stages();
    let tracked: Vec<String> = target_schema.names().map(String::from).collect();
    let chunk_size = options.chunk_size.max(1);

    let mut accumulated: Vec<Frame> = Vec::new();
    let mut chunks_since_flush = 0usize;
    let mut last_flush = Instant::now();

    for (signature, rows) in signature_groups(ledger.frame(), &tracked, &unfinished) {
        let filled: HashSet<&str> = tracked
            .iter()
            .zip(&signature)
            .filter(|(_, is_null)| !**is_null)
            .map(|(name, _)| name.as_str())
            .collect();
        let stages = prune_stages(&all_stages, &filled, &target_schema);
        if stages.is_empty() {
            // Nulls with no producer to fill them (e.g. a column whose
            // producer is no longer registered). Nothing to run.
            continue;
        }

        for chunk_rows in rows.chunks(chunk_size) {
            if cancel.is_cancelled() {
                warn!("cancellation requested; flushing accumulated chunks");
                flush(ledger, &mut accumulated)?;
                report.cancelled = true;
                return Ok(report);
            }

            let chunk = ledger.frame().take(chunk_rows);
            let done = run_stages(&chunk, &stages, &target_schema, &mut report)?;
            report.rows_processed += done.height();
            report.chunks_completed += 1;
            accumulated.push(done);
            chunks_since_flush += 1;

            if chunks_since_flush >= options.checkpoint_chunks.max(1)
                || last_flush.elapsed() >= options.checkpoint_interval
            {
                flush(ledger, &mut accumulated)?;
                report.checkpoints += 1;
                chunks_since_flush = 0;
                last_flush = Instant::now();
            }
        }
    }

    flush(ledger, &mut accumulated)?;
    if !report.failures.is_empty() {
        warn!(
            failed_cells = report.failures.len(),
            "some attribute computations failed; cells left null"
        );
    }
    Ok(report)
}

/// Merge accumulated chunks into the ledger and persist.
fn flush(ledger: &mut Ledger, accumulated: &mut Vec<Frame>) -> Result<()> {
    for chunk in accumulated.drain(..) {
        ledger.merge_chunk(&chunk)?;
    }
    if ledger.is_persistent() {
        ledger.save()?;
        debug!(rows = ledger.height(), "checkpointed ledger");
    }
    Ok(())
}

/// Partition rows by the exact tuple of "is this tracked column null".
/// Rows sharing a signature need exactly the same stage subset re-run.
fn signature_groups(
    frame: &Frame,
    tracked: &[String],
    rows: &[usize],
) -> IndexMap<Vec<bool>, Vec<usize>> {
    let columns: Vec<Option<&Column>> = tracked
        .iter()
        .map(|name| frame.column_opt(name))
        .collect();

    let mut groups: IndexMap<Vec<bool>, Vec<usize>> = IndexMap::new();
    for &row in rows {
        let signature: Vec<bool> = columns
            .iter()
            .map(|col| col.map(|c| c.is_null(row)).unwrap_or(true))
            .collect();
        groups.entry(signature).or_default().push(row);
    }
    groups
}

/// Drop stage outputs a signature group does not need: target columns the
/// group already has (the blacklist-by-signature optimization), and
/// intermediates no surviving later output consumes.
fn prune_stages(stages: &[Stage], filled: &HashSet<&str>, target: &Schema) -> Vec<Stage> {
    let mut kept_reversed: Vec<Vec<crate::producer::StageOutput>> = Vec::new();
    let mut needed: HashSet<String> = HashSet::new();

    for stage in stages.iter().rev() {
        let kept: Vec<_> = stage
            .outputs
            .iter()
            .filter(|out| {
                let missing_target =
                    target.contains(&out.column) && !filled.contains(out.column.as_str());
                missing_target || needed.contains(&out.column)
            })
            .cloned()
            .collect();

        for out in &kept {
            needed.remove(&out.column);
        }
        for out in &kept {
            for input in &out.inputs {
                if input != PATH_COLUMN && !filled.contains(input.as_str()) {
                    needed.insert(input.clone());
                }
            }
        }
        kept_reversed.push(kept);
    }

    kept_reversed
        .into_iter()
        .rev()
        .filter(|outputs| !outputs.is_empty())
        .map(|outputs| Stage { outputs })
        .collect()
}

/// Run a pruned pipeline over one chunk and project the result onto the
/// target schema. Cell failures are recorded and leave nulls behind.
fn run_stages(
    chunk: &Frame,
    stages: &[Stage],
    target: &Schema,
    report: &mut PopulateReport,
) -> Result<Frame> {
    let mut scratch = chunk.clone();
    let height = scratch.height();

    for stage in stages {
        let mut computed: Vec<(String, Column)> = Vec::with_capacity(stage.outputs.len());
        for output in &stage.outputs {
            let mut values: Vec<Option<Value>> = Vec::with_capacity(height);
            for row in 0..height {
                let view = RowView::new(&scratch, row);
                match (output.compute)(&view) {
                    Ok(value) => values.push(value),
                    Err(error) => {
                        let path = scratch
                            .get(PATH_COLUMN, row)
                            .and_then(|v| v.as_str().map(String::from))
                            .unwrap_or_default();
                        report.failures.push(RowFailure {
                            path,
                            column: output.column.clone(),
                            message: error.to_string(),
                        });
                        values.push(None);
                    }
                }
            }
            computed.push((output.column.clone(), Column::from_values(output.dtype, values)?));
        }
        // Stage outputs land together so one output never observes a
        // sibling from the same stage.
        for (name, column) in computed {
            scratch.replace_column(name, column)?;
        }
    }

    scratch.select(target)
}

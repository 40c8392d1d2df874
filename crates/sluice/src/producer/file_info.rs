//! Filesystem metadata producer: byte size and stat timestamps.

use std::fs;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use crate::error::{Result, SluiceError};
use crate::frame::{ColumnType, Schema, Value};
use crate::ledger::PATH_COLUMN;

use super::{Producer, RowView, Stage, StageOutput};

/// Intermediate column holding the raw stat result for a row.
const STAT_COLUMN: &str = "stat";

/// Produces `size`, `mtime`, `atime`, and `ctime` from one stat call per
/// file. The first stage lands the composite result in an intermediate
/// struct column; the second projects its fields, so adding another stat
/// field never costs a second syscall.
#[derive(Debug, Default)]
pub struct FileInfoProducer;

impl FileInfoProducer {
    pub const NAME: &'static str = "file_info";

    pub fn new() -> Self {
        Self
    }

    pub fn from_config(_params: &serde_json::Value) -> Result<Box<dyn Producer>> {
        Ok(Box::new(Self::new()))
    }

    pub fn default_config() -> serde_json::Value {
        serde_json::json!({})
    }
}

fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

/// Inode change time on Unix, creation time elsewhere.
#[cfg(unix)]
fn change_time_millis(meta: &fs::Metadata) -> Option<i64> {
    use std::os::unix::fs::MetadataExt;
    Some(meta.ctime() * 1000 + meta.ctime_nsec() / 1_000_000)
}

#[cfg(not(unix))]
fn change_time_millis(meta: &fs::Metadata) -> Option<i64> {
    meta.created().ok().map(epoch_millis)
}

fn stat_row(view: &RowView<'_>) -> Result<Option<Value>> {
    let path = view.path()?;
    let meta = fs::metadata(&path)
        .map_err(|e| SluiceError::row(format!("stat '{}': {}", path, e)))?;

    let mtime = meta
        .modified()
        .map_err(|e| SluiceError::row(format!("stat '{}': {}", path, e)))?;
    let atime = meta
        .accessed()
        .map_err(|e| SluiceError::row(format!("stat '{}': {}", path, e)))?;

    let mut fields = IndexMap::new();
    fields.insert("size".to_string(), Value::Int(meta.len() as i64));
    fields.insert("mtime".to_string(), Value::Timestamp(epoch_millis(mtime)));
    fields.insert("atime".to_string(), Value::Timestamp(epoch_millis(atime)));
    if let Some(ctime) = change_time_millis(&meta) {
        fields.insert("ctime".to_string(), Value::Timestamp(ctime));
    }
    Ok(Some(Value::Struct(fields)))
}

fn project(field: &'static str) -> super::StageFn {
    Arc::new(move |view| {
        let Some(stat) = view.value(STAT_COLUMN)? else {
            return Ok(None);
        };
        Ok(stat.field(field).cloned())
    })
}

impl Producer for FileInfoProducer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn produces(&self) -> Schema {
        Schema::new()
            .with_field("size", ColumnType::Int)
            .with_field("mtime", ColumnType::Timestamp)
            .with_field("atime", ColumnType::Timestamp)
            .with_field("ctime", ColumnType::Timestamp)
    }

    fn stages(&self) -> Vec<Stage> {
        vec![
            Stage::new(vec![StageOutput::new(
                STAT_COLUMN,
                ColumnType::Struct,
                &[PATH_COLUMN],
                Arc::new(stat_row),
            )]),
            Stage::new(vec![
                StageOutput::new("size", ColumnType::Int, &[STAT_COLUMN], project("size")),
                StageOutput::new(
                    "mtime",
                    ColumnType::Timestamp,
                    &[STAT_COLUMN],
                    project("mtime"),
                ),
                StageOutput::new(
                    "atime",
                    ColumnType::Timestamp,
                    &[STAT_COLUMN],
                    project("atime"),
                ),
                StageOutput::new(
                    "ctime",
                    ColumnType::Timestamp,
                    &[STAT_COLUMN],
                    project("ctime"),
                ),
            ]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, Frame};
    use std::io::Write;

    #[test]
    fn test_stat_row_reads_real_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let frame = Frame::from_columns([(
            PATH_COLUMN.to_string(),
            Column::from_values(ColumnType::Str, vec![Some(Value::Str(path))]).unwrap(),
        )])
        .unwrap();

        let stat = stat_row(&RowView::new(&frame, 0)).unwrap().unwrap();
        assert_eq!(stat.field("size"), Some(&Value::Int(5)));
        assert!(matches!(stat.field("mtime"), Some(Value::Timestamp(_))));
    }

    #[test]
    fn test_missing_file_is_row_error() {
        let frame = Frame::from_columns([(
            PATH_COLUMN.to_string(),
            Column::from_values(
                ColumnType::Str,
                vec![Some(Value::from("/definitely/not/here.png"))],
            )
            .unwrap(),
        )])
        .unwrap();

        let err = stat_row(&RowView::new(&frame, 0)).unwrap_err();
        assert!(matches!(err, SluiceError::Row(_)));
    }

    #[test]
    fn test_projection_passes_null_through() {
        let frame = Frame::from_columns([
            (
                PATH_COLUMN.to_string(),
                Column::from_values(ColumnType::Str, vec![Some(Value::from("a.png"))]).unwrap(),
            ),
            (
                STAT_COLUMN.to_string(),
                Column::nulls(ColumnType::Struct, 1),
            ),
        ])
        .unwrap();

        let value = project("size")(&RowView::new(&frame, 0)).unwrap();
        assert_eq!(value, None);
    }
}

//! Image dimension producer: width, height, and channel count.

use std::sync::Arc;

use image::GenericImageView;
use indexmap::IndexMap;

use crate::error::{Result, SluiceError};
use crate::frame::{ColumnType, Schema, Value};
use crate::ledger::PATH_COLUMN;

use super::{Producer, RowView, Stage, StageOutput};

const SHAPE_COLUMN: &str = "shape";

/// Produces `width`, `height`, and `channels` from one image decode per
/// file, following the same composite-then-project pattern as the stat
/// producer.
#[derive(Debug, Default)]
pub struct ImageShapeProducer;

impl ImageShapeProducer {
    pub const NAME: &'static str = "image_shape";

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

fn shape_row(view: &RowView<'_>) -> Result<Option<Value>> {
    let path = view.path()?;
    let img = image::open(&path)
        .map_err(|e| SluiceError::row(format!("decode '{}': {}", path, e)))?;
    let (width, height) = img.dimensions();

    let mut fields = IndexMap::new();
    fields.insert("width".to_string(), Value::Int(width as i64));
    fields.insert("height".to_string(), Value::Int(height as i64));
    fields.insert(
        "channels".to_string(),
        Value::Int(img.color().channel_count() as i64),
    );
    Ok(Some(Value::Struct(fields)))
}

fn project(field: &'static str) -> super::StageFn {
    Arc::new(move |view| {
        let Some(shape) = view.value(SHAPE_COLUMN)? else {
            return Ok(None);
        };
        Ok(shape.field(field).cloned())
    })
}

impl Producer for ImageShapeProducer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn produces(&self) -> Schema {
        Schema::new()
            .with_field("width", ColumnType::Int)
            .with_field("height", ColumnType::Int)
            .with_field("channels", ColumnType::Int)
    }

    fn stages(&self) -> Vec<Stage> {
        vec![
            Stage::new(vec![StageOutput::new(
                SHAPE_COLUMN,
                ColumnType::Struct,
                &[PATH_COLUMN],
                Arc::new(shape_row),
            )]),
            Stage::new(vec![
                StageOutput::new("width", ColumnType::Int, &[SHAPE_COLUMN], project("width")),
                StageOutput::new(
                    "height",
                    ColumnType::Int,
                    &[SHAPE_COLUMN],
                    project("height"),
                ),
                StageOutput::new(
                    "channels",
                    ColumnType::Int,
                    &[SHAPE_COLUMN],
                    project("channels"),
                ),
            ]),
        ]
    }
}

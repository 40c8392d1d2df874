//! The in-memory columnar table.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};

use super::column::Column;
use super::schema::Schema;
use super::value::{ColumnType, Value};

/// An ordered collection of equal-length named columns.
///
/// All ledger state and every chunk passed through the population engine is
/// a `Frame`. Operations are whole-table transformations; there is no
/// internal locking and no partial mutation mid-operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: IndexMap<String, Column>,
    height: usize,
}

impl Frame {
    /// An empty frame carrying the given schema.
    pub fn empty(schema: &Schema) -> Self {
        let columns = schema
            .iter()
            .map(|(name, dtype)| (name.to_string(), Column::empty(dtype)))
            .collect();
        Self { columns, height: 0 }
    }

    /// Build a frame from named columns, which must all share one length.
    pub fn from_columns(
        columns: impl IntoIterator<Item = (String, Column)>,
    ) -> Result<Frame> {
        let mut frame: Option<Frame> = None;
        for (name, column) in columns {
            match frame.as_mut() {
                None => {
                    let height = column.len();
                    let mut first = IndexMap::new();
                    first.insert(name, column);
                    frame = Some(Frame {
                        columns: first,
                        height,
                    });
                }
                Some(f) => f.add_column(name, column)?,
            }
        }
        Ok(frame.unwrap_or_default())
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    /// The schema of the current columns, in column order.
    pub fn schema(&self) -> Schema {
        self.columns
            .iter()
            .map(|(name, col)| (name.clone(), col.dtype()))
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| SluiceError::MissingColumn(name.to_string()))
    }

    pub fn column_opt(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    /// Cell access; `None` for a null slot.
    pub fn get(&self, column: &str, row: usize) -> Option<Value> {
        self.columns.get(column)?.get(row)
    }

    pub fn set(&mut self, column: &str, row: usize, value: Option<Value>) -> Result<()> {
        self.columns
            .get_mut(column)
            .ok_or_else(|| SluiceError::MissingColumn(column.to_string()))?
            .set(row, value)
    }

    /// Add a new column. Its length must match the frame height.
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(SluiceError::Frame(format!("duplicate column '{}'", name)));
        }
        self.insert_column(name, column)
    }

    /// Add a column, replacing any existing column of the same name.
    pub fn replace_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        self.insert_column(name.into(), column)
    }

    fn insert_column(&mut self, name: String, column: Column) -> Result<()> {
        if column.len() != self.height {
            return Err(SluiceError::Frame(format!(
                "column '{}' has length {} but frame height is {}",
                name,
                column.len(),
                self.height
            )));
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Non-destructively extend the frame so every declared column exists,
    /// null-filled for all rows. Idempotent; this is the schema-migration
    /// primitive.
    pub fn align_to(&mut self, schema: &Schema) -> Result<()> {
        for (name, dtype) in schema.iter() {
            match self.columns.get(name) {
                Some(existing) if existing.dtype() != dtype => {
                    return Err(SluiceError::SchemaConflict {
                        column: name.to_string(),
                        message: format!(
                            "ledger holds {} but {} was declared",
                            existing.dtype(),
                            dtype
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    self.columns
                        .insert(name.to_string(), Column::nulls(dtype, self.height));
                }
            }
        }
        Ok(())
    }

    /// Rows where `mask` is true. The mask length must equal the height.
    pub fn filter(&self, mask: &[bool]) -> Frame {
        let height = mask.iter().filter(|&&keep| keep).count();
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| (name.clone(), col.filter(mask)))
            .collect();
        Frame { columns, height }
    }

    /// Rows at the given indices, in order.
    pub fn take(&self, indices: &[usize]) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| (name.clone(), col.take(indices)))
            .collect();
        Frame {
            columns,
            height: indices.len(),
        }
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Frame {
        let indices: Vec<usize> = (0..self.height.min(n)).collect();
        self.take(&indices)
    }

    /// Project onto the given schema, in schema order. Every requested
    /// column must exist with the declared type.
    pub fn select(&self, schema: &Schema) -> Result<Frame> {
        let mut columns = IndexMap::with_capacity(schema.len());
        for (name, dtype) in schema.iter() {
            let col = self.column(name)?;
            if col.dtype() != dtype {
                return Err(SluiceError::TypeMismatch(format!(
                    "column '{}' is {} but {} was requested",
                    name,
                    col.dtype(),
                    dtype
                )));
            }
            columns.insert(name.to_string(), col.clone());
        }
        Ok(Frame {
            columns,
            height: self.height,
        })
    }

    /// Append another frame's rows, unioning the schemas: columns missing
    /// on either side are null-filled (diagonal concatenation).
    pub fn append(&mut self, other: &Frame) -> Result<()> {
        let target = self.schema().union(&other.schema())?;
        self.align_to(&target)?;
        let added = other.height();
        for (name, col) in self.columns.iter_mut() {
            match other.column_opt(name) {
                Some(incoming) => col.append(incoming)?,
                None => col.extend_nulls(added),
            }
        }
        self.height += added;
        Ok(())
    }

    /// Stable sort by one column, nulls last.
    pub fn sort_by(&self, column: &str) -> Result<Frame> {
        let key = self.column(column)?;
        let mut indices: Vec<usize> = (0..self.height).collect();
        indices.sort_by(|&a, &b| match (key.get(a), key.get(b)) {
            (Some(x), Some(y)) => Value::compare(&x, &y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        Ok(self.take(&indices))
    }

    /// One row's cells, keyed by column name. Null cells are `None`.
    pub fn row_values(&self, row: usize) -> IndexMap<String, Option<Value>> {
        self.columns
            .iter()
            .map(|(name, col)| (name.clone(), col.get(row)))
            .collect()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::empty(&Schema::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        let paths = Column::from_values(
            ColumnType::Str,
            vec![
                Some(Value::from("b.png")),
                Some(Value::from("a.png")),
                Some(Value::from("c.png")),
            ],
        )
        .unwrap();
        let sizes = Column::from_values(
            ColumnType::Int,
            vec![Some(Value::Int(20)), Some(Value::Int(10)), None],
        )
        .unwrap();
        Frame::from_columns([("path".to_string(), paths), ("size".to_string(), sizes)]).unwrap()
    }

    #[test]
    fn test_align_to_is_idempotent_and_nondestructive() {
        let mut frame = sample();
        let extended = frame
            .schema()
            .union(&Schema::new().with_field("hash", ColumnType::Str))
            .unwrap();

        frame.align_to(&extended).unwrap();
        assert!(frame.has_column("hash"));
        assert_eq!(frame.column("hash").unwrap().null_count(), 3);
        assert_eq!(frame.get("size", 0), Some(Value::Int(20)));

        let snapshot = frame.clone();
        frame.align_to(&extended).unwrap();
        assert_eq!(frame, snapshot);
    }

    #[test]
    fn test_align_to_rejects_dtype_change() {
        let mut frame = sample();
        let conflicting = Schema::new().with_field("size", ColumnType::Str);
        assert!(matches!(
            frame.align_to(&conflicting),
            Err(SluiceError::SchemaConflict { .. })
        ));
    }

    #[test]
    fn test_append_unions_schemas() {
        let mut frame = sample();
        let incoming = Frame::from_columns([
            (
                "path".to_string(),
                Column::from_values(ColumnType::Str, vec![Some(Value::from("d.png"))]).unwrap(),
            ),
            (
                "hash".to_string(),
                Column::from_values(ColumnType::Str, vec![Some(Value::from("abcd"))]).unwrap(),
            ),
        ])
        .unwrap();

        frame.append(&incoming).unwrap();
        assert_eq!(frame.height(), 4);
        // Old rows got null hash, the new row got null size.
        assert_eq!(frame.get("hash", 0), None);
        assert_eq!(frame.get("hash", 3), Some(Value::from("abcd")));
        assert_eq!(frame.get("size", 3), None);
    }

    #[test]
    fn test_sort_by_puts_nulls_last() {
        let frame = sample();
        let sorted = frame.sort_by("size").unwrap();
        assert_eq!(sorted.get("path", 0), Some(Value::from("a.png")));
        assert_eq!(sorted.get("path", 1), Some(Value::from("b.png")));
        assert_eq!(sorted.get("path", 2), Some(Value::from("c.png")));
    }

    #[test]
    fn test_select_projects_in_schema_order() {
        let frame = sample();
        let projection = Schema::new()
            .with_field("size", ColumnType::Int)
            .with_field("path", ColumnType::Str);
        let selected = frame.select(&projection).unwrap();
        let names: Vec<&str> = selected.column_names().collect();
        assert_eq!(names, vec!["size", "path"]);

        assert!(matches!(
            frame.select(&Schema::new().with_field("missing", ColumnType::Int)),
            Err(SluiceError::MissingColumn(_))
        ));
    }
}

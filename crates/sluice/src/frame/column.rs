//! Typed nullable column vectors.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SluiceError};

use super::value::{ColumnType, Value};

/// A single column: one typed vector with per-slot nulls.
///
/// This is the in-memory columnar representation; it serializes directly
/// into the persisted store, so the on-disk format is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Str(Vec<Option<String>>),
    Timestamp(Vec<Option<i64>>),
    List(Vec<Option<Vec<Value>>>),
    Struct(Vec<Option<IndexMap<String, Value>>>),
}

fn filter_vec<T: Clone>(values: &[Option<T>], mask: &[bool]) -> Vec<Option<T>> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(v, _)| v.clone())
        .collect()
}

fn take_vec<T: Clone>(values: &[Option<T>], indices: &[usize]) -> Vec<Option<T>> {
    indices
        .iter()
        .map(|&i| values.get(i).cloned().flatten())
        .collect()
}

impl Column {
    /// An empty column of the given type.
    pub fn empty(dtype: ColumnType) -> Self {
        Self::nulls(dtype, 0)
    }

    /// A column of `len` nulls.
    pub fn nulls(dtype: ColumnType, len: usize) -> Self {
        match dtype {
            ColumnType::Int => Column::Int(vec![None; len]),
            ColumnType::Float => Column::Float(vec![None; len]),
            ColumnType::Bool => Column::Bool(vec![None; len]),
            ColumnType::Str => Column::Str(vec![None; len]),
            ColumnType::Timestamp => Column::Timestamp(vec![None; len]),
            ColumnType::List => Column::List(vec![None; len]),
            ColumnType::Struct => Column::Struct(vec![None; len]),
        }
    }

    /// Build a column of the given type from a vector of optional values.
    pub fn from_values(dtype: ColumnType, values: Vec<Option<Value>>) -> Result<Self> {
        let mut column = Self::nulls(dtype, 0);
        for value in values {
            column.push(value)?;
        }
        Ok(column)
    }

    pub fn dtype(&self) -> ColumnType {
        match self {
            Column::Int(_) => ColumnType::Int,
            Column::Float(_) => ColumnType::Float,
            Column::Bool(_) => ColumnType::Bool,
            Column::Str(_) => ColumnType::Str,
            Column::Timestamp(_) => ColumnType::Timestamp,
            Column::List(_) => ColumnType::List,
            Column::Struct(_) => ColumnType::Struct,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::Timestamp(v) => v.len(),
            Column::List(v) => v.len(),
            Column::Struct(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the value at `idx`; `None` for a null slot or out of range.
    pub fn get(&self, idx: usize) -> Option<Value> {
        match self {
            Column::Int(v) => v.get(idx)?.map(Value::Int),
            Column::Float(v) => v.get(idx)?.map(Value::Float),
            Column::Bool(v) => v.get(idx)?.map(Value::Bool),
            Column::Str(v) => v.get(idx)?.clone().map(Value::Str),
            Column::Timestamp(v) => v.get(idx)?.map(Value::Timestamp),
            Column::List(v) => v.get(idx)?.clone().map(Value::List),
            Column::Struct(v) => v.get(idx)?.clone().map(Value::Struct),
        }
    }

    pub fn is_null(&self, idx: usize) -> bool {
        match self {
            Column::Int(v) => v.get(idx).is_none_or(|s| s.is_none()),
            Column::Float(v) => v.get(idx).is_none_or(|s| s.is_none()),
            Column::Bool(v) => v.get(idx).is_none_or(|s| s.is_none()),
            Column::Str(v) => v.get(idx).is_none_or(|s| s.is_none()),
            Column::Timestamp(v) => v.get(idx).is_none_or(|s| s.is_none()),
            Column::List(v) => v.get(idx).is_none_or(|s| s.is_none()),
            Column::Struct(v) => v.get(idx).is_none_or(|s| s.is_none()),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    /// Append a value, which must match the column type (or be null).
    pub fn push(&mut self, value: Option<Value>) -> Result<()> {
        let dtype = self.dtype();
        match (self, value) {
            (Column::Int(v), Some(Value::Int(x))) => v.push(Some(x)),
            (Column::Float(v), Some(Value::Float(x))) => v.push(Some(x)),
            (Column::Bool(v), Some(Value::Bool(x))) => v.push(Some(x)),
            (Column::Str(v), Some(Value::Str(x))) => v.push(Some(x)),
            (Column::Timestamp(v), Some(Value::Timestamp(x))) => v.push(Some(x)),
            (Column::List(v), Some(Value::List(x))) => v.push(Some(x)),
            (Column::Struct(v), Some(Value::Struct(x))) => v.push(Some(x)),
            (col, None) => col.push_null(),
            (_, Some(other)) => {
                return Err(SluiceError::TypeMismatch(format!(
                    "cannot store {} value in {} column",
                    other.dtype(),
                    dtype
                )));
            }
        }
        Ok(())
    }

    fn push_null(&mut self) {
        match self {
            Column::Int(v) => v.push(None),
            Column::Float(v) => v.push(None),
            Column::Bool(v) => v.push(None),
            Column::Str(v) => v.push(None),
            Column::Timestamp(v) => v.push(None),
            Column::List(v) => v.push(None),
            Column::Struct(v) => v.push(None),
        }
    }

    /// Overwrite the slot at `idx`.
    pub fn set(&mut self, idx: usize, value: Option<Value>) -> Result<()> {
        if idx >= self.len() {
            return Err(SluiceError::Frame(format!(
                "row {} out of range for column of length {}",
                idx,
                self.len()
            )));
        }
        let dtype = self.dtype();
        match (self, value) {
            (Column::Int(v), Some(Value::Int(x))) => v[idx] = Some(x),
            (Column::Float(v), Some(Value::Float(x))) => v[idx] = Some(x),
            (Column::Bool(v), Some(Value::Bool(x))) => v[idx] = Some(x),
            (Column::Str(v), Some(Value::Str(x))) => v[idx] = Some(x),
            (Column::Timestamp(v), Some(Value::Timestamp(x))) => v[idx] = Some(x),
            (Column::List(v), Some(Value::List(x))) => v[idx] = Some(x),
            (Column::Struct(v), Some(Value::Struct(x))) => v[idx] = Some(x),
            (col, None) => col.set_null(idx),
            (_, Some(other)) => {
                return Err(SluiceError::TypeMismatch(format!(
                    "cannot store {} value in {} column",
                    other.dtype(),
                    dtype
                )));
            }
        }
        Ok(())
    }

    fn set_null(&mut self, idx: usize) {
        match self {
            Column::Int(v) => v[idx] = None,
            Column::Float(v) => v[idx] = None,
            Column::Bool(v) => v[idx] = None,
            Column::Str(v) => v[idx] = None,
            Column::Timestamp(v) => v[idx] = None,
            Column::List(v) => v[idx] = None,
            Column::Struct(v) => v[idx] = None,
        }
    }

    /// Rows of this column where `mask` is true.
    pub fn filter(&self, mask: &[bool]) -> Self {
        match self {
            Column::Int(v) => Column::Int(filter_vec(v, mask)),
            Column::Float(v) => Column::Float(filter_vec(v, mask)),
            Column::Bool(v) => Column::Bool(filter_vec(v, mask)),
            Column::Str(v) => Column::Str(filter_vec(v, mask)),
            Column::Timestamp(v) => Column::Timestamp(filter_vec(v, mask)),
            Column::List(v) => Column::List(filter_vec(v, mask)),
            Column::Struct(v) => Column::Struct(filter_vec(v, mask)),
        }
    }

    /// Rows of this column at the given indices, in order.
    pub fn take(&self, indices: &[usize]) -> Self {
        match self {
            Column::Int(v) => Column::Int(take_vec(v, indices)),
            Column::Float(v) => Column::Float(take_vec(v, indices)),
            Column::Bool(v) => Column::Bool(take_vec(v, indices)),
            Column::Str(v) => Column::Str(take_vec(v, indices)),
            Column::Timestamp(v) => Column::Timestamp(take_vec(v, indices)),
            Column::List(v) => Column::List(take_vec(v, indices)),
            Column::Struct(v) => Column::Struct(take_vec(v, indices)),
        }
    }

    /// Grow the column by `n` null slots.
    pub fn extend_nulls(&mut self, n: usize) {
        match self {
            Column::Int(v) => v.extend(std::iter::repeat_with(|| None).take(n)),
            Column::Float(v) => v.extend(std::iter::repeat_with(|| None).take(n)),
            Column::Bool(v) => v.extend(std::iter::repeat_with(|| None).take(n)),
            Column::Str(v) => v.extend(std::iter::repeat_with(|| None).take(n)),
            Column::Timestamp(v) => v.extend(std::iter::repeat_with(|| None).take(n)),
            Column::List(v) => v.extend(std::iter::repeat_with(|| None).take(n)),
            Column::Struct(v) => v.extend(std::iter::repeat_with(|| None).take(n)),
        }
    }

    /// Append all rows of another column of the same type.
    pub fn append(&mut self, other: &Column) -> Result<()> {
        if self.dtype() != other.dtype() {
            return Err(SluiceError::TypeMismatch(format!(
                "cannot append {} column to {} column",
                other.dtype(),
                self.dtype()
            )));
        }
        match (self, other) {
            (Column::Int(a), Column::Int(b)) => a.extend(b.iter().cloned()),
            (Column::Float(a), Column::Float(b)) => a.extend(b.iter().cloned()),
            (Column::Bool(a), Column::Bool(b)) => a.extend(b.iter().cloned()),
            (Column::Str(a), Column::Str(b)) => a.extend(b.iter().cloned()),
            (Column::Timestamp(a), Column::Timestamp(b)) => a.extend(b.iter().cloned()),
            (Column::List(a), Column::List(b)) => a.extend(b.iter().cloned()),
            (Column::Struct(a), Column::Struct(b)) => a.extend(b.iter().cloned()),
            _ => unreachable!("dtype equality checked above"),
        }
        Ok(())
    }
}

//! Core data model of the row engine.
//!
//! A [`DataSet`] is an ordered [`Schema`] plus row-major [`Value`] storage. CSV parsing yields
//! text ([`DataType::Utf8`]) columns; [`DataSet::infer_types`] then applies the shared inference
//! rules of [`crate::infer`], and columns generated by unpacking are typed the same way.

use std::collections::HashMap;
use std::fmt;

use crate::infer::{infer_text_column, InferredColumn};
use crate::literal::python_float_repr;

/// Logical data type for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

impl From<&InferredColumn> for DataType {
    fn from(col: &InferredColumn) -> Self {
        match col {
            InferredColumn::Int64(_) => Self::Int64,
            InferredColumn::Float64(_) => Self::Float64,
            InferredColumn::Bool(_) => Self::Bool,
            InferredColumn::Utf8(_) => Self::Utf8,
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the shape of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns the index of a field by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// A single typed value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// `true` for [`Value::Null`] and for blank text.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Utf8(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric reading of the value, if it has one.
    ///
    /// Text is parsed with [`crate::summary::parse_number`]; booleans are not numeric.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int64(v) => Some(*v as f64),
            Self::Float64(v) if v.is_finite() => Some(*v),
            Self::Utf8(s) => crate::summary::parse_number(s),
            _ => None,
        }
    }

    /// Integer reading of the value (integer cell or integer text), if it has one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            Self::Utf8(s) => crate::summary::parse_integer(s),
            _ => None,
        }
    }

    /// Display text of a present value; `None` when missing.
    pub fn text(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl InferredColumn {
    /// Converts the inferred cells into row-engine values.
    pub fn into_values(self) -> Vec<Value> {
        fn wrap<T>(cells: Vec<Option<T>>, f: impl Fn(T) -> Value) -> Vec<Value> {
            cells.into_iter().map(|c| c.map_or(Value::Null, &f)).collect()
        }
        match self {
            Self::Int64(cells) => wrap(cells, Value::Int64),
            Self::Float64(cells) => wrap(cells, Value::Float64),
            Self::Bool(cells) => wrap(cells, Value::Bool),
            Self::Utf8(cells) => wrap(cells, Value::Utf8),
        }
    }
}

/// Text of the value as it appears in summaries and group labels. `Null` renders empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => f.write_str(&python_float_repr(*v)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(s) => f.write_str(s),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Cells of column `idx`, one per row.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| row.get(idx).unwrap_or(&Value::Null))
    }

    /// Re-types every text column with [`infer_text_column`].
    ///
    /// Columns that already carry a non-text type are left alone.
    pub fn infer_types(&mut self) {
        for idx in 0..self.column_count() {
            if self.schema.fields[idx].data_type != DataType::Utf8 {
                continue;
            }
            let inferred = infer_text_column(self.column(idx).map(Value::text));
            self.replace_column(idx, inferred);
        }
    }

    /// Overwrites column `idx` with `column` (one cell per row) and updates its field type.
    pub fn replace_column(&mut self, idx: usize, column: InferredColumn) {
        self.schema.fields[idx].data_type = DataType::from(&column);
        for (row, value) in self.rows.iter_mut().zip(column.into_values()) {
            if let Some(slot) = row.get_mut(idx) {
                *slot = value;
            }
        }
    }

    /// Appends a column (one cell per row).
    pub fn push_column(&mut self, name: impl Into<String>, column: InferredColumn) {
        self.schema.fields.push(Field::new(name, DataType::from(&column)));
        for (row, value) in self.rows.iter_mut().zip(column.into_values()) {
            row.push(value);
        }
    }

    /// Keep only the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            schema: self.schema.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Create a new dataset with the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i))
            .cloned()
            .collect();
        Self {
            schema: self.schema.clone(),
            rows,
        }
    }

    /// Splits the rows into groups keyed by the values at `key_idxs`.
    ///
    /// Groups are returned in order of first occurrence, each with its key values and row
    /// indices. Every row lands in exactly one group.
    pub fn partition_by(&self, key_idxs: &[usize]) -> Vec<(Vec<Value>, Vec<usize>)> {
        let mut groups: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
        let mut lookup: HashMap<Vec<String>, usize> = HashMap::new();

        for (row_idx, row) in self.rows.iter().enumerate() {
            let key: Vec<Value> = key_idxs
                .iter()
                .map(|&i| match row.get(i) {
                    Some(v) if !v.is_missing() => v.clone(),
                    _ => Value::Null,
                })
                .collect();
            // Keyed by text so that e.g. Int64(1) and Utf8("1") do not split a group.
            let text_key: Vec<String> = key.iter().map(Value::to_string).collect();
            match lookup.get(&text_key) {
                Some(&g) => groups[g].1.push(row_idx),
                None => {
                    lookup.insert(text_key, groups.len());
                    groups.push((key, vec![row_idx]));
                }
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Utf8),
            Field::new("b", DataType::Utf8),
        ]);
        let rows = vec![
            vec![Value::Utf8("1".to_string()), Value::Utf8("x".to_string())],
            vec![Value::Utf8("2".to_string()), Value::Utf8("y".to_string())],
            vec![Value::Utf8("3".to_string()), Value::Utf8("x".to_string())],
            vec![Value::Utf8("4".to_string()), Value::Null],
        ];
        DataSet::new(schema, rows)
    }

    #[test]
    fn schema_index_of_works() {
        let ds = sample_dataset();
        assert_eq!(ds.schema.index_of("a"), Some(0));
        assert_eq!(ds.schema.index_of("b"), Some(1));
        assert_eq!(ds.schema.index_of("missing"), None);
    }

    #[test]
    fn partition_groups_in_first_occurrence_order() {
        let ds = sample_dataset();
        let groups = ds.partition_by(&[1]);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0], (vec![Value::Utf8("x".to_string())], vec![0, 2]));
        assert_eq!(groups[1], (vec![Value::Utf8("y".to_string())], vec![1]));
        assert_eq!(groups[2], (vec![Value::Null], vec![3]));

        let total: usize = groups.iter().map(|(_, rows)| rows.len()).sum();
        assert_eq!(total, ds.row_count());
    }

    #[test]
    fn head_and_take_preserve_schema() {
        let ds = sample_dataset();
        let head = ds.head(2);
        assert_eq!(head.schema, ds.schema);
        assert_eq!(head.row_count(), 2);

        let taken = ds.take_rows(&[2, 2, 0]);
        assert_eq!(taken.row_count(), 3);
        assert_eq!(taken.rows[0], ds.rows[2]);
        assert_eq!(taken.rows[2], ds.rows[0]);
    }

    #[test]
    fn value_numeric_reading() {
        assert_eq!(Value::Utf8(" 1,500 ".to_string()).as_number(), Some(1500.0));
        assert_eq!(Value::Int64(7).as_number(), Some(7.0));
        assert_eq!(Value::Bool(true).as_number(), None);
        assert_eq!(Value::Utf8("12".to_string()).as_integer(), Some(12));
        assert_eq!(Value::Utf8("1.5".to_string()).as_integer(), None);
        assert_eq!(Value::Float64(2.0).as_integer(), None);
        assert!(Value::Utf8("   ".to_string()).is_missing());
    }

    #[test]
    fn infer_types_retypes_numeric_text_columns() {
        let mut ds = sample_dataset();
        ds.infer_types();
        assert_eq!(ds.schema.fields[0].data_type, DataType::Int64);
        assert_eq!(ds.schema.fields[1].data_type, DataType::Utf8);
        assert_eq!(ds.rows[1][0], Value::Int64(2));
        assert_eq!(ds.rows[3][1], Value::Null);
    }

    #[test]
    fn push_and_replace_columns() {
        let mut ds = sample_dataset();
        ds.push_column("c", InferredColumn::Bool(vec![Some(true), None, Some(false), None]));
        assert_eq!(ds.schema.index_of("c"), Some(2));
        assert_eq!(ds.rows[0][2], Value::Bool(true));
        assert_eq!(ds.rows[1][2], Value::Null);

        ds.replace_column(0, InferredColumn::Float64(vec![Some(0.5); 4]));
        assert_eq!(ds.schema.fields[0].data_type, DataType::Float64);
        assert_eq!(ds.rows[3][0].to_string(), "0.5");
        assert_eq!(Value::Float64(2.0).to_string(), "2.0");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }
}

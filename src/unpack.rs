//! Flattening of columns that hold a nested mapping per cell.
//!
//! A cell such as `{'A': {'x': 1}, 'B': {'x': 3}}` in column `meta_info` becomes two rows with
//! `meta_key = A` / `meta_key = B` and `meta_x = 1` / `meta_x = 3`; the `meta_info` column is
//! removed. The decision logic lives here and is shared by both engines: each engine only feeds
//! cells in and applies the resulting [`UnpackPlan`] to its own table type.
//!
//! Rows that cannot be expanded (missing cell, unparsable text, not a mapping, or no outer entry
//! whose value is a mapping) are passed through once with no new fields, so unpacking never
//! removes rows.

use crate::infer::{infer_literal_column, infer_text_column, literal_text, InferredColumn};
use crate::literal::{self, Literal};

/// Number of non-missing cells inspected per column by `detect_unpackable`.
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Returns `true` for a dict whose every value is itself a dict.
pub fn is_nested_mapping(value: &Literal) -> bool {
    value
        .as_dict()
        .is_some_and(|entries| entries.iter().all(|(_, v)| v.as_dict().is_some()))
}

/// Parses `text` and reports whether it is a nested mapping. Parse failures count as `false`.
pub fn parses_as_nested_mapping(text: &str) -> bool {
    literal::parse(text).is_ok_and(|v| is_nested_mapping(&v))
}

/// Applies the sampling rule to one column's cells (missing cells as `None`, in row order).
pub fn samples_qualify<'a, I>(cells: I, sample_size: usize) -> bool
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    cells
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .take(sample_size)
        .any(parses_as_nested_mapping)
}

/// Prefix used for the generated columns: the column name up to its first underscore.
pub fn column_prefix(column: &str) -> &str {
    column.split('_').next().unwrap_or(column)
}

/// How an unpack turns source rows into output rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnpackPlan {
    /// Source row index of every output row, in output order.
    pub sources: Vec<usize>,
    /// Names of the generated columns in first-appearance order (`<prefix>_key` first).
    pub columns: Vec<String>,
    /// Generated fields of every output row. Empty for pass-through rows.
    pub fields: Vec<Vec<(String, Literal)>>,
}

impl UnpackPlan {
    /// Number of output rows.
    pub fn row_count(&self) -> usize {
        self.sources.len()
    }

    /// Value of generated column `name` in output row `row`, if that row sets it.
    pub fn value(&self, row: usize, name: &str) -> Option<&Literal> {
        self.fields
            .get(row)?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// All values of generated column `name`, one per output row.
    pub fn column_values(&self, name: &str) -> Vec<Option<&Literal>> {
        (0..self.row_count()).map(|row| self.value(row, name)).collect()
    }

    fn push_passthrough(&mut self, source: usize) {
        self.sources.push(source);
        self.fields.push(Vec::new());
    }

    fn push_expanded(&mut self, source: usize, fields: Vec<(String, Literal)>) {
        for (name, _) in &fields {
            if !self.columns.contains(name) {
                self.columns.push(name.clone());
            }
        }
        self.sources.push(source);
        self.fields.push(fields);
    }
}

/// Builds the expansion plan for one column.
///
/// `cells` yields the column's cells in row order (`None` for missing).
pub fn plan_unpack<'a, I>(cells: I, prefix: &str) -> UnpackPlan
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let key_column = format!("{prefix}_key");
    let mut plan = UnpackPlan::default();

    for (source, cell) in cells.into_iter().enumerate() {
        let parsed = cell.and_then(|text| literal::parse(text.trim()).ok());
        let Some(Literal::Dict(entries)) = parsed else {
            plan.push_passthrough(source);
            continue;
        };

        let mut expanded = false;
        for (outer_key, inner) in entries {
            let Literal::Dict(inner_entries) = inner else {
                continue;
            };
            let mut fields: Vec<(String, Literal)> = Vec::with_capacity(inner_entries.len() + 1);
            set_field(&mut fields, key_column.clone(), outer_key);
            for (field, value) in inner_entries {
                set_field(&mut fields, format!("{prefix}_{field}"), value);
            }
            plan.push_expanded(source, fields);
            expanded = true;
        }
        if !expanded {
            plan.push_passthrough(source);
        }
    }

    plan
}

// Later writes win, matching dict assignment order (`<prefix>_key` can be overwritten by an inner
// field literally named `key`).
fn set_field(fields: &mut Vec<(String, Literal)>, name: String, value: Literal) {
    match fields.iter_mut().find(|(k, _)| *k == name) {
        Some(slot) => slot.1 = value,
        None => fields.push((name, value)),
    }
}

/// Cells of generated column `name` for every output row of `plan`.
///
/// `existing` is the text of a same-named column that is already in the table, indexed by source
/// row. Rows that set the field take the new value and the others keep their existing cell; the
/// merged column is then re-inferred from text.
pub fn generated_column(
    plan: &UnpackPlan,
    name: &str,
    existing: Option<&[Option<String>]>,
) -> InferredColumn {
    let values = plan.column_values(name);
    let Some(existing) = existing else {
        return infer_literal_column(&values);
    };

    let gtype = generated_type(values.iter().copied());
    let merged = values.iter().zip(&plan.sources).map(|(value, &source)| match value {
        Some(v) => literal_text(v, gtype),
        None => existing.get(source).cloned().flatten(),
    });
    infer_text_column(merged)
}

/// Storage type chosen for a generated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedType {
    Int64,
    Float64,
    Bool,
    Utf8,
}

/// Picks the narrowest column type that holds every non-`None` value.
///
/// Ints only → `Int64`; ints and floats → `Float64`; bools only → `Bool`; anything else (or no
/// values at all) → `Utf8` holding the `Display` text.
pub fn generated_type<'a, I>(values: I) -> GeneratedType
where
    I: IntoIterator<Item = Option<&'a Literal>>,
{
    let mut seen_int = false;
    let mut seen_float = false;
    let mut seen_bool = false;
    let mut seen_other = false;
    for value in values.into_iter().flatten() {
        match value {
            Literal::None => {}
            Literal::Int(_) => seen_int = true,
            Literal::Float(_) => seen_float = true,
            Literal::Bool(_) => seen_bool = true,
            _ => seen_other = true,
        }
    }
    match (seen_int, seen_float, seen_bool, seen_other) {
        (true, false, false, false) => GeneratedType::Int64,
        (_, true, false, false) => GeneratedType::Float64,
        (false, false, true, false) => GeneratedType::Bool,
        _ => GeneratedType::Utf8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const META: &str = r#"{"A": {"x": 1, "y": 2}, "B": {"x": 3, "y": 4}}"#;

    #[test]
    fn prefix_is_text_before_first_underscore() {
        assert_eq!(column_prefix("meta_data_json"), "meta");
        assert_eq!(column_prefix("meta"), "meta");
        assert_eq!(column_prefix("_x"), "");
    }

    #[test]
    fn nested_mapping_detection() {
        assert!(parses_as_nested_mapping(META));
        assert!(parses_as_nested_mapping("{}"));
        assert!(!parses_as_nested_mapping("{'a': 1}"));
        assert!(!parses_as_nested_mapping("[{'a': {}}]"));
        assert!(!parses_as_nested_mapping("not a literal"));
    }

    #[test]
    fn sampling_skips_missing_and_stops_at_sample_size() {
        let cells = vec![None, Some(""), Some("x"), Some(META)];
        assert!(samples_qualify(cells.clone(), 2));
        assert!(!samples_qualify(cells, 1));

        let late = vec![Some("a"), Some("b"), Some("c"), Some("d"), Some("e"), Some(META)];
        assert!(!samples_qualify(late, DEFAULT_SAMPLE_SIZE));
    }

    #[test]
    fn plan_expands_in_outer_key_order() {
        let plan = plan_unpack(vec![Some("plain"), Some(META)], "meta");
        assert_eq!(plan.sources, vec![0, 1, 1]);
        assert_eq!(plan.columns, vec!["meta_key", "meta_x", "meta_y"]);
        assert!(plan.fields[0].is_empty());
        assert_eq!(plan.value(1, "meta_key"), Some(&Literal::Str("A".to_string())));
        assert_eq!(plan.value(2, "meta_x"), Some(&Literal::Int(3)));
        assert_eq!(plan.value(2, "meta_y"), Some(&Literal::Int(4)));
    }

    #[test]
    fn unusable_rows_pass_through_once() {
        let plan = plan_unpack(
            vec![None, Some("{broken"), Some("[1, 2]"), Some("{}"), Some("{'a': 5}")],
            "p",
        );
        assert_eq!(plan.sources, vec![0, 1, 2, 3, 4]);
        assert!(plan.fields.iter().all(Vec::is_empty));
        assert!(plan.columns.is_empty());
    }

    #[test]
    fn non_mapping_outer_values_are_skipped() {
        let plan = plan_unpack(vec![Some("{'a': 1, 'b': {'v': 2}}")], "p");
        assert_eq!(plan.sources, vec![0]);
        assert_eq!(plan.value(0, "p_key"), Some(&Literal::Str("b".to_string())));
        assert_eq!(plan.value(0, "p_v"), Some(&Literal::Int(2)));
    }

    #[test]
    fn inner_field_named_key_overwrites_outer_key() {
        let plan = plan_unpack(vec![Some("{'a': {'key': 'inner'}}")], "p");
        assert_eq!(plan.columns, vec!["p_key"]);
        assert_eq!(plan.value(0, "p_key"), Some(&Literal::Str("inner".to_string())));
    }

    #[test]
    fn generated_column_merges_with_existing_cells() {
        let plan = plan_unpack(vec![Some("{'a': {'v': 7}}"), None], "p");
        let existing = vec![Some("1".to_string()), Some("2".to_string())];
        let merged = generated_column(&plan, "p_v", Some(&existing));
        assert_eq!(merged, InferredColumn::Int64(vec![Some(7), Some(2)]));

        let fresh = generated_column(&plan, "p_v", None);
        assert_eq!(fresh, InferredColumn::Int64(vec![Some(7), None]));
    }

    #[test]
    fn generated_type_inference() {
        let int = Literal::Int(1);
        let float = Literal::Float(1.5);
        let flag = Literal::Bool(true);
        let text = Literal::Str("x".to_string());
        assert_eq!(generated_type([Some(&int), None]), GeneratedType::Int64);
        assert_eq!(generated_type([Some(&int), Some(&float)]), GeneratedType::Float64);
        assert_eq!(generated_type([Some(&flag), Some(&Literal::None)]), GeneratedType::Bool);
        assert_eq!(generated_type([Some(&int), Some(&text)]), GeneratedType::Utf8);
        assert_eq!(generated_type([Some(&int), Some(&flag)]), GeneratedType::Utf8);
        assert_eq!(generated_type([None]), GeneratedType::Utf8);
    }
}

//! Column type inference shared by both engines.
//!
//! Loaded CSV columns arrive as text. A column whose every non-missing cell is a number (after
//! stripping thousands separators) becomes an integer or float column; everything else stays text.
//! Columns generated by unpacking are typed from their literal values first and fall back to the
//! same text rule. Running one rule set for both engines keeps their column classification,
//! group labels and statistics identical.

use crate::literal::Literal;
use crate::summary::{parse_integer, parse_number};
use crate::unpack::{generated_type, GeneratedType};

/// A column's cells after inference. `None` is a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum InferredColumn {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Utf8(Vec<Option<String>>),
}

impl InferredColumn {
    /// Number of cells.
    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if cell `row` holds a value.
    pub fn is_present(&self, row: usize) -> bool {
        match self {
            Self::Int64(v) => v.get(row).is_some_and(Option::is_some),
            Self::Float64(v) => v.get(row).is_some_and(Option::is_some),
            Self::Bool(v) => v.get(row).is_some_and(Option::is_some),
            Self::Utf8(v) => v.get(row).is_some_and(Option::is_some),
        }
    }
}

/// Normalizes one cell of text: surrounding whitespace removed, blank becomes `None`.
pub fn clean_cell(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Infers the type of a text column.
///
/// - At least one value and all values integers → `Int64`.
/// - At least one value and all values finite numbers → `Float64`.
/// - Otherwise `Utf8` with trimmed text.
pub fn infer_text_column<I, S>(cells: I) -> InferredColumn
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let cells: Vec<Option<String>> = cells
        .into_iter()
        .map(|c| clean_cell(c.as_ref().map(AsRef::as_ref)))
        .collect();

    let mut any = false;
    let mut all_int = true;
    for cell in cells.iter().flatten() {
        any = true;
        if parse_number(cell).is_none() {
            return InferredColumn::Utf8(cells);
        }
        if all_int && parse_integer(cell).is_none() {
            all_int = false;
        }
    }
    if !any {
        return InferredColumn::Utf8(cells);
    }

    if all_int {
        InferredColumn::Int64(
            cells
                .iter()
                .map(|c| c.as_deref().and_then(parse_integer))
                .collect(),
        )
    } else {
        InferredColumn::Float64(
            cells
                .iter()
                .map(|c| c.as_deref().and_then(parse_number))
                .collect(),
        )
    }
}

/// Infers the type of a column generated by unpacking (`None` for rows that do not set it).
///
/// Integers, floats and booleans keep their literal type; anything else is rendered as text and
/// inferred with [`infer_text_column`].
pub fn infer_literal_column(values: &[Option<&Literal>]) -> InferredColumn {
    let gtype = generated_type(values.iter().copied());
    match gtype {
        GeneratedType::Int64 => InferredColumn::Int64(
            values
                .iter()
                .map(|v| match v {
                    Some(Literal::Int(i)) => Some(*i),
                    _ => None,
                })
                .collect(),
        ),
        GeneratedType::Float64 if all_finite(values) => InferredColumn::Float64(
            values
                .iter()
                .map(|v| match v {
                    Some(Literal::Int(i)) => Some(*i as f64),
                    Some(Literal::Float(f)) => Some(*f),
                    _ => None,
                })
                .collect(),
        ),
        GeneratedType::Bool => InferredColumn::Bool(
            values
                .iter()
                .map(|v| match v {
                    Some(Literal::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect(),
        ),
        _ => infer_text_column(values.iter().map(|v| v.and_then(|v| literal_text(v, gtype)))),
    }
}

/// Text of a generated value as it would appear in a column of type `gtype`.
///
/// `None` literals are missing; booleans in a boolean column print lowercase like every other
/// boolean cell.
pub fn literal_text(value: &Literal, gtype: GeneratedType) -> Option<String> {
    match (value, gtype) {
        (Literal::None, _) => None,
        (Literal::Bool(b), GeneratedType::Bool) => Some(b.to_string()),
        (other, _) => Some(other.to_string()),
    }
}

fn all_finite(values: &[Option<&Literal>]) -> bool {
    values.iter().flatten().all(|v| match v {
        Literal::Float(f) => f.is_finite(),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_text_becomes_int64() {
        let col = infer_text_column([Some("1"), None, Some(" 1,500 ")]);
        assert_eq!(col, InferredColumn::Int64(vec![Some(1), None, Some(1500)]));
    }

    #[test]
    fn mixed_numbers_become_float64() {
        let col = infer_text_column([Some("1"), Some("2.5")]);
        assert_eq!(col, InferredColumn::Float64(vec![Some(1.0), Some(2.5)]));
    }

    #[test]
    fn any_text_keeps_the_column_textual() {
        let col = infer_text_column([Some("1"), Some("x "), Some("  ")]);
        assert_eq!(
            col,
            InferredColumn::Utf8(vec![Some("1".to_string()), Some("x".to_string()), None])
        );
        assert!(col.is_present(0));
        assert!(!col.is_present(2));
    }

    #[test]
    fn empty_column_is_text() {
        let col = infer_text_column([None::<&str>, None]);
        assert_eq!(col, InferredColumn::Utf8(vec![None, None]));
    }

    #[test]
    fn generated_values_keep_literal_types() {
        let one = Literal::Int(1);
        let half = Literal::Float(0.5);
        let yes = Literal::Bool(true);
        assert_eq!(
            infer_literal_column(&[Some(&one), None]),
            InferredColumn::Int64(vec![Some(1), None])
        );
        assert_eq!(
            infer_literal_column(&[Some(&one), Some(&half)]),
            InferredColumn::Float64(vec![Some(1.0), Some(0.5)])
        );
        assert_eq!(
            infer_literal_column(&[Some(&yes), Some(&Literal::None)]),
            InferredColumn::Bool(vec![Some(true), None])
        );
    }

    #[test]
    fn generated_text_numbers_are_inferred() {
        let one = Literal::Int(1);
        let two = Literal::Str("2".to_string());
        assert_eq!(
            infer_literal_column(&[Some(&one), Some(&two)]),
            InferredColumn::Int64(vec![Some(1), Some(2)])
        );

        let word = Literal::Str("red".to_string());
        let yes = Literal::Bool(true);
        assert_eq!(
            infer_literal_column(&[Some(&word), Some(&yes)]),
            InferredColumn::Utf8(vec![Some("red".to_string()), Some("True".to_string())])
        );
    }
}

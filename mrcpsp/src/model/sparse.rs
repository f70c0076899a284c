use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    LessEqual,
    Equal,
    GreaterEqual,
}

impl Operator {
    /// Whether `lhs <op> rhs` holds up to `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Operator::LessEqual => lhs <= rhs + tolerance,
            Operator::Equal => (lhs - rhs).abs() <= tolerance,
            Operator::GreaterEqual => lhs >= rhs - tolerance,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::LessEqual => write!(f, "<="),
            Operator::Equal => write!(f, "="),
            Operator::GreaterEqual => write!(f, ">="),
        }
    }
}

/// Sparse constraint row, sorted by column, free of duplicate columns and of
/// zero coefficients.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseRow {
    entries: Vec<(usize, f64)>,
}

impl SparseRow {
    /// Builds a row from `(column, coefficient)` pairs. Zero coefficients are
    /// dropped, a column given twice is an error.
    pub fn from_entries(
        description: &str,
        entries: impl IntoIterator<Item = (usize, f64)>,
    ) -> Result<Self, ModelError> {
        let mut entries: Vec<(usize, f64)> = entries
            .into_iter()
            .filter(|(_, coefficient)| *coefficient != 0.0)
            .collect();
        entries.sort_by_key(|(column, _)| *column);

        if let Some(window) = entries.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(ModelError::DuplicateColumn {
                row: description.to_string(),
                column: window[0].0,
            });
        }

        if entries.is_empty() {
            return Err(ModelError::EmptyRow(description.to_string()));
        }

        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn coefficient(&self, column: usize) -> Option<f64> {
        self.entries
            .binary_search_by_key(&column, |(c, _)| *c)
            .ok()
            .map(|position| self.entries[position].1)
    }

    pub fn max_column(&self) -> Option<usize> {
        self.entries.last().map(|(column, _)| *column)
    }

    /// Value of the row's linear expression for a dense assignment.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|(column, coefficient)| coefficient * values.get(*column).copied().unwrap_or(0.0))
            .sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SparseMatrix {
    rows: Vec<SparseRow>,
}

impl SparseMatrix {
    pub fn push(&mut self, row: SparseRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn non_zeros(&self) -> usize {
        self.rows.iter().map(SparseRow::len).sum()
    }
}

/// A row together with its relation, right hand side and a tag for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub row: SparseRow,
    pub operator: Operator,
    pub rhs: f64,
    pub description: String,
}

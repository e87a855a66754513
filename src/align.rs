use crate::error::{FinancialInsightError, Result};
use crate::schema::StatementKind;
use crate::shift::{prev_column, PriorYearTable};
use crate::table::DerivedKpiTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Text columns appended by the narrative renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightColumns {
    pub insights: String,
    pub previous_year_insights: String,
    pub year_comparison_insight: String,
    pub patterns: String,
}

/// One fiscal year next to the year that follows it in the table
/// (one year earlier for a descending table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub fiscal_year: i32,
    pub fiscal_date_ending: Option<NaiveDate>,
    #[serde(with = "crate::table::nan_as_null")]
    pub current: BTreeMap<String, f64>,
    #[serde(with = "crate::table::nan_as_null")]
    pub previous: BTreeMap<String, f64>,
    #[serde(default)]
    pub annotations: InsightColumns,
}

impl ComparisonRow {
    pub fn current(&self, column: &str) -> Option<f64> {
        self.current.get(column).copied()
    }

    /// Prior-year value for a current-year column name (`grossMargin` reads `grossMargin_prev`).
    pub fn previous(&self, column: &str) -> Option<f64> {
        self.previous.get(&prev_column(column)).copied()
    }

    /// Looks a column up by its full name in either half of the row.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.current
            .get(column)
            .or_else(|| self.previous.get(column))
            .copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub kind: StatementKind,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fiscal_years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.fiscal_year).collect()
    }

    /// Rows whose fiscal year matches `fiscal_year` exactly.
    pub fn select_year(&self, fiscal_year: i32) -> Vec<&ComparisonRow> {
        self.rows
            .iter()
            .filter(|r| r.fiscal_year == fiscal_year)
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.value(name)).collect()
    }
}

/// Pairs current-year and prior-year rows by position.
///
/// No re-sorting and no join on fiscal year: row `i` of each input ends up in
/// row `i` of the output. Inputs of different length are an error rather than
/// being truncated.
pub fn align_years(current: &DerivedKpiTable, prior: &PriorYearTable) -> Result<ComparisonTable> {
    if current.len() != prior.len() {
        return Err(FinancialInsightError::AlignmentError {
            current: current.len(),
            prior: prior.len(),
        });
    }

    let rows = current
        .rows
        .iter()
        .zip(&prior.rows)
        .map(|(cur, prev)| ComparisonRow {
            fiscal_year: cur.fiscal_year,
            fiscal_date_ending: cur.fiscal_date_ending,
            current: cur.values.clone(),
            previous: prev.clone(),
            annotations: InsightColumns::default(),
        })
        .collect();

    Ok(ComparisonTable {
        kind: current.kind,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shift::create_prior_year_table;
    use crate::table::StatementTable;

    fn derived() -> StatementTable {
        StatementTable::from_columns(
            StatementKind::IncomeStatement,
            &[2023, 2022, 2021],
            &[("grossMargin", &[80.0, 70.0, 60.0])],
        )
    }

    #[test]
    fn test_align_pairs_rows_by_position() {
        let current = derived();
        let prior = create_prior_year_table(&current, 0.0);
        let comparison = align_years(&current, &prior).unwrap();

        assert_eq!(comparison.len(), 3);
        assert_eq!(comparison.fiscal_years(), vec![2023, 2022, 2021]);
        for (idx, row) in comparison.rows.iter().enumerate() {
            assert_eq!(row.current, current.rows[idx].values);
            assert_eq!(row.previous, prior.rows[idx]);
        }

        assert_eq!(comparison.rows[0].current("grossMargin"), Some(80.0));
        assert_eq!(comparison.rows[0].previous("grossMargin"), Some(70.0));
        assert_eq!(comparison.rows[2].value("grossMargin_prev"), Some(0.0));
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let current = derived();
        let mut prior = create_prior_year_table(&current, 0.0);
        prior.rows.pop();

        let result = align_years(&current, &prior);
        assert!(matches!(
            result,
            Err(FinancialInsightError::AlignmentError { current: 3, prior: 2 })
        ));
    }

    #[test]
    fn test_select_year() {
        let current = derived();
        let prior = create_prior_year_table(&current, 0.0);
        let comparison = align_years(&current, &prior).unwrap();

        let selected = comparison.select_year(2022);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].current("grossMargin"), Some(70.0));
        assert!(comparison.select_year(1999).is_empty());
    }
}

use crate::error::{FinancialInsightError, Result};
use crate::schema::StatementKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One statement-year's line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalYearRow {
    pub fiscal_year: i32,
    /// Full period end when the provider label parsed as a date (e.g. `2023-06-30`)
    pub fiscal_date_ending: Option<NaiveDate>,
    #[serde(with = "nan_as_null")]
    pub values: BTreeMap<String, f64>,
}

/// Serde helpers for value maps: NaN (and infinities) are written as `null`
/// and `null` reads back as NaN.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(values: &BTreeMap<String, f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        values
            .iter()
            .map(|(k, v)| (k, v.is_finite().then_some(*v)))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
        Ok(values
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or(f64::NAN)))
            .collect())
    }
}

impl FiscalYearRow {
    pub fn new(fiscal_year: i32) -> Self {
        Self {
            fiscal_year,
            fiscal_date_ending: None,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// Rows of one statement type, most recent fiscal year first.
///
/// Every derived step (prior-year shift, growth rates, trend windows) reads
/// "the next row" as "the year before", so the descending order is load-bearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    pub kind: StatementKind,
    pub rows: Vec<FiscalYearRow>,
}

/// A statement table whose KPI columns have been recomputed in full.
pub type DerivedKpiTable = StatementTable;

impl StatementTable {
    pub fn new(kind: StatementKind, rows: Vec<FiscalYearRow>) -> Self {
        Self { kind, rows }
    }

    /// Builds a table from named columns, one value per fiscal year.
    /// Columns shorter than `fiscal_years` leave the remaining rows without that key.
    pub fn from_columns(kind: StatementKind, fiscal_years: &[i32], columns: &[(&str, &[f64])]) -> Self {
        let rows = fiscal_years
            .iter()
            .enumerate()
            .map(|(idx, &year)| {
                let mut row = FiscalYearRow::new(year);
                for (name, values) in columns {
                    if let Some(&value) = values.get(idx) {
                        row.values.insert((*name).to_string(), value);
                    }
                }
                row
            })
            .collect();

        Self { kind, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fiscal_years(&self) -> Vec<i32> {
        self.rows.iter().map(|r| r.fiscal_year).collect()
    }

    /// Column names of the first row; all rows share them once validated.
    pub fn column_names(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.values.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_column(&self, name: &str) -> bool {
        !self.rows.is_empty() && self.rows.iter().all(|r| r.values.contains_key(name))
    }

    pub fn has_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.has_column(n))
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.get(name)).collect()
    }

    pub fn require_column(&self, name: &str) -> Result<Vec<f64>> {
        self.column(name)
            .ok_or_else(|| FinancialInsightError::MissingColumn(name.to_string()))
    }

    /// Writes one value per row. `values` must be as long as the table.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(FinancialInsightError::AlignmentError {
                current: self.rows.len(),
                prior: values.len(),
            });
        }

        for (row, value) in self.rows.iter_mut().zip(values) {
            row.values.insert(name.to_string(), value);
        }

        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) {
        for row in &mut self.rows {
            row.values.remove(name);
        }
    }

    pub fn is_descending(&self) -> bool {
        self.rows
            .windows(2)
            .all(|pair| pair[0].fiscal_year > pair[1].fiscal_year)
    }

    pub fn sort_descending(&mut self) {
        self.rows.sort_by(|a, b| b.fiscal_year.cmp(&a.fiscal_year));
    }

    /// Checks the shared key set and unique fiscal year invariants.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for row in &self.rows {
            if !seen.insert(row.fiscal_year) {
                return Err(FinancialInsightError::DuplicateFiscalYear(row.fiscal_year));
            }
        }

        if let Some(first) = self.rows.first() {
            for (idx, row) in self.rows.iter().enumerate().skip(1) {
                let same_keys = row.values.len() == first.values.len()
                    && row.values.keys().all(|k| first.values.contains_key(k));
                if !same_keys {
                    return Err(FinancialInsightError::InconsistentColumns {
                        row: idx,
                        fiscal_year: row.fiscal_year,
                    });
                }
            }
        }

        Ok(())
    }
}

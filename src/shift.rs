use crate::table::StatementTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Suffix that marks a prior-year column (`grossMargin` -> `grossMargin_prev`).
pub const PREV_SUFFIX: &str = "_prev";

pub fn prev_column(name: &str) -> String {
    format!("{}{}", name, PREV_SUFFIX)
}

/// Each row holds the numeric values of the following source row, renamed with
/// [`PREV_SUFFIX`]. The last row has nothing to shift from and holds the fill value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorYearTable {
    pub rows: Vec<BTreeMap<String, f64>>,
}

impl PriorYearTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.rows.iter().map(|r| r.get(name).copied()).collect()
    }
}

/// Shifts every numeric column up by one row. The fiscal year itself is not carried.
pub fn create_prior_year_table(table: &StatementTable, fill_value: f64) -> PriorYearTable {
    let columns = table.column_names();

    let rows = (0..table.len())
        .map(|idx| {
            let source = table.rows.get(idx + 1);
            columns
                .iter()
                .map(|name| {
                    let value = source
                        .and_then(|row| row.get(name))
                        .unwrap_or(fill_value);
                    (prev_column(name), value)
                })
                .collect()
        })
        .collect();

    PriorYearTable { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StatementKind;

    #[test]
    fn test_shift_moves_next_row_up() {
        let table = StatementTable::from_columns(
            StatementKind::IncomeStatement,
            &[2023, 2022, 2021],
            &[
                ("grossMargin", &[80.0, 70.0, 60.0]),
                ("totalRevenue", &[100.0, 100.0, 100.0]),
            ],
        );

        let prior = create_prior_year_table(&table, 0.0);
        assert_eq!(prior.len(), 3);
        assert_eq!(prior.column("grossMargin_prev"), Some(vec![70.0, 60.0, 0.0]));
        assert_eq!(prior.column("totalRevenue_prev"), Some(vec![100.0, 100.0, 0.0]));
        assert_eq!(prior.rows[0].len(), 2);
        assert!(prior.column("grossMargin").is_none());
    }

    #[test]
    fn test_single_row_is_all_fill() {
        let table = StatementTable::from_columns(
            StatementKind::BalanceSheet,
            &[2023],
            &[("totalAssets", &[10.0]), ("inventory", &[2.0])],
        );

        let prior = create_prior_year_table(&table, 0.0);
        assert_eq!(prior.len(), 1);
        assert!(prior.rows[0].values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_table() {
        let table = StatementTable::new(StatementKind::CashFlow, Vec::new());
        let prior = create_prior_year_table(&table, 0.0);
        assert!(prior.is_empty());
    }

    #[test]
    fn test_nan_values_shift_unchanged() {
        let table = StatementTable::from_columns(
            StatementKind::CashFlow,
            &[2023, 2022],
            &[("operatingCashFlowGrowth", &[5.0, f64::NAN])],
        );

        let prior = create_prior_year_table(&table, 0.0);
        assert!(prior.rows[0]["operatingCashFlowGrowth_prev"].is_nan());
        assert_eq!(prior.rows[1]["operatingCashFlowGrowth_prev"], 0.0);
    }
}

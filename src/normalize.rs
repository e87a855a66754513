use crate::error::{FinancialInsightError, Result};
use crate::ingestion::{RawStatement, FISCAL_DATE_ENDING, REPORTED_CURRENCY};
use crate::schema::{AnalysisConfig, InvalidYearPolicy, MissingValuePolicy, StatementKind};
use crate::table::{FiscalYearRow, StatementTable};
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::HashSet;

/// Reshapes a wide raw statement into one row per fiscal year.
pub struct StatementNormalizer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> StatementNormalizer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn normalize(&self, raw: &RawStatement, kind: StatementKind) -> Result<StatementTable> {
        if raw.lines.is_empty() {
            return Err(FinancialInsightError::NormalizationError {
                statement: kind.to_string(),
                details: "statement has no header row".to_string(),
            });
        }

        let period_line = raw.line(FISCAL_DATE_ENDING).ok_or_else(|| {
            FinancialInsightError::NormalizationError {
                statement: kind.to_string(),
                details: format!("missing '{}' period column", FISCAL_DATE_ENDING),
            }
        })?;

        let value_lines: Vec<_> = {
            let mut seen = HashSet::new();
            raw.lines
                .iter()
                .filter(|l| l.label != FISCAL_DATE_ENDING && l.label != REPORTED_CURRENCY)
                .filter(|l| {
                    let first = seen.insert(l.label.as_str());
                    if !first {
                        warn!("{}: duplicate line item '{}' ignored", kind, l.label);
                    }
                    first
                })
                .collect()
        };

        let mut rows = Vec::with_capacity(period_line.cells.len());

        for (period_idx, period) in period_line.cells.iter().enumerate() {
            let fiscal_year = match parse_fiscal_year(period) {
                Ok(year) => year,
                Err(e) => match self.config.invalid_year_policy {
                    InvalidYearPolicy::Abort => return Err(e),
                    InvalidYearPolicy::DropRow => {
                        warn!("{}: dropping period '{}' ({})", kind, period, e);
                        continue;
                    }
                },
            };

            let mut row = FiscalYearRow::new(fiscal_year);
            row.fiscal_date_ending = NaiveDate::parse_from_str(period.trim(), "%Y-%m-%d").ok();

            for line in &value_lines {
                let cell = line.cells.get(period_idx).map(String::as_str).unwrap_or("");
                let value = match parse_numeric(cell) {
                    Some(v) => v,
                    None => self.missing_value(&line.label, period)?,
                };
                row.values.insert(line.label.clone(), value);
            }

            rows.push(row);
        }

        let mut table = StatementTable::new(kind, rows);
        table.validate()?;

        if self.config.sort_by_fiscal_year {
            table.sort_descending();
        } else if !table.is_descending() {
            warn!(
                "{}: fiscal years {:?} are not in descending order; prior-year comparisons will follow row order",
                kind,
                table.fiscal_years()
            );
        }

        debug!(
            "Normalized {} into {} fiscal years and {} line items",
            kind,
            table.len(),
            value_lines.len()
        );

        Ok(table)
    }

    fn missing_value(&self, column: &str, period: &str) -> Result<f64> {
        match self.config.missing_value_policy {
            MissingValuePolicy::ZeroFill => Ok(0.0),
            MissingValuePolicy::PropagateNull => Ok(f64::NAN),
            MissingValuePolicy::Reject => Err(FinancialInsightError::MissingValue {
                column: column.to_string(),
                period: period.to_string(),
            }),
        }
    }
}

pub fn normalize_statement(
    raw: &RawStatement,
    kind: StatementKind,
    config: &AnalysisConfig,
) -> Result<StatementTable> {
    StatementNormalizer::new(config).normalize(raw, kind)
}

/// Reads the fiscal year from the leading 4 characters of a period label
/// (`"2023-06-30"` -> 2023).
pub fn parse_fiscal_year(period: &str) -> Result<i32> {
    let trimmed = period.trim();
    let prefix: String = trimmed.chars().take(4).collect();

    if prefix.len() != 4 || !prefix.chars().all(|c| c.is_ascii_digit()) {
        return Err(FinancialInsightError::ParseError(period.to_string()));
    }

    prefix
        .parse::<i32>()
        .map_err(|_| FinancialInsightError::ParseError(period.to_string()))
}

fn parse_numeric(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return None;
    }

    trimmed
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::RawLine;

    fn line(label: &str, cells: &[&str]) -> RawLine {
        RawLine {
            label: label.to_string(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn raw_income_statement() -> RawStatement {
        RawStatement::new(vec![
            line(FISCAL_DATE_ENDING, &["2023-06-30", "2022-06-30", "2021-06-30"]),
            line(REPORTED_CURRENCY, &["USD", "USD", "USD"]),
            line("totalRevenue", &["211915", "198270", "168088"]),
            line("interestExpense", &["1968", "None", "2346"]),
        ])
    }

    #[test]
    fn test_normalize_promotes_headers_and_drops_currency() {
        let config = AnalysisConfig::default();
        let table =
            normalize_statement(&raw_income_statement(), StatementKind::IncomeStatement, &config)
                .unwrap();

        assert_eq!(table.fiscal_years(), vec![2023, 2022, 2021]);
        assert!(!table.has_column(REPORTED_CURRENCY));
        assert!(!table.has_column(FISCAL_DATE_ENDING));
        assert_eq!(table.column("totalRevenue"), Some(vec![211915.0, 198270.0, 168088.0]));
        assert_eq!(
            table.rows[0].fiscal_date_ending,
            NaiveDate::from_ymd_opt(2023, 6, 30)
        );
    }

    #[test]
    fn test_missing_value_policies() {
        let raw = raw_income_statement();

        let zero = normalize_statement(&raw, StatementKind::IncomeStatement, &AnalysisConfig::default())
            .unwrap();
        assert_eq!(zero.rows[1].get("interestExpense"), Some(0.0));

        let config = AnalysisConfig {
            missing_value_policy: MissingValuePolicy::PropagateNull,
            ..Default::default()
        };
        let null = normalize_statement(&raw, StatementKind::IncomeStatement, &config).unwrap();
        assert!(null.rows[1].get("interestExpense").unwrap().is_nan());

        let config = AnalysisConfig {
            missing_value_policy: MissingValuePolicy::Reject,
            ..Default::default()
        };
        let rejected = normalize_statement(&raw, StatementKind::IncomeStatement, &config);
        assert!(matches!(
            rejected,
            Err(FinancialInsightError::MissingValue { ref column, .. }) if column == "interestExpense"
        ));
    }

    #[test]
    fn test_invalid_year_policies() {
        let raw = RawStatement::new(vec![
            line(FISCAL_DATE_ENDING, &["2023-12-31", "FY22", "2021-12-31"]),
            line("totalAssets", &["10", "9", "8"]),
        ]);

        let aborted = normalize_statement(&raw, StatementKind::BalanceSheet, &AnalysisConfig::default());
        assert!(matches!(aborted, Err(FinancialInsightError::ParseError(_))));

        let config = AnalysisConfig {
            invalid_year_policy: InvalidYearPolicy::DropRow,
            ..Default::default()
        };
        let dropped = normalize_statement(&raw, StatementKind::BalanceSheet, &config).unwrap();
        assert_eq!(dropped.fiscal_years(), vec![2023, 2021]);
        assert_eq!(dropped.column("totalAssets"), Some(vec![10.0, 8.0]));
    }

    #[test]
    fn test_structural_errors() {
        let config = AnalysisConfig::default();

        let empty = normalize_statement(&RawStatement::default(), StatementKind::CashFlow, &config);
        assert!(matches!(empty, Err(FinancialInsightError::NormalizationError { .. })));

        let no_period = RawStatement::new(vec![line("operatingCashflow", &["1", "2"])]);
        let result = normalize_statement(&no_period, StatementKind::CashFlow, &config);
        assert!(matches!(result, Err(FinancialInsightError::NormalizationError { .. })));

        let duplicate = RawStatement::new(vec![
            line(FISCAL_DATE_ENDING, &["2023-12-31", "2023-06-30"]),
            line("operatingCashflow", &["1", "2"]),
        ]);
        let result = normalize_statement(&duplicate, StatementKind::CashFlow, &config);
        assert!(matches!(result, Err(FinancialInsightError::DuplicateFiscalYear(2023))));
    }

    #[test]
    fn test_sort_by_fiscal_year() {
        let raw = RawStatement::new(vec![
            line(FISCAL_DATE_ENDING, &["2021-12-31", "2023-12-31", "2022-12-31"]),
            line("totalAssets", &["8", "10", "9"]),
        ]);

        let kept = normalize_statement(&raw, StatementKind::BalanceSheet, &AnalysisConfig::default())
            .unwrap();
        assert_eq!(kept.fiscal_years(), vec![2021, 2023, 2022]);

        let config = AnalysisConfig {
            sort_by_fiscal_year: true,
            ..Default::default()
        };
        let sorted = normalize_statement(&raw, StatementKind::BalanceSheet, &config).unwrap();
        assert_eq!(sorted.fiscal_years(), vec![2023, 2022, 2021]);
        assert_eq!(sorted.column("totalAssets"), Some(vec![10.0, 9.0, 8.0]));
    }

    #[test]
    fn test_parse_fiscal_year() {
        assert_eq!(parse_fiscal_year("2023-06-30").unwrap(), 2023);
        assert_eq!(parse_fiscal_year(" 1999").unwrap(), 1999);
        assert!(parse_fiscal_year("23-06").is_err());
        assert!(parse_fiscal_year("").is_err());
    }
}

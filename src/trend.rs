//! Three-year trend classification over consecutive rows.
//!
//! Rows are newest first, so a window whose values *decrease* down the table
//! is a KPI that *grew* over time.

use crate::align::ComparisonTable;
use crate::schema::StatementKind;
use log::debug;
use serde::{Deserialize, Serialize};

pub const TREND_WINDOW: usize = 3;

pub const INSUFFICIENT_DATA: &str = "Insufficient data for trend analysis over three years.";

pub const INCOME_STATEMENT_TREND_KPIS: [&str; 28] = [
    "grossProfit",
    "totalRevenue",
    "costOfRevenue",
    "costofGoodsAndServicesSold",
    "operatingIncome",
    "sellingGeneralAndAdministrative",
    "researchAndDevelopment",
    "operatingExpenses",
    "investmentIncomeNet",
    "netInterestIncome",
    "interestIncome",
    "interestExpense",
    "nonInterestIncome",
    "otherNonOperatingIncome",
    "depreciation",
    "depreciationAndAmortization",
    "incomeBeforeTax",
    "incomeTaxExpense",
    "interestAndDebtExpense",
    "netIncomeFromContinuingOperations",
    "comprehensiveIncomeNetOfTax",
    "ebit",
    "ebitda",
    "netIncome",
    "grossMargin",
    "operatingMargin",
    "netProfitMargin",
    "interestCoverageRatio",
];

pub const CASH_FLOW_TREND_KPIS: [&str; 32] = [
    "operatingCashflow",
    "paymentsForOperatingActivities",
    "proceedsFromOperatingActivities",
    "changeInOperatingLiabilities",
    "changeInOperatingAssets",
    "depreciationDepletionAndAmortization",
    "capitalExpenditures",
    "changeInReceivables",
    "changeInInventory",
    "profitLoss",
    "cashflowFromInvestment",
    "cashflowFromFinancing",
    "proceedsFromRepaymentsOfShortTermDebt",
    "paymentsForRepurchaseOfCommonStock",
    "paymentsForRepurchaseOfEquity",
    "paymentsForRepurchaseOfPreferredStock",
    "dividendPayout",
    "dividendPayoutCommonStock",
    "dividendPayoutPreferredStock",
    "proceedsFromIssuanceOfCommonStock",
    "proceedsFromIssuanceOfLongTermDebtAndCapitalSecuritiesNet",
    "proceedsFromIssuanceOfPreferredStock",
    "proceedsFromRepurchaseOfEquity",
    "proceedsFromSaleOfTreasuryStock",
    "changeInCashAndCashEquivalents",
    "changeInExchangeRate",
    "netIncome",
    "freeCashFlow",
    "capitalExpenditureRatio",
    "operatingCashFlowGrowth",
    "dividendPayoutRatio",
    "reinvestmentRatio",
];

pub const BALANCE_SHEET_TREND_KPIS: [&str; 45] = [
    "totalAssets",
    "totalCurrentAssets",
    "cashAndCashEquivalentsAtCarryingValue",
    "cashAndShortTermInvestments",
    "inventory",
    "currentNetReceivables",
    "totalNonCurrentAssets",
    "propertyPlantEquipment",
    "accumulatedDepreciationAmortizationPPE",
    "intangibleAssets",
    "intangibleAssetsExcludingGoodwill",
    "goodwill",
    "investments",
    "longTermInvestments",
    "shortTermInvestments",
    "otherCurrentAssets",
    "otherNonCurrentAssets",
    "totalLiabilities",
    "totalCurrentLiabilities",
    "currentAccountsPayable",
    "deferredRevenue",
    "currentDebt",
    "shortTermDebt",
    "totalNonCurrentLiabilities",
    "capitalLeaseObligations",
    "longTermDebt",
    "currentLongTermDebt",
    "longTermDebtNoncurrent",
    "shortLongTermDebtTotal",
    "otherCurrentLiabilities",
    "otherNonCurrentLiabilities",
    "totalShareholderEquity",
    "treasuryStock",
    "retainedEarnings",
    "commonStock",
    "commonStockSharesOutstanding",
    "currentRatio",
    "quickRatio",
    "cashRatio",
    "debtToAssetsRatio",
    "debtToEquityRatio",
    "equityRatio",
    "workingCapital",
    "netWorkingCapitalRatio",
    "bookValuePerShare",
];

pub fn trend_kpis(kind: StatementKind) -> &'static [&'static str] {
    match kind {
        StatementKind::IncomeStatement => &INCOME_STATEMENT_TREND_KPIS,
        StatementKind::CashFlow => &CASH_FLOW_TREND_KPIS,
        StatementKind::BalanceSheet => &BALANCE_SHEET_TREND_KPIS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    GrownConsistently,
    DeclinedConsistently,
    Stable,
    Fluctuating,
    /// A NaN in the window; no classification possible
    Undetermined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiTrend {
    pub kpi: String,
    pub direction: TrendDirection,
}

impl KpiTrend {
    pub fn sentence(&self, ending_year: i32) -> String {
        let kpi = self.kpi.replace('_', " ");
        match self.direction {
            TrendDirection::GrownConsistently => format!(
                "The {} has grown consistently over the past three years ending in {}.",
                kpi, ending_year
            ),
            TrendDirection::DeclinedConsistently => format!(
                "The {} has declined consistently over the past three years ending in {}.",
                kpi, ending_year
            ),
            TrendDirection::Stable => format!(
                "The {} has remained stable over the past three years ending in {}.",
                kpi, ending_year
            ),
            TrendDirection::Fluctuating => format!(
                "The {} has shown fluctuations over the past three years ending in {}.",
                kpi, ending_year
            ),
            TrendDirection::Undetermined => format!(
                "The {} could not be classified over the past three years ending in {} because of missing values.",
                kpi, ending_year
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowTrends {
    Classified { fiscal_year: i32, trends: Vec<KpiTrend> },
    Insufficient { fiscal_year: i32 },
}

impl RowTrends {
    pub fn render(&self) -> String {
        match self {
            RowTrends::Classified { fiscal_year, trends } => trends
                .iter()
                .map(|t| t.sentence(*fiscal_year))
                .collect::<Vec<_>>()
                .join(" "),
            RowTrends::Insufficient { .. } => INSUFFICIENT_DATA.to_string(),
        }
    }

    pub fn direction_of(&self, kpi: &str) -> Option<TrendDirection> {
        match self {
            RowTrends::Classified { trends, .. } => {
                trends.iter().find(|t| t.kpi == kpi).map(|t| t.direction)
            }
            RowTrends::Insufficient { .. } => None,
        }
    }
}

/// Classifies one window `[newest, middle, oldest]`.
///
/// `tolerance` is relative to the largest magnitude in the window; two values
/// closer than that count as equal. A tolerance of `0.0` compares exactly.
pub fn classify_window(window: [f64; 3], tolerance: f64) -> TrendDirection {
    if window.iter().any(|v| v.is_nan()) {
        return TrendDirection::Undetermined;
    }

    let scale = window.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let margin = tolerance.max(0.0) * scale;

    let [newest, middle, oldest] = window;
    let above = |a: f64, b: f64| a - b > margin;
    let equal = |a: f64, b: f64| (a - b).abs() <= margin;

    if above(newest, middle) && above(middle, oldest) {
        TrendDirection::GrownConsistently
    } else if above(middle, newest) && above(oldest, middle) {
        TrendDirection::DeclinedConsistently
    } else if equal(newest, middle) && equal(middle, oldest) {
        TrendDirection::Stable
    } else {
        TrendDirection::Fluctuating
    }
}

/// One entry per row: rows with two following rows are classified for every
/// KPI in `kpis` the table carries; the last two rows are `Insufficient`.
pub fn classify_trends(table: &ComparisonTable, kpis: &[&str], tolerance: f64) -> Vec<RowTrends> {
    let present: Vec<&str> = kpis
        .iter()
        .copied()
        .filter(|kpi| table.rows.iter().all(|r| r.current.contains_key(*kpi)))
        .collect();

    if present.len() < kpis.len() {
        debug!(
            "{}: {} of {} trend KPIs are not in the table and are skipped",
            table.kind,
            kpis.len() - present.len(),
            kpis.len()
        );
    }

    (0..table.len())
        .map(|idx| {
            let fiscal_year = table.rows[idx].fiscal_year;
            if idx + TREND_WINDOW > table.len() {
                return RowTrends::Insufficient { fiscal_year };
            }

            let trends = present
                .iter()
                .map(|kpi| {
                    let value = |offset: usize| {
                        table.rows[idx + offset].current(kpi).unwrap_or(f64::NAN)
                    };
                    KpiTrend {
                        kpi: kpi.to_string(),
                        direction: classify_window([value(0), value(1), value(2)], tolerance),
                    }
                })
                .collect();

            RowTrends::Classified { fiscal_year, trends }
        })
        .collect()
}

/// Classifies the statement's standard KPI vocabulary.
pub fn classify_statement_trends(table: &ComparisonTable, tolerance: f64) -> Vec<RowTrends> {
    classify_trends(table, trend_kpis(table.kind), tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_years;
    use crate::shift::create_prior_year_table;
    use crate::table::StatementTable;

    fn revenue_table(values: &[f64]) -> ComparisonTable {
        let years: Vec<i32> = (0..values.len() as i32).map(|i| 2023 - i).collect();
        let table = StatementTable::from_columns(
            StatementKind::IncomeStatement,
            &years,
            &[("totalRevenue", values)],
        );
        let prior = create_prior_year_table(&table, 0.0);
        align_years(&table, &prior).unwrap()
    }

    #[test]
    fn test_descending_values_mean_growth() {
        let trends = classify_trends(&revenue_table(&[100.0, 90.0, 80.0, 70.0]), &["totalRevenue"], 0.0);

        assert_eq!(trends.len(), 4);
        assert_eq!(trends[0].direction_of("totalRevenue"), Some(TrendDirection::GrownConsistently));
        assert_eq!(trends[1].direction_of("totalRevenue"), Some(TrendDirection::GrownConsistently));
        assert_eq!(trends[2], RowTrends::Insufficient { fiscal_year: 2021 });
        assert_eq!(trends[3].render(), INSUFFICIENT_DATA);
        assert_eq!(
            trends[0].render(),
            "The totalRevenue has grown consistently over the past three years ending in 2023."
        );
    }

    #[test]
    fn test_ascending_values_mean_decline() {
        let trends = classify_trends(&revenue_table(&[70.0, 80.0, 90.0]), &["totalRevenue"], 0.0);
        assert_eq!(trends[0].direction_of("totalRevenue"), Some(TrendDirection::DeclinedConsistently));
    }

    #[test]
    fn test_stable_and_fluctuating() {
        let stable = classify_trends(&revenue_table(&[100.0, 100.0, 100.0, 100.0]), &["totalRevenue"], 0.0);
        assert_eq!(stable[0].direction_of("totalRevenue"), Some(TrendDirection::Stable));
        assert_eq!(stable[1].direction_of("totalRevenue"), Some(TrendDirection::Stable));

        let fluctuating = classify_trends(&revenue_table(&[100.0, 80.0, 90.0, 70.0]), &["totalRevenue"], 0.0);
        assert_eq!(fluctuating[0].direction_of("totalRevenue"), Some(TrendDirection::Fluctuating));
        assert_eq!(fluctuating[1].direction_of("totalRevenue"), Some(TrendDirection::Fluctuating));
    }

    #[test]
    fn test_tolerance_absorbs_float_noise() {
        let window = [0.1 + 0.2, 0.3, 0.3];
        assert_eq!(classify_window(window, 0.0), TrendDirection::Fluctuating);
        assert_eq!(classify_window(window, 1e-9), TrendDirection::Stable);
        assert_eq!(classify_window([3.0, 2.0, 1.0], 1e-9), TrendDirection::GrownConsistently);
    }

    #[test]
    fn test_nan_is_undetermined() {
        assert_eq!(classify_window([1.0, f64::NAN, 3.0], 0.0), TrendDirection::Undetermined);
    }

    #[test]
    fn test_short_tables_are_insufficient() {
        let trends = classify_trends(&revenue_table(&[100.0, 90.0]), &["totalRevenue"], 0.0);
        assert!(trends.iter().all(|t| matches!(t, RowTrends::Insufficient { .. })));

        let empty = classify_trends(&revenue_table(&[]), &["totalRevenue"], 0.0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_absent_kpis_are_skipped() {
        let trends = classify_trends(&revenue_table(&[3.0, 2.0, 1.0]), &["totalRevenue", "ebit"], 0.0);
        assert_eq!(trends[0].direction_of("ebit"), None);
        assert!(trends[0].direction_of("totalRevenue").is_some());
    }
}

//! Derived ratio columns for the three statement types.
//!
//! Every calculator first strips the columns it owns and then recomputes them,
//! so running it on an already-derived table gives the same result as running
//! it once. A derived column is only written when all of its inputs exist.

use crate::error::Result;
use crate::schema::StatementKind;
use crate::table::{DerivedKpiTable, StatementTable};
use log::{debug, warn};

pub const INCOME_STATEMENT_KPIS: [&str; 4] = [
    "grossMargin",
    "operatingMargin",
    "netProfitMargin",
    "interestCoverageRatio",
];

pub const CASH_FLOW_KPIS: [&str; 6] = [
    "freeCashFlow",
    "capitalExpenditureRatio",
    "operatingCashFlowGrowth",
    "dividendPayoutRatio",
    "cashFlowMargin",
    "reinvestmentRatio",
];

pub const BALANCE_SHEET_KPIS: [&str; 9] = [
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

/// Columns each calculator owns and rewrites on every run.
pub fn derived_columns(kind: StatementKind) -> &'static [&'static str] {
    match kind {
        StatementKind::IncomeStatement => &INCOME_STATEMENT_KPIS,
        StatementKind::CashFlow => &CASH_FLOW_KPIS,
        StatementKind::BalanceSheet => &BALANCE_SHEET_KPIS,
    }
}

/// Division that never panics: a zero denominator or a NaN operand yields NaN.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || numerator.is_nan() || denominator.is_nan() {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Percent change from `previous` to `current`, NaN when undefined.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    safe_divide(current - previous, previous) * 100.0
}

pub fn calculate_kpis(table: &StatementTable, revenue: Option<&[f64]>) -> Result<DerivedKpiTable> {
    match table.kind {
        StatementKind::IncomeStatement => calculate_income_statement_kpis(table),
        StatementKind::CashFlow => calculate_cash_flow_kpis(table, revenue),
        StatementKind::BalanceSheet => calculate_balance_sheet_kpis(table),
    }
}

pub fn calculate_income_statement_kpis(table: &StatementTable) -> Result<DerivedKpiTable> {
    let mut derived = strip_derived(table, StatementKind::IncomeStatement);

    derive_ratio(&mut derived, "grossMargin", "grossProfit", "totalRevenue", 100.0)?;
    derive_ratio(&mut derived, "operatingMargin", "operatingIncome", "totalRevenue", 100.0)?;
    derive_ratio(&mut derived, "netProfitMargin", "netIncome", "totalRevenue", 100.0)?;
    derive_ratio(&mut derived, "interestCoverageRatio", "ebit", "interestExpense", 1.0)?;

    debug!("Derived income statement KPIs for {} years", derived.len());
    Ok(derived)
}

/// Cash flow KPIs. `revenue` is an optional external series (one value per row,
/// same order as the table) used for the cash flow margin.
pub fn calculate_cash_flow_kpis(table: &StatementTable, revenue: Option<&[f64]>) -> Result<DerivedKpiTable> {
    let mut derived = strip_derived(table, StatementKind::CashFlow);

    derive_rows(&mut derived, "freeCashFlow", &["operatingCashflow", "capitalExpenditures"], |v| {
        v[0] - v[1]
    })?;
    derive_ratio(&mut derived, "capitalExpenditureRatio", "operatingCashflow", "capitalExpenditures", 1.0)?;

    if let Some(ocf) = derived.column("operatingCashflow") {
        // rows run newest first, so each year's prior period is the next row
        let growth = (0..ocf.len())
            .map(|i| match ocf.get(i + 1) {
                Some(&previous) => percent_change(ocf[i], previous),
                None => f64::NAN,
            })
            .collect();
        derived.set_column("operatingCashFlowGrowth", growth)?;
    }

    derive_ratio(&mut derived, "dividendPayoutRatio", "dividendPayoutCommonStock", "operatingCashflow", 1.0)?;

    if let (Some(revenue), Some(ocf)) = (revenue, derived.column("operatingCashflow")) {
        if revenue.len() != ocf.len() {
            warn!(
                "Revenue series has {} values for {} cash flow rows; unmatched rows get no cash flow margin",
                revenue.len(),
                ocf.len()
            );
        }
        let margin = ocf
            .iter()
            .enumerate()
            .map(|(i, &cash)| match revenue.get(i) {
                Some(&rev) => safe_divide(cash, rev) * 100.0,
                None => f64::NAN,
            })
            .collect();
        derived.set_column("cashFlowMargin", margin)?;
    }

    derive_ratio(&mut derived, "reinvestmentRatio", "capitalExpenditures", "operatingCashflow", 1.0)?;

    debug!("Derived cash flow KPIs for {} years", derived.len());
    Ok(derived)
}

pub fn calculate_balance_sheet_kpis(table: &StatementTable) -> Result<DerivedKpiTable> {
    let mut derived = strip_derived(table, StatementKind::BalanceSheet);

    derive_ratio(&mut derived, "currentRatio", "totalCurrentAssets", "totalCurrentLiabilities", 1.0)?;
    derive_rows(
        &mut derived,
        "quickRatio",
        &["totalCurrentAssets", "inventory", "totalCurrentLiabilities"],
        |v| safe_divide(v[0] - v[1], v[2]),
    )?;
    derive_ratio(
        &mut derived,
        "cashRatio",
        "cashAndCashEquivalentsAtCarryingValue",
        "totalCurrentLiabilities",
        1.0,
    )?;
    derive_ratio(&mut derived, "debtToAssetsRatio", "totalLiabilities", "totalAssets", 1.0)?;
    derive_ratio(&mut derived, "debtToEquityRatio", "totalLiabilities", "totalShareholderEquity", 1.0)?;
    derive_ratio(&mut derived, "equityRatio", "totalShareholderEquity", "totalAssets", 1.0)?;
    derive_rows(
        &mut derived,
        "workingCapital",
        &["totalCurrentAssets", "totalCurrentLiabilities"],
        |v| v[0] - v[1],
    )?;
    // reads workingCapital, so it must run after it
    derive_ratio(&mut derived, "netWorkingCapitalRatio", "workingCapital", "totalAssets", 1.0)?;
    derive_ratio(
        &mut derived,
        "bookValuePerShare",
        "totalShareholderEquity",
        "commonStockSharesOutstanding",
        1.0,
    )?;

    debug!("Derived balance sheet KPIs for {} years", derived.len());
    Ok(derived)
}

fn strip_derived(table: &StatementTable, kind: StatementKind) -> StatementTable {
    let mut stripped = table.clone();
    for column in derived_columns(kind) {
        stripped.remove_column(column);
    }
    stripped
}

fn derive_ratio(
    table: &mut StatementTable,
    target: &str,
    numerator: &str,
    denominator: &str,
    scale: f64,
) -> Result<()> {
    derive_rows(table, target, &[numerator, denominator], |v| {
        safe_divide(v[0], v[1]) * scale
    })
}

fn derive_rows<F>(table: &mut StatementTable, target: &str, inputs: &[&str], formula: F) -> Result<()>
where
    F: Fn(&[f64]) -> f64,
{
    if !table.has_columns(inputs) {
        debug!("{}: skipping {} (requires {:?})", table.kind, target, inputs);
        return Ok(());
    }

    let values: Vec<f64> = table
        .rows
        .iter()
        .map(|row| {
            let args: Vec<f64> = inputs
                .iter()
                .map(|name| row.get(name).unwrap_or(f64::NAN))
                .collect();
            formula(&args)
        })
        .collect();

    table.set_column(target, values)
}

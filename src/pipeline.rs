use crate::align::{align_years, ComparisonRow, ComparisonTable};
use crate::cache::StatementCache;
use crate::error::{FinancialInsightError, Result};
use crate::health::{health_score, HealthScore};
use crate::ingestion::RawStatement;
use crate::kpi::calculate_kpis;
use crate::narrative::NarrativeRenderer;
use crate::normalize::StatementNormalizer;
use crate::schema::{AnalysisConfig, StatementKind};
use crate::shift::create_prior_year_table;
use crate::table::StatementTable;
use crate::trend::classify_statement_trends;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Raw statements for one company. Any of the three may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSet {
    pub balance_sheet: Option<RawStatement>,
    pub income_statement: Option<RawStatement>,
    pub cash_flow: Option<RawStatement>,
}

impl StatementSet {
    pub fn with(mut self, kind: StatementKind, raw: RawStatement) -> Self {
        *self.slot_mut(kind) = Some(raw);
        self
    }

    pub fn get(&self, kind: StatementKind) -> Option<&RawStatement> {
        match kind {
            StatementKind::BalanceSheet => self.balance_sheet.as_ref(),
            StatementKind::IncomeStatement => self.income_statement.as_ref(),
            StatementKind::CashFlow => self.cash_flow.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: StatementKind) -> &mut Option<RawStatement> {
        match kind {
            StatementKind::BalanceSheet => &mut self.balance_sheet,
            StatementKind::IncomeStatement => &mut self.income_statement,
            StatementKind::CashFlow => &mut self.cash_flow,
        }
    }

    pub fn is_empty(&self) -> bool {
        StatementKind::ALL.iter().all(|k| self.get(*k).is_none())
    }

    /// Reads whatever the cache holds for `symbol`; missing files leave the slot empty.
    pub fn from_cache(cache: &StatementCache, symbol: &str) -> Result<Self> {
        let mut set = Self::default();
        for kind in StatementKind::ALL {
            *set.slot_mut(kind) = cache.load(symbol, kind)?;
        }
        Ok(set)
    }
}

/// Everything a presentation layer needs for one fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearView {
    pub fiscal_year: i32,
    pub balance_sheet: Vec<ComparisonRow>,
    pub income_statement: Vec<ComparisonRow>,
    pub cash_flow: Vec<ComparisonRow>,
    pub health: Option<HealthScore>,
}

/// A statement that could not be analyzed while the others were.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementFailure {
    pub kind: StatementKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub balance_sheet: Option<ComparisonTable>,
    pub income_statement: Option<ComparisonTable>,
    pub cash_flow: Option<ComparisonTable>,
    /// One score per fiscal year, newest first
    pub health: Vec<HealthScore>,
    #[serde(default)]
    pub failures: Vec<StatementFailure>,
}

impl AnalysisReport {
    pub fn table(&self, kind: StatementKind) -> Option<&ComparisonTable> {
        match kind {
            StatementKind::BalanceSheet => self.balance_sheet.as_ref(),
            StatementKind::IncomeStatement => self.income_statement.as_ref(),
            StatementKind::CashFlow => self.cash_flow.as_ref(),
        }
    }

    /// Every fiscal year present in any statement, newest first.
    pub fn fiscal_years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = StatementKind::ALL
            .iter()
            .filter_map(|k| self.table(*k))
            .flat_map(|t| t.fiscal_years())
            .collect();
        years.into_iter().rev().collect()
    }

    pub fn year_view(&self, fiscal_year: i32) -> YearView {
        let rows = |kind: StatementKind| {
            self.table(kind)
                .map(|t| t.select_year(fiscal_year).into_iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        };

        YearView {
            fiscal_year,
            balance_sheet: rows(StatementKind::BalanceSheet),
            income_statement: rows(StatementKind::IncomeStatement),
            cash_flow: rows(StatementKind::CashFlow),
            health: self
                .health
                .iter()
                .find(|h| h.fiscal_year == fiscal_year)
                .cloned(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs normalize, KPI derivation, prior-year shift, alignment, trend
/// classification and narrative rendering for each statement.
#[derive(Debug, Clone, Default)]
pub struct InsightPipeline {
    config: AnalysisConfig,
}

impl InsightPipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyzes one statement. `revenue` is only read for cash flow statements
    /// and must follow the statement's row order.
    pub fn analyze_statement(
        &self,
        raw: &RawStatement,
        kind: StatementKind,
        revenue: Option<&[f64]>,
    ) -> Result<ComparisonTable> {
        let table = StatementNormalizer::new(&self.config).normalize(raw, kind)?;
        self.compare(&table, revenue)
    }

    /// Analyzes every statement in the set. A statement that fails is recorded
    /// in `AnalysisReport::failures` and the others are still reported; the
    /// run only fails when no supplied statement could be analyzed.
    pub fn analyze(&self, statements: &StatementSet) -> Result<AnalysisReport> {
        let supplied = StatementKind::ALL
            .iter()
            .filter(|k| statements.get(**k).is_some())
            .count();
        info!("Analyzing {} statements", supplied);

        let normalizer = StatementNormalizer::new(&self.config);
        let mut report = AnalysisReport::default();
        let mut failures: Vec<(StatementKind, FinancialInsightError)> = Vec::new();
        let mut revenue_by_year: Option<BTreeMap<i32, f64>> = None;

        if let Some(raw) = &statements.income_statement {
            let outcome = normalizer
                .normalize(raw, StatementKind::IncomeStatement)
                .and_then(|table| {
                    if self.config.cash_flow_margin_from_income {
                        revenue_by_year = revenue_by_fiscal_year(&table);
                    }
                    self.compare(&table, None)
                });
            match outcome {
                Ok(table) => report.income_statement = Some(table),
                Err(e) => failures.push((StatementKind::IncomeStatement, e)),
            }
        }

        if let Some(raw) = &statements.balance_sheet {
            let outcome = normalizer
                .normalize(raw, StatementKind::BalanceSheet)
                .and_then(|table| self.compare(&table, None));
            match outcome {
                Ok(table) => report.balance_sheet = Some(table),
                Err(e) => failures.push((StatementKind::BalanceSheet, e)),
            }
        }

        if let Some(raw) = &statements.cash_flow {
            let outcome = normalizer
                .normalize(raw, StatementKind::CashFlow)
                .and_then(|table| {
                    let revenue = revenue_by_year.as_ref().map(|by_year| {
                        table
                            .rows
                            .iter()
                            .map(|row| by_year.get(&row.fiscal_year).copied().unwrap_or(f64::NAN))
                            .collect::<Vec<f64>>()
                    });
                    self.compare(&table, revenue.as_deref())
                });
            match outcome {
                Ok(table) => report.cash_flow = Some(table),
                Err(e) => failures.push((StatementKind::CashFlow, e)),
            }
        }

        if supplied > 0 && failures.len() == supplied {
            let (kind, error) = failures.remove(0);
            warn!("No statement could be analyzed; first failure in {}", kind);
            return Err(error);
        }

        for (kind, error) in failures {
            warn!("{} skipped: {}", kind, error);
            report.failures.push(StatementFailure {
                kind,
                message: error.to_string(),
            });
        }

        let health: Vec<HealthScore> = report
            .fiscal_years()
            .into_iter()
            .map(|year| {
                let first = |kind: StatementKind| {
                    report
                        .table(kind)
                        .and_then(|t| t.select_year(year).into_iter().next())
                };
                health_score(
                    year,
                    first(StatementKind::IncomeStatement),
                    first(StatementKind::BalanceSheet),
                    first(StatementKind::CashFlow),
                )
            })
            .collect();
        report.health = health;

        info!(
            "Analysis complete: {} fiscal years scored",
            report.health.len()
        );
        Ok(report)
    }

    fn compare(&self, table: &StatementTable, revenue: Option<&[f64]>) -> Result<ComparisonTable> {
        let derived = calculate_kpis(table, revenue)?;
        let prior = create_prior_year_table(&derived, self.config.fill_value);
        let mut comparison = align_years(&derived, &prior)?;

        let trends = classify_statement_trends(&comparison, self.config.trend_tolerance);
        NarrativeRenderer::new(self.config.narrative_format).annotate(&mut comparison, &trends);

        debug!(
            "{}: {} comparison rows with {} columns",
            comparison.kind,
            comparison.len(),
            derived.column_names().len()
        );
        Ok(comparison)
    }
}

fn revenue_by_fiscal_year(income: &StatementTable) -> Option<BTreeMap<i32, f64>> {
    match income.require_column("totalRevenue") {
        Ok(revenue) => Some(income.fiscal_years().into_iter().zip(revenue).collect()),
        Err(e) => {
            debug!("{}; cash flow margin is skipped", e);
            None
        }
    }
}

/// Caller-owned state for one analysed company: the latest report and the
/// fiscal year currently selected. A failed run leaves both untouched.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    symbol: String,
    report: Option<AnalysisReport>,
    selected_year: Option<i32>,
}

impl AnalysisSession {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            report: None,
            selected_year: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    pub fn selected_year(&self) -> Option<i32> {
        self.selected_year
    }

    pub fn run(&mut self, pipeline: &InsightPipeline, statements: &StatementSet) -> Result<&AnalysisReport> {
        match pipeline.analyze(statements) {
            Ok(report) => {
                let years = report.fiscal_years();
                if !self.selected_year.is_some_and(|y| years.contains(&y)) {
                    self.selected_year = years.first().copied();
                }
                Ok(&*self.report.insert(report))
            }
            Err(e) => {
                warn!(
                    "Analysis of {} failed, keeping the previous report: {}",
                    self.symbol, e
                );
                Err(e)
            }
        }
    }

    pub fn run_from_cache(&mut self, pipeline: &InsightPipeline, cache: &StatementCache) -> Result<&AnalysisReport> {
        let statements = StatementSet::from_cache(cache, &self.symbol)?;
        self.run(pipeline, &statements)
    }

    /// Returns false and keeps the current selection when no statement has `fiscal_year`.
    pub fn select_year(&mut self, fiscal_year: i32) -> bool {
        let available = self
            .report
            .as_ref()
            .is_some_and(|r| r.fiscal_years().contains(&fiscal_year));
        if available {
            self.selected_year = Some(fiscal_year);
        }
        available
    }

    pub fn selected_view(&self) -> Option<YearView> {
        let year = self.selected_year?;
        self.report.as_ref().map(|r| r.year_view(year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{RawLine, FISCAL_DATE_ENDING};

    fn raw(lines: &[(&str, &[&str])]) -> RawStatement {
        RawStatement::new(
            lines
                .iter()
                .map(|(label, cells)| RawLine {
                    label: label.to_string(),
                    cells: cells.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        )
    }

    fn statements() -> StatementSet {
        StatementSet::default()
            .with(
                StatementKind::IncomeStatement,
                raw(&[
                    (FISCAL_DATE_ENDING, &["2023-12-31", "2022-12-31", "2021-12-31"]),
                    ("grossProfit", &["80", "70", "60"]),
                    ("totalRevenue", &["100", "100", "100"]),
                ]),
            )
            .with(
                StatementKind::CashFlow,
                raw(&[
                    (FISCAL_DATE_ENDING, &["2023-12-31", "2022-12-31"]),
                    ("operatingCashflow", &["30", "20"]),
                    ("capitalExpenditures", &["10", "5"]),
                ]),
            )
    }

    #[test]
    fn test_analyze_statement_produces_prev_columns() {
        let pipeline = InsightPipeline::default();
        let income = statements().income_statement.unwrap();
        let table = pipeline
            .analyze_statement(&income, StatementKind::IncomeStatement, None)
            .unwrap();

        assert_eq!(table.column("grossMargin"), Some(vec![80.0, 70.0, 60.0]));
        assert_eq!(table.column("grossMargin_prev"), Some(vec![70.0, 60.0, 0.0]));
        assert_eq!(table.rows[0].current("grossMargin"), Some(80.0));
        assert_eq!(table.rows[0].previous("grossMargin"), Some(70.0));
    }

    #[test]
    fn test_cash_flow_margin_matches_revenue_by_year() {
        let report = InsightPipeline::default().analyze(&statements()).unwrap();
        let cash_flow = report.cash_flow.as_ref().unwrap();

        assert_eq!(cash_flow.column("cashFlowMargin"), Some(vec![30.0, 20.0]));
        assert_eq!(report.fiscal_years(), vec![2023, 2022, 2021]);
        assert_eq!(report.health.len(), 3);
    }

    #[test]
    fn test_cash_flow_margin_can_be_disabled() {
        let pipeline = InsightPipeline::new(AnalysisConfig {
            cash_flow_margin_from_income: false,
            ..Default::default()
        });
        let report = pipeline.analyze(&statements()).unwrap();
        assert!(report.cash_flow.unwrap().column("cashFlowMargin").is_none());
    }

    #[test]
    fn test_year_view() {
        let report = InsightPipeline::default().analyze(&statements()).unwrap();

        let view = report.year_view(2021);
        assert_eq!(view.income_statement.len(), 1);
        assert!(view.cash_flow.is_empty());
        assert!(view.balance_sheet.is_empty());
        assert_eq!(view.health.map(|h| h.fiscal_year), Some(2021));

        let missing = report.year_view(1990);
        assert!(missing.income_statement.is_empty());
        assert!(missing.health.is_none());
    }

    #[test]
    fn test_session_keeps_report_on_failure() {
        let pipeline = InsightPipeline::default();
        let mut session = AnalysisSession::new("ACME");

        session.run(&pipeline, &statements()).unwrap();
        assert_eq!(session.selected_year(), Some(2023));
        assert!(session.select_year(2022));
        assert!(!session.select_year(1990));
        assert_eq!(session.selected_year(), Some(2022));

        let broken = StatementSet::default().with(
            StatementKind::BalanceSheet,
            raw(&[(FISCAL_DATE_ENDING, &["FY23"]), ("totalAssets", &["1"])]),
        );
        assert!(session.run(&pipeline, &broken).is_err());

        let report = session.report().unwrap();
        assert!(report.income_statement.is_some());
        assert_eq!(session.selected_year(), Some(2022));
        assert_eq!(session.selected_view().unwrap().fiscal_year, 2022);
    }

    #[test]
    fn test_failed_statement_is_recorded_not_fatal() {
        let set = statements().with(
            StatementKind::BalanceSheet,
            raw(&[(FISCAL_DATE_ENDING, &["FY23"]), ("totalAssets", &["1"])]),
        );
        let report = InsightPipeline::default().analyze(&set).unwrap();

        assert!(report.income_statement.is_some());
        assert!(report.cash_flow.is_some());
        assert!(report.balance_sheet.is_none());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, StatementKind::BalanceSheet);
        assert!(report.failures[0].message.contains("FY23"));
    }

    #[test]
    fn test_report_to_json() {
        let report = InsightPipeline::default().analyze(&statements()).unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"income_statement\""));
        assert!(json.contains("grossMargin_prev"));
    }
}

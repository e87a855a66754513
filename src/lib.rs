//! # Financial Insight Builder
//!
//! A library for turning a company's annual financial statements into derived
//! KPIs, year-over-year comparisons, three-year trend classifications and
//! templated narrative insights.
//!
//! ## Core Concepts
//!
//! - **Raw Statement**: A wide grid as delivered by the data provider, one line item per row and one fiscal period per column
//! - **Statement Table**: The normalized form, one row per fiscal year, most recent year first
//! - **Derived KPIs**: Margins, liquidity, leverage and cash flow ratios recomputed from the line items
//! - **Comparison Table**: Each year's values next to the year before it (`grossMargin` beside `grossMargin_prev`)
//! - **Trends and Narratives**: Three-year trend classes and insight sentences attached to every comparison row
//!
//! Division by zero never fails a run: the affected cell becomes NaN and every
//! downstream step treats it as "no classification possible".
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_insight_builder::*;
//!
//! let json = std::fs::read_to_string("income_statement.json")?;
//! let raw = RawStatement::from_annual_reports_json(&json)?;
//!
//! let config = AnalysisConfig::default();
//! let table = analyze_statement(&raw, StatementKind::IncomeStatement, &config)?;
//!
//! for row in table.select_year(2023) {
//!     println!("{}", row.annotations.insights);
//!     println!("{}", row.annotations.patterns);
//! }
//! ```

pub mod align;
pub mod cache;
pub mod error;
pub mod health;
pub mod ingestion;
pub mod kpi;
pub mod narrative;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod shift;
pub mod table;
pub mod trend;

pub use align::{align_years, ComparisonRow, ComparisonTable, InsightColumns};
pub use cache::StatementCache;
pub use error::{FinancialInsightError, Result};
pub use health::{health_score, HealthAdjustment, HealthScore};
pub use ingestion::*;
pub use kpi::{
    calculate_balance_sheet_kpis, calculate_cash_flow_kpis, calculate_income_statement_kpis,
    calculate_kpis, percent_change, safe_divide,
};
pub use narrative::{NarrativeRenderer, NarrativeRule};
pub use normalize::{normalize_statement, parse_fiscal_year, StatementNormalizer};
pub use pipeline::{
    AnalysisReport, AnalysisSession, InsightPipeline, StatementFailure, StatementSet, YearView,
};
pub use schema::*;
pub use shift::{create_prior_year_table, prev_column, PriorYearTable, PREV_SUFFIX};
pub use table::{DerivedKpiTable, FiscalYearRow, StatementTable};
pub use trend::{classify_statement_trends, classify_trends, classify_window, RowTrends, TrendDirection};

use log::info;

/// Analyzes a single statement with the given configuration.
pub fn analyze_statement(
    raw: &RawStatement,
    kind: StatementKind,
    config: &AnalysisConfig,
) -> Result<ComparisonTable> {
    InsightPipeline::new(config.clone()).analyze_statement(raw, kind, None)
}

/// Analyzes all available statements of one company.
pub fn analyze_statements(statements: &StatementSet, config: &AnalysisConfig) -> Result<AnalysisReport> {
    InsightPipeline::new(config.clone()).analyze(statements)
}

/// Loads `symbol` from the flat cache and analyzes whatever is there.
pub fn analyze_cached(cache: &StatementCache, symbol: &str, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let statements = StatementSet::from_cache(cache, symbol)?;
    if statements.is_empty() {
        info!("No cached statements for {} in {}", symbol, cache.dir().display());
    }
    analyze_statements(&statements, config)
}

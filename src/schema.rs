use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum StatementKind {
    #[schemars(description = "Point-in-time balances: assets, liabilities and shareholder equity")]
    BalanceSheet,

    #[schemars(description = "Period activity: revenue, costs, operating income and net income")]
    IncomeStatement,

    #[schemars(description = "Cash movements: operating, investing and financing cash flows")]
    CashFlow,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::BalanceSheet,
        StatementKind::IncomeStatement,
        StatementKind::CashFlow,
    ];

    /// Prefix used by the flat per-symbol cache files (`bs_annual_MSFT.csv`).
    pub fn cache_prefix(self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "bs",
            StatementKind::IncomeStatement => "pnl",
            StatementKind::CashFlow => "cf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "Balance Sheet",
            StatementKind::IncomeStatement => "Profit and Loss",
            StatementKind::CashFlow => "Cash Flow",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    #[schemars(
        description = "Replace missing or non-numeric cells with 0.0. Matches the provider convention but hides gaps from downstream ratios."
    )]
    ZeroFill,

    #[schemars(
        description = "Keep missing cells as NaN so every ratio built on them becomes NaN instead of a misleading number."
    )]
    PropagateNull,

    #[schemars(description = "Fail normalization on the first missing or non-numeric cell.")]
    Reject,
}

impl Default for MissingValuePolicy {
    fn default() -> Self {
        Self::ZeroFill
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvalidYearPolicy {
    #[schemars(description = "Abort normalization of the statement when a period label has no 4-digit year.")]
    Abort,

    #[schemars(description = "Drop the offending period and keep the remaining years.")]
    DropRow,
}

impl Default for InvalidYearPolicy {
    fn default() -> Self {
        Self::Abort
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeFormat {
    #[schemars(description = "Plain sentences, suitable for logs and terminals.")]
    Plain,

    #[schemars(description = "Sentences with key figures emphasised in Markdown bold.")]
    Markdown,
}

impl Default for NarrativeFormat {
    fn default() -> Self {
        Self::Plain
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    #[schemars(description = "How cells that cannot be read as numbers are treated during normalization.")]
    pub missing_value_policy: MissingValuePolicy,

    #[schemars(description = "What happens to a period whose fiscalDateEnding does not start with a 4-digit year.")]
    pub invalid_year_policy: InvalidYearPolicy,

    #[schemars(
        description = "If true, normalized rows are re-sorted by descending fiscal year. If false, input order is kept and a warning is logged when it is not descending."
    )]
    pub sort_by_fiscal_year: bool,

    #[schemars(
        description = "Relative tolerance used by the trend classifier when comparing consecutive years. 0.0 means exact comparison."
    )]
    pub trend_tolerance: f64,

    #[schemars(description = "Output flavour of the rendered insight sentences.")]
    pub narrative_format: NarrativeFormat,

    #[schemars(
        description = "If true, the income statement's totalRevenue (matched by fiscal year) feeds the cash flow margin KPI."
    )]
    pub cash_flow_margin_from_income: bool,

    #[schemars(description = "Value written into the prior-year columns of the earliest year.")]
    pub fill_value: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            missing_value_policy: MissingValuePolicy::default(),
            invalid_year_policy: InvalidYearPolicy::default(),
            sort_by_fiscal_year: false,
            trend_tolerance: 1e-9,
            narrative_format: NarrativeFormat::default(),
            cash_flow_margin_from_income: true,
            fill_value: 0.0,
        }
    }
}

impl AnalysisConfig {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

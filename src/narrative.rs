//! Template narratives for comparison rows.
//!
//! Each statement kind has one rule table. A rule names a KPI, how to print
//! it, the single-year threshold bands and the phrases used when the value
//! rises, falls or holds against the prior year. All four text columns are
//! rendered from the same table.

use crate::align::{ComparisonRow, ComparisonTable, InsightColumns};
use crate::kpi::percent_change;
use crate::schema::{NarrativeFormat, StatementKind};
use crate::trend::RowTrends;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Percent,
    Ratio,
    Amount,
}

/// Band predicates are checked in order; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Below(f64),
    AtMost(f64),
    Above(f64),
    Otherwise,
}

impl Bound {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Bound::Below(limit) => value < limit,
            Bound::AtMost(limit) => value <= limit,
            Bound::Above(limit) => value > limit,
            Bound::Otherwise => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Band {
    pub bound: Bound,
    pub reading: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct NarrativeRule {
    pub kpi: &'static str,
    pub label: &'static str,
    pub unit: Unit,
    pub bands: &'static [Band],
    pub rising: &'static str,
    pub falling: &'static str,
    pub steady: &'static str,
}

const fn band(bound: Bound, reading: &'static str) -> Band {
    Band { bound, reading }
}

pub const INCOME_STATEMENT_RULES: &[NarrativeRule] = &[
    NarrativeRule {
        kpi: "grossMargin",
        label: "Gross Margin",
        unit: Unit::Percent,
        bands: &[
            band(Bound::Below(60.0), "which is below industry standards and might indicate challenges in cost control"),
            band(Bound::Above(80.0), "highlighting strong cost efficiency in production"),
        ],
        rising: "suggesting better cost management",
        falling: "indicating rising production costs or pricing pressures",
        steady: "indicating consistent production economics",
    },
    NarrativeRule {
        kpi: "operatingMargin",
        label: "Operating Margin",
        unit: Unit::Percent,
        bands: &[
            band(Bound::Below(30.0), "which suggests potential inefficiencies in managing operational costs"),
            band(Bound::Above(50.0), "reflecting efficient management of operational costs"),
        ],
        rising: "reflecting enhanced operational efficiency",
        falling: "indicating potential inefficiencies in operational costs",
        steady: "indicating consistent operating cost control",
    },
    NarrativeRule {
        kpi: "netProfitMargin",
        label: "Net Profit Margin",
        unit: Unit::Percent,
        bands: &[
            band(Bound::Below(20.0), "signaling profitability challenges"),
            band(Bound::Above(35.0), "indicating strong overall profitability"),
        ],
        rising: "indicating improved profitability",
        falling: "which may signal profitability challenges",
        steady: "indicating consistent profitability",
    },
    NarrativeRule {
        kpi: "interestCoverageRatio",
        label: "Interest Coverage Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Below(10.0), "suggesting some vulnerability when covering interest payments"),
            band(Bound::Above(15.0), "showing no issues covering interest obligations"),
        ],
        rising: "indicating more room to cover interest payments",
        falling: "indicating less room to cover interest payments",
        steady: "indicating a consistent ability to cover interest payments",
    },
    NarrativeRule {
        kpi: "totalRevenue",
        label: "Total Revenue",
        unit: Unit::Amount,
        bands: &[],
        rising: "indicating strong market demand",
        falling: "indicating potential market challenges",
        steady: "indicating steady market demand",
    },
    NarrativeRule {
        kpi: "netIncome",
        label: "Net Income",
        unit: Unit::Amount,
        bands: &[],
        rising: "indicating improved profitability",
        falling: "which may signal profitability challenges",
        steady: "indicating consistent earnings",
    },
    NarrativeRule {
        kpi: "operatingExpenses",
        label: "Operating Expenses",
        unit: Unit::Amount,
        bands: &[],
        rising: "reflecting a larger operating cost base",
        falling: "reflecting a leaner operating cost base",
        steady: "reflecting a stable operating cost base",
    },
    NarrativeRule {
        kpi: "ebitda",
        label: "EBITDA",
        unit: Unit::Amount,
        bands: &[],
        rising: "indicating stronger operating earnings",
        falling: "indicating weaker operating earnings",
        steady: "indicating consistent operating earnings",
    },
];

pub const CASH_FLOW_RULES: &[NarrativeRule] = &[
    NarrativeRule {
        kpi: "freeCashFlow",
        label: "Free Cash Flow",
        unit: Unit::Amount,
        bands: &[
            band(Bound::Below(0.0), "which is negative and suggests challenges in covering capital expenditures"),
            band(Bound::AtMost(5e9), "which is low and may limit flexibility to reinvest or return value to shareholders"),
            band(Bound::AtMost(2e10), "which is moderate and sufficient to meet capital requirements"),
            band(Bound::Otherwise, "which is high and leaves room for expansion, dividends or debt reduction"),
        ],
        rising: "indicating improved cash generation",
        falling: "suggesting potential challenges in cash generation",
        steady: "showing stable cash generation",
    },
    NarrativeRule {
        kpi: "capitalExpenditureRatio",
        label: "Capital Expenditure Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Below(1.0), "classified as high, meaning a significant portion of operating cash flow went to capital investments"),
            band(Bound::AtMost(2.0), "classified as moderate, a balanced split between investment and cash retention"),
            band(Bound::Otherwise, "classified as low, meaning most operating cash flow was retained"),
        ],
        rising: "indicating a higher focus on reinvestment in growth",
        falling: "suggesting a more conservative investment approach",
        steady: "showing consistency in investment approach",
    },
    NarrativeRule {
        kpi: "operatingCashFlowGrowth",
        label: "Operating Cash Flow Growth",
        unit: Unit::Percent,
        bands: &[
            band(Bound::Below(0.0), "a negative growth that may signal declining efficiency in generating cash"),
            band(Bound::AtMost(10.0), "classified as low growth"),
            band(Bound::Otherwise, "classified as high growth, reflecting improved operational efficiency"),
        ],
        rising: "reflecting increased efficiency in generating cash",
        falling: "which may indicate a decline in cash generation efficiency",
        steady: "showing stable performance",
    },
    NarrativeRule {
        kpi: "dividendPayoutRatio",
        label: "Dividend Payout Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::AtMost(0.25), "classified as low, retaining most cash flow for reinvestment"),
            band(Bound::AtMost(0.5), "classified as moderate, balancing shareholder returns and retention"),
            band(Bound::Otherwise, "classified as high, which may limit reinvestment"),
        ],
        rising: "highlighting a stronger focus on returning value to shareholders",
        falling: "suggesting more cash is being retained for reinvestment",
        steady: "indicating no change in dividend policy",
    },
    NarrativeRule {
        kpi: "cashFlowMargin",
        label: "Cash Flow Margin",
        unit: Unit::Percent,
        bands: &[],
        rising: "indicating more cash generated per unit of revenue",
        falling: "indicating less cash generated per unit of revenue",
        steady: "indicating consistent cash conversion of revenue",
    },
    NarrativeRule {
        kpi: "reinvestmentRatio",
        label: "Reinvestment Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Above(0.5), "classified as high, a strong focus on expansion"),
            band(Bound::Above(0.2), "classified as moderate"),
            band(Bound::Otherwise, "classified as low, potentially prioritizing cash retention or dividends"),
        ],
        rising: "indicating a stronger focus on business growth",
        falling: "suggesting a reduced emphasis on reinvestment",
        steady: "showing a stable strategy toward reinvestment",
    },
];

pub const BALANCE_SHEET_RULES: &[NarrativeRule] = &[
    NarrativeRule {
        kpi: "currentRatio",
        label: "Current Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Below(1.0), "indicating potential liquidity concerns"),
            band(Bound::Below(2.0), "which suggests adequate but not excessive liquidity"),
            band(Bound::Otherwise, "indicating strong liquidity"),
        ],
        rising: "indicating improved short-term liquidity",
        falling: "suggesting potential challenges in covering short-term liabilities",
        steady: "indicating consistent short-term liquidity",
    },
    NarrativeRule {
        kpi: "quickRatio",
        label: "Quick Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Below(1.0), "which may indicate challenges covering short-term liabilities without relying on inventory"),
            band(Bound::Otherwise, "indicating good short-term financial health without dependence on inventory"),
        ],
        rising: "suggesting improved liquidity without relying on inventory",
        falling: "indicating potential difficulties meeting short-term liabilities without inventory",
        steady: "indicating consistent liquidity without inventory dependency",
    },
    NarrativeRule {
        kpi: "cashRatio",
        label: "Cash Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Below(0.5), "suggesting limited cash available to cover short-term liabilities"),
            band(Bound::AtMost(1.0), "indicating sufficient cash reserves to cover short-term obligations"),
            band(Bound::Otherwise, "highlighting strong cash reserves"),
        ],
        rising: "highlighting stronger cash reserves",
        falling: "suggesting reduced cash reserves to meet short-term obligations",
        steady: "indicating consistent cash reserves",
    },
    NarrativeRule {
        kpi: "debtToAssetsRatio",
        label: "Debt-to-Assets Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Above(0.5), "indicating a higher portion of assets financed by debt"),
            band(Bound::Otherwise, "suggesting a lower dependency on debt to finance assets"),
        ],
        rising: "indicating a higher proportion of assets financed by debt",
        falling: "suggesting a reduced reliance on debt for financing assets",
        steady: "indicating consistent debt financing levels",
    },
    NarrativeRule {
        kpi: "debtToEquityRatio",
        label: "Debt-to-Equity Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Above(2.0), "indicating high leverage which may increase financial risk"),
            band(Bound::Above(1.0), "indicating moderate leverage"),
            band(Bound::Otherwise, "indicating low leverage"),
        ],
        rising: "reflecting higher financial leverage",
        falling: "indicating reduced leverage",
        steady: "indicating consistent leverage levels",
    },
    NarrativeRule {
        kpi: "equityRatio",
        label: "Equity Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Above(0.5), "meaning more than half of assets are financed by equity"),
            band(Bound::Otherwise, "which may indicate a higher reliance on debt financing"),
        ],
        rising: "indicating a greater share of assets financed by equity",
        falling: "suggesting increased reliance on debt financing",
        steady: "indicating consistent equity financing levels",
    },
    NarrativeRule {
        kpi: "workingCapital",
        label: "Working Capital",
        unit: Unit::Amount,
        bands: &[
            band(Bound::Below(0.0), "which is negative and points to potential liquidity issues"),
            band(Bound::Otherwise, "covering short-term liabilities"),
        ],
        rising: "showing an improved ability to meet short-term obligations",
        falling: "indicating potential liquidity pressure",
        steady: "indicating a consistent ability to cover short-term liabilities",
    },
    NarrativeRule {
        kpi: "netWorkingCapitalRatio",
        label: "Net Working Capital Ratio",
        unit: Unit::Ratio,
        bands: &[
            band(Bound::Below(0.1), "suggesting limited working capital relative to total assets"),
            band(Bound::Otherwise, "indicating adequate working capital relative to total assets"),
        ],
        rising: "indicating more working capital relative to total assets",
        falling: "suggesting reduced working capital efficiency",
        steady: "indicating consistent working capital relative to total assets",
    },
    NarrativeRule {
        kpi: "bookValuePerShare",
        label: "Book Value per Share",
        unit: Unit::Amount,
        bands: &[band(Bound::Otherwise, "the per-share equity value available to shareholders")],
        rising: "indicating a higher per-share equity value",
        falling: "suggesting a decline in per-share equity value",
        steady: "indicating consistent per-share equity value",
    },
];

pub fn narrative_rules(kind: StatementKind) -> &'static [NarrativeRule] {
    match kind {
        StatementKind::IncomeStatement => INCOME_STATEMENT_RULES,
        StatementKind::CashFlow => CASH_FLOW_RULES,
        StatementKind::BalanceSheet => BALANCE_SHEET_RULES,
    }
}

pub struct NarrativeRenderer {
    format: NarrativeFormat,
}

impl NarrativeRenderer {
    pub fn new(format: NarrativeFormat) -> Self {
        Self { format }
    }

    fn number(&self, value: f64, unit: Unit) -> String {
        let text = match unit {
            Unit::Percent => format!("{:.2}%", value),
            Unit::Ratio | Unit::Amount => format!("{:.2}", value),
        };
        match self.format {
            NarrativeFormat::Plain => text,
            NarrativeFormat::Markdown => format!("**{}**", text),
        }
    }

    /// Single-year readings against the threshold bands.
    pub fn insights(&self, row: &ComparisonRow, rules: &[NarrativeRule]) -> String {
        rules
            .iter()
            .filter_map(|rule| {
                let value = row.current(rule.kpi).filter(|v| !v.is_nan())?;
                let band = rule.bands.iter().find(|b| b.bound.matches(value))?;
                Some(format!(
                    "In {}, the {} was {}, {}.",
                    row.fiscal_year,
                    rule.label,
                    self.number(value, rule.unit),
                    band.reading
                ))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Current value next to the prior-year value with the percent change.
    /// KPIs whose prior value is zero or missing are left out.
    pub fn previous_year_insights(&self, row: &ComparisonRow, rules: &[NarrativeRule]) -> String {
        rules
            .iter()
            .filter_map(|rule| {
                let (current, previous, change) = Self::change(row, rule.kpi)?;
                Some(format!(
                    "The {} was {} (previous year: {}), which changed by {} compared to the previous year.",
                    rule.label,
                    self.number(current, rule.unit),
                    self.number(previous, rule.unit),
                    self.number(change, Unit::Percent)
                ))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn year_comparison_insight(&self, row: &ComparisonRow, rules: &[NarrativeRule]) -> String {
        rules
            .iter()
            .filter_map(|rule| {
                let (_, _, change) = Self::change(row, rule.kpi)?;
                let sentence = if change > 0.0 {
                    format!(
                        "{} has increased by {} compared to the previous year, {}.",
                        rule.label,
                        self.number(change, Unit::Percent),
                        rule.rising
                    )
                } else if change < 0.0 {
                    format!(
                        "{} has decreased by {} compared to the previous year, {}.",
                        rule.label,
                        self.number(change.abs(), Unit::Percent),
                        rule.falling
                    )
                } else {
                    format!(
                        "{} has remained stable compared to the previous year, {}.",
                        rule.label, rule.steady
                    )
                };
                Some(sentence)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn change(row: &ComparisonRow, kpi: &str) -> Option<(f64, f64, f64)> {
        let current = row.current(kpi)?;
        let previous = row.previous(kpi)?;
        if previous == 0.0 {
            return None;
        }
        let change = percent_change(current, previous);
        if change.is_nan() || change.is_infinite() {
            return None;
        }
        Some((current, previous, change))
    }

    /// Fills every row's annotation block. `trends` is indexed by row position.
    ///
    /// The last row's `_prev` values are the shifter's fill, not a real prior
    /// year, so it gets no year-over-year text.
    pub fn annotate(&self, table: &mut ComparisonTable, trends: &[RowTrends]) {
        let rules = narrative_rules(table.kind);
        let last = table.rows.len().saturating_sub(1);

        for (idx, row) in table.rows.iter_mut().enumerate() {
            let has_prior_year = idx < last;
            row.annotations = InsightColumns {
                insights: self.insights(row, rules),
                previous_year_insights: if has_prior_year {
                    self.previous_year_insights(row, rules)
                } else {
                    String::new()
                },
                year_comparison_insight: if has_prior_year {
                    self.year_comparison_insight(row, rules)
                } else {
                    String::new()
                },
                patterns: trends.get(idx).map(RowTrends::render).unwrap_or_default(),
            };
        }

        debug!("Rendered narratives for {} {} rows", table.len(), table.kind);
    }
}

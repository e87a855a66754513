use crate::align::ComparisonRow;
use crate::narrative::Bound;
use crate::schema::StatementKind;
use serde::{Deserialize, Serialize};

pub const BASE_SCORE: i32 = 50;
pub const MAX_SCORE: i32 = 100;

#[derive(Debug, Clone, Copy)]
pub struct HealthRule {
    pub kind: StatementKind,
    pub kpi: &'static str,
    pub bound: Bound,
    pub points: i32,
}

const fn rule(kind: StatementKind, kpi: &'static str, bound: Bound, points: i32) -> HealthRule {
    HealthRule {
        kind,
        kpi,
        bound,
        points,
    }
}

/// Every matching rule adds its points; rules for the same KPI are
/// written so that at most one of them matches.
pub const HEALTH_RULES: &[HealthRule] = &[
    rule(StatementKind::IncomeStatement, "grossMargin", Bound::Above(40.0), 10),
    rule(StatementKind::IncomeStatement, "grossMargin", Bound::Below(20.0), -10),
    rule(StatementKind::IncomeStatement, "netProfitMargin", Bound::Above(15.0), 10),
    rule(StatementKind::IncomeStatement, "netProfitMargin", Bound::Below(0.0), -15),
    rule(StatementKind::IncomeStatement, "interestCoverageRatio", Bound::Above(5.0), 5),
    rule(StatementKind::IncomeStatement, "interestCoverageRatio", Bound::Below(1.5), -10),
    rule(StatementKind::BalanceSheet, "currentRatio", Bound::Above(1.5), 10),
    rule(StatementKind::BalanceSheet, "currentRatio", Bound::Below(1.0), -10),
    rule(StatementKind::BalanceSheet, "debtToEquityRatio", Bound::Below(1.0), 10),
    rule(StatementKind::BalanceSheet, "debtToEquityRatio", Bound::Above(2.0), -10),
    rule(StatementKind::CashFlow, "freeCashFlow", Bound::Above(0.0), 10),
    rule(StatementKind::CashFlow, "freeCashFlow", Bound::Below(0.0), -10),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAdjustment {
    pub kpi: String,
    pub value: f64,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub fiscal_year: i32,
    /// Always within `0..=100`
    pub score: u8,
    pub adjustments: Vec<HealthAdjustment>,
}

/// Scores one fiscal year from whichever statement rows are available.
/// Missing KPIs and NaN values contribute nothing.
pub fn health_score(
    fiscal_year: i32,
    income: Option<&ComparisonRow>,
    balance: Option<&ComparisonRow>,
    cash_flow: Option<&ComparisonRow>,
) -> HealthScore {
    let row_for = |kind: StatementKind| match kind {
        StatementKind::IncomeStatement => income,
        StatementKind::BalanceSheet => balance,
        StatementKind::CashFlow => cash_flow,
    };

    let adjustments: Vec<HealthAdjustment> = HEALTH_RULES
        .iter()
        .filter_map(|rule| {
            let value = row_for(rule.kind)?.current(rule.kpi)?;
            if value.is_nan() || !rule.bound.matches(value) {
                return None;
            }
            Some(HealthAdjustment {
                kpi: rule.kpi.to_string(),
                value,
                points: rule.points,
            })
        })
        .collect();

    let total = BASE_SCORE + adjustments.iter().map(|a| a.points).sum::<i32>();

    HealthScore {
        fiscal_year,
        score: total.clamp(0, MAX_SCORE) as u8,
        adjustments,
    }
}

use financial_insight_builder::{
    analyze_statements, AnalysisConfig, NarrativeFormat, RawStatement, StatementKind, StatementSet,
};
use std::error::Error;

const INCOME_STATEMENT: &str = r#"{
    "symbol": "DEMO",
    "annualReports": [
        {"fiscalDateEnding": "2023-12-31", "reportedCurrency": "USD", "totalRevenue": "1200", "grossProfit": "780", "operatingIncome": "420", "netIncome": "300", "ebit": "450", "interestExpense": "25"},
        {"fiscalDateEnding": "2022-12-31", "reportedCurrency": "USD", "totalRevenue": "1100", "grossProfit": "660", "operatingIncome": "330", "netIncome": "240", "ebit": "360", "interestExpense": "30"},
        {"fiscalDateEnding": "2021-12-31", "reportedCurrency": "USD", "totalRevenue": "1000", "grossProfit": "550", "operatingIncome": "250", "netIncome": "180", "ebit": "280", "interestExpense": "None"}
    ]
}"#;

const BALANCE_SHEET: &str = r#"{
    "symbol": "DEMO",
    "annualReports": [
        {"fiscalDateEnding": "2023-12-31", "reportedCurrency": "USD", "totalAssets": "5000", "totalCurrentAssets": "1800", "totalCurrentLiabilities": "900", "inventory": "300", "cashAndCashEquivalentsAtCarryingValue": "600", "totalLiabilities": "2500", "totalShareholderEquity": "2500", "commonStockSharesOutstanding": "100"},
        {"fiscalDateEnding": "2022-12-31", "reportedCurrency": "USD", "totalAssets": "4600", "totalCurrentAssets": "1500", "totalCurrentLiabilities": "1000", "inventory": "350", "cashAndCashEquivalentsAtCarryingValue": "400", "totalLiabilities": "2600", "totalShareholderEquity": "2000", "commonStockSharesOutstanding": "100"}
    ]
}"#;

const CASH_FLOW: &str = r#"{
    "symbol": "DEMO",
    "annualReports": [
        {"fiscalDateEnding": "2023-12-31", "reportedCurrency": "USD", "operatingCashflow": "380", "capitalExpenditures": "120", "dividendPayoutCommonStock": "60"},
        {"fiscalDateEnding": "2022-12-31", "reportedCurrency": "USD", "operatingCashflow": "310", "capitalExpenditures": "140", "dividendPayoutCommonStock": "50"},
        {"fiscalDateEnding": "2021-12-31", "reportedCurrency": "USD", "operatingCashflow": "260", "capitalExpenditures": "90", "dividendPayoutCommonStock": "40"}
    ]
}"#;

fn main() -> Result<(), Box<dyn Error>> {
    let statements = StatementSet::default()
        .with(
            StatementKind::IncomeStatement,
            RawStatement::from_annual_reports_json(INCOME_STATEMENT)?,
        )
        .with(
            StatementKind::BalanceSheet,
            RawStatement::from_annual_reports_json(BALANCE_SHEET)?,
        )
        .with(
            StatementKind::CashFlow,
            RawStatement::from_annual_reports_json(CASH_FLOW)?,
        );

    let config = AnalysisConfig {
        narrative_format: NarrativeFormat::Markdown,
        ..Default::default()
    };

    let report = analyze_statements(&statements, &config)?;

    for year in report.fiscal_years() {
        let view = report.year_view(year);
        println!("## Fiscal year {}", year);
        if let Some(health) = &view.health {
            println!("Health score: {}/100", health.score);
        }

        for (kind, rows) in [
            (StatementKind::IncomeStatement, &view.income_statement),
            (StatementKind::BalanceSheet, &view.balance_sheet),
            (StatementKind::CashFlow, &view.cash_flow),
        ] {
            for row in rows {
                println!("\n### {}", kind);
                println!("{}", row.annotations.insights);
                println!("{}", row.annotations.year_comparison_insight);
                println!("{}", row.annotations.patterns);
            }
        }
        println!();
    }

    Ok(())
}

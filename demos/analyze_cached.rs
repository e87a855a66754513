use financial_insight_builder::{
    AnalysisConfig, AnalysisSession, InsightPipeline, RawStatement, StatementCache, StatementKind,
};
use std::error::Error;

const CASH_FLOW: &str = r#"{
    "symbol": "ACME",
    "annualReports": [
        {"fiscalDateEnding": "2023-06-30", "operatingCashflow": "910", "capitalExpenditures": "300", "dividendPayoutCommonStock": "150"},
        {"fiscalDateEnding": "2022-06-30", "operatingCashflow": "840", "capitalExpenditures": "280", "dividendPayoutCommonStock": "140"},
        {"fiscalDateEnding": "2021-06-30", "operatingCashflow": "760", "capitalExpenditures": "260", "dividendPayoutCommonStock": "None"},
        {"fiscalDateEnding": "2020-06-30", "operatingCashflow": "700", "capitalExpenditures": "250", "dividendPayoutCommonStock": "120"}
    ]
}"#;

/// Usage: `cargo run --example analyze_cached [cache_dir] [symbol]`
fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let dir = args
        .next()
        .unwrap_or_else(|| std::env::temp_dir().join("insight-cache").display().to_string());
    let symbol = args.next().unwrap_or_else(|| "ACME".to_string());

    let cache = StatementCache::new(&dir);
    if !cache.contains(&symbol, StatementKind::CashFlow)? {
        let path = cache.store(
            &symbol,
            StatementKind::CashFlow,
            &RawStatement::from_annual_reports_json(CASH_FLOW)?,
        )?;
        println!("Seeded {}", path.display());
    }

    let pipeline = InsightPipeline::new(AnalysisConfig::default());
    let mut session = AnalysisSession::new(symbol.as_str());
    let report = session.run_from_cache(&pipeline, &cache)?;

    println!("Years available for {}: {:?}", symbol, report.fiscal_years());

    if let Some(&oldest) = report.fiscal_years().last() {
        session.select_year(oldest);
    }

    if let Some(view) = session.selected_view() {
        println!("Selected fiscal year {}", view.fiscal_year);
        for row in &view.cash_flow {
            println!("{}", row.annotations.previous_year_insights);
            println!("{}", row.annotations.patterns);
        }
    }

    Ok(())
}

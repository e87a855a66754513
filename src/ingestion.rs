use crate::error::{FinancialInsightError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const FISCAL_DATE_ENDING: &str = "fiscalDateEnding";
pub const REPORTED_CURRENCY: &str = "reportedCurrency";

/// One line item of a wide statement: the label followed by one cell per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    pub label: String,
    pub cells: Vec<String>,
}

/// A statement as delivered by the data provider or read from the cache:
/// periods run across the columns, line items down the rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatement {
    pub lines: Vec<RawLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderPayload {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    annual_reports: Vec<serde_json::Map<String, Value>>,
}

impl RawStatement {
    pub fn new(lines: Vec<RawLine>) -> Self {
        Self { lines }
    }

    pub fn period_count(&self) -> usize {
        self.lines.iter().map(|l| l.cells.len()).max().unwrap_or(0)
    }

    pub fn line(&self, label: &str) -> Option<&RawLine> {
        self.lines.iter().find(|l| l.label == label)
    }

    /// Builds the wide grid from long-form reports (one map per fiscal period).
    ///
    /// Labels keep the order in which they are first seen; a report that lacks a
    /// label contributes an empty cell so every line has one cell per period.
    pub fn from_reports(reports: &[BTreeMap<String, String>]) -> Self {
        let labels = collect_labels(reports.iter().map(|r| r.keys()));

        let lines = labels
            .into_iter()
            .map(|label| {
                let cells = reports
                    .iter()
                    .map(|report| report.get(&label).cloned().unwrap_or_default())
                    .collect();
                RawLine { label, cells }
            })
            .collect();

        Self { lines }
    }

    /// Parses the provider's annual statement payload (`{"symbol": .., "annualReports": [..]}`).
    pub fn from_annual_reports_json(json: &str) -> Result<Self> {
        let payload: ProviderPayload = serde_json::from_str(json)?;

        if payload.annual_reports.is_empty() {
            return Err(FinancialInsightError::NormalizationError {
                statement: payload.symbol.unwrap_or_else(|| "unknown symbol".to_string()),
                details: "payload contains no annualReports".to_string(),
            });
        }

        let labels = collect_labels(payload.annual_reports.iter().map(|r| r.keys()));

        let lines = labels
            .into_iter()
            .map(|label| {
                let cells = payload
                    .annual_reports
                    .iter()
                    .map(|report| match report.get(&label) {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Number(n)) => n.to_string(),
                        Some(Value::Null) | None => String::new(),
                        Some(other) => other.to_string(),
                    })
                    .collect();
                RawLine { label, cells }
            })
            .collect();

        Ok(Self { lines })
    }
}

fn collect_labels<'a, I, K>(reports: I) -> Vec<String>
where
    I: Iterator<Item = K>,
    K: Iterator<Item = &'a String>,
{
    let mut labels: Vec<String> = Vec::new();
    for keys in reports {
        for key in keys {
            if !labels.contains(key) {
                labels.push(key.clone());
            }
        }
    }

    // fiscalDateEnding first, like the provider payload
    if let Some(pos) = labels.iter().position(|l| l == FISCAL_DATE_ENDING) {
        let label = labels.remove(pos);
        labels.insert(0, label);
    }

    labels
}

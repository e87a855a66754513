//! Flat per-symbol statement cache.
//!
//! One CSV file per symbol and statement kind, named
//! `{prefix}_annual_{SYMBOL}.csv`. The file holds the wide raw statement: a
//! header row `Year,0,1,..` followed by one record per line item.

use crate::error::{FinancialInsightError, Result};
use crate::ingestion::{RawLine, RawStatement};
use crate::schema::StatementKind;
use csv::{ReaderBuilder, WriterBuilder};
use log::debug;
use std::path::{Path, PathBuf};

const HEADER_LABEL: &str = "Year";

#[derive(Debug, Clone)]
pub struct StatementCache {
    dir: PathBuf,
}

impl StatementCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &str, kind: StatementKind) -> Result<PathBuf> {
        let symbol = normalize_symbol(symbol)?;
        Ok(self
            .dir
            .join(format!("{}_annual_{}.csv", kind.cache_prefix(), symbol)))
    }

    pub fn contains(&self, symbol: &str, kind: StatementKind) -> Result<bool> {
        Ok(self.path_for(symbol, kind)?.is_file())
    }

    /// `Ok(None)` when nothing is cached for this symbol and kind.
    pub fn load(&self, symbol: &str, kind: StatementKind) -> Result<Option<RawStatement>> {
        let path = self.path_for(symbol, kind)?;
        if !path.is_file() {
            debug!("Cache miss: {}", path.display());
            return Ok(None);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;

        let mut lines = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut fields = record.iter();
            let label = match fields.next() {
                Some(label) if !label.is_empty() => label.to_string(),
                _ => continue,
            };
            lines.push(RawLine {
                label,
                cells: fields.map(str::to_string).collect(),
            });
        }

        debug!("Cache hit: {} ({} line items)", path.display(), lines.len());
        Ok(Some(RawStatement::new(lines)))
    }

    pub fn store(&self, symbol: &str, kind: StatementKind, raw: &RawStatement) -> Result<PathBuf> {
        let path = self.path_for(symbol, kind)?;
        std::fs::create_dir_all(&self.dir)?;

        let mut writer = WriterBuilder::new().flexible(true).from_path(&path)?;

        let header: Vec<String> = std::iter::once(HEADER_LABEL.to_string())
            .chain((0..raw.period_count()).map(|i| i.to_string()))
            .collect();
        writer.write_record(&header)?;

        for line in &raw.lines {
            writer.write_record(std::iter::once(&line.label).chain(&line.cells))?;
        }
        writer.flush()?;

        debug!("Cached {} for {} at {}", kind, symbol, path.display());
        Ok(path)
    }
}

/// Upper-cases the ticker and rejects anything that could escape the cache directory.
fn normalize_symbol(symbol: &str) -> Result<String> {
    let trimmed = symbol.trim();
    let valid = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && !trimmed.starts_with('.');

    if !valid {
        return Err(FinancialInsightError::InvalidSymbol(symbol.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

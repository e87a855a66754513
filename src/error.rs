use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinancialInsightError {
    #[error("Normalization error in {statement}: {details}")]
    NormalizationError { statement: String, details: String },

    #[error("Invalid fiscal period '{0}': expected a value starting with a 4-digit year")]
    ParseError(String),

    #[error("Missing value for '{column}' in fiscal period '{period}'")]
    MissingValue { column: String, period: String },

    #[error("Duplicate fiscal year {0} in statement")]
    DuplicateFiscalYear(i32),

    #[error("Row {row} (fiscal year {fiscal_year}) does not share the column set of the first row")]
    InconsistentColumns { row: usize, fiscal_year: i32 },

    #[error("Required column '{0}' is missing")]
    MissingColumn(String),

    #[error("Alignment error: current-year table has {current} rows but prior-year table has {prior}")]
    AlignmentError { current: usize, prior: usize },

    #[error("Invalid ticker symbol '{0}'")]
    InvalidSymbol(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FinancialInsightError>;

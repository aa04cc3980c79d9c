use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Excel export failed: {0}")]
    ExcelExport(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV export failed: {0}")]
    CsvExport(#[from] csv::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// HTTP 404 かどうか
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ApiError { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

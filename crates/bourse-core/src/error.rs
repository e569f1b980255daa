use bourse_warehouse::WarehouseError;
use thiserror::Error;

/// Validation and decoding errors exposed by `bourse-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol contains invalid character {ch:?} at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid field '{value}', expected one of value, volume")]
    InvalidField { value: String },

    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("band window must be at least 2, got {window}")]
    BandWindowTooSmall { window: usize },
    #[error("band width must be finite and non-negative")]
    InvalidBandWidth,

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Failure to read from the market data store.
///
/// Renderers treat every variant as "no data" for the affected call.
#[derive(Debug, Error)]
pub enum DataAccessError {
    /// The store could not be reached or opened.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A query failed to execute.
    #[error("query failed: {0}")]
    Query(String),

    /// A row could not be decoded into a domain value.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl DataAccessError {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "store_unavailable",
            Self::Query(_) => "query_failed",
            Self::InvalidRecord(_) => "invalid_record",
        }
    }
}

impl From<WarehouseError> for DataAccessError {
    fn from(error: WarehouseError) -> Self {
        match error {
            WarehouseError::DuckDb(error) => Self::Query(error.to_string()),
            WarehouseError::Io(error) => Self::Unavailable(error.to_string()),
            WarehouseError::InvalidRecord(message) => Self::InvalidRecord(message),
        }
    }
}

impl From<ValidationError> for DataAccessError {
    fn from(error: ValidationError) -> Self {
        Self::InvalidRecord(error.to_string())
    }
}

/// Errors raised by the dashboard controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// The event targets a control that is not currently shown.
    #[error("control '{control}' is not available in the current dashboard state")]
    ControlUnavailable { control: &'static str },
}

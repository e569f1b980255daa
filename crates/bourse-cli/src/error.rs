use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] bourse_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Warehouse(#[from] bourse_warehouse::WarehouseError),

    #[error(transparent)]
    DataAccess(#[from] bourse_core::DataAccessError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Serialization(_) => 4,
            Self::Server(_) => 6,
            Self::Command(_) | Self::Warehouse(_) | Self::DataAccess(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        assert_eq!(
            CliError::from(bourse_core::ValidationError::EmptySymbol).exit_code(),
            2
        );
        assert_eq!(
            CliError::Server(std::io::Error::other("address in use")).exit_code(),
            6
        );
        assert_eq!(CliError::Command(String::from("boom")).exit_code(), 10);
    }
}

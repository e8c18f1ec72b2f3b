use super::Error;

/// Error when a query or mutation specification is malformed.
///
/// This occurs when:
/// - Two links in one query share a caller-chosen alias
/// - An insert supplies no scalar values
/// - An IN condition has an empty value list
/// - A primary key tuple does not match the entity's key width
#[derive(Debug)]
pub(super) struct InvalidStatementError {
    pub(super) message: Box<str>,
}

impl std::error::Error for InvalidStatementError {}

impl core::fmt::Display for InvalidStatementError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid statement: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid statement error.
    pub fn invalid_statement(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidStatement(InvalidStatementError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid statement error.
    pub fn is_invalid_statement(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::InvalidStatement(_)))
    }
}

use super::Error;

/// Error when an ER model cannot be assembled.
///
/// This occurs when:
/// - Two entities share a name
/// - A parent or relational target names an unknown entity
/// - The inheritance graph has a cycle
/// - An adapter modifier is applied to the wrong attribute kind
///
/// These errors surface from [`Builder::build`](crate::schema::Builder::build),
/// before any statement is compiled.
#[derive(Debug)]
pub(super) struct InvalidSchemaError {
    message: Box<str>,
}

impl std::error::Error for InvalidSchemaError {}

impl core::fmt::Display for InvalidSchemaError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid schema: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidSchema(InvalidSchemaError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid schema error.
    pub fn is_invalid_schema(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::InvalidSchema(_)))
    }
}

use super::Error;

/// Error when a WHERE or ORDER BY key names a link alias that does not exist
/// in the query's link tree.
///
/// This is always a bug in the caller's query specification and is never
/// retried.
#[derive(Debug)]
pub(super) struct AliasNotFoundError {
    alias: Box<str>,
}

impl std::error::Error for AliasNotFoundError {}

impl core::fmt::Display for AliasNotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "alias not found: `{}`", self.alias)
    }
}

impl Error {
    /// Creates an alias-not-found error for the given link alias.
    pub fn alias_not_found(alias: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::AliasNotFound(AliasNotFoundError {
            alias: alias.into().into(),
        }))
    }

    /// Returns `true` if this error is an alias-not-found error.
    pub fn is_alias_not_found(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::AliasNotFound(_)))
    }
}

use super::Error;

/// Error when an operation is not defined for an attribute kind.
///
/// Examples: updating a detail attribute directly, filtering on a set
/// attribute, or nesting a link under a scalar attribute.
#[derive(Debug)]
pub(super) struct UnsupportedAttributeError {
    attribute: Box<str>,
    message: Box<str>,
}

impl std::error::Error for UnsupportedAttributeError {}

impl core::fmt::Display for UnsupportedAttributeError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "unsupported attribute `{}`: {}",
            self.attribute, self.message
        )
    }
}

impl Error {
    /// Creates an unsupported attribute error.
    pub fn unsupported_attribute(
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::UnsupportedAttribute(
            UnsupportedAttributeError {
                attribute: attribute.into().into(),
                message: message.into().into(),
            },
        ))
    }

    /// Returns `true` if this error is an unsupported attribute error.
    pub fn is_unsupported_attribute(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::UnsupportedAttribute(_)))
    }
}

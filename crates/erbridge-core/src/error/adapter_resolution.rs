use super::Error;

/// Error when an attribute cannot be mapped to a physical relation or column.
///
/// This occurs when:
/// - An attribute name does not exist on the entity or any of its ancestors
/// - An adapter names a relation that is not part of the entity's chain
/// - A detail or set adapter points at a relation the target entity lacks
///
/// The ER model is assumed consistent, so this indicates a model bug.
#[derive(Debug)]
pub(super) struct AdapterResolutionError {
    entity: Box<str>,
    attribute: Box<str>,
    message: Box<str>,
}

impl std::error::Error for AdapterResolutionError {}

impl core::fmt::Display for AdapterResolutionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "cannot resolve {}.{}: {}",
            self.entity, self.attribute, self.message
        )
    }
}

impl Error {
    /// Creates an adapter resolution error for `entity.attribute`.
    pub fn adapter_resolution(
        entity: impl Into<String>,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Error {
        Error::from(super::ErrorKind::AdapterResolution(AdapterResolutionError {
            entity: entity.into().into(),
            attribute: attribute.into().into(),
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an adapter resolution error.
    pub fn is_adapter_resolution(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::AdapterResolution(_)))
    }
}

use super::Error;

/// Error when a set attribute is updated without the current membership.
///
/// Reconciling old and new cross-table rows requires the caller to state
/// which reference ids are present today.
#[derive(Debug)]
pub(super) struct AmbiguousSetUpdateError {
    entity: Box<str>,
    attribute: Box<str>,
}

impl std::error::Error for AmbiguousSetUpdateError {}

impl core::fmt::Display for AmbiguousSetUpdateError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "ambiguous set update: {}.{} changed without the current reference ids",
            self.entity, self.attribute
        )
    }
}

impl Error {
    /// Creates an ambiguous set update error for `entity.attribute`.
    pub fn ambiguous_set_update(entity: impl Into<String>, attribute: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::AmbiguousSetUpdate(AmbiguousSetUpdateError {
            entity: entity.into().into(),
            attribute: attribute.into().into(),
        }))
    }

    /// Returns `true` if this error is an ambiguous set update error.
    pub fn is_ambiguous_set_update(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::AmbiguousSetUpdate(_)))
    }
}

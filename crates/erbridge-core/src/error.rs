mod adapter_resolution;
mod adhoc;
mod alias_not_found;
mod ambiguous_set_update;
mod cursor;
mod driver;
mod invalid_schema;
mod invalid_statement;
mod unsupported_attribute;

use adapter_resolution::AdapterResolutionError;
use adhoc::AdhocError;
use alias_not_found::AliasNotFoundError;
use ambiguous_set_update::AmbiguousSetUpdateError;
use cursor::{CursorAlreadyClosedError, CursorMisuseError};
use driver::DriverError;
use invalid_schema::InvalidSchemaError;
use invalid_statement::InvalidStatementError;
use std::sync::Arc;
use unsupported_attribute::UnsupportedAttributeError;

/// Returns early with an ad-hoc error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Builds an ad-hoc error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur while compiling or executing ER statements.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context is shown first,
    /// followed by earlier context, ending with the root cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let mut err = consequent;
        if err.inner.is_none() {
            err = Error::from(ErrorKind::Unknown);
        }
        let Some(inner) = err.inner.as_mut() else {
            unreachable!()
        };
        match Arc::get_mut(inner) {
            Some(inner) if inner.cause.is_none() => inner.cause = Some(self),
            _ => {
                // Shared or already-caused consequents are re-wrapped so the
                // original chain stays intact.
                err = Error::from(ErrorKind::Adhoc(AdhocError::new(err.to_string())));
                return self.context_impl(err);
            }
        }
        err
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }

    /// Returns `true` if this error, or any error in its context chain,
    /// satisfies `f`.
    fn any(&self, f: impl Fn(&ErrorKind) -> bool) -> bool {
        self.chain().any(|err| f(err.kind()))
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Driver(err) => Some(err),
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    AdapterResolution(AdapterResolutionError),
    AliasNotFound(AliasNotFoundError),
    AmbiguousSetUpdate(AmbiguousSetUpdateError),
    CursorAlreadyClosed(CursorAlreadyClosedError),
    CursorMisuse(CursorMisuseError),
    Driver(DriverError),
    InvalidSchema(InvalidSchemaError),
    InvalidStatement(InvalidStatementError),
    UnsupportedAttribute(UnsupportedAttributeError),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            AdapterResolution(err) => core::fmt::Display::fmt(err, f),
            AliasNotFound(err) => core::fmt::Display::fmt(err, f),
            AmbiguousSetUpdate(err) => core::fmt::Display::fmt(err, f),
            CursorAlreadyClosed(err) => core::fmt::Display::fmt(err, f),
            CursorMisuse(err) => core::fmt::Display::fmt(err, f),
            Driver(err) => core::fmt::Display::fmt(err, f),
            InvalidSchema(err) => core::fmt::Display::fmt(err, f),
            InvalidStatement(err) => core::fmt::Display::fmt(err, f),
            UnsupportedAttribute(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown erbridge error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_size() {
        let expected_size = size_of::<usize>();
        assert_eq!(expected_size, size_of::<Error>());
    }

    #[test]
    fn adhoc_error() {
        let err = err!("link {} is not joined", "u");
        assert_eq!(err.to_string(), "link u is not joined");
    }

    #[test]
    fn error_chain_display() {
        let root = Error::from_args(format_args!("root cause"));
        let mid = Error::from_args(format_args!("middle context"));
        let top = Error::from_args(format_args!("top context"));

        let chained = root.context(mid).context(top);
        assert_eq!(
            chained.to_string(),
            "top context: middle context: root cause"
        );
    }

    #[test]
    fn predicates_see_through_context() {
        let err = Error::alias_not_found("x").context(err!("compiling query on USERS"));
        assert!(err.is_alias_not_found());
        assert!(!err.is_adapter_resolution());
        assert_eq!(
            err.to_string(),
            "compiling query on USERS: alias not found: `x`"
        );
    }

    #[test]
    fn anyhow_bridge() {
        let anyhow_err = anyhow::anyhow!("something failed");
        let our_err: Error = anyhow_err.into();
        assert_eq!(our_err.to_string(), "something failed");
    }

    #[test]
    fn driver_error_keeps_source_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let err = Error::driver(io_err);
        assert!(err.is_driver());
        assert_eq!(err.to_string(), "peer reset");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn ambiguous_set_update_message() {
        let err = Error::ambiguous_set_update("GD_USER", "GROUPS");
        assert_eq!(
            err.to_string(),
            "ambiguous set update: GD_USER.GROUPS changed without the current reference ids"
        );
    }

    #[test]
    fn cursor_errors() {
        assert!(Error::cursor_already_closed().is_cursor_already_closed());
        assert_eq!(
            Error::cursor_misuse("fetch count must be positive").to_string(),
            "cursor misuse: fetch count must be positive"
        );
    }
}

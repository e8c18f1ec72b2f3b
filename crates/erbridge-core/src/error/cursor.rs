use super::Error;

/// Error when a cursor is fetched from or closed after it was closed.
#[derive(Debug)]
pub(super) struct CursorAlreadyClosedError;

impl std::error::Error for CursorAlreadyClosedError {}

impl core::fmt::Display for CursorAlreadyClosedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("cursor already closed")
    }
}

/// Error when the cursor API contract is violated in some other way, such
/// as a zero-sized fetch or a row wider than the compiled projection.
#[derive(Debug)]
pub(super) struct CursorMisuseError {
    message: Box<str>,
}

impl std::error::Error for CursorMisuseError {}

impl core::fmt::Display for CursorMisuseError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "cursor misuse: {}", self.message)
    }
}

impl Error {
    pub fn cursor_already_closed() -> Error {
        Error::from(super::ErrorKind::CursorAlreadyClosed(CursorAlreadyClosedError))
    }

    pub fn is_cursor_already_closed(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::CursorAlreadyClosed(_)))
    }

    pub fn cursor_misuse(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::CursorMisuse(CursorMisuseError {
            message: message.into().into(),
        }))
    }

    pub fn is_cursor_misuse(&self) -> bool {
        self.any(|kind| matches!(kind, super::ErrorKind::CursorMisuse(_)))
    }
}

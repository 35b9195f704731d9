//! Error handling for context creation and management.

use std::fmt;
use std::io::Error as IoError;

/// A specialized [`Result`] type for context operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all the native context operations.
#[derive(Debug, Clone)]
pub struct Error {
    /// The raw code of the underlying error.
    raw_code: Option<i64>,

    /// The raw message from the native API in case it could be obtained.
    raw_os_message: Option<String>,

    /// The simplified error kind to handle matching.
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(
        raw_code: Option<i64>,
        raw_os_message: Option<String>,
        kind: ErrorKind,
    ) -> Self {
        Self { raw_code, raw_os_message, kind }
    }

    /// Helper to check that error is [`ErrorKind::NotSupported`].
    #[inline]
    pub fn not_supported(&self) -> bool {
        matches!(&self.kind, ErrorKind::NotSupported(_))
    }

    /// The underlying error kind.
    #[inline]
    pub fn error_kind(&self) -> ErrorKind {
        self.kind
    }

    /// The underlying raw code in case it's present.
    #[inline]
    pub fn raw_code(&self) -> Option<i64> {
        self.raw_code
    }

    /// The native diagnostic message in case it's present.
    #[inline]
    pub fn raw_os_message(&self) -> Option<&str> {
        self.raw_os_message.as_deref()
    }

    /// Replace the kind while keeping the native diagnostic.
    pub(crate) fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(raw_code) = self.raw_code {
            write!(f, "[{raw_code:x}] ")?;
        }

        let msg = if let Some(raw_os_message) = self.raw_os_message.as_ref() {
            raw_os_message
        } else {
            self.kind.as_str()
        };

        write!(f, "{msg}")
    }
}

impl std::error::Error for Error {}

/// Build an error with just a kind.
impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { raw_code: None, raw_os_message: None, kind }
    }
}

/// Failures reported through `GetLastError`/`errno` happen while setting the
/// context up, so they're treated as creation failures.
impl From<IoError> for Error {
    fn from(value: IoError) -> Self {
        let raw_code = value.raw_os_error().map(i64::from);
        Error::new(raw_code, Some(value.to_string()), ErrorKind::ContextCreationFailed)
    }
}

/// A list specifying general categories of context errors.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required driver or windowing library could not be located or loaded.
    LibraryNotFound,

    /// Detect mode found no context bound to the calling thread.
    NoCurrentContext,

    /// A native step of context creation failed.
    ///
    /// This covers opening a display, selecting a config or pixel format,
    /// creating the context and making it current.
    ContextCreationFailed,

    /// The driver can't satisfy the requested minimum GL version.
    UnsupportedVersion,

    /// The handle was already released.
    ContextReleased,

    /// The configuration couldn't be parsed or is inconsistent.
    InvalidConfig,

    /// The operation is not supported by the platform.
    NotSupported(&'static str),
}

impl ErrorKind {
    pub(crate) fn as_str(&self) -> &'static str {
        use ErrorKind::*;
        match *self {
            LibraryNotFound => "required native library not found",
            NoCurrentContext => "no OpenGL context is current on the calling thread",
            ContextCreationFailed => "context creation failed",
            UnsupportedVersion => "requested OpenGL version is not supported",
            ContextReleased => "the context was already released",
            InvalidConfig => "invalid context configuration",
            NotSupported(reason) => reason,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefers_native_message() {
        let message = Some(String::from("EGL_BAD_MATCH"));
        let err = Error::new(Some(0x3009), message, ErrorKind::ContextCreationFailed);
        assert_eq!(err.to_string(), "[3009] EGL_BAD_MATCH");
    }

    #[test]
    fn display_falls_back_to_kind() {
        let err = Error::from(ErrorKind::NoCurrentContext);
        assert_eq!(err.to_string(), ErrorKind::NoCurrentContext.as_str());
        assert_eq!(err.raw_code(), None);
    }

    #[test]
    fn with_kind_keeps_diagnostic() {
        let message = Some(String::from("BadMatch"));
        let err = Error::new(Some(8), message, ErrorKind::ContextCreationFailed)
            .with_kind(ErrorKind::UnsupportedVersion);
        assert_eq!(err.error_kind(), ErrorKind::UnsupportedVersion);
        assert_eq!(err.raw_os_message(), Some("BadMatch"));
        assert_eq!(err.raw_code(), Some(8));
    }

    #[test]
    fn not_supported_helper() {
        assert!(Error::from(ErrorKind::NotSupported("share mode")).not_supported());
        assert!(!Error::from(ErrorKind::InvalidConfig).not_supported());
    }

    #[test]
    fn io_errors_are_creation_failures() {
        let err = Error::from(IoError::from_raw_os_error(2));
        assert_eq!(err.error_kind(), ErrorKind::ContextCreationFailed);
        assert_eq!(err.raw_code(), Some(2));
    }
}

//! Defines error types.

use std::fmt::Debug;
use std::sync::Arc;

type BoxedSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for GATT operations driven by this crate.
///
/// Cancellation is never reported through this type; see [`crate::Outcome`].
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxedSource>,
    message: String,
}

impl Error {
    /// Creates an error of `kind` with an optional underlying cause.
    pub fn new<S: ToString>(
        kind: ErrorKind,
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
        message: S,
    ) -> Self {
        Error {
            kind,
            source: source.map(Arc::from),
            message: message.to_string(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message for this error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Re-labels an error reported by the platform binding with the kind of the
    /// operation that was attempted, keeping the original as the source.
    ///
    /// An error that already carries `kind` is returned unchanged.
    pub(crate) fn during(self, kind: ErrorKind) -> Self {
        if self.kind == kind {
            return self;
        }
        let message = self.to_string();
        Error {
            kind,
            source: Some(Arc::new(self)),
            message,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            source: None,
            message: String::new(),
        }
    }
}

impl From<AttError> for Error {
    fn from(att_error: AttError) -> Self {
        ErrorKind::Protocol(att_error).into()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut f = f.debug_struct("Error");
        f.field("kind", &self.kind);
        if !self.message.is_empty() {
            f.field("message", &self.message);
        }
        if let Some(source) = self.source.as_ref() {
            f.field("source", source);
        }
        f.finish()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", &self.kind)
        } else {
            write!(f, "{}: {}", &self.kind, &self.message)
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|x| {
            let x: &(dyn std::error::Error + 'static) = x.as_ref();
            x
        })
    }
}

/// A list of general categories of GATT error.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// enabling notifications failed
    SubscriptionFailed,
    /// writing the characteristic failed
    WriteFailed,
    /// reading the characteristic failed
    ReadFailed,
    /// the device or the event source is gone
    NotConnected,
    /// the operation is unsupported
    NotSupported,
    /// invalid parameter
    InvalidParameter,
    /// protocol error: {0}
    Protocol(AttError),
    /// an internal error has occured
    Internal,
    /// error
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::SubscriptionFailed => f.write_str("enabling notifications failed"),
            ErrorKind::WriteFailed => f.write_str("writing the characteristic failed"),
            ErrorKind::ReadFailed => f.write_str("reading the characteristic failed"),
            ErrorKind::NotConnected => f.write_str("the device or the event source is gone"),
            ErrorKind::NotSupported => f.write_str("the operation is unsupported"),
            ErrorKind::InvalidParameter => f.write_str("invalid parameter"),
            ErrorKind::Protocol(err) => write!(f, "protocol error: {err}"),
            ErrorKind::Internal => f.write_str("an internal error has occured"),
            ErrorKind::Other => f.write_str("error"),
        }
    }
}

/// Bluetooth Attribute Protocol error reported by the device.
/// See the Bluetooth Core Specification, Vol 3, Part F, §3.4.1.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttError(u8);

impl AttError {
    /// The attribute handle given was not valid on this server.
    pub const INVALID_HANDLE: AttError = AttError(0x01);
    /// The attribute cannot be read.
    pub const READ_NOT_PERMITTED: AttError = AttError(0x02);
    /// The attribute cannot be written.
    pub const WRITE_NOT_PERMITTED: AttError = AttError(0x03);
    /// The attribute requires authentication before it can be read or written.
    pub const INSUFFICIENT_AUTHENTICATION: AttError = AttError(0x05);
    /// Attribute server does not support the request received from the client.
    pub const REQUEST_NOT_SUPPORTED: AttError = AttError(0x06);
    /// The attribute value length is invalid for the operation.
    pub const INVALID_ATTRIBUTE_VALUE_LENGTH: AttError = AttError(0x0d);
    /// The request encountered an unlikely error and could not be completed.
    pub const UNLIKELY_ERROR: AttError = AttError(0x0e);
    /// Insufficient Resources to complete the request.
    pub const INSUFFICIENT_RESOURCES: AttError = AttError(0x11);
    /// Client Characteristic Configuration Descriptor Improperly Configured
    pub const CCCD_IMPROPERLY_CONFIGURED: AttError = AttError(0xfd);
    /// Procedure Already in Progress
    pub const PROCEDURE_ALREADY_IN_PROGRESS: AttError = AttError(0xfe);

    /// Converts a [`u8`] value to an [`AttError`].
    pub const fn from_u8(val: u8) -> Self {
        AttError(val)
    }

    /// Converts an [`AttError`] to a [`u8`] value.
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Checks if the error code is in the application error range.
    pub fn is_application(&self) -> bool {
        (0x80..0xa0).contains(&self.0)
    }
}

impl std::fmt::Display for AttError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match *self {
            AttError::INVALID_HANDLE => "invalid attribute handle",
            AttError::READ_NOT_PERMITTED => "read not permitted",
            AttError::WRITE_NOT_PERMITTED => "write not permitted",
            AttError::INSUFFICIENT_AUTHENTICATION => "insufficient authentication",
            AttError::REQUEST_NOT_SUPPORTED => "request not supported",
            AttError::INVALID_ATTRIBUTE_VALUE_LENGTH => "invalid attribute value length",
            AttError::UNLIKELY_ERROR => "unlikely error",
            AttError::INSUFFICIENT_RESOURCES => "insufficient resources",
            AttError::CCCD_IMPROPERLY_CONFIGURED => "CCCD improperly configured",
            AttError::PROCEDURE_ALREADY_IN_PROGRESS => "procedure already in progress",
            _ if self.is_application() => {
                return write!(f, "application error 0x{:02x}", self.0);
            }
            _ => return write!(f, "unknown error 0x{:02x}", self.0),
        };
        f.write_str(text)
    }
}

impl From<u8> for AttError {
    fn from(number: u8) -> Self {
        AttError(number)
    }
}

impl From<AttError> for u8 {
    fn from(val: AttError) -> Self {
        val.0
    }
}

use thiserror::Error;

/// Errors raised by the binding layer.
///
/// Rejections reported by the server as part of a reply (the status of a
/// `SetCrtcConfig`, for example) are not errors; they come back as
/// [`ConfigStatus`](crate::codec::ConfigStatus) values.
#[derive(Debug, Error)]
pub enum Error {
    /// `XOpenDisplay` did not yield a usable session.
    #[error("failed to open display {name}")]
    ConnectionFailure { name: String },

    /// The connection was explicitly closed and must not be used again.
    #[error("this display connection has already been closed")]
    ConnectionClosed,

    /// `unlock` was called more often than `lock`.
    #[error("display connection is not locked")]
    NotLocked,

    /// A query for a specific resource returned no result.
    #[error("failed to get info for {kind} {id}")]
    NotFound { kind: &'static str, id: u64 },

    /// The property exists but does not hold a `STRING` value.
    #[error("only properties of type `STRING` are supported, property {atom} has type {actual}")]
    TypeMismatch { atom: u64, actual: u64 },

    /// An element of a caller-supplied sequence has the wrong shape. `index` is 1-based.
    #[error("at index {index}: expected {expected}, got {actual}")]
    InvalidArgument {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// A transient buffer could not be allocated before issuing the request.
    #[error("failed to allocate {what} array of {len} elements")]
    AllocationFailed { what: &'static str, len: usize },

    /// A name handed to Xlib contains an interior NUL byte.
    #[error("invalid string {value:?}: contains a NUL byte")]
    InvalidString { value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<u64>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }
}

//! Error types for the makuo client.
//!
//! Library code returns [`ClientError`] so callers can tell transport
//! failures, daemon-reported failures, and local misuse apart. The binary
//! wraps these in `anyhow` for top-level reporting.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by [`Session`](crate::Session) operations.
///
/// `ConnectionClosed`, `Daemon`, and `Timeout` stay distinct so callers can
/// choose between reconnecting, reporting, and retrying at their own layer;
/// the client itself never retries.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The daemon closed the connection before the response completed
    /// (zero-byte read).
    #[error("daemon closed the connection")]
    ConnectionClosed,

    /// The daemon rejected the command with an `error:` line.
    ///
    /// Carries the line's text with the marker stripped.
    #[error("daemon error: {0}")]
    Daemon(String),

    /// An operation was invoked on a closed session.
    #[error("session is not connected")]
    NotConnected,

    /// No response arrived within the configured read deadline.
    #[error("timed out waiting for daemon response")]
    Timeout,

    /// No base directory was supplied and the daemon's `status` output did
    /// not report one.
    #[error("daemon status did not report a basedir")]
    MissingBaseDir,

    /// A pattern or target argument contained characters that cannot be
    /// carried in a single wire command line.
    #[error("{what} contains characters invalid on the wire: {value:?}")]
    InvalidArgument {
        /// Which argument was rejected.
        what: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A path argument does not live under the session base directory.
    #[error("path {path:?} is not under base directory {base:?}")]
    PathOutsideBase {
        /// The offending path.
        path: PathBuf,
        /// The session's working base directory.
        base: PathBuf,
    },

    /// The socket path exceeds the kernel's `sun_path` limit.
    #[error("socket path too long ({len} > {max} bytes): {path:?}")]
    SocketPathTooLong {
        /// The rejected path.
        path: PathBuf,
        /// Its length in bytes.
        len: usize,
        /// The kernel limit.
        max: usize,
    },

    /// Connecting to the daemon socket failed.
    #[error("cannot connect to daemon socket {path:?}: {source}")]
    Connect {
        /// The socket path that was tried.
        path: PathBuf,
        /// The underlying connect error.
        source: io::Error,
    },

    /// Any other transport I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias for operations that can fail with [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

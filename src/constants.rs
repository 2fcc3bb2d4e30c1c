//! Application-wide constants for the makuo client.
//!
//! Centralizes protocol and transport values so they are documented in one
//! place instead of scattered as magic numbers.

use std::time::Duration;

// ============================================================================
// Daemon socket
// ============================================================================

/// Default path of the daemon's Unix control socket.
///
/// Matches the stock makuosan installation; override via configuration,
/// `MAKUO_SOCKET`, or the `--socket` flag.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/makuosan.sock";

/// Maximum Unix socket path length (sun_path limit on macOS/BSD; Linux
/// allows 108 but we enforce the portable bound).
pub const MAX_SOCKET_PATH_LEN: usize = 104;

// ============================================================================
// Transport deadlines
// ============================================================================

/// Default read deadline for one response cycle.
///
/// Generous because transfer commands answer only after the daemon has
/// walked the tree; raise it (or disable with a timeout of 0) for large
/// replication runs.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

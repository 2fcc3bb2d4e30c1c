//! Client library for the makuosan file replication daemon.
//!
//! makuosan replicates files across a group of servers; each daemon exposes
//! a line-oriented control protocol on a local Unix socket. This crate is a
//! blocking client for that protocol, plus the `makuo` binary as a thin
//! command-line front end.
//!
//! # Architecture
//!
//! ```text
//! caller ──► Session::execute_command ── "cmd\r\n" ──► daemon socket
//!                     │
//!                     └──◄── ResponseDecoder::read_response ◄── response
//!                            (lines until the two-byte "> " prompt)
//! ```
//!
//! The protocol is half-duplex and stateful: one command at a time per
//! session, each answered by newline-terminated lines that end at a
//! two-character prompt sent without a newline. [`Session`] owns the
//! connection lifecycle, [`framing::ResponseDecoder`] owns reassembly and
//! error classification.
//!
//! # Example
//!
//! ```no_run
//! use makuo::Session;
//! use std::path::Path;
//!
//! # fn main() -> makuo::Result<()> {
//! let mut session = Session::connect(
//!     Path::new("/var/run/makuosan.sock"),
//!     None, // ask the daemon for its base directory
//!     false,
//! )?;
//! let report = session.send(None, true, true, None)?; // dry-run the whole base
//! print!("{report}");
//! session.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`session`] - Connection lifecycle and the typed command surface
//! - [`framing`] - Line framing, prompt detection, error classification
//! - [`command`] - Wire command assembly
//! - [`status`] - Parsed `status` output
//! - [`config`] - Configuration file and environment overrides
//! - [`error`] - Error taxonomy
//! - [`constants`] - Protocol and transport constants

// Library modules
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod framing;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use command::SyncVerb;
pub use config::Config;
pub use error::{ClientError, Result};
pub use session::Session;
pub use status::DaemonStatus;

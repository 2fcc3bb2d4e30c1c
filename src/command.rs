//! Wire command assembly for the daemon's control grammar.
//!
//! Commands are plain text tokens joined by single spaces. The daemon's
//! parser is positional, so transfer commands must keep the exact order
//! `VERB [-r] [-n] [-t TARGET] [PATH]`.

use std::fmt;

/// Transfer verbs understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncVerb {
    /// Replicate a file or directory to the member servers.
    Send,
    /// Remove files from members that no longer exist locally.
    Sync,
    /// Replicate and delete in one pass.
    Dsync,
    /// Compare checksums with the members without transferring.
    Check,
}

impl SyncVerb {
    /// The wire token for this verb.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Sync => "sync",
            Self::Dsync => "dsync",
            Self::Check => "check",
        }
    }
}

impl fmt::Display for SyncVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assemble one transfer command line.
///
/// Token order is part of the wire contract: verb, `-r` when recursive,
/// `-n` when dry-run, `-t TARGET` when a member host is given, then the
/// base-relative path when one is given. No path means the daemon operates
/// on its whole base directory.
pub fn build_sync_command(
    verb: SyncVerb,
    recursive: bool,
    dry_run: bool,
    target: Option<&str>,
    path: Option<&str>,
) -> String {
    // The daemon grammar has no dry-run flag for `check`.
    debug_assert!(
        !(verb == SyncVerb::Check && dry_run),
        "check does not accept -n"
    );

    let mut command = String::from(verb.as_str());
    if recursive {
        command.push_str(" -r");
    }
    if dry_run {
        command.push_str(" -n");
    }
    if let Some(target) = target {
        command.push_str(" -t ");
        command.push_str(target);
    }
    if let Some(path) = path {
        command.push(' ');
        command.push_str(path);
    }
    command
}

//! Blocking session with the makuosan daemon.
//!
//! Wraps the daemon's Unix control socket and layers the typed command
//! surface on top of one synchronous request/response primitive,
//! [`Session::execute_command`].
//!
//! # Lifecycle
//!
//! ```text
//! Session::connect(socket, base, debug)
//!     │  connect stream, set read deadline
//!     ├─ drain greeting banner to the first prompt
//!     ├─ "loglevel 1"            only when debug is set
//!     └─ "status" -> basedir     only when no base dir was supplied
//!     ▼
//!   Ready ──execute_command()──► ... ──close()/drop──► Closed
//! ```
//!
//! A constructed session is always ready; the in-between states exist only
//! inside `connect`. `close` is idempotent and also runs on drop, so the
//! socket is released on every exit path. Calling into a closed session
//! fails with [`ClientError::NotConnected`].
//!
//! # Half-duplex
//!
//! The daemon tracks one prompt per connection: exactly one command may be
//! awaiting its response at any time. The blocking `&mut self` methods
//! enforce that ordering; wrap the session in a mutex to share it across
//! threads.
//!
//! Rust guideline compliant 2026-02

use std::io::Write;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::{build_sync_command, SyncVerb};
use crate::constants::{DEFAULT_READ_TIMEOUT, MAX_SOCKET_PATH_LEN};
use crate::error::{ClientError, Result};
use crate::framing::ResponseDecoder;
use crate::status::DaemonStatus;

/// Blocking client session on the daemon's control socket.
#[derive(Debug)]
pub struct Session {
    /// `None` once the session has been closed.
    stream: Option<UnixStream>,
    decoder: ResponseDecoder,
    base_dir: PathBuf,
}

impl Session {
    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Connect to the daemon socket and complete the startup handshake.
    ///
    /// The daemon opens every connection with a greeting banner ending at
    /// its first prompt; nothing may be sent before that prompt is seen,
    /// so `connect` drains it. With `debug` set, the daemon's log level is
    /// raised via `loglevel 1`. When `base_dir` is `None` the daemon is
    /// asked for its own `basedir` via `status`, and that directory becomes
    /// the base for path relativization.
    ///
    /// The read deadline starts at [`DEFAULT_READ_TIMEOUT`]; adjust it with
    /// [`Session::set_read_timeout`].
    ///
    /// # Errors
    ///
    /// Fails when the socket path exceeds the kernel limit, the connection
    /// is refused, the deadline cannot be set, or any handshake step fails.
    pub fn connect(
        socket_path: &Path,
        base_dir: Option<PathBuf>,
        debug: bool,
    ) -> Result<Self> {
        let path_len = socket_path.as_os_str().len();
        if path_len > MAX_SOCKET_PATH_LEN {
            return Err(ClientError::SocketPathTooLong {
                path: socket_path.to_path_buf(),
                len: path_len,
                max: MAX_SOCKET_PATH_LEN,
            });
        }

        let stream =
            UnixStream::connect(socket_path).map_err(|source| ClientError::Connect {
                path: socket_path.to_path_buf(),
                source,
            })?;
        stream.set_read_timeout(Some(DEFAULT_READ_TIMEOUT))?;
        log::debug!("[session] connected to {}", socket_path.display());

        let mut session = Self {
            stream: Some(stream),
            decoder: ResponseDecoder::new(),
            base_dir: PathBuf::new(),
        };

        let banner = session.read_response()?;
        if !banner.is_empty() {
            log::debug!("[session] banner: {}", banner.trim_end());
        }

        if debug {
            session.execute_command("loglevel 1")?;
        }

        session.base_dir = match base_dir {
            Some(dir) => dir,
            None => {
                let status = session.status()?;
                let dir = status.get("basedir").ok_or(ClientError::MissingBaseDir)?;
                PathBuf::from(dir)
            }
        };
        log::info!(
            "[session] ready, base directory {}",
            session.base_dir.display()
        );

        Ok(session)
    }

    /// Close the session and release the socket.
    ///
    /// Idempotent: any call after the first is a no-op. Also runs on drop,
    /// so every exit path ends here.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            log::debug!("[session] closed");
        }
    }

    /// True while the session can issue commands.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Set or clear the transport read deadline.
    ///
    /// `None` waits indefinitely, which suits replication runs that outlast
    /// the default deadline. The OS rejects a zero duration.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] on a closed session, or the underlying
    /// socket option failure.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let stream = self.stream.as_ref().ok_or(ClientError::NotConnected)?;
        stream.set_read_timeout(timeout)?;
        Ok(())
    }

    // ── Request/response primitive ──────────────────────────────────────────

    /// Send one command and return its full response body.
    ///
    /// The single choke point for daemon traffic: appends the `\r\n`
    /// terminator, writes the command in one piece, then reads lines until
    /// the next prompt. Blocks until the response completes or the read
    /// deadline expires.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotConnected`] on a closed session, otherwise the
    /// response-cycle failures: [`ClientError::Daemon`],
    /// [`ClientError::ConnectionClosed`], [`ClientError::Timeout`], or I/O.
    pub fn execute_command(&mut self, command: &str) -> Result<String> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        log::debug!("[session] >> {command}");

        let mut wire = Vec::with_capacity(command.len() + 2);
        wire.extend_from_slice(command.as_bytes());
        wire.extend_from_slice(b"\r\n");
        stream.write_all(&wire)?;

        self.decoder.read_response(stream)
    }

    // ── Transfer commands ───────────────────────────────────────────────────

    /// `send` - replicate a file or directory to the member servers.
    ///
    /// `path` is an absolute path under the session base directory; `None`
    /// operates on the whole base. `target` restricts the transfer to one
    /// member host.
    ///
    /// # Errors
    ///
    /// [`ClientError::PathOutsideBase`] for paths outside the base, plus
    /// the [`Session::execute_command`] failures.
    pub fn send(
        &mut self,
        path: Option<&Path>,
        recursive: bool,
        dry_run: bool,
        target: Option<&str>,
    ) -> Result<String> {
        self.transfer(SyncVerb::Send, path, recursive, dry_run, target)
    }

    /// `sync` - remove files from members that no longer exist locally.
    ///
    /// Same argument rules as [`Session::send`].
    pub fn sync(
        &mut self,
        path: Option<&Path>,
        recursive: bool,
        dry_run: bool,
        target: Option<&str>,
    ) -> Result<String> {
        self.transfer(SyncVerb::Sync, path, recursive, dry_run, target)
    }

    /// `dsync` - replicate and delete in one pass.
    ///
    /// Same argument rules as [`Session::send`].
    pub fn dsync(
        &mut self,
        path: Option<&Path>,
        recursive: bool,
        dry_run: bool,
        target: Option<&str>,
    ) -> Result<String> {
        self.transfer(SyncVerb::Dsync, path, recursive, dry_run, target)
    }

    /// `check` - compare checksums with the members without transferring.
    ///
    /// The daemon grammar has no dry-run flag for `check`, so this method
    /// takes none.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Session::send`].
    pub fn check(
        &mut self,
        path: Option<&Path>,
        recursive: bool,
        target: Option<&str>,
    ) -> Result<String> {
        self.transfer(SyncVerb::Check, path, recursive, false, target)
    }

    fn transfer(
        &mut self,
        verb: SyncVerb,
        path: Option<&Path>,
        recursive: bool,
        dry_run: bool,
        target: Option<&str>,
    ) -> Result<String> {
        if let Some(target) = target {
            // Targets are member host names; the daemon reads them as ASCII.
            if !target.is_ascii() {
                return Err(ClientError::InvalidArgument {
                    what: "target",
                    value: target.to_owned(),
                });
            }
            reject_line_breaks("target", target)?;
        }
        let relative = match path {
            Some(p) => Some(self.relativize(p)?),
            None => None,
        };
        let command =
            build_sync_command(verb, recursive, dry_run, target, relative.as_deref());
        log::info!("[session] {command}");
        self.execute_command(&command)
    }

    // ── Exclusion list ──────────────────────────────────────────────────────

    /// Add `pattern` to the daemon's exclusion list.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for patterns containing line
    /// breaks, plus the [`Session::execute_command`] failures.
    pub fn exclude_add(&mut self, pattern: &str) -> Result<String> {
        reject_line_breaks("pattern", pattern)?;
        self.execute_command(&format!("exclude add {pattern}"))
    }

    /// Remove `pattern` from the daemon's exclusion list.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidArgument`] for patterns containing line
    /// breaks, plus the [`Session::execute_command`] failures.
    pub fn exclude_del(&mut self, pattern: &str) -> Result<String> {
        reject_line_breaks("pattern", pattern)?;
        self.execute_command(&format!("exclude del {pattern}"))
    }

    /// List the daemon's exclusion patterns.
    ///
    /// # Errors
    ///
    /// The [`Session::execute_command`] failures.
    pub fn exclude_list(&mut self) -> Result<String> {
        self.execute_command("exclude list")
    }

    /// Clear the daemon's exclusion list.
    ///
    /// # Errors
    ///
    /// The [`Session::execute_command`] failures.
    pub fn exclude_clear(&mut self) -> Result<String> {
        self.execute_command("exclude clear")
    }

    // ── Status ──────────────────────────────────────────────────────────────

    /// Query daemon status as ordered key/value entries.
    ///
    /// # Errors
    ///
    /// The [`Session::execute_command`] failures.
    pub fn status(&mut self) -> Result<DaemonStatus> {
        let body = self.execute_command("status")?;
        Ok(DaemonStatus::parse(&body))
    }

    // ── Paths ───────────────────────────────────────────────────────────────

    /// Convert an absolute path into the daemon's base-relative form.
    ///
    /// The daemon interprets every path argument relative to its base
    /// directory, so this is the one place absolute local paths get
    /// translated. The base directory itself maps to `"."`.
    ///
    /// # Errors
    ///
    /// [`ClientError::PathOutsideBase`] when `path` does not live under the
    /// session base directory.
    pub fn relativize(&self, path: &Path) -> Result<String> {
        base_relative(&self.base_dir, path)
    }

    /// The session's working base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn read_response(&mut self) -> Result<String> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        self.decoder.read_response(stream)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Refuse argument values that would smuggle a second line onto the wire.
///
/// A CR or LF inside a pattern or target would terminate the command early
/// and desynchronize the prompt accounting for every later response.
fn reject_line_breaks(what: &'static str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(ClientError::InvalidArgument {
            what,
            value: value.to_owned(),
        });
    }
    Ok(())
}

/// Strip `base` from `path`, yielding the daemon-side relative form.
///
/// `.` and `..` components are resolved lexically before the containment
/// check, so `/base/../etc` cannot pass as being under `/base`.
fn base_relative(base: &Path, path: &Path) -> Result<String> {
    let outside = || ClientError::PathOutsideBase {
        path: path.to_path_buf(),
        base: base.to_path_buf(),
    };

    let normalized = normalize_lexically(path).ok_or_else(outside)?;
    let base = normalize_lexically(base).ok_or_else(outside)?;

    let Ok(relative) = normalized.strip_prefix(&base) else {
        return Err(outside());
    };
    if relative.as_os_str().is_empty() {
        return Ok(".".to_owned());
    }
    Ok(relative.to_string_lossy().into_owned())
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// Returns `None` when a `..` would climb past the root.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other),
        }
    }
    Some(out)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::net::UnixListener;
    use std::thread;

    /// Spawn a scripted daemon on a socket in a fresh temp directory.
    ///
    /// `script` runs against the single accepted connection. Keep the
    /// returned `TempDir` alive for the duration of the test.
    fn fake_daemon<F>(script: F) -> (tempfile::TempDir, PathBuf, thread::JoinHandle<()>)
    where
        F: FnOnce(UnixStream) + Send + 'static,
    {
        let dir = tempfile::tempdir().expect("create tempdir");
        let path = dir.path().join("makuosan.sock");
        let listener = UnixListener::bind(&path).expect("bind test socket");
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept client");
            script(stream);
        });
        (dir, path, handle)
    }

    /// Read one CRLF-terminated command line from the client.
    fn read_command(stream: &mut UnixStream) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        while let Ok(1) = stream.read(&mut byte) {
            line.push(byte[0]);
            if line.ends_with(b"\r\n") {
                line.truncate(line.len() - 2);
                break;
            }
        }
        String::from_utf8(line).expect("utf-8 command")
    }

    #[test]
    fn connect_drains_banner_and_is_ready() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream
                .write_all(b"makuosan version 1.3\r\nwelcome\r\n> ")
                .unwrap();
        });

        let session = Session::connect(&path, Some(PathBuf::from("/srv")), false).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.base_dir(), Path::new("/srv"));

        drop(session);
        daemon.join().unwrap();
    }

    #[test]
    fn execute_command_round_trips_through_prompt() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream.write_all(b"> ").unwrap();
            assert_eq!(read_command(&mut stream), "exclude list");
            stream.write_all(b"*.bak\r\n*.tmp\r\n> ").unwrap();
        });

        let mut session =
            Session::connect(&path, Some(PathBuf::from("/srv")), false).unwrap();
        assert_eq!(session.exclude_list().unwrap(), "*.bak\n*.tmp\n");

        drop(session);
        daemon.join().unwrap();
    }

    #[test]
    fn handshake_asks_daemon_for_basedir() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream.write_all(b"> ").unwrap();
            assert_eq!(read_command(&mut stream), "status");
            stream
                .write_all(b"basedir: /var/data\r\nversion: 3\r\n> ")
                .unwrap();
        });

        let session = Session::connect(&path, None, false).unwrap();
        assert_eq!(session.base_dir(), Path::new("/var/data"));

        drop(session);
        daemon.join().unwrap();
    }

    #[test]
    fn handshake_fails_when_daemon_reports_no_basedir() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream.write_all(b"> ").unwrap();
            assert_eq!(read_command(&mut stream), "status");
            stream.write_all(b"version: 3\r\n> ").unwrap();
        });

        let err = Session::connect(&path, None, false).unwrap_err();
        assert!(matches!(err, ClientError::MissingBaseDir));

        daemon.join().unwrap();
    }

    #[test]
    fn debug_mode_raises_daemon_loglevel() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream.write_all(b"> ").unwrap();
            assert_eq!(read_command(&mut stream), "loglevel 1");
            stream.write_all(b"> ").unwrap();
        });

        let session = Session::connect(&path, Some(PathBuf::from("/srv")), true).unwrap();
        drop(session);
        daemon.join().unwrap();
    }

    #[test]
    fn daemon_error_keeps_stream_aligned() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream.write_all(b"> ").unwrap();
            assert_eq!(read_command(&mut stream), "send missing.txt");
            stream.write_all(b"error: no such file\r\n> ").unwrap();
            assert_eq!(read_command(&mut stream), "exclude list");
            stream.write_all(b"*.tmp\r\n> ").unwrap();
        });

        let mut session =
            Session::connect(&path, Some(PathBuf::from("/var/data")), false).unwrap();
        let err = session
            .send(Some(Path::new("/var/data/missing.txt")), false, false, None)
            .unwrap_err();
        assert!(matches!(err, ClientError::Daemon(ref m) if m == "no such file"));

        // The failed cycle consumed through its prompt; the session keeps
        // working.
        assert_eq!(session.exclude_list().unwrap(), "*.tmp\n");

        drop(session);
        daemon.join().unwrap();
    }

    #[test]
    fn patterns_with_line_breaks_are_refused() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream.write_all(b"> ").unwrap();
            // A rejected pattern must never reach the wire; the next real
            // command is the first thing the daemon sees.
            assert_eq!(read_command(&mut stream), "exclude list");
            stream.write_all(b"> ").unwrap();
        });

        let mut session =
            Session::connect(&path, Some(PathBuf::from("/srv")), false).unwrap();

        let err = session.exclude_add("*.tmp\r\nstatus").unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument { what: "pattern", .. }));
        let err = session.exclude_del("*.tmp\nstatus").unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument { what: "pattern", .. }));

        assert_eq!(session.exclude_list().unwrap(), "");

        drop(session);
        daemon.join().unwrap();
    }

    #[test]
    fn targets_are_validated_before_any_write() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream.write_all(b"> ").unwrap();
        });

        let mut session =
            Session::connect(&path, Some(PathBuf::from("/srv")), false).unwrap();

        let err = session.send(None, false, false, Some("web\r\n1")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument { what: "target", .. }));
        let err = session.send(None, false, false, Some("wéb1")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument { what: "target", .. }));

        drop(session);
        daemon.join().unwrap();
    }

    #[test]
    fn close_twice_is_a_noop() {
        let (_dir, path, daemon) = fake_daemon(|mut stream| {
            stream.write_all(b"> ").unwrap();
            // Hold the connection until the client goes away.
            let mut buf = [0u8; 16];
            let _ = stream.read(&mut buf);
        });

        let mut session =
            Session::connect(&path, Some(PathBuf::from("/srv")), false).unwrap();
        session.close();
        session.close();
        assert!(!session.is_connected());

        let err = session.execute_command("status").unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));

        daemon.join().unwrap();
    }

    #[test]
    fn connect_rejects_overlong_socket_path() {
        let path = PathBuf::from(format!("/tmp/{}.sock", "x".repeat(150)));
        let err = Session::connect(&path, Some(PathBuf::from("/srv")), false).unwrap_err();
        assert!(matches!(err, ClientError::SocketPathTooLong { .. }));
    }

    #[test]
    fn base_relative_strips_the_base() {
        let relative =
            base_relative(Path::new("/var/data"), Path::new("/var/data/a/b.txt")).unwrap();
        assert_eq!(relative, "a/b.txt");
    }

    #[test]
    fn base_relative_is_stable_across_calls() {
        let base = Path::new("/var/data");
        let path = Path::new("/var/data/htdocs/index.html");
        assert_eq!(
            base_relative(base, path).unwrap(),
            base_relative(base, path).unwrap()
        );
    }

    #[test]
    fn base_itself_maps_to_dot() {
        assert_eq!(
            base_relative(Path::new("/var/data"), Path::new("/var/data")).unwrap(),
            "."
        );
    }

    #[test]
    fn paths_outside_base_are_refused() {
        let err = base_relative(Path::new("/var/data"), Path::new("/etc/passwd"))
            .unwrap_err();
        assert!(matches!(err, ClientError::PathOutsideBase { .. }));
    }

    #[test]
    fn dotdot_cannot_escape_the_base() {
        let err = base_relative(
            Path::new("/var/data"),
            Path::new("/var/data/../etc/passwd"),
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::PathOutsideBase { .. }));
    }

    #[test]
    fn dotdot_inside_the_base_is_resolved() {
        let relative = base_relative(
            Path::new("/var/data"),
            Path::new("/var/data/htdocs/../etc/./app.conf"),
        )
        .unwrap();
        assert_eq!(relative, "etc/app.conf");
    }

    #[test]
    fn dotdot_past_the_root_is_refused() {
        let err = base_relative(Path::new("/var/data"), Path::new("/../var/data/x"))
            .unwrap_err();
        assert!(matches!(err, ClientError::PathOutsideBase { .. }));
    }
}

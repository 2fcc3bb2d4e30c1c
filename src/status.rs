//! Parsed view of the daemon's `status` output.
//!
//! `status` answers with colon-separated `key: value` lines, for example:
//!
//! ```text
//! version: 1.3.0
//! basedir: /var/www
//! loglevel: 0
//! ```
//!
//! [`DaemonStatus`] keeps the entries in the daemon's output order and skips
//! free-form lines without a colon (section headers, member listings).

/// Ordered key/value view of one `status` response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonStatus {
    entries: Vec<(String, String)>,
}

impl DaemonStatus {
    /// Parse a response body into ordered key/value entries.
    ///
    /// Each line is split on its first colon; keys and values are
    /// whitespace-trimmed. Lines without a colon are skipped, so values may
    /// themselves contain colons.
    pub fn parse(body: &str) -> Self {
        let mut entries = Vec::new();
        for line in body.lines() {
            if let Some((key, value)) = line.split_once(':') {
                entries.push((key.trim().to_owned(), value.trim().to_owned()));
            }
        }
        Self { entries }
    }

    /// Value for `key`, if the daemon reported one. First match wins when a
    /// key repeats.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All entries, in daemon output order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// True when the response contained no key/value lines.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_daemon_order() {
        let status = DaemonStatus::parse("basedir: /var/data\nversion: 3\n");
        assert_eq!(
            status.entries(),
            &[
                ("basedir".to_string(), "/var/data".to_string()),
                ("version".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn get_finds_reported_values() {
        let status = DaemonStatus::parse("basedir: /var/data\nversion: 3\n");
        assert_eq!(status.get("basedir"), Some("/var/data"));
        assert_eq!(status.get("loglevel"), None);
    }

    #[test]
    fn split_happens_on_first_colon_only() {
        let status = DaemonStatus::parse("source: tcp://web1:8765\n");
        assert_eq!(status.get("source"), Some("tcp://web1:8765"));
    }

    #[test]
    fn lines_without_colon_are_skipped() {
        let status = DaemonStatus::parse("member list\nweb1 alive\ncount: 2\n");
        assert_eq!(status.entries().len(), 1);
        assert_eq!(status.get("count"), Some("2"));
    }

    #[test]
    fn keys_and_values_are_trimmed() {
        let status = DaemonStatus::parse("  basedir  :   /var/www  \n");
        assert_eq!(status.get("basedir"), Some("/var/www"));
    }

    #[test]
    fn empty_body_parses_empty() {
        assert!(DaemonStatus::parse("").is_empty());
    }
}

//! The append-only command log and its repair/commit bookkeeping.

use serde::{Deserialize, Serialize};

use crate::common::Term;

/// The command carried by a single log entry.
///
/// Internally structured (rather than an opaque string) so the state
/// machine doesn't need to parse it, but it renders to the opaque
/// `enqueue("m")` / `dequeue()` form for `request_log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Enqueue(String),
    Dequeue,
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Enqueue(msg) => write!(f, "enqueue(\"{msg}\")"),
            Command::Dequeue => write!(f, "dequeue()"),
        }
    }
}

impl Command {
    /// Parses the opaque `enqueue("m")` / `dequeue()` wire form back into a
    /// `Command`. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Command> {
        if s == "dequeue()" {
            return Some(Command::Dequeue);
        }
        let inner = s.strip_prefix("enqueue(\"")?.strip_suffix("\")")?;
        Some(Command::Enqueue(inner.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub term: Term,
    pub command: Command,
}

/// An in-memory, append-only sequence of `LogEntry`, indexed from 0.
///
/// `committed_length` is always `<= length` and never shrinks except by the
/// truncate-on-append path, which can only ever discard the uncommitted
/// suffix (see `append`'s assertion).
#[derive(Debug, Default)]
pub struct Log {
    entries: Vec<LogEntry>,
    committed_length: usize,
}

impl Log {
    pub fn new() -> Self {
        Log { entries: Vec::new(), committed_length: 0 }
    }

    pub fn length(&self) -> usize {
        self.entries.len()
    }

    pub fn committed_length(&self) -> usize {
        self.committed_length
    }

    pub fn last_term(&self) -> Term {
        self.entries.last().map(|e| e.term).unwrap_or(Term::zero())
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&LogEntry> {
        self.entries.get(index)
    }

    pub fn entries_from(&self, index: usize) -> &[LogEntry] {
        if index >= self.entries.len() {
            &[]
        } else {
            &self.entries[index..]
        }
    }

    /// Entries in `[committed_length, length)`: accepted but not yet committed.
    pub fn uncommitted_entries(&self) -> &[LogEntry] {
        self.entries_from(self.committed_length)
    }

    /// `true` iff `length >= prefix_len` and, when `prefix_len > 0`, the
    /// entry at `prefix_len - 1` has term `prefix_last_term`.
    pub fn consistent(&self, prefix_len: usize, prefix_last_term: Term) -> bool {
        if self.entries.len() < prefix_len {
            return false;
        }
        if prefix_len == 0 {
            return true;
        }
        self.entries[prefix_len - 1].term == prefix_last_term
    }

    /// Truncate the suffix at/after `prefix_len` (if any), then append
    /// `entries`. A no-op if `entries` is empty and `prefix_len == length`.
    ///
    /// `committed_length` is only ever lowered down to `prefix_len`, and
    /// only when truncation actually occurs; callers must never truncate
    /// below the already-committed prefix (invariant 4).
    pub fn append(&mut self, entries: &[LogEntry], prefix_len: usize) {
        if entries.is_empty() && prefix_len == self.entries.len() {
            return;
        }
        if prefix_len < self.entries.len() {
            debug_assert!(
                prefix_len >= self.committed_length,
                "refusing to truncate the committed prefix: prefix_len={} committed_length={}",
                prefix_len,
                self.committed_length
            );
            self.entries.truncate(prefix_len);
            if self.committed_length > prefix_len {
                self.committed_length = prefix_len;
            }
        }
        self.entries.extend_from_slice(entries);
    }

    /// Raise `committed_length` to `new_len`. Never shrinks (invariant 4).
    pub fn advance_committed(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.entries.len());
        if new_len > self.committed_length {
            self.committed_length = new_len;
        }
    }

    /// Human-readable `Term: t | Method: command` rendering for `request_log`.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("Term: {} | Method: {}", e.term, e.command))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(term: u64, cmd: Command) -> LogEntry {
        LogEntry { term: Term(term), command: cmd }
    }

    #[test]
    fn append_is_noop_when_entries_empty_and_prefix_matches_length() {
        let mut log = Log::new();
        log.append(&[entry(1, Command::Dequeue)], 0);
        assert_eq!(log.length(), 1);
        log.append(&[], 1);
        assert_eq!(log.length(), 1);
    }

    #[test]
    fn append_truncates_uncommitted_suffix() {
        let mut log = Log::new();
        log.append(
            &[
                entry(1, Command::Enqueue("a".into())),
                entry(1, Command::Enqueue("b".into())),
                entry(1, Command::Enqueue("c".into())),
            ],
            0,
        );
        assert_eq!(log.length(), 3);
        log.append(&[entry(2, Command::Enqueue("x".into()))], 1);
        assert_eq!(log.length(), 2);
        assert_eq!(log.entry(1).unwrap().command, Command::Enqueue("x".into()));
    }

    #[test]
    fn append_lowers_committed_length_only_down_to_prefix_len() {
        let mut log = Log::new();
        log.append(
            &[
                entry(1, Command::Enqueue("a".into())),
                entry(1, Command::Enqueue("b".into())),
                entry(1, Command::Enqueue("c".into())),
            ],
            0,
        );
        log.advance_committed(2);
        log.append(&[entry(2, Command::Enqueue("x".into()))], 1);
        assert_eq!(log.committed_length(), 1);
    }

    #[test]
    fn consistent_empty_prefix_is_always_true() {
        let log = Log::new();
        assert!(log.consistent(0, Term::zero()));
    }

    #[test]
    fn consistent_checks_last_term_of_prefix() {
        let mut log = Log::new();
        log.append(&[entry(3, Command::Dequeue)], 0);
        assert!(log.consistent(1, Term(3)));
        assert!(!log.consistent(1, Term(4)));
        assert!(!log.consistent(2, Term(3)));
    }

    #[test]
    fn advance_committed_never_shrinks() {
        let mut log = Log::new();
        log.append(&[entry(1, Command::Dequeue), entry(1, Command::Dequeue)], 0);
        log.advance_committed(2);
        log.advance_committed(1);
        assert_eq!(log.committed_length(), 2);
    }

    #[test]
    fn command_parse_recognizes_rendered_forms() {
        assert_eq!(Command::parse("dequeue()"), Some(Command::Dequeue));
        assert_eq!(
            Command::parse("enqueue(\"hello\")"),
            Some(Command::Enqueue("hello".into()))
        );
        assert_eq!(Command::parse("bogus"), None);
    }

}

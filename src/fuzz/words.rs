//! Candidate words and the shared word source
//!
//! Wordlist entries are normalized into absolute paths and deduplicated
//! up front; workers then pull candidates through an atomic cursor, so
//! each candidate is handed out exactly once without locking.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ConfigError;

/// Well-known paths probed in addition to the wordlist
pub const COMMON_PATHS: &[&str] = &["/admin", "/login", "/dashboard", "/user", "/api"];

/// One normalized path to probe, always starting with a single `/`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate(String);

impl Candidate {
    /// Normalizes a raw wordlist entry. Blank lines and `#` comments
    /// yield `None`.
    pub fn parse(raw: &str) -> Option<Candidate> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        Some(Candidate(format!("/{}", trimmed.trim_start_matches('/'))))
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplicated source of candidates, shared across probe workers.
///
/// Wordlist entries come first, in file order, followed by any common
/// paths not already present. `next_candidate` is safe to call from
/// many workers at once.
#[derive(Debug)]
pub struct WordSource {
    candidates: Vec<Candidate>,
    cursor: AtomicUsize,
}

impl WordSource {
    /// Builds a source from raw entries plus a set of common paths.
    /// Fails if nothing usable remains after normalization.
    pub fn new<I, S>(entries: I, common: &[&str]) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for raw in entries {
            if let Some(candidate) = Candidate::parse(raw.as_ref()) {
                if seen.insert(candidate.clone()) {
                    candidates.push(candidate);
                }
            }
        }
        for raw in common {
            if let Some(candidate) = Candidate::parse(raw) {
                if seen.insert(candidate.clone()) {
                    candidates.push(candidate);
                }
            }
        }
        if candidates.is_empty() {
            return Err(ConfigError::EmptyWordlist);
        }
        Ok(Self {
            candidates,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Reads a wordlist file, one entry per line.
    pub fn from_file(path: &Path, common: &[&str]) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|e| ConfigError::WordlistRead {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| ConfigError::WordlistRead {
                path: path.display().to_string(),
                source: e,
            })?;
            entries.push(line);
        }
        Self::new(entries, common)
    }

    /// Number of distinct candidates this source will hand out
    pub fn total(&self) -> usize {
        self.candidates.len()
    }

    /// Claims the next unclaimed candidate, or `None` once exhausted.
    /// Each candidate is returned to exactly one caller.
    pub fn next_candidate(&self) -> Option<Candidate> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.candidates.get(index).cloned()
    }

    /// Rewinds the cursor so the source can feed another session
    #[allow(dead_code)]
    pub fn reset(&self) {
        self.cursor.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Barrier;

    #[test]
    fn test_candidate_normalization() {
        assert_eq!(Candidate::parse("admin").unwrap().path(), "/admin");
        assert_eq!(Candidate::parse("/admin").unwrap().path(), "/admin");
        assert_eq!(Candidate::parse("//admin").unwrap().path(), "/admin");
        assert_eq!(Candidate::parse("  login  ").unwrap().path(), "/login");
        assert_eq!(Candidate::parse("a/b/c").unwrap().path(), "/a/b/c");
        assert!(Candidate::parse("").is_none());
        assert!(Candidate::parse("   ").is_none());
        assert!(Candidate::parse("# comment").is_none());
    }

    #[test]
    fn test_dedup_across_spellings() {
        let source = WordSource::new(["admin", "/admin", "admin/", "login"], &[]).unwrap();
        // "admin/" normalizes to a different path than "admin"
        assert_eq!(source.total(), 3);
    }

    #[test]
    fn test_wordlist_entries_precede_common_paths() {
        let source = WordSource::new(["zzz", "admin"], &["/admin", "/login"]).unwrap();
        let order: Vec<String> = std::iter::from_fn(|| source.next_candidate())
            .map(|c| c.path().to_string())
            .collect();
        assert_eq!(order, vec!["/zzz", "/admin", "/login"]);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let entries: [&str; 0] = [];
        assert!(matches!(
            WordSource::new(entries, &[]),
            Err(ConfigError::EmptyWordlist)
        ));
        // comments and blanks only
        assert!(matches!(
            WordSource::new(["", "# note", "   "], &[]),
            Err(ConfigError::EmptyWordlist)
        ));
    }

    #[test]
    fn test_exhaustion_and_reset() {
        let source = WordSource::new(["a", "b"], &[]).unwrap();
        assert!(source.next_candidate().is_some());
        assert!(source.next_candidate().is_some());
        assert!(source.next_candidate().is_none());
        assert!(source.next_candidate().is_none());
        source.reset();
        assert_eq!(source.next_candidate().unwrap().path(), "/a");
    }

    #[test]
    fn test_from_file_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# common paths").unwrap();
        writeln!(file, "admin").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  backup.zip").unwrap();
        writeln!(file, "admin").unwrap();
        file.flush().unwrap();

        let source = WordSource::from_file(file.path(), &[]).unwrap();
        assert_eq!(source.total(), 2);
        assert_eq!(source.next_candidate().unwrap().path(), "/admin");
        assert_eq!(source.next_candidate().unwrap().path(), "/backup.zip");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = WordSource::from_file(Path::new("/no/such/wordlist.txt"), &[]);
        assert!(matches!(result, Err(ConfigError::WordlistRead { .. })));
    }

    #[test]
    fn test_concurrent_pulls_claim_each_candidate_once() {
        let entries: Vec<String> = (0..200).map(|i| format!("path-{}", i)).collect();
        let source = WordSource::new(entries, &[]).unwrap();

        // real threads, released together, so the cursor is contended
        let barrier = Barrier::new(8);
        let claimed: Vec<Candidate> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        let mut mine = Vec::new();
                        while let Some(candidate) = source.next_candidate() {
                            mine.push(candidate);
                        }
                        mine
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(claimed.len(), 200);
        let distinct: HashSet<_> = claimed.iter().collect();
        assert_eq!(distinct.len(), 200);
        assert!(source.next_candidate().is_none());
    }
}

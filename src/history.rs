use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Upper bound on what a history read returns, matching the original
/// shell's ten-entry window.
const HISTORY_CAPACITY: usize = 10;

/// Append-only command history in a user-scoped file. Writes are
/// fire-and-forget: a failure here must never abort command execution.
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: PathBuf) -> History {
        History { path }
    }

    /// Appends one submitted line verbatim. Errors are swallowed.
    pub fn append(&self, line: &str) {
        let entry = line.trim_end_matches('\n');
        if let Ok(mut file) = OpenOptions::new().append(true).create(true).open(&self.path) {
            let _ = writeln!(file, "{entry}");
        }
    }

    /// The most recent entries, oldest first, capped at ten. Reserved for
    /// the `history` builtin, which has no dispatcher action yet.
    #[allow(dead_code)]
    pub fn recent(&self) -> Vec<String> {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        let lines: Vec<&str> = contents.lines().collect();
        let skip = lines.len().saturating_sub(HISTORY_CAPACITY);
        lines[skip..].iter().map(|line| line.to_string()).collect()
    }
}

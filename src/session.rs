use std::env;
use std::path::PathBuf;

use crate::history::History;

const HISTORY_FILE: &str = ".minish_history";

/// Per-shell state: home directory, current working directory and the
/// history file. Populated once at startup and threaded explicitly through
/// the loop and the builtins instead of living in globals.
pub struct Session {
    home: String,
    cwd: PathBuf,
    history: History,
}

impl Session {
    pub fn new() -> Session {
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/"));
        Session::with_home(home)
    }

    pub fn with_home(home: String) -> Session {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from(&home));
        let history = History::new(PathBuf::from(&home).join(HISTORY_FILE));
        Session { home, cwd, history }
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Basename of the working directory, shown in the prompt.
    pub fn cwd_label(&self) -> String {
        match self.cwd.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => String::from("/"),
        }
    }

    /// Re-reads the process working directory after a `cd`, falling back to
    /// home when it cannot be determined.
    pub fn refresh_cwd(&mut self) {
        self.cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from(&self.home));
    }
}

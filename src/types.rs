/// Whether a stage names an in-process builtin or an external program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Builtin,
    External,
}

/// One segment of a pipeline. A full command line parses into a chain of
/// stages, each exclusively owning its successor through `next`.
#[derive(Debug)]
pub struct Stage {
    /// Program name followed by its arguments. Never empty once the chain
    /// leaves the parser.
    pub argv: Vec<String>,
    /// Replaces standard input with this file's contents when present.
    pub input_redirect: Option<String>,
    /// Replaces standard output with this file (created or truncated).
    pub output_redirect: Option<String>,
    pub background: bool,
    pub kind: CommandKind,
    pub next: Option<Box<Stage>>,
}

impl Stage {
    pub fn new() -> Stage {
        Stage {
            argv: Vec::new(),
            input_redirect: None,
            output_redirect: None,
            background: false,
            kind: CommandKind::External,
            next: None,
        }
    }

    /// Walks the chain from this stage to the last one.
    pub fn iter(&self) -> Stages<'_> {
        Stages { cur: Some(self) }
    }
}

pub struct Stages<'a> {
    cur: Option<&'a Stage>,
}

impl<'a> Iterator for Stages<'a> {
    type Item = &'a Stage;

    fn next(&mut self) -> Option<&'a Stage> {
        let stage = self.cur?;
        self.cur = stage.next.as_deref();
        Some(stage)
    }
}

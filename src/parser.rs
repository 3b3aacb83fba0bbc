use crate::builtin;
use crate::types::{CommandKind, Stage};

fn is_operator(c: u8) -> bool {
    matches!(c, b'&' | b'|' | b'<' | b'>')
}

/// Splits a line into tokens: the single-character operators `&`, `|`, `<`
/// and `>`, double-quoted literal spans (quotes stripped, everything inside
/// kept verbatim), and runs of other non-whitespace characters. Operators
/// split words even without surrounding whitespace, so `a>b` tokenizes the
/// same as `a > b`. Tokens are slices of the input line; word and operator
/// are told apart by content alone.
pub fn tokenize(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
        } else if is_operator(bytes[i]) {
            tokens.push(&line[i..i + 1]);
            i += 1;
        } else if bytes[i] == b'"' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i] != b'"' {
                i += 1;
            }
            // an unterminated span runs to the end of the line
            tokens.push(&line[start..i]);
            if i < bytes.len() {
                i += 1;
            }
        } else {
            let start = i;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !is_operator(bytes[i]) && bytes[i] != b'"' {
                i += 1;
            }
            tokens.push(&line[start..i]);
        }
    }
    tokens
}

/// Consumes a token sequence into a stage chain. Words accumulate on the
/// current stage; `<` and `>` take the following token as a redirect target
/// (a dangling operator at the end of the line is dropped silently); `&`
/// marks the current stage for background launch; `|` starts a new stage.
///
/// Stages left with an empty argv (stray separators) are discarded, so every
/// stage that reaches execution has a program name. Returns `None` when the
/// line contains no runnable stage at all.
pub fn build(tokens: &[&str]) -> Option<Stage> {
    let mut stages: Vec<Stage> = Vec::new();
    let mut cur = Stage::new();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "<" => {
                if i + 1 < tokens.len() {
                    i += 1;
                    cur.input_redirect = Some(tokens[i].to_string());
                }
            }
            ">" => {
                if i + 1 < tokens.len() {
                    i += 1;
                    cur.output_redirect = Some(tokens[i].to_string());
                }
            }
            "&" => cur.background = true,
            "|" => stages.push(std::mem::replace(&mut cur, Stage::new())),
            word => cur.argv.push(word.to_string()),
        }
        i += 1;
    }
    stages.push(cur);
    stages.retain(|stage| !stage.argv.is_empty());

    let mut head: Option<Box<Stage>> = None;
    while let Some(mut stage) = stages.pop() {
        stage.next = head;
        head = Some(Box::new(stage));
    }

    let mut head = *head?;
    classify(&mut head);
    Some(head)
}

/// Classifier pass: marks each stage by testing its leading word against the
/// builtin name set.
fn classify(head: &mut Stage) {
    let mut cur = Some(head);
    while let Some(stage) = cur {
        stage.kind = if builtin::is_builtin_name(&stage.argv[0]) {
            CommandKind::Builtin
        } else {
            CommandKind::External
        };
        cur = stage.next.as_deref_mut();
    }
}

/// Tokenizes and builds in one step. Callers must not hand in blank lines;
/// the interactive loop filters those before parsing.
pub fn parse(line: &str) -> Option<Stage> {
    build(&tokenize(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(stage: &Stage) -> Vec<&str> {
        stage.argv.iter().map(String::as_str).collect()
    }

    fn parse_line(line: &str) -> Stage {
        parse(line).expect("line should produce a chain")
    }

    #[test]
    fn simple_command_splits_into_words() {
        let stage = parse_line("ls -la");
        assert_eq!(argv(&stage), ["ls", "-la"]);
        assert_eq!(stage.input_redirect, None);
        assert_eq!(stage.output_redirect, None);
        assert!(!stage.background);
        assert!(stage.next.is_none());
    }

    #[test]
    fn operators_split_without_whitespace() {
        assert_eq!(tokenize("a>b"), ["a", ">", "b"]);
        assert_eq!(tokenize("a>b"), tokenize("a > b"));
        assert_eq!(tokenize("a|b<c"), ["a", "|", "b", "<", "c"]);
    }

    #[test]
    fn quoted_span_is_one_token() {
        assert_eq!(tokenize(r#"echo "x y""#), ["echo", "x y"]);
    }

    #[test]
    fn unterminated_quote_runs_to_end_of_line() {
        assert_eq!(tokenize(r#"echo "abc def"#), ["echo", "abc def"]);
    }

    #[test]
    fn pipeline_links_stages_in_source_order() {
        let head = parse_line("cat file.txt | grep pattern | wc -l");
        let stages: Vec<&Stage> = head.iter().collect();
        assert_eq!(stages.len(), 3);
        assert_eq!(argv(stages[0]), ["cat", "file.txt"]);
        assert_eq!(argv(stages[1]), ["grep", "pattern"]);
        assert_eq!(argv(stages[2]), ["wc", "-l"]);
        for stage in &stages {
            assert_eq!(stage.input_redirect, None);
            assert_eq!(stage.output_redirect, None);
            assert!(!stage.background);
        }
    }

    #[test]
    fn input_redirect_captured() {
        let stage = parse_line("grep pattern < input.txt");
        assert_eq!(argv(&stage), ["grep", "pattern"]);
        assert_eq!(stage.input_redirect.as_deref(), Some("input.txt"));
        assert_eq!(stage.output_redirect, None);
    }

    #[test]
    fn output_redirect_captured() {
        let stage = parse_line("echo hello > output.txt");
        assert_eq!(argv(&stage), ["echo", "hello"]);
        assert_eq!(stage.output_redirect.as_deref(), Some("output.txt"));
        assert_eq!(stage.input_redirect, None);
    }

    #[test]
    fn both_redirects_on_one_stage() {
        let stage = parse_line("tr a-z A-Z < lowercase.txt > uppercase.txt");
        assert_eq!(argv(&stage), ["tr", "a-z", "A-Z"]);
        assert_eq!(stage.input_redirect.as_deref(), Some("lowercase.txt"));
        assert_eq!(stage.output_redirect.as_deref(), Some("uppercase.txt"));
    }

    #[test]
    fn background_flag_captured() {
        let stage = parse_line("sleep 100 &");
        assert_eq!(argv(&stage), ["sleep", "100"]);
        assert!(stage.background);
        assert!(stage.next.is_none());
    }

    #[test]
    fn dangling_redirect_is_dropped() {
        let stage = parse_line("cat <");
        assert_eq!(argv(&stage), ["cat"]);
        assert_eq!(stage.input_redirect, None);
    }

    #[test]
    fn empty_stages_are_discarded() {
        assert!(parse("|").is_none());
        let stage = parse_line("cat |");
        assert_eq!(argv(&stage), ["cat"]);
        assert!(stage.next.is_none());
    }

    #[test]
    fn classifier_marks_builtin_names() {
        assert_eq!(parse_line("cd ..").kind, CommandKind::Builtin);
        assert_eq!(parse_line("exit").kind, CommandKind::Builtin);
        assert_eq!(parse_line("history").kind, CommandKind::Builtin);
        assert_eq!(parse_line("ls").kind, CommandKind::External);
    }
}

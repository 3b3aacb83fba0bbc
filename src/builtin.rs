use std::env;
use std::process;

use crate::session::Session;

pub type BuiltinFn = fn(&mut Session, &[String]) -> u8;

/// Names classified as builtins. `history` is reserved in the set but has no
/// dispatcher action, so executing it falls through to the external lookup.
pub fn is_builtin_name(name: &str) -> bool {
    matches!(name, "cd" | "exit" | "history")
}

pub fn lookup(name: &str) -> Option<BuiltinFn> {
    match name {
        "cd" => Some(builtin_cd),
        "exit" => Some(builtin_exit),
        _ => None,
    }
}

/// `cd` with no argument goes home.
fn cd_target<'a>(session: &'a Session, args: &'a [String]) -> &'a str {
    args.first().map(String::as_str).unwrap_or_else(|| session.home())
}

fn builtin_cd(session: &mut Session, args: &[String]) -> u8 {
    let target = cd_target(session, args).to_owned();
    let status = match env::set_current_dir(&target) {
        Ok(()) => 0,
        Err(err) => {
            // the working directory is left as it was
            eprintln!("cd: {target}: {err}");
            1
        }
    };
    session.refresh_cwd();
    status
}

fn builtin_exit(_: &mut Session, _: &[String]) -> u8 {
    process::exit(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cd_without_argument_resolves_to_home() {
        let session = Session::with_home(String::from("/home/someone"));
        assert_eq!(cd_target(&session, &[]), "/home/someone");
        let args = vec![String::from("/tmp")];
        assert_eq!(cd_target(&session, &args), "/tmp");
    }

    #[test]
    fn cd_failure_reports_and_leaves_directory_unchanged() {
        let mut session = Session::with_home(String::from("/"));
        let before = env::current_dir().unwrap();
        let cd = lookup("cd").unwrap();
        let status = cd(&mut session, &[String::from("/no/such/dir/minish")]);
        assert_eq!(status, 1);
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn reserved_history_name_has_no_action() {
        assert!(is_builtin_name("history"));
        assert!(lookup("history").is_none());
    }

    #[test]
    fn unknown_names_are_not_builtins() {
        assert!(!is_builtin_name("ls"));
        assert!(lookup("ls").is_none());
    }
}

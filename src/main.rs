mod builtin;
mod exec;
mod history;
mod parser;
mod session;
mod types;

use anyhow::Result;
use nix::sys::signal::{sigaction, signal, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::exec::{NativeSpawner, Outcome};
use crate::session::Session;

/// Collects finished children so fire-and-forget background launches never
/// linger as zombies.
extern "C" fn reap_children(_: libc::c_int) {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

fn main() -> Result<()> {
    // the shell survives Ctrl-C; children restore the default disposition
    unsafe {
        signal(Signal::SIGINT, SigHandler::SigIgn)?;
        let reap = SigAction::new(
            SigHandler::Handler(reap_children),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        sigaction(Signal::SIGCHLD, &reap)?;
    }

    let mut session = Session::new();
    let mut spawner = NativeSpawner;
    let mut editor = DefaultEditor::new()?;

    loop {
        let prompt = format!("shell {} > ", session.cwd_label());
        match editor.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                session.history().append(&line);

                let Some(chain) = parser::parse(&line) else {
                    continue;
                };
                match exec::run(&mut session, &chain, &mut spawner) {
                    Ok(Outcome::Exited(0)) => {}
                    Ok(Outcome::Exited(status)) => {
                        eprintln!("command exited with status {status}");
                    }
                    Ok(Outcome::Background(pid)) => {
                        println!("[bg] started PID {pid}");
                    }
                    Err(err) => eprintln!("{err}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{err}");
                break;
            }
        }
    }
    Ok(())
}

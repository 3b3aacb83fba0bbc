use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, OwnedFd};

use anyhow::Context;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, execvp, fork, ForkResult, Pid};
use thiserror::Error;

use crate::builtin;
use crate::session::Session;
use crate::types::{CommandKind, Stage};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("background pipelines unsupported")]
    BackgroundPipeline,
    #[error("cannot create pipe: {0}")]
    Pipe(nix::Error),
    #[error("cannot start {name}: {source}")]
    Spawn { name: String, source: nix::Error },
}

/// Result of running one chain.
#[derive(Debug)]
pub enum Outcome {
    /// All foreground children were collected; carries the last stage's
    /// exit status as the aggregate.
    Exited(i32),
    /// A background child was launched and not waited for.
    Background(Pid),
}

/// Process creation seam. The native implementation forks; tests substitute
/// a recording fake to observe orchestration without touching the process
/// table.
pub trait Spawner {
    fn spawn(
        &mut self,
        stage: &Stage,
        stdin: Option<&OwnedFd>,
        stdout: Option<&OwnedFd>,
    ) -> nix::Result<Pid>;

    fn wait(&mut self, pid: Pid) -> i32;
}

/// Runs a stage chain to completion.
///
/// A single-stage builtin with a dispatcher action executes in this process
/// without forking. A background flag combined with a multi-stage chain is
/// rejected before any process is created. Everything else becomes one child
/// per stage over N-1 pipes, started left to right; the parent closes every
/// pipe endpoint once all stages are running, then waits on all children
/// unless the (single) stage was launched in the background.
pub fn run(
    session: &mut Session,
    chain: &Stage,
    spawner: &mut dyn Spawner,
) -> Result<Outcome, ExecError> {
    if chain.next.is_none() && chain.kind == CommandKind::Builtin {
        if let Some(func) = builtin::lookup(&chain.argv[0]) {
            return Ok(Outcome::Exited(i32::from(func(session, &chain.argv[1..]))));
        }
        // reserved names without an action fall through to the exec lookup,
        // which reports "command not found" from the child
    }

    let stages: Vec<&Stage> = chain.iter().collect();
    if stages.len() > 1 && stages.iter().any(|stage| stage.background) {
        return Err(ExecError::BackgroundPipeline);
    }

    let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::with_capacity(stages.len().saturating_sub(1));
    for _ in 1..stages.len() {
        pipes.push(unistd::pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?);
    }

    let mut pids = Vec::with_capacity(stages.len());
    for (i, &stage) in stages.iter().enumerate() {
        let stdin = if i > 0 { Some(&pipes[i - 1].0) } else { None };
        let stdout = if i + 1 < stages.len() { Some(&pipes[i].1) } else { None };
        match spawner.spawn(stage, stdin, stdout) {
            Ok(pid) => pids.push(pid),
            // already-started children are left to the SIGCHLD reaper
            Err(source) => {
                return Err(ExecError::Spawn { name: stage.argv[0].clone(), source });
            }
        }
    }
    // every endpoint is open in the children that need it; closing the
    // parent's copies lets end-of-file travel down the pipeline
    drop(pipes);

    if stages.len() == 1 && stages[0].background {
        return Ok(Outcome::Background(pids[0]));
    }

    let mut status = 0;
    for pid in pids {
        status = spawner.wait(pid);
    }
    Ok(Outcome::Exited(status))
}

/// Fork-based spawner used by the interactive shell.
pub struct NativeSpawner;

impl Spawner for NativeSpawner {
    fn spawn(
        &mut self,
        stage: &Stage,
        stdin: Option<&OwnedFd>,
        stdout: Option<&OwnedFd>,
    ) -> nix::Result<Pid> {
        match unsafe { fork() }? {
            ForkResult::Parent { child } => Ok(child),
            ForkResult::Child => exec_stage(stage, stdin, stdout),
        }
    }

    fn wait(&mut self, pid: Pid) -> i32 {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, status)) => status,
            Ok(WaitStatus::Signaled(_, sig, _)) => 128 + sig as i32,
            Ok(_) => 0,
            // the SIGCHLD reaper may have collected the child first
            Err(_) => 0,
        }
    }
}

/// Child side of a fork: wires descriptors and replaces the process image.
/// Failures are reported on stderr and end the child immediately; control
/// never returns to the shell's code.
fn exec_stage(stage: &Stage, stdin: Option<&OwnedFd>, stdout: Option<&OwnedFd>) -> ! {
    let status = run_child(stage, stdin, stdout);
    unsafe { libc::_exit(status as libc::c_int) }
}

fn run_child(stage: &Stage, stdin: Option<&OwnedFd>, stdout: Option<&OwnedFd>) -> i32 {
    if let Err(err) = wire_stage(stage, stdin, stdout) {
        eprintln!("{err:#}");
        return 1;
    }
    let argv: Vec<CString> = match stage
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<_, _>>()
    {
        Ok(argv) => argv,
        Err(_) => {
            eprintln!("{}: invalid argument", stage.argv[0]);
            return 126;
        }
    };
    match execvp(&argv[0], &argv) {
        Err(Errno::ENOENT) => {
            eprintln!("command not found: {}", stage.argv[0]);
            127
        }
        Err(err) => {
            eprintln!("{}: {}", stage.argv[0], err);
            126
        }
        Ok(never) => match never {},
    }
}

/// Pipe endpoints first, explicit redirections second, so a redirect target
/// overrides a pipe-supplied stream by being applied last.
fn wire_stage(
    stage: &Stage,
    stdin: Option<&OwnedFd>,
    stdout: Option<&OwnedFd>,
) -> anyhow::Result<()> {
    if let Some(fd) = stdin {
        unistd::dup2(fd.as_raw_fd(), libc::STDIN_FILENO).context("dup2 stdin")?;
    }
    if let Some(fd) = stdout {
        unistd::dup2(fd.as_raw_fd(), libc::STDOUT_FILENO).context("dup2 stdout")?;
    }
    if let Some(path) = &stage.input_redirect {
        let file = File::open(path).with_context(|| format!("cannot open {path}"))?;
        unistd::dup2(file.as_raw_fd(), libc::STDIN_FILENO).context("dup2 input redirect")?;
    }
    if let Some(path) = &stage.output_redirect {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("cannot open {path}"))?;
        unistd::dup2(file.as_raw_fd(), libc::STDOUT_FILENO).context("dup2 output redirect")?;
    }
    // the interactive loop ignores SIGINT; children must die on it again
    unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) }.context("reset SIGINT")?;
    Ok(())
}

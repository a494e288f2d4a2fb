//! Turning a parsed [`Pipeline`] into running processes.
//!
//! Every pipe end is an [`OwnedFd`], so each descriptor has exactly one owner
//! and is closed when that owner goes away: the parent keeps only the read end
//! feeding the next stage, and a child drops every pipe end once it has been
//! duplicated onto stdin/stdout.

use crate::interrupt;
use crate::parser::{Pipeline, Stage};
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::io::Write;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;

/// Exit status of a child whose redirection could not be set up.
const REDIRECT_FAILURE: i32 = 1;
/// Exit status when the program was not found on the search path.
const NOT_FOUND: i32 = 127;
/// Exit status when the program was found but could not be executed.
const NOT_EXECUTABLE: i32 = 126;

/// Outcome of [`run_pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineReport {
    /// How many stages were forked (and therefore reaped).
    pub spawned: usize,
    /// Status of the last stage, if it was spawned: its exit code, or
    /// 128 + signal number when it was killed by a signal.
    pub last_status: Option<i32>,
}

/// Both ends of one pipe between adjacent stages.
struct Pipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl Pipe {
    fn new() -> nix::Result<Self> {
        let (read, write) = unistd::pipe()?;
        Ok(Pipe { read, write })
    }

    /// Keep the read end for the next stage; the write end is closed here.
    fn into_downstream(self) -> OwnedFd {
        self.read
    }
}

/// Argument vector converted for `execvp` before forking.
fn c_argv(stage: &Stage) -> Result<Vec<CString>, std::ffi::NulError> {
    stage.argv.iter().map(|a| CString::new(a.as_bytes())).collect()
}

/// Fork one process per stage, wire them together and wait for all of them.
///
/// Stages that failed to parse, or whose fork fails, are reported on stderr and
/// skipped: their downstream neighbour reads end-of-file. A pipe creation
/// failure stops further stages from being created. Only processes that were
/// actually forked are waited on.
pub fn run_pipeline(pipeline: &Pipeline) -> PipelineReport {
    let n = pipeline.len();
    let mut children: Vec<Pid> = Vec::with_capacity(n);
    let mut upstream: Option<OwnedFd> = None;
    let mut last_spawned = false;

    for (i, slot) in pipeline.stages.iter().enumerate() {
        let is_last = i + 1 == n;
        last_spawned = false;

        let pipe = if is_last {
            None
        } else {
            match Pipe::new() {
                Ok(pipe) => Some(pipe),
                Err(e) => {
                    eprintln!("Error: pipe() failed. {}.", e.desc());
                    tracing::warn!(stage = i, error = %e, "pipe creation failed");
                    break;
                }
            }
        };

        let stage = match slot {
            Ok(stage) => stage,
            Err(e) => {
                eprintln!("Error: {e}.");
                tracing::debug!(stage = i, error = %e, "skipping stage");
                upstream = pipe.map(Pipe::into_downstream);
                continue;
            }
        };
        let Ok(argv) = c_argv(stage) else {
            eprintln!("Error: argument contains a NUL byte.");
            upstream = pipe.map(Pipe::into_downstream);
            continue;
        };

        // Anything still buffered would otherwise be written twice.
        let _ = std::io::stdout().flush();

        match unsafe { unistd::fork() } {
            Ok(ForkResult::Child) => exec_stage(stage, &argv, upstream.take(), pipe),
            Ok(ForkResult::Parent { child }) => {
                tracing::debug!(
                    stage = i,
                    pid = child.as_raw(),
                    program = %stage.argv[0],
                    "spawned"
                );
                children.push(child);
                last_spawned = true;
                // Dropping the old upstream closes the read end the child now owns a copy of.
                upstream = pipe.map(Pipe::into_downstream);
            }
            Err(e) => {
                eprintln!("Error: fork() failed. {}.", e.desc());
                tracing::warn!(stage = i, error = %e, "fork failed");
                upstream = pipe.map(Pipe::into_downstream);
            }
        }
    }
    drop(upstream);

    let mut report = PipelineReport {
        spawned: children.len(),
        last_status: None,
    };
    let last_pid = children.last().copied();
    for pid in children {
        let status = wait_for(pid);
        tracing::debug!(pid = pid.as_raw(), ?status, "reaped");
        if last_spawned && Some(pid) == last_pid {
            report.last_status = status.and_then(status_code);
        }
    }
    report
}

/// Wait for one child, retrying when a signal interrupts the wait.
fn wait_for(pid: Pid) -> Option<WaitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => {
                return Some(status);
            }
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => {
                tracing::warn!(pid = pid.as_raw(), error = %e, "waitpid failed");
                return None;
            }
        }
    }
}

fn status_code(status: WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, signal, _) => Some(128 + signal as i32),
        _ => None,
    }
}

/// Terminate a child immediately, without running any of the parent's cleanup.
fn child_exit(code: i32) -> ! {
    unsafe { libc::_exit(code) }
}

fn move_fd(fd: OwnedFd, target: RawFd, what: &str) {
    if let Err(e) = unistd::dup2(fd.as_raw_fd(), target) {
        eprintln!("Error: cannot redirect {what}. {}.", e.desc());
        child_exit(REDIRECT_FAILURE);
    }
}

fn redirect_file(path: &Path, flags: OFlag, target: RawFd, what: &str) {
    let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
    match fcntl::open(path, flags, mode) {
        Ok(fd) => {
            let moved = unistd::dup2(fd, target);
            let _ = unistd::close(fd);
            if let Err(e) = moved {
                eprintln!("Error: cannot redirect {what}. {}.", e.desc());
                child_exit(REDIRECT_FAILURE);
            }
        }
        Err(e) => {
            eprintln!("Error: cannot open {what} file '{}'. {}.", path.display(), e.desc());
            child_exit(REDIRECT_FAILURE);
        }
    }
}

/// Child side of a fork: rewire descriptors, apply redirections and exec.
fn exec_stage(
    stage: &Stage,
    argv: &[CString],
    stdin_pipe: Option<OwnedFd>,
    stdout_pipe: Option<Pipe>,
) -> ! {
    let _ = interrupt::reset_to_default();

    if let Some(read) = stdin_pipe {
        move_fd(read, libc::STDIN_FILENO, "input");
    }
    if let Some(Pipe { read, write }) = stdout_pipe {
        drop(read);
        move_fd(write, libc::STDOUT_FILENO, "output");
    }

    if let Some(path) = &stage.input_file {
        redirect_file(path, OFlag::O_RDONLY, libc::STDIN_FILENO, "input");
    }
    if let Some(path) = &stage.output_file {
        let mode = if stage.append { OFlag::O_APPEND } else { OFlag::O_TRUNC };
        let flags = OFlag::O_WRONLY | OFlag::O_CREAT | mode;
        redirect_file(path, flags, libc::STDOUT_FILENO, "output");
    }

    let errno = match unistd::execvp(&argv[0], argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    eprintln!("Error: exec() failed. {}.", errno.desc());
    child_exit(if errno == Errno::ENOENT { NOT_FOUND } else { NOT_EXECUTABLE })
}

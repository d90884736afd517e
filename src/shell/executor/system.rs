use std::env;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{op} failed: {}", .source.desc())]
    Sys {
        op: &'static str,
        #[source]
        source: Errno,
    },
    #[error("{path}: {}", .source.desc())]
    Path {
        path: String,
        #[source]
        source: Errno,
    },
}

impl ExecError {
    pub fn sys(op: &'static str) -> impl FnOnce(Errno) -> ExecError {
        move |source| ExecError::Sys { op, source }
    }

    pub fn at(path: &Path) -> impl FnOnce(Errno) -> ExecError + '_ {
        move |source| ExecError::Path {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Process-level operations the executor performs on behalf of the
/// interpreter itself. Everything that happens after a fork, inside the
/// child, goes straight to the OS.
pub trait System {
    fn fork(&mut self) -> Result<ForkResult, ExecError>;
    fn pipe(&mut self) -> Result<(OwnedFd, OwnedFd), ExecError>;
    fn wait(&mut self, pid: Pid) -> Result<WaitStatus, ExecError>;
    fn chdir(&mut self, path: &Path) -> Result<(), ExecError>;
    fn home_dir(&self) -> Option<PathBuf>;
    fn exit(&mut self, code: i32) -> !;
}

/// The real thing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Posix;

impl System for Posix {
    fn fork(&mut self) -> Result<ForkResult, ExecError> {
        // Anything still buffered would otherwise be written by both processes.
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        // SAFETY: the interpreter is single-threaded, so the child cannot
        // inherit a lock held by another thread.
        unsafe { unistd::fork() }.map_err(ExecError::sys("fork"))
    }

    fn pipe(&mut self) -> Result<(OwnedFd, OwnedFd), ExecError> {
        unistd::pipe().map_err(ExecError::sys("pipe"))
    }

    fn wait(&mut self, pid: Pid) -> Result<WaitStatus, ExecError> {
        loop {
            match waitpid(pid, None) {
                Err(Errno::EINTR) => continue,
                other => return other.map_err(ExecError::sys("waitpid")),
            }
        }
    }

    fn chdir(&mut self, path: &Path) -> Result<(), ExecError> {
        unistd::chdir(path).map_err(ExecError::at(path))
    }

    fn home_dir(&self) -> Option<PathBuf> {
        env::var_os("HOME").map(PathBuf::from)
    }

    fn exit(&mut self, code: i32) -> ! {
        let _ = io::stdout().flush();
        std::process::exit(code)
    }
}

/// Leaves a forked child without running any of the parent's cleanup.
pub fn exit_child(code: i32) -> ! {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    // SAFETY: _exit has no preconditions; it never returns.
    unsafe { libc::_exit(code) }
}

/// Replaces the current process image, searching `PATH` for `argv[0]`.
/// Only returns on failure.
pub fn exec(argv: &[String]) -> ExecError {
    let program = argv.first().cloned().unwrap_or_default();
    let args = match argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(args) if !args.is_empty() => args,
        _ => {
            return ExecError::Path {
                path: program,
                source: Errno::EINVAL,
            }
        }
    };

    match unistd::execvp(&args[0], &args) {
        Ok(never) => match never {},
        Err(source) => ExecError::Path {
            path: program,
            source,
        },
    }
}

use std::os::fd::RawFd;
use std::path::Path;

use log::trace;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};

use super::system::ExecError;
use crate::shell::parser::ast::Redirections;

pub const STDIN: RawFd = libc::STDIN_FILENO;
pub const STDOUT: RawFd = libc::STDOUT_FILENO;

/// rw-rw-r--, before the umask.
const OUTPUT_MODE: libc::mode_t = 0o664;

/// Rebinds stdin and stdout of the current (child) process to the files
/// named in `redirections`. Input is handled first.
pub fn apply(redirections: &Redirections) -> Result<(), ExecError> {
    if redirections.is_empty() {
        return Ok(());
    }
    if let Some(input) = &redirections.input {
        open_onto(Path::new(input), OFlag::O_RDONLY, STDIN)?;
    }
    if let Some(output) = &redirections.output {
        open_onto(
            Path::new(output),
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            STDOUT,
        )?;
    }
    Ok(())
}

fn open_onto(path: &Path, flags: OFlag, target: RawFd) -> Result<(), ExecError> {
    let fd = open(path, flags, Mode::from_bits_truncate(OUTPUT_MODE)).map_err(ExecError::at(path))?;
    trace!("redirect {} -> fd {}", path.display(), target);
    move_fd(fd, target)
}

/// Wires one end of a pipe onto `target` and closes both original
/// descriptors.
pub fn attach_pipe(keep: RawFd, discard: RawFd, target: RawFd) -> Result<(), ExecError> {
    close(discard).map_err(ExecError::sys("close"))?;
    move_fd(keep, target)
}

/// dup2 `fd` onto `target`, then close `fd`. A descriptor that already sits
/// on `target` is left alone.
fn move_fd(fd: RawFd, target: RawFd) -> Result<(), ExecError> {
    if fd == target {
        return Ok(());
    }
    let duplicated = dup2(fd, target).map_err(ExecError::sys("dup2"));
    let closed = close(fd).map_err(ExecError::sys("close"));
    duplicated?;
    closed
}

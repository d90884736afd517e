use std::os::fd::AsRawFd;

use log::{debug, error};
use nix::unistd::{ForkResult, Pid};

use super::builtins::{self, Builtin};
use super::redirect::{self, STDIN, STDOUT};
use super::status::{normalize, EXIT_FAILURE, EXIT_NOT_FOUND, EXIT_OS_ERROR};
use super::system::{self, ExecError, Posix, System};
use crate::shell::parser::ast::{Node, SimpleCommand, Subshell};

/// Walks a command tree, forking and wiring processes as each node asks.
pub struct Executor<S: System = Posix> {
    system: S,
}

impl Executor<Posix> {
    pub fn new() -> Self {
        Self::with_system(Posix)
    }
}

impl Default for Executor<Posix> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: System> Executor<S> {
    pub fn with_system(system: S) -> Self {
        Self { system }
    }

    #[cfg(test)]
    pub fn system(&self) -> &S {
        &self.system
    }

    /// Runs `node` and returns its exit status.
    ///
    /// `allow_builtin` lets `cd` and `exit` act on the interpreter itself.
    /// It survives `&&` and `||` but not `;`, and is always off inside pipe
    /// stages and subshells; built-ins reached without it run in a child.
    pub fn execute(&mut self, node: &Node, allow_builtin: bool) -> i32 {
        match node {
            Node::Simple(command) => self.execute_simple(command, allow_builtin),
            Node::And(left, right) => {
                let status = self.execute(left, allow_builtin);
                if status == 0 {
                    self.execute(right, allow_builtin)
                } else {
                    status
                }
            }
            Node::Or(left, right) => {
                let status = self.execute(left, allow_builtin);
                if status != 0 {
                    self.execute(right, allow_builtin)
                } else {
                    status
                }
            }
            Node::Sequence(left, right) => {
                self.execute(left, false);
                self.execute(right, false)
            }
            Node::Pipe(left, right) => self.execute_pipe(left, right),
            Node::Subshell(subshell) => self.execute_subshell(subshell),
        }
    }

    fn execute_simple(&mut self, command: &SimpleCommand, allow_builtin: bool) -> i32 {
        if allow_builtin {
            match Builtin::lookup(command.program()) {
                Some(Builtin::Exit) => {
                    let code = builtins::exit_code(command);
                    debug!("exit {}", code);
                    self.system.exit(code)
                }
                Some(Builtin::Cd) => return builtins::cd(&mut self.system, command),
                None => {}
            }
        }

        debug!("执行外部命令: {}", command.argv.join(" "));
        match self.spawn(|executor| executor.exec_simple(command)) {
            Ok(pid) => self.wait_status(pid),
            Err(e) => self.os_error(e),
        }
    }

    fn execute_pipe(&mut self, left: &Node, right: &Node) -> i32 {
        if left.output().is_some() {
            eprintln!("d8sh: ambiguous output redirect");
            return EXIT_FAILURE;
        }
        if right.input().is_some() {
            eprintln!("d8sh: ambiguous input redirect");
            return EXIT_FAILURE;
        }

        let (read_end, write_end) = match self.system.pipe() {
            Ok(ends) => ends,
            Err(e) => return self.os_error(e),
        };

        let left_pid = match self.spawn(|executor| {
            if let Err(e) = redirect::attach_pipe(write_end.as_raw_fd(), read_end.as_raw_fd(), STDOUT) {
                eprintln!("d8sh: {}", e);
                return EXIT_FAILURE;
            }
            executor.run_in_child(left)
        }) {
            Ok(pid) => pid,
            Err(e) => return self.os_error(e),
        };

        let right_pid = match self.spawn(|executor| {
            if let Err(e) = redirect::attach_pipe(read_end.as_raw_fd(), write_end.as_raw_fd(), STDIN) {
                eprintln!("d8sh: {}", e);
                return EXIT_FAILURE;
            }
            executor.run_in_child(right)
        }) {
            Ok(pid) => pid,
            Err(e) => {
                // Let the left stage see a closed pipe and exit before reaping it.
                drop(read_end);
                drop(write_end);
                let _ = self.system.wait(left_pid);
                return self.os_error(e);
            }
        };

        // The right stage only sees end-of-input once every write end is closed.
        drop(read_end);
        drop(write_end);

        let left_status = self.wait_status(left_pid);
        let right_status = self.wait_status(right_pid);
        debug!(
            "pipeline {} | {} finished: {} / {}",
            left_pid, right_pid, left_status, right_status
        );
        right_status
    }

    fn execute_subshell(&mut self, subshell: &Subshell) -> i32 {
        match self.spawn(|executor| executor.run_subshell(subshell)) {
            Ok(pid) => self.wait_status(pid),
            Err(e) => self.os_error(e),
        }
    }

    /// Forks. The child runs `body` and exits with its result; the parent
    /// gets the child's pid back.
    fn spawn<F>(&mut self, body: F) -> Result<Pid, ExecError>
    where
        F: FnOnce(&mut Self) -> i32,
    {
        match self.system.fork()? {
            ForkResult::Parent { child } => {
                debug!("forked child {}", child);
                Ok(child)
            }
            ForkResult::Child => {
                let status = body(self);
                system::exit_child(status)
            }
        }
    }

    /// Runs `node` inside an already forked child. Simple commands replace
    /// the child outright instead of forking once more.
    fn run_in_child(&mut self, node: &Node) -> i32 {
        match node {
            Node::Simple(command) => self.exec_simple(command),
            Node::Subshell(subshell) => self.run_subshell(subshell),
            other => self.execute(other, false),
        }
    }

    fn run_subshell(&mut self, subshell: &Subshell) -> i32 {
        if let Err(e) = redirect::apply(&subshell.redirections) {
            eprintln!("d8sh: {}", e);
            return EXIT_FAILURE;
        }
        self.run_in_child(&subshell.body)
    }

    /// Child side of a simple command: redirect, then exec. Built-ins that
    /// land here only affect this child.
    fn exec_simple(&mut self, command: &SimpleCommand) -> i32 {
        if let Err(e) = redirect::apply(&command.redirections) {
            eprintln!("d8sh: {}", e);
            return EXIT_FAILURE;
        }

        match Builtin::lookup(command.program()) {
            Some(Builtin::Exit) => return builtins::exit_code(command),
            Some(Builtin::Cd) => return builtins::cd(&mut self.system, command),
            None => {}
        }

        let e = system::exec(&command.argv);
        eprintln!("d8sh: {}", e);
        EXIT_NOT_FOUND
    }

    fn wait_status(&mut self, pid: Pid) -> i32 {
        match self.system.wait(pid) {
            Ok(ws) => {
                let status = normalize(ws);
                debug!("child {} -> {:?} ({})", pid, ws, status);
                status
            }
            Err(e) => self.os_error(e),
        }
    }

    fn os_error(&self, e: ExecError) -> i32 {
        error!("{}", e);
        eprintln!("d8sh: {}", e);
        EXIT_OS_ERROR
    }
}

#[cfg(test)]
mod tests {
    use std::os::fd::OwnedFd;
    use std::path::{Path, PathBuf};

    use nix::errno::Errno;
    use nix::sys::wait::WaitStatus;

    use super::*;
    use crate::shell::parser::parse_line;

    /// Records what the executor asks of the OS. Every fork fails, so no
    /// process is ever created.
    #[derive(Default)]
    struct RecordingSystem {
        forks: usize,
        pipes: usize,
        fail_pipe: bool,
        cwd: PathBuf,
        existing_dirs: Vec<PathBuf>,
        home: Option<PathBuf>,
        chdirs: Vec<PathBuf>,
    }

    impl System for RecordingSystem {
        fn fork(&mut self) -> Result<ForkResult, ExecError> {
            self.forks += 1;
            Err(ExecError::Sys {
                op: "fork",
                source: Errno::EAGAIN,
            })
        }

        fn pipe(&mut self) -> Result<(OwnedFd, OwnedFd), ExecError> {
            self.pipes += 1;
            if self.fail_pipe {
                return Err(ExecError::Sys {
                    op: "pipe",
                    source: Errno::EMFILE,
                });
            }
            nix::unistd::pipe().map_err(ExecError::sys("pipe"))
        }

        fn wait(&mut self, _pid: Pid) -> Result<WaitStatus, ExecError> {
            Err(ExecError::Sys {
                op: "waitpid",
                source: Errno::ECHILD,
            })
        }

        fn chdir(&mut self, path: &Path) -> Result<(), ExecError> {
            self.chdirs.push(path.to_path_buf());
            if self.existing_dirs.iter().any(|dir| dir == path) {
                self.cwd = path.to_path_buf();
                Ok(())
            } else {
                Err(ExecError::at(path)(Errno::ENOENT))
            }
        }

        fn home_dir(&self) -> Option<PathBuf> {
            self.home.clone()
        }

        fn exit(&mut self, code: i32) -> ! {
            panic!("exit({})", code)
        }
    }

    fn executor() -> Executor<RecordingSystem> {
        Executor::with_system(RecordingSystem {
            cwd: PathBuf::from("/start"),
            existing_dirs: vec![PathBuf::from("/tmp"), PathBuf::from("/home/me")],
            home: Some(PathBuf::from("/home/me")),
            ..Default::default()
        })
    }

    #[allow(clippy::unwrap_used)]
    fn run(executor: &mut Executor<RecordingSystem>, line: &str) -> i32 {
        let node = parse_line(line).unwrap();
        executor.execute(&node, true)
    }

    #[test]
    fn test_ambiguous_output_redirect_never_forks() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "ls > out.txt | wc"), EXIT_FAILURE);
        assert_eq!(executor.system().forks, 0);
        assert_eq!(executor.system().pipes, 0);
    }

    #[test]
    fn test_ambiguous_input_redirect_never_forks() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "ls | wc < in.txt"), EXIT_FAILURE);
        assert_eq!(run(&mut executor, "ls | (wc) < in.txt"), EXIT_FAILURE);
        assert_eq!(run(&mut executor, "(ls) > out | wc"), EXIT_FAILURE);
        assert_eq!(executor.system().forks, 0);
    }

    #[test]
    fn test_inner_redirects_are_not_ambiguous() {
        let mut executor = executor();
        // the check only looks at the pipe's direct children
        assert_eq!(run(&mut executor, "(ls > out; echo) | wc"), EXIT_OS_ERROR);
        assert_eq!(executor.system().pipes, 1);
        assert_eq!(executor.system().forks, 1);
    }

    #[test]
    fn test_fork_failure_is_recoverable() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "ls -l"), EXIT_OS_ERROR);
        assert_eq!(run(&mut executor, "(ls)"), EXIT_OS_ERROR);
        assert_eq!(executor.system().forks, 2);
    }

    #[test]
    fn test_pipe_failure_is_recoverable() {
        let mut executor = executor();
        executor.system.fail_pipe = true;
        assert_eq!(run(&mut executor, "ls | wc"), EXIT_OS_ERROR);
        assert_eq!(executor.system().forks, 0);
    }

    #[test]
    fn test_and_short_circuits() {
        let mut executor = executor();
        // the left side fails, so the right side is never forked
        assert_ne!(run(&mut executor, "a && b"), 0);
        assert_eq!(executor.system().forks, 1);
    }

    #[test]
    fn test_or_runs_right_after_failure() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "a || b"), EXIT_OS_ERROR);
        assert_eq!(executor.system().forks, 2);
    }

    #[test]
    fn test_or_skips_right_after_success() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "cd /tmp || b"), 0);
        assert_eq!(executor.system().forks, 0);
        assert_eq!(executor.system().cwd, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_and_runs_right_after_success() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "cd /tmp && b"), EXIT_OS_ERROR);
        assert_eq!(executor.system().forks, 1);
    }

    #[test]
    fn test_sequence_runs_both() {
        let mut executor = executor();
        run(&mut executor, "a; b; c");
        assert_eq!(executor.system().forks, 3);
    }

    #[test]
    fn test_cd_changes_directory() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "cd /tmp"), 0);
        assert_eq!(executor.system().cwd, PathBuf::from("/tmp"));
        assert_eq!(executor.system().forks, 0);
    }

    #[test]
    fn test_cd_without_argument_goes_home() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "cd"), 0);
        assert_eq!(executor.system().cwd, PathBuf::from("/home/me"));
    }

    #[test]
    fn test_cd_without_home_is_reported() {
        let mut executor = executor();
        executor.system.home = None;
        assert_eq!(run(&mut executor, "cd"), 0);
        assert!(executor.system().chdirs.is_empty());
        assert_eq!(executor.system().cwd, PathBuf::from("/start"));
    }

    #[test]
    fn test_cd_to_missing_directory_keeps_cwd_and_returns_zero() {
        let mut executor = executor();
        assert_eq!(run(&mut executor, "cd /does/not/exist"), 0);
        assert_eq!(executor.system().chdirs, vec![PathBuf::from("/does/not/exist")]);
        assert_eq!(executor.system().cwd, PathBuf::from("/start"));
    }

    #[test]
    fn test_builtin_in_sequence_runs_in_child() {
        let mut executor = executor();
        run(&mut executor, "cd /tmp; ls");
        assert!(executor.system().chdirs.is_empty());
        assert_eq!(executor.system().forks, 2);
    }

    #[test]
    fn test_builtin_in_pipeline_or_subshell_is_forked() {
        let mut executor = executor();
        run(&mut executor, "(cd /tmp)");
        run(&mut executor, "exit 3 | cat");
        assert!(executor.system().chdirs.is_empty());
        assert_eq!(executor.system().cwd, PathBuf::from("/start"));
    }

    #[test]
    #[should_panic(expected = "exit(3)")]
    fn test_exit_with_code() {
        let mut executor = executor();
        run(&mut executor, "exit 3");
    }

    #[test]
    #[should_panic(expected = "exit(0)")]
    fn test_exit_defaults_to_zero() {
        let mut executor = executor();
        run(&mut executor, "exit");
    }

    #[test]
    #[should_panic(expected = "exit(0)")]
    fn test_exit_after_successful_and() {
        let mut executor = executor();
        run(&mut executor, "cd /tmp && exit abc");
    }

    #[test]
    fn test_exit_not_allowed_is_forked() {
        let mut executor = executor();
        let node = parse_line("exit 4").unwrap_or_else(|e| panic!("{}", e));
        assert_eq!(executor.execute(&node, false), EXIT_OS_ERROR);
        assert_eq!(executor.system().forks, 1);
    }
}

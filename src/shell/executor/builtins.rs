use std::path::PathBuf;

use log::{debug, warn};

use super::status::atoi;
use super::system::System;
use crate::shell::parser::ast::SimpleCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Cd,
}

impl Builtin {
    pub fn lookup(program: &str) -> Option<Builtin> {
        match program {
            "exit" => Some(Builtin::Exit),
            "cd" => Some(Builtin::Cd),
            _ => None,
        }
    }
}

/// Code requested by `exit [N]`.
pub fn exit_code(command: &SimpleCommand) -> i32 {
    command.arguments().first().map(|arg| atoi(arg)).unwrap_or(0)
}

/// `cd [DIR]`, defaulting to `$HOME`.
///
/// A failed directory change is reported but still yields 0, so
/// `cd missing && cmd` runs `cmd`. Scripts cannot use the status of `cd`
/// to detect the failure.
pub fn cd<S: System>(system: &mut S, command: &SimpleCommand) -> i32 {
    let target = match command.arguments().first() {
        Some(dir) => PathBuf::from(dir),
        None => match system.home_dir() {
            Some(home) => home,
            None => {
                warn!("cd: HOME not set");
                eprintln!("d8sh: cd: HOME not set");
                return 0;
            }
        },
    };

    match system.chdir(&target) {
        Ok(()) => debug!("cd: now in {}", target.display()),
        Err(e) => {
            warn!("cd failed: {}", e);
            eprintln!("d8sh: cd: {}", e);
        }
    }
    0
}

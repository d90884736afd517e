use argh::FromArgs;
use log::debug;
use std::process;

use crate::shell::{run_line, Executor, Shell};
use crate::utils::config::Config;
use crate::utils::log::init_logger;

mod shell;
mod utils;

/// Status of `-c` when the line does not parse.
const EXIT_SYNTAX_ERROR: i32 = 2;

#[derive(FromArgs)]
/// d8sh: run commands joined by pipes, redirections, &&, || and ;
struct Args {
    /// run this one command line and exit with its status
    #[argh(option, short = 'c')]
    command: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();
    let config = Config::new();
    init_logger(&config);
    debug!("配置加载成功 {}", config.history_file.display());

    if let Some(line) = args.command {
        if line.trim().is_empty() {
            return Ok(());
        }
        let mut executor = Executor::new();
        let status = match run_line(&mut executor, &line) {
            Ok(status) => status,
            Err(e) => {
                debug!("syntax error: {}", e);
                eprintln!("syntax error");
                EXIT_SYNTAX_ERROR
            }
        };
        process::exit(status);
    }

    let mut shell = Shell::new(&config)?;
    shell.run()
}

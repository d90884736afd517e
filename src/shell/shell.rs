use log::{debug, error, warn};
use std::error::Error;

use crate::shell::executor::Executor;
use crate::shell::parser::{parse_line, ParseError};
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::utils::config::Config;
use crate::utils::theme::Theme;

/// Parses and runs one line with built-ins acting on this process.
pub fn run_line(executor: &mut Executor, line: &str) -> Result<i32, ParseError> {
    let node = parse_line(line)?;
    debug!("解析结果: {}\n{}", node, node.dump().trim_end());
    let status = executor.execute(&node, true);
    debug!("`{}` exited with {}", line, status);
    Ok(status)
}

pub struct Shell<'a> {
    theme: Theme,
    readline: ReadlineManager<'a>,
    executor: Executor,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            theme: Theme::load(&config.theme),
            readline: ReadlineManager::new(config)?,
            executor: Executor::new(),
        })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        debug!("初始化 d8sh...");
        self.readline.load_history();

        self.run_loop()?;
        self.readline.save_history();

        debug!("退出 d8sh...");
        Ok(())
    }

    fn run_loop(&mut self) -> Result<(), Box<dyn Error>> {
        loop {
            match self.readline.readline(&self.theme.prompt) {
                Ok(line) => self.handle_input(&line),
                Err(ReadlineError::Eof) => {
                    debug!("接收到 EOF 信号，退出 d8sh...");
                    println!();
                    break;
                }
                Err(ReadlineError::Interrupted) => {
                    debug!("接收到中断信号...");
                }
                Err(err) => {
                    error!("发生错误: {}", err);
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    fn handle_input(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        if let Err(e) = self.readline.add_history(line) {
            warn!("无法添加历史记录: {}", e);
        }
        self.readline.save_history();

        if let Err(e) = run_line(&mut self.executor, line) {
            debug!("syntax error in `{}`: {}", line, e);
            eprintln!("{}", self.theme.error("syntax error"));
        }
    }
}

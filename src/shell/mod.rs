mod executor;
mod parser;
mod readline;
#[allow(clippy::module_inception)]
mod shell;

pub use executor::Executor;
pub use shell::{run_line, Shell};

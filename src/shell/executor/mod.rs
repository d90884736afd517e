mod builtins;
#[allow(clippy::module_inception)]
mod executor;
mod redirect;
pub mod status;
pub mod system;

pub use executor::Executor;

//! Interactive command interpreter for piterm.
//!
//! Commands are registered as word chains with a fixed trailing-argument
//! count; one input line may resolve to several commands back to back.
//! The interpreter lives in [`interpreter`], the built-in command sets in
//! the `*_commands` modules.

pub mod interpreter;
pub mod logbuf;

pub mod auth_commands;
pub mod config_commands;
pub mod query_commands;
pub mod system_commands;

#[cfg(test)]
pub(crate) mod test_support;

pub use interpreter::{Command, CommandRegistry, CommandSpec, Environment, Prompter};
pub use logbuf::{LogBuffer, install_logger};

use piterm_types::Result;

/// Register every built-in command set into a registry.
pub fn register_builtins(reg: &mut CommandRegistry) -> Result<()> {
    query_commands::register_query_commands(reg)?;
    config_commands::register_config_commands(reg)?;
    auth_commands::register_auth_commands(reg)?;
    system_commands::register_system_commands(reg)?;
    Ok(())
}

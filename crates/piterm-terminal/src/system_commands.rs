//! Help, log maintenance, and exit.

use piterm_types::Result;

use crate::interpreter::{Command, CommandRegistry, Environment};

/// Register the system commands into a registry.
pub fn register_system_commands(reg: &mut CommandRegistry) -> Result<()> {
    reg.register(Box::new(HelpCmd))?;
    reg.register(Box::new(LogsClearCmd))?;
    reg.register(Box::new(ExitCmd))?;
    Ok(())
}

struct HelpCmd;
impl Command for HelpCmd {
    fn chain(&self) -> &[&'static str] {
        &["help"]
    }
    fn description(&self) -> &str {
        "List available commands"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<()> {
        // A command cannot reach the registry through its own `&self`;
        // the dispatcher intercepts `help` and logs the listing itself.
        // This body only runs if that interception is ever removed.
        log::info!("help is handled by the command registry");
        Ok(())
    }
}

struct LogsClearCmd;
impl Command for LogsClearCmd {
    fn chain(&self) -> &[&'static str] {
        &["logs", "clear"]
    }
    fn description(&self) -> &str {
        "Clear the log view"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.logs.clear();
        Ok(())
    }
}

struct ExitCmd;
impl Command for ExitCmd {
    fn chain(&self) -> &[&'static str] {
        &["exit"]
    }
    fn description(&self) -> &str {
        "Save the session and quit"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        *env.should_exit = true;
        Ok(())
    }
}

//! Login and logout.

use piterm_types::Result;

use crate::interpreter::{Command, CommandRegistry, Environment};

/// Register the auth commands into a registry.
pub fn register_auth_commands(reg: &mut CommandRegistry) -> Result<()> {
    reg.register(Box::new(LoginCmd))?;
    reg.register(Box::new(LogoutCmd))?;
    Ok(())
}

struct LoginCmd;
impl Command for LoginCmd {
    fn chain(&self) -> &[&'static str] {
        &["login"]
    }
    fn description(&self) -> &str {
        "Set credentials for PI Web API authentication"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        let username = env.prompter.prompt("Username: ")?;
        let password = env.prompter.prompt_secret("Password: ")?;
        env.credentials.set(username, password);

        if env.config.store_credentials
            && let Some(path) = &env.credentials_file
        {
            env.credentials.save(path)?;
            log::info!("Stored credentials");
        }
        log::info!("Logged in as {}", env.credentials.username.as_deref().unwrap_or(""));
        Ok(())
    }
}

struct LogoutCmd;
impl Command for LogoutCmd {
    fn chain(&self) -> &[&'static str] {
        &["logout"]
    }
    fn description(&self) -> &str {
        "Clear credentials"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.credentials.clear();

        if env.config.store_credentials
            && let Some(path) = &env.credentials_file
        {
            piterm_session::Credentials::delete_store(path)?;
        }
        log::info!("Logged out");
        Ok(())
    }
}

//! Configuration commands.
//!
//! All `config set ...` changes apply to the running process only; the
//! config file on disk is written once with defaults and never updated
//! afterwards.

use std::path::PathBuf;

use piterm_config::{AuthMethod, parse_bool};
use piterm_session::split_list;
use piterm_types::Result;

use crate::interpreter::{Command, CommandRegistry, Environment};
use crate::logbuf;

/// Register all config commands into a registry.
pub fn register_config_commands(reg: &mut CommandRegistry) -> Result<()> {
    reg.register(Box::new(SetAuthMethodCmd))?;
    reg.register(Box::new(SetStoreCredentialsCmd))?;
    reg.register(Box::new(SetSessionFieldsCmd))?;
    reg.register(Box::new(SetOutputPathCmd))?;
    reg.register(Box::new(SetTlsCertPathCmd))?;
    reg.register(Box::new(SetDebugCmd))?;
    reg.register(Box::new(ConfigShowCmd))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// config set ...
// ---------------------------------------------------------------------------

struct SetAuthMethodCmd;
impl Command for SetAuthMethodCmd {
    fn chain(&self) -> &[&'static str] {
        &["config", "set", "auth_method"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the authentication method (basic or ntlm)"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.config.auth_method = AuthMethod::parse(args[0])?;
        log::info!("Authentication method set to {}", env.config.auth_method);
        Ok(())
    }
}

struct SetStoreCredentialsCmd;
impl Command for SetStoreCredentialsCmd {
    fn chain(&self) -> &[&'static str] {
        &["config", "set", "store_credentials"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Store credentials on login (true or false)"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.config.store_credentials = parse_bool(args[0])?;
        log::info!("Credential storage set to {}", env.config.store_credentials);
        Ok(())
    }
}

struct SetSessionFieldsCmd;
impl Command for SetSessionFieldsCmd {
    fn chain(&self) -> &[&'static str] {
        &["config", "set", "session_fields"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set which query fields persist between runs"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.config.session_fields = split_list(args[0]);
        log::info!("Persisted fields set to {}", env.config.session_fields.join(", "));
        Ok(())
    }
}

struct SetOutputPathCmd;
impl Command for SetOutputPathCmd {
    fn chain(&self) -> &[&'static str] {
        &["config", "set", "output_path"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Write query results to this file as JSON"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.config.output_path = Some(PathBuf::from(args[0]));
        log::info!("Output path set to {}", args[0]);
        Ok(())
    }
}

struct SetTlsCertPathCmd;
impl Command for SetTlsCertPathCmd {
    fn chain(&self) -> &[&'static str] {
        &["config", "set", "tls_cert_path"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Trust additional PEM certificates from this file"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.config.tls_cert_path = Some(PathBuf::from(args[0]));
        // The transport is built at startup; extra roots apply on the
        // next run when the config file or environment carries them.
        log::info!("TLS certificate path set to {} (takes effect on restart)", args[0]);
        Ok(())
    }
}

struct SetDebugCmd;
impl Command for SetDebugCmd {
    fn chain(&self) -> &[&'static str] {
        &["config", "set", "debug"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Collect debug-level log lines (true or false)"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.config.debug = parse_bool(args[0])?;
        logbuf::set_debug(env.config.debug);
        log::info!("Debug logging set to {}", env.config.debug);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// config show
// ---------------------------------------------------------------------------

struct ConfigShowCmd;
impl Command for ConfigShowCmd {
    fn chain(&self) -> &[&'static str] {
        &["config", "show"]
    }
    fn description(&self) -> &str {
        "Log the current configuration"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        let c = &env.config;
        log::info!("Current configuration:");
        log::info!("auth_method: {}", c.auth_method);
        log::info!("store_credentials: {}", c.store_credentials);
        log::info!("session_fields: {}", c.session_fields.join(", "));
        log::info!(
            "output_path: {}",
            c.output_path.as_ref().map_or("(none)".to_string(), |p| p.display().to_string())
        );
        log::info!(
            "tls_cert_path: {}",
            c.tls_cert_path.as_ref().map_or("(none)".to_string(), |p| p.display().to_string())
        );
        log::info!("debug: {}", c.debug);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::World;
    use piterm_types::PitermError;
    use std::path::Path;

    fn registry() -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        register_config_commands(&mut reg).unwrap();
        reg
    }

    fn toks(line: &str) -> Vec<String> {
        line.split(' ').map(str::to_string).collect()
    }

    #[test]
    fn set_auth_method() {
        let reg = registry();
        let mut world = World::new();
        reg.resolve_and_dispatch(&toks("config set auth_method NTLM"), &mut world.env())
            .unwrap();
        assert_eq!(world.config.auth_method, AuthMethod::Ntlm);
    }

    #[test]
    fn set_auth_method_rejects_unknown() {
        let reg = registry();
        let mut world = World::new();
        let err = reg
            .resolve_and_dispatch(&toks("config set auth_method kerberos"), &mut world.env())
            .unwrap_err();
        assert!(matches!(err, PitermError::Validation(_)));
        assert_eq!(world.config.auth_method, AuthMethod::Basic);
    }

    #[test]
    fn set_store_credentials_requires_strict_bool() {
        let reg = registry();
        let mut world = World::new();
        reg.resolve_and_dispatch(&toks("config set store_credentials true"), &mut world.env())
            .unwrap();
        assert!(world.config.store_credentials);

        // "False" in any case means false, not truthy-nonempty.
        reg.resolve_and_dispatch(&toks("config set store_credentials FALSE"), &mut world.env())
            .unwrap();
        assert!(!world.config.store_credentials);

        assert!(
            reg.resolve_and_dispatch(
                &toks("config set store_credentials maybe"),
                &mut world.env()
            )
            .is_err()
        );
    }

    #[test]
    fn set_session_fields_splits_list() {
        let reg = registry();
        let mut world = World::new();
        reg.resolve_and_dispatch(
            &toks("config set session_fields pi_server;timezone"),
            &mut world.env(),
        )
        .unwrap();
        assert_eq!(world.config.session_fields, ["pi_server", "timezone"]);
    }

    #[test]
    fn set_paths() {
        let reg = registry();
        let mut world = World::new();
        reg.resolve_and_dispatch(&toks("config set output_path /tmp/out.json"), &mut world.env())
            .unwrap();
        reg.resolve_and_dispatch(&toks("config set tls_cert_path /etc/ca.pem"), &mut world.env())
            .unwrap();
        assert_eq!(world.config.output_path.as_deref(), Some(Path::new("/tmp/out.json")));
        assert_eq!(world.config.tls_cert_path.as_deref(), Some(Path::new("/etc/ca.pem")));
    }

    #[test]
    fn set_debug_flips_flag() {
        let reg = registry();
        let mut world = World::new();
        reg.resolve_and_dispatch(&toks("config set debug 1"), &mut world.env()).unwrap();
        assert!(world.config.debug);
        reg.resolve_and_dispatch(&toks("config set debug 0"), &mut world.env()).unwrap();
        assert!(!world.config.debug);
    }

    #[test]
    fn config_show_succeeds() {
        let reg = registry();
        let mut world = World::new();
        reg.resolve_and_dispatch(&toks("config show"), &mut world.env()).unwrap();
    }

    #[test]
    fn deep_chain_resolves_alongside_siblings() {
        let reg = registry();
        let mut world = World::new();
        // Two three-word chains on one line.
        reg.resolve_and_dispatch(
            &toks("config set debug true config set auth_method basic"),
            &mut world.env(),
        )
        .unwrap();
        assert!(world.config.debug);
        assert_eq!(world.config.auth_method, AuthMethod::Basic);
    }
}

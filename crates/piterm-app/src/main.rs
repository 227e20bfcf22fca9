//! piterm entry point.
//!
//! Interactive client for a PI Web API historian: a full-screen status
//! view with a one-line prompt. Lines are split on spaces and resolved
//! against the command registry; a bare Enter executes the active query.

mod ansi;
mod prompt;
mod render;

use std::io::{self, BufRead, Write};

use anyhow::Result;

use piterm_config::{Config, paths};
use piterm_session::{Credentials, Session};
use piterm_terminal::{
    CommandRegistry, Environment, LogBuffer, install_logger, register_builtins,
};
use piterm_webapi::{Record, RustlsProvider, TcpTransport, TlsProvider};

use prompt::StdinPrompter;

fn main() -> Result<()> {
    let config_path = paths::config_file()?;
    let mut config = Config::load(&config_path)?;

    let logs = LogBuffer::new();
    install_logger(logs.clone(), config.debug)?;
    log::info!("piterm starting");

    let session_path = paths::session_file()?;
    let mut session = Session::load(&session_path, &config.session_fields)?;

    let credentials_path = paths::credentials_file()?;
    let mut credentials = if config.store_credentials {
        Credentials::load(&credentials_path)?
    } else {
        Credentials::default()
    };

    let tls: Box<dyn TlsProvider> = Box::new(RustlsProvider::new(config.tls_cert_path.as_deref())?);
    let transport = TcpTransport::new(Some(tls));

    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry)?;
    log::info!("{} commands registered; type 'help' for a list", registry.len());

    let mut results: Vec<Record> = Vec::new();
    let mut prompter = StdinPrompter;
    let stdin = io::stdin();

    loop {
        render::render(&credentials, session.active(), &results, &logs)?;
        print!("Enter a command: ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF: leave like `exit` does.
            break;
        }
        let tokens: Vec<String> = line
            .trim_end_matches(['\r', '\n'])
            .split(' ')
            .map(str::to_string)
            .collect();

        let mut should_exit = false;
        let mut env = Environment {
            config: &mut config,
            session: &mut session,
            credentials: &mut credentials,
            results: &mut results,
            transport: &transport,
            prompter: &mut prompter,
            logs: &logs,
            credentials_file: Some(credentials_path.clone()),
            should_exit: &mut should_exit,
        };
        if let Err(e) = registry.resolve_and_dispatch(&tokens, &mut env) {
            log::info!("{e}");
        }
        if should_exit {
            break;
        }
    }

    session.save(&session_path, &config.session_fields)?;
    print!("{}{}", ansi::CLEAR, ansi::CURSOR_HOME);
    io::stdout().flush()?;
    Ok(())
}

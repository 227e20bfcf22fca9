//! Query commands: everything that shapes or runs the active query.

use piterm_session::{
    BoundaryType, CalculationBasis, QueryType, SummaryType, TimestampCalculation, split_list, time,
};
use piterm_types::{PitermError, Result};
use piterm_webapi::Client;

use crate::interpreter::{Command, CommandRegistry, Environment};

/// Register all query commands into a registry.
pub fn register_query_commands(reg: &mut CommandRegistry) -> Result<()> {
    reg.register(Box::new(RunQueryCmd))?;
    reg.register(Box::new(SwapCmd))?;
    reg.register(Box::new(TypeCmd))?;
    reg.register(Box::new(UrlCmd))?;
    reg.register(Box::new(ServerCmd))?;
    reg.register(Box::new(StartCmd))?;
    reg.register(Box::new(EndCmd))?;
    reg.register(Box::new(TagsAddCmd))?;
    reg.register(Box::new(TagsRemoveCmd))?;
    reg.register(Box::new(TagsSetCmd))?;
    reg.register(Box::new(TagsClearCmd))?;
    reg.register(Box::new(TimezoneCmd))?;
    reg.register(Box::new(SummaryCmd))?;
    reg.register(Box::new(BasisCmd))?;
    reg.register(Box::new(TimecalcCmd))?;
    reg.register(Box::new(BoundCmd))?;
    reg.register(Box::new(IntervalCmd))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// run (bare Enter)
// ---------------------------------------------------------------------------

/// Registered under the empty token so a bare Enter runs the query.
struct RunQueryCmd;
impl Command for RunQueryCmd {
    fn chain(&self) -> &[&'static str] {
        &[""]
    }
    fn description(&self) -> &str {
        "Execute the active query (press Enter on an empty line)"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        let client = Client::new(env.transport, env.config, env.credentials)?;
        let records = client.execute(env.session.active())?;

        if let Some(path) = &env.config.output_path {
            std::fs::write(path, serde_json::to_string_pretty(&records)?)?;
            log::info!("Wrote {} record(s) to {}", records.len(), path.display());
        }

        *env.results = records;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// swap
// ---------------------------------------------------------------------------

struct SwapCmd;
impl Command for SwapCmd {
    fn chain(&self) -> &[&'static str] {
        &["swap"]
    }
    fn description(&self) -> &str {
        "Switch the active query slot"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        env.session.swap();
        log::info!("Switched to query {}", env.session.active_slot());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// type
// ---------------------------------------------------------------------------

struct TypeCmd;
impl Command for TypeCmd {
    fn chain(&self) -> &[&'static str] {
        &["type"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the query type (recorded, interpolated, summary)"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting query type to {}", args[0]);
        env.session.active_mut().query_type = QueryType::parse(args[0])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// url / server
// ---------------------------------------------------------------------------

struct UrlCmd;
impl Command for UrlCmd {
    fn chain(&self) -> &[&'static str] {
        &["url"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the PI Web API base URL"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting API base URL to {}", args[0]);
        env.session.active_mut().api_base_url = args[0].to_string();
        Ok(())
    }
}

struct ServerCmd;
impl Command for ServerCmd {
    fn chain(&self) -> &[&'static str] {
        &["server"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the PI data server name"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting PI server to {}", args[0]);
        env.session.active_mut().pi_server = args[0].to_string();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// start / end
// ---------------------------------------------------------------------------

struct StartCmd;
impl Command for StartCmd {
    fn chain(&self) -> &[&'static str] {
        &["start"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the query start time"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting start time to {}", args[0]);
        env.session.active_mut().start_time = time::normalize(args[0]);
        Ok(())
    }
}

struct EndCmd;
impl Command for EndCmd {
    fn chain(&self) -> &[&'static str] {
        &["end"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the query end time"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting end time to {}", args[0]);
        env.session.active_mut().end_time = time::normalize(args[0]);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// tags add / remove / set / clear
// ---------------------------------------------------------------------------

struct TagsAddCmd;
impl Command for TagsAddCmd {
    fn chain(&self) -> &[&'static str] {
        &["tags", "add"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Add tags (comma, semicolon, or pipe separated)"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Adding tags: {}", args[0]);
        env.session.active_mut().tags.extend(split_list(args[0]));
        Ok(())
    }
}

struct TagsRemoveCmd;
impl Command for TagsRemoveCmd {
    fn chain(&self) -> &[&'static str] {
        &["tags", "remove"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Remove tags (comma, semicolon, or pipe separated)"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Removing tags: {}", args[0]);
        let tags = &mut env.session.active_mut().tags;
        for tag in split_list(args[0]) {
            match tags.iter().position(|t| *t == tag) {
                Some(i) => {
                    tags.remove(i);
                },
                None => {
                    return Err(PitermError::Validation(format!(
                        "tag {tag} is not in the list"
                    )));
                },
            }
        }
        Ok(())
    }
}

struct TagsSetCmd;
impl Command for TagsSetCmd {
    fn chain(&self) -> &[&'static str] {
        &["tags", "set"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Replace the tag list"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting tags: {}", args[0]);
        env.session.active_mut().tags = split_list(args[0]);
        Ok(())
    }
}

struct TagsClearCmd;
impl Command for TagsClearCmd {
    fn chain(&self) -> &[&'static str] {
        &["tags", "clear"]
    }
    fn description(&self) -> &str {
        "Clear the tag list"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Clearing tags");
        env.session.active_mut().tags.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// timezone / summary / basis / timecalc / bound / interval
// ---------------------------------------------------------------------------

struct TimezoneCmd;
impl Command for TimezoneCmd {
    fn chain(&self) -> &[&'static str] {
        &["timezone"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the query timezone"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting timezone to {}", args[0]);
        env.session.active_mut().timezone = args[0].to_string();
        Ok(())
    }
}

struct SummaryCmd;
impl Command for SummaryCmd {
    fn chain(&self) -> &[&'static str] {
        &["summary"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the summary type"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting summary type to {}", args[0]);
        env.session.active_mut().summary_type = SummaryType::parse(args[0])?;
        Ok(())
    }
}

struct BasisCmd;
impl Command for BasisCmd {
    fn chain(&self) -> &[&'static str] {
        &["basis"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the calculation basis"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting calculation basis to {}", args[0]);
        env.session.active_mut().calculation_basis = CalculationBasis::parse(args[0])?;
        Ok(())
    }
}

struct TimecalcCmd;
impl Command for TimecalcCmd {
    fn chain(&self) -> &[&'static str] {
        &["timecalc"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the timestamp calculation"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting timestamp calculation to {}", args[0]);
        env.session.active_mut().timestamp_calculation = TimestampCalculation::parse(args[0])?;
        Ok(())
    }
}

struct BoundCmd;
impl Command for BoundCmd {
    fn chain(&self) -> &[&'static str] {
        &["bound"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the boundary type"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting boundary type to {}", args[0]);
        env.session.active_mut().boundary_type = BoundaryType::parse(args[0])?;
        Ok(())
    }
}

struct IntervalCmd;
impl Command for IntervalCmd {
    fn chain(&self) -> &[&'static str] {
        &["interval"]
    }
    fn arity(&self) -> usize {
        1
    }
    fn description(&self) -> &str {
        "Set the interval for interpolated and summary queries"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<()> {
        log::info!("Setting interval to {}", args[0]);
        env.session.active_mut().interval = args[0].to_string();
        Ok(())
    }
}

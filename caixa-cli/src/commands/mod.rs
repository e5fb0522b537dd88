//! CLI command implementations

pub mod admin;
pub mod audit;
pub mod close;
pub mod doctor;
pub mod import;
pub mod jobs;
pub mod logs;
pub mod manual;
pub mod report;
pub mod snapshot;
pub mod sources;
pub mod status;
pub mod tx;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use caixa_core::domain::Actor;
use caixa_core::services::{EntryPoint, LogEvent, LoggingService};
use caixa_core::CaixaContext;
use dialoguer::Confirm;

/// Email of the acting user, recorded in the audit trail
pub const USER_ENV: &str = "CAIXA_USER";

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let caixa_dir = get_caixa_dir().ok()?;
    std::fs::create_dir_all(&caixa_dir).ok()?;
    LoggingService::new(&caixa_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from `CAIXA_DIR`, or `~/.caixa`
pub fn get_caixa_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CAIXA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".caixa"))
        .ok_or_else(|| anyhow!("Could not find home directory; set CAIXA_DIR"))
}

/// Get or create the caixa context
pub fn get_context() -> Result<CaixaContext> {
    let caixa_dir = get_caixa_dir()?;

    std::fs::create_dir_all(&caixa_dir)
        .with_context(|| format!("Failed to create caixa directory: {:?}", caixa_dir))?;

    CaixaContext::new(&caixa_dir).context("Failed to initialize caixa context")
}

/// Identity for audit entries, taken from `CAIXA_USER`
pub fn current_actor(ctx: &CaixaContext) -> Result<Actor> {
    let email = std::env::var(USER_ENV).ok();
    ctx.user_service.resolve_actor(email.as_deref())
}

/// Ask before a destructive action; `--force` and `--json` skip the prompt
pub fn confirm(prompt: &str, force: bool, json: bool) -> Result<bool> {
    if force || json {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

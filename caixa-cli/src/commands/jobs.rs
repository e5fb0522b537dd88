//! Jobs commands - import history

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color};
use serde_json::json;

use caixa_core::domain::ImportJobStatus;
use caixa_core::services::LogEvent;

use super::{confirm, current_actor, get_context, get_logger, log_event, print_json};
use crate::output::{create_table, success, truncate};

#[derive(Subcommand)]
pub enum JobsCommands {
    /// List recent imports
    List {
        #[arg(short, long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Delete an import and every transaction it created
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: JobsCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        JobsCommands::List { limit, json } => {
            let jobs = ctx.import_service.list_jobs(limit)?;
            if json {
                return print_json(&jobs);
            }
            if jobs.is_empty() {
                println!("No imports yet.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["ID", "Created", "Source", "File", "Status", "Inserted", "Ignored", "Locked", "Skipped"]);
            for job in &jobs {
                let status = match job.status {
                    ImportJobStatus::Completed => Cell::new(job.status.as_str()).fg(Color::Green),
                    ImportJobStatus::CompletedWithAlerts => Cell::new(job.status.as_str()).fg(Color::Yellow),
                    ImportJobStatus::Failed => Cell::new(job.status.as_str()).fg(Color::Red),
                    ImportJobStatus::Processing => Cell::new(job.status.as_str()),
                };
                table.add_row(vec![
                    Cell::new(job.id),
                    Cell::new(job.created_at.format("%Y-%m-%d %H:%M")),
                    Cell::new(&job.source),
                    Cell::new(truncate(&job.file_name, 30)),
                    status,
                    Cell::new(job.inserted),
                    Cell::new(job.ignored),
                    Cell::new(job.locked),
                    Cell::new(job.skipped),
                ]);
            }
            println!("{}", table);

            for job in jobs.iter().filter(|j| j.status == ImportJobStatus::Failed) {
                if let Some(message) = &job.error_message {
                    println!("  {}: {}", job.id, message);
                }
            }
        }
        JobsCommands::Delete { id, force, json } => {
            let actor = current_actor(&ctx)?;
            let job = ctx.import_service.get_job(&id)?;
            if !confirm(
                &format!("Delete import '{}' and its {} transactions?", job.file_name, job.inserted),
                force,
                json,
            )? {
                println!("Cancelled.");
                return Ok(());
            }

            let removed = ctx.import_service.delete_job(&id, &actor)?;
            log_event(&get_logger(), LogEvent::new("import_deleted").with_command("jobs delete"));

            if json {
                return print_json(&json!({ "jobId": job.id, "transactionsDeleted": removed }));
            }
            success(&format!("Deleted import {} ({} transactions)", job.file_name, removed));
        }
    }

    Ok(())
}

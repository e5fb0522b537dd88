//! Sources commands - banks and channels statements come from

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use super::{confirm, current_actor, get_context, print_json};
use crate::output::{create_table, success};

#[derive(Subcommand)]
pub enum SourcesCommands {
    /// List registered sources
    List {
        #[arg(long)]
        json: bool,
    },
    /// Register a source
    Add {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Remove a source no transaction uses
    Remove {
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: SourcesCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        SourcesCommands::List { json } => {
            let sources = ctx.source_service.list()?;
            if json {
                return print_json(&sources);
            }

            let mut table = create_table();
            table.set_header(vec!["ID", "Name", "Added"]);
            for source in &sources {
                table.add_row(vec![
                    source.id.clone(),
                    source.name.clone(),
                    source.created_at.format("%Y-%m-%d").to_string(),
                ]);
            }
            println!("{}", table);
        }
        SourcesCommands::Add { name, json } => {
            let actor = current_actor(&ctx)?;
            let source = ctx.source_service.add(&name, &actor)?;
            if json {
                return print_json(&source);
            }
            success(&format!("Source {} ({})", source.id, source.name));
        }
        SourcesCommands::Remove { name, force, json } => {
            let actor = current_actor(&ctx)?;
            if !confirm(&format!("Remove source {}?", name), force, json)? {
                println!("Cancelled.");
                return Ok(());
            }

            ctx.source_service.remove(&name, &actor)?;
            if json {
                return print_json(&json!({ "removed": name }));
            }
            success(&format!("Source {} removed", name));
        }
    }

    Ok(())
}

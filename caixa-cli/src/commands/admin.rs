//! Admin commands - user provisioning

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color};
use dialoguer::Password;

use caixa_core::services::LogEvent;

use super::{current_actor, get_context, get_logger, log_event, print_json};
use crate::output::{create_table, info, success};

/// Password for `admin provision` when not given on the command line
const ADMIN_PASSWORD_ENV: &str = "CAIXA_ADMIN_PASSWORD";

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Ensure an active admin with this email exists
    Provision {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Password for a new user (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List users
    Users {
        #[arg(long)]
        json: bool,
    },
}

fn get_password(provided: Option<String>, json: bool) -> Result<String> {
    if let Some(p) = provided {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ADMIN_PASSWORD_ENV) {
        return Ok(p);
    }
    if json {
        anyhow::bail!("Password required: use --password or {}", ADMIN_PASSWORD_ENV);
    }
    Ok(Password::new()
        .with_prompt("Admin password")
        .with_confirmation("Confirm password", "Passwords don't match")
        .interact()?)
}

pub fn run(command: AdminCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        AdminCommands::Provision {
            name,
            email,
            password,
            json,
        } => {
            let actor = current_actor(&ctx)?;
            let existing = ctx
                .user_service
                .list()?
                .into_iter()
                .any(|u| u.email == email.trim().to_lowercase());
            // Existing users keep their password, so only prompt for new ones
            let password = if existing { String::new() } else { get_password(password, json)? };

            let outcome = ctx.user_service.provision_admin(&name, &email, &password, &actor)?;
            log_event(&get_logger(), LogEvent::new("admin_provisioned").with_command("admin provision"));

            if json {
                return print_json(&outcome);
            }
            if outcome.created {
                success(&format!("Admin {} created", outcome.user.email));
            } else if outcome.updated {
                success(&format!("{} is now an active admin", outcome.user.email));
            } else {
                info(&format!("{} is already an active admin", outcome.user.email));
            }
        }
        AdminCommands::Users { json } => {
            let users = ctx.user_service.list()?;
            if json {
                return print_json(&users);
            }
            if users.is_empty() {
                println!("No users. Create one with `caixa admin provision`.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Email", "Name", "Role", "Active", "Created"]);
            for user in &users {
                let active = if user.active {
                    Cell::new("yes").fg(Color::Green)
                } else {
                    Cell::new("no").fg(Color::Red)
                };
                table.add_row(vec![
                    Cell::new(&user.email),
                    Cell::new(&user.name),
                    Cell::new(user.role),
                    active,
                    Cell::new(user.created_at.format("%Y-%m-%d")),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}

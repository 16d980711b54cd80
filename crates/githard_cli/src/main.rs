//! Command-line driver for the project service.
//!
//! # Responsibility
//! - Resolve `ServiceConfig` from file, environment and flags.
//! - Run one request handler per invocation and print its JSON body.
//!
//! Exit status is non-zero whenever the handler answers with a 4xx/5xx.

use clap::{Parser, Subcommand};
use githard_api::{ApiResponse, ProjectApi};
use githard_core::ServiceConfig;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "githard", version, about = "Project record-keeping service")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides `db_path` from the configuration.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print service name and version.
    Info,
    /// Check that the project store answers.
    Health,
    /// Create a project.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        description: Option<String>,
        /// Join this user as the first member.
        #[arg(long)]
        owner: Option<String>,
    },
    /// Show one project.
    Get {
        #[arg(long)]
        id: String,
    },
    /// Join a project.
    Join {
        #[arg(long)]
        id: String,
        #[arg(long)]
        user: String,
    },
    /// Apply a hardware checkout (positive) or checkin (negative).
    Usage {
        #[arg(long)]
        id: String,
        #[arg(long = "hw-set")]
        hw_set: String,
        #[arg(long, allow_hyphen_values = true)]
        qty: i64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let response = match run(cli) {
        Ok(response) => response,
        Err(message) => {
            eprintln!("githard: {message}");
            return ExitCode::FAILURE;
        }
    };

    println!("{}", response.body);
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(cli: Cli) -> Result<ApiResponse, String> {
    let config = resolve_config(cli.config.as_ref(), cli.db)?;
    config.init_logging()?;

    let conn = match config.open_db() {
        Ok(conn) => conn,
        Err(err) if matches!(cli.command, Command::Health) => {
            return Ok(ApiResponse::unhealthy(err));
        }
        Err(err) => {
            return Err(format!(
                "cannot open database `{}`: {err}",
                config.db_path.display()
            ))
        }
    };
    let api = ProjectApi::from_connection(&conn).map_err(|err| err.to_string())?;

    Ok(match cli.command {
        Command::Info => api.root(),
        Command::Health => api.health(),
        Command::Create {
            name,
            id,
            description,
            owner,
        } => api.create_project(&create_body(name, id, description, owner)),
        Command::Get { id } => api.get_project_info(Some(&id)),
        Command::Join { id, user } => {
            api.join_project(&json!({ "projectId": id, "userId": user }))
        }
        Command::Usage { id, hw_set, qty } => api.update_hw_usage(&json!({
            "projectId": id,
            "hwSetName": hw_set,
            "qty": qty,
        })),
    })
}

fn resolve_config(path: Option<&PathBuf>, db: Option<PathBuf>) -> Result<ServiceConfig, String> {
    let config = match path {
        Some(path) => ServiceConfig::load(path).map_err(|err| err.to_string())?,
        None => ServiceConfig::default(),
    };
    let mut config = config.with_env_overrides(|key| std::env::var(key).ok());
    if let Some(db) = db {
        config.db_path = db;
    }
    Ok(config)
}

fn create_body(
    name: String,
    id: String,
    description: Option<String>,
    owner: Option<String>,
) -> Value {
    let mut body = json!({ "projectName": name, "projectId": id });
    if let Some(description) = description {
        body["description"] = json!(description);
    }
    if let Some(owner) = owner {
        body["ownerUserId"] = json!(owner);
    }
    body
}

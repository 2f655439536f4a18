/// Main entry point for the Habit Activity Engine MCP server
///
/// This file sets up logging, parses command line arguments, and starts the MCP server.
/// The server listens for JSON-RPC requests over stdin/stdout following the MCP protocol.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use habit_activity_engine::{Caller, HabitEngineServer, OwnerId, WorkspaceId};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|mut p| {
            p.push(".habit_engine");
            p
        }),
        dirs::data_dir().map(|mut p| {
            p.push("habit_engine");
            p
        }),
        dirs::config_dir().map(|mut p| {
            p.push("habit_engine");
            p
        }),
        std::env::current_dir().ok().map(|mut p| {
            p.push(".habit_engine");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            // Make sure the directory is actually writable
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("habits.db"));
            }
        }
    }

    let mut temp_path = std::env::temp_dir();
    temp_path.push("habit_engine");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("habits.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}

/// Command line arguments for the Habit Activity Engine MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long)]
    database: Option<PathBuf>,

    /// Owner used when a tool call does not name one
    #[arg(long, env = "HABIT_OWNER_ID")]
    owner: Option<OwnerId>,

    /// Workspace used when a tool call does not name one
    #[arg(long, env = "HABIT_WORKSPACE_ID")]
    workspace: Option<WorkspaceId>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    // RUST_LOG wins over the command line flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("habit_activity_engine={}", log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // stdout carries the protocol
        .init();

    info!("Starting Habit Activity Engine MCP server");

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };

    info!("Using database at: {}", db_path.display());

    let mut server = HabitEngineServer::new(db_path)?;
    match (args.owner, args.workspace) {
        (Some(owner), Some(workspace)) => {
            server = server.with_default_caller(Caller::new(owner, workspace));
        }
        (None, None) => {}
        _ => {
            return Err("--owner and --workspace must be given together".into());
        }
    }

    server.run().await?;

    info!("Habit Activity Engine MCP server shutdown complete");
    Ok(())
}

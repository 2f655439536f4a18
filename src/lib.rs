/// Public library interface for the Habit Activity Engine
///
/// This module exports the server type and the public building blocks
/// (domain types, storage, analytics and tools) used by the binary and tests.

use std::path::PathBuf;
use thiserror::Error;

pub mod analytics;
pub mod domain;
pub mod mcp;
pub mod storage;
pub mod tools;

// Re-export public modules and types
pub use analytics::{AnalyticsEngine, CalendarDay, CalendarEntry, CalendarResponse};
pub use domain::*;
pub use storage::{CompletionStore, HabitStorage, SqliteStorage, Storage, StorageError, Toggled, VersionStore};
pub use tools::{Caller, ErrorKind, ToolError};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Habit engine served over MCP
///
/// Owns the SQLite storage and the analytics engine. The default caller is
/// used for tool calls that do not name an owner and workspace.
pub struct HabitEngineServer {
    storage: SqliteStorage,
    analytics: AnalyticsEngine,
    default_caller: Option<Caller>,
}

impl HabitEngineServer {
    /// Open the database at `db_path`, creating and migrating it if needed
    pub fn new(db_path: PathBuf) -> Result<Self, ServerError> {
        tracing::info!("Initializing habit engine with database: {:?}", db_path);
        let storage = SqliteStorage::new(db_path)?;
        Ok(Self::with_storage(storage))
    }

    pub fn with_storage(storage: SqliteStorage) -> Self {
        Self {
            storage,
            analytics: AnalyticsEngine::new(),
            default_caller: None,
        }
    }

    pub fn with_default_caller(mut self, caller: Caller) -> Self {
        self.default_caller = Some(caller);
        self
    }

    /// Serve JSON-RPC requests over stdin/stdout until stdin closes
    pub async fn run(self) -> Result<(), ServerError> {
        match &self.default_caller {
            Some(caller) => tracing::info!(
                "Serving owner {} in workspace {} by default",
                caller.owner_id,
                caller.workspace_id
            ),
            None => tracing::info!("No default caller; every tool call must name owner_id and workspace_id"),
        }

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    pub fn default_caller(&self) -> Option<Caller> {
        self.default_caller
    }
}

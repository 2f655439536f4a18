/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin, one per line
/// 2. Resolves the caller and runs the requested tool
/// 3. Writes JSON-RPC responses to stdout

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::domain::today_utc;
use crate::mcp::protocol::*;
use crate::tools::{self, Caller, ToolError};
use crate::{HabitEngineServer, ServerError};

/// Tools this server answers to
pub const TOOL_NAMES: [&str; 10] = [
    "habit_list",
    "habit_create",
    "habit_get",
    "habit_update",
    "habit_delete",
    "habit_complete",
    "habit_toggle",
    "habit_stats",
    "habit_completions",
    "habit_calendar",
];

/// MCP server speaking JSON-RPC over stdio
pub struct McpServer {
    engine: HabitEngineServer,
    initialized: bool,
}

impl McpServer {
    pub fn new(engine: HabitEngineServer) -> Self {
        Self {
            engine,
            initialized: false,
        }
    }

    /// Run the MCP server until stdin closes
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let mut reader = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("MCP server shutting down (stdin closed)");
                    break;
                }
                Ok(_) => {
                    if let Some(response) = self.process_line(&line).await {
                        let response_str = serde_json::to_string(&response)?;

                        stdout.write_all(response_str.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    /// Process a single line of JSON-RPC input
    ///
    /// Blank lines and notifications produce no response.
    pub async fn process_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        if request.is_notification() {
            if request.method == "notifications/initialized" {
                self.initialized = true;
            }
            return None;
        }

        Some(self.handle_request(request))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "initialized" => {
                self.initialized = true;
                JsonRpcResponse::success(request.id, Value::Null)
            }
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request),
            _ => JsonRpcResponse::error(
                request.id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        }
    }

    fn handle_initialize(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        info!("MCP client connected");

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Habit Activity Engine".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        respond(request.id, &result)
    }

    fn handle_tools_list(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let definitions = vec![
            tool_definition::<tools::ListHabitsParams>(
                "habit_list",
                "List habits; with a date, only the habits due on that day",
            ),
            tool_definition::<tools::CreateHabitParams>(
                "habit_create",
                "Create a recurring (weekday) or one-time habit",
            ),
            tool_definition::<tools::HabitIdParams>("habit_get", "Fetch one habit"),
            tool_definition::<tools::UpdateHabitParams>(
                "habit_update",
                "Update a habit; schedule, title, color and pause changes take effect the next day",
            ),
            tool_definition::<tools::HabitIdParams>(
                "habit_delete",
                "Delete a habit, keeping its past days on the calendar",
            ),
            tool_definition::<tools::CompleteHabitParams>(
                "habit_complete",
                "Record a completion with optional notes, rating and time",
            ),
            tool_definition::<tools::ToggleHabitParams>("habit_toggle", "Flip whether a habit is done on a day"),
            tool_definition::<tools::HabitIdParams>(
                "habit_stats",
                "Completion rate and current/longest streak of a habit",
            ),
            tool_definition::<tools::CompletionsParams>(
                "habit_completions",
                "Completions of one habit or the whole workspace over a date range",
            ),
            tool_definition::<tools::CalendarParams>(
                "habit_calendar",
                "Day-by-day view of due and completed habits, as they were on each day",
            ),
        ];

        JsonRpcResponse::success(request.id, json!({ "tools": definitions }))
    }

    fn handle_tools_call(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let tool_params: ToolCallParams = match request.params.map(serde_json::from_value::<ToolCallParams>) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    request.id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid parameters: {}", e),
                    None,
                );
            }
            None => {
                return JsonRpcResponse::error(
                    request.id,
                    error_codes::INVALID_PARAMS,
                    "Missing parameters".to_string(),
                    None,
                );
            }
        };

        if !TOOL_NAMES.contains(&tool_params.name.as_str()) {
            return JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_PARAMS,
                format!("Unknown tool: {}", tool_params.name),
                None,
            );
        }

        debug!("Calling tool {}", tool_params.name);
        match self.call_tool(&tool_params.name, tool_params.arguments) {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(text) => respond(request.id, &ToolCallResult::success(text)),
                Err(e) => JsonRpcResponse::error(request.id, error_codes::INTERNAL_ERROR, e.to_string(), None),
            },
            Err(err) => {
                if err.is_client_error() {
                    debug!("Tool {} rejected: {}", tool_params.name, err);
                } else {
                    error!("Tool {} failed: {}", tool_params.name, err);
                }
                JsonRpcResponse::tool_error(request.id, &err)
            }
        }
    }

    fn call_tool(&self, name: &str, args: Map<String, Value>) -> Result<Value, ToolError> {
        let caller = self.resolve_caller(&args)?;
        let storage = self.engine.storage();
        let analytics = self.engine.analytics();
        let today = today_utc();

        match name {
            "habit_list" => run(args, |p| tools::list_habits(storage, &caller, p)),
            "habit_create" => run(args, |p| tools::create_habit(storage, &caller, p, today)),
            "habit_get" => run(args, |p| tools::get_habit(storage, &caller, p)),
            "habit_update" => run(args, |p| tools::update_habit(storage, &caller, p, today)),
            "habit_delete" => run(args, |p| tools::delete_habit(storage, &caller, p, today)),
            "habit_complete" => run(args, |p| tools::complete_habit(storage, &caller, p, today)),
            "habit_toggle" => run(args, |p| tools::toggle_habit(storage, &caller, p, today)),
            "habit_stats" => run(args, |p| tools::get_habit_stats(storage, analytics, &caller, p, today)),
            "habit_completions" => run(args, |p| tools::list_completions(storage, &caller, p, today)),
            "habit_calendar" => run(args, |p| tools::get_calendar(storage, analytics, &caller, p, today)),
            other => Err(ToolError::Validation(format!("Unknown tool: {}", other))),
        }
    }

    /// Caller identity from the arguments, falling back to the configured one
    fn resolve_caller(&self, args: &Map<String, Value>) -> Result<Caller, ToolError> {
        let default = self.engine.default_caller();

        let owner_id = match args.get("owner_id").and_then(Value::as_str) {
            Some(raw) => tools::parse_owner_id(raw)?,
            None => default
                .map(|c| c.owner_id)
                .ok_or_else(|| ToolError::Validation("owner_id is required".to_string()))?,
        };
        let workspace_id = match args.get("workspace_id").and_then(Value::as_str) {
            Some(raw) => tools::parse_workspace_id(raw)?,
            None => default
                .map(|c| c.workspace_id)
                .ok_or_else(|| ToolError::Validation("workspace_id is required".to_string()))?,
        };

        Ok(Caller::new(owner_id, workspace_id))
    }
}

/// Deserialize the arguments and run the tool, retrying once on a write conflict
fn run<P, R, F>(args: Map<String, Value>, op: F) -> Result<Value, ToolError>
where
    P: DeserializeOwned + Clone,
    R: Serialize,
    F: Fn(P) -> Result<R, ToolError>,
{
    let params: P = serde_json::from_value(Value::Object(args))
        .map_err(|e| ToolError::Validation(format!("Invalid arguments: {}", e)))?;

    let response = tools::with_conflict_retry(|| op(params.clone()))?;
    serde_json::to_value(response).map_err(|e| ToolError::Internal(e.to_string()))
}

fn respond<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None),
    }
}

/// Tool definition with the argument schema derived from its parameter type
///
/// Every tool also accepts the caller identity.
fn tool_definition<P: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    let mut input_schema = serde_json::to_value(schema_for!(P)).unwrap_or_else(|_| json!({ "type": "object" }));

    if let Some(schema) = input_schema.as_object_mut() {
        schema.remove("$schema");
        schema.remove("title");

        let properties = schema
            .entry("properties")
            .or_insert_with(|| json!({}));
        if let Some(properties) = properties.as_object_mut() {
            properties.insert(
                "owner_id".to_string(),
                json!({ "type": "string", "description": "Owner UUID (defaults to the configured owner)" }),
            );
            properties.insert(
                "workspace_id".to_string(),
                json!({ "type": "string", "description": "Workspace UUID (defaults to the configured workspace)" }),
            );
        }
    }

    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

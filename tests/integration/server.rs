/// JSON-RPC round trips through the MCP server
use habit_activity_engine::mcp::protocol::{error_codes, JsonRpcResponse};
use habit_activity_engine::mcp::McpServer;
use habit_activity_engine::{Caller, HabitEngineServer, SqliteStorage};
use serde_json::{json, Value};

use crate::common::new_caller;

fn server_for(caller: Option<Caller>) -> McpServer {
    let engine = HabitEngineServer::with_storage(SqliteStorage::in_memory().unwrap());
    let engine = match caller {
        Some(caller) => engine.with_default_caller(caller),
        None => engine,
    };
    McpServer::new(engine)
}

async fn call(server: &mut McpServer, id: u64, tool: &str, arguments: Value) -> JsonRpcResponse {
    let request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments }
    });
    server.process_line(&request.to_string()).await.expect("a response")
}

/// Decode the JSON text content of a successful tool call
fn payload(response: &JsonRpcResponse) -> Value {
    let result = response.result.as_ref().expect("successful call");
    let text = result["content"][0]["text"].as_str().expect("text content");
    serde_json::from_str(text).expect("JSON payload")
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let mut server = server_for(Some(new_caller()));

    let init = server
        .process_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
        .await
        .unwrap();
    let result = init.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], false);

    assert!(server
        .process_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await
        .is_none());
    assert!(server.is_initialized());

    let listed = server
        .process_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
        .await
        .unwrap();
    let tools = listed.result.unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 10);
    assert!(tools.iter().all(|t| t["inputSchema"]["properties"]["owner_id"].is_object()));
}

#[tokio::test]
async fn test_create_toggle_and_read_back() {
    let mut server = server_for(Some(new_caller()));

    let created = call(
        &mut server,
        1,
        "habit_create",
        json!({ "title": "Stretch", "recurring_days": [0, 1, 2, 3, 4, 5, 6] }),
    )
    .await;
    let habit = payload(&created)["habit"].clone();
    assert_eq!(habit["title"], "Stretch");
    assert_eq!(habit["scheduleType"], "recurring");
    let habit_id = habit["id"].as_str().unwrap().to_string();

    let toggled = call(&mut server, 2, "habit_toggle", json!({ "habit_id": habit_id })).await;
    assert_eq!(payload(&toggled)["completed"], true);

    let stats = call(&mut server, 3, "habit_stats", json!({ "habit_id": habit_id })).await;
    let stats = payload(&stats);
    assert_eq!(stats["completedDays"], 1);
    assert_eq!(stats["currentStreak"], 1);

    let today = call(&mut server, 4, "habit_list", json!({})).await;
    assert_eq!(payload(&today)["total"], 1);
}

#[tokio::test]
async fn test_errors_carry_their_kind() {
    let owner = new_caller();
    let mut server = server_for(Some(owner));

    let created = call(
        &mut server,
        1,
        "habit_create",
        json!({ "title": "Private", "recurring_days": [1] }),
    )
    .await;
    let habit_id = payload(&created)["habit"]["id"].as_str().unwrap().to_string();

    // Same id, different owner
    let stranger = new_caller();
    let foreign = call(
        &mut server,
        2,
        "habit_get",
        json!({ "habit_id": habit_id, "owner_id": stranger.owner_id.to_string() }),
    )
    .await;
    let error = foreign.error.unwrap();
    assert_eq!(error.code, error_codes::HABIT_NOT_FOUND);
    assert_eq!(error.data.unwrap()["kind"], "not_found");

    let invalid = call(
        &mut server,
        3,
        "habit_complete",
        json!({ "habit_id": habit_id, "date": "2024-13-40" }),
    )
    .await;
    assert_eq!(invalid.error.unwrap().code, error_codes::VALIDATION_ERROR);

    let unknown = call(&mut server, 4, "habit_explode", json!({})).await;
    assert_eq!(unknown.error.unwrap().code, error_codes::INVALID_PARAMS);

    let garbage = server.process_line("{not json").await.unwrap();
    assert_eq!(garbage.error.unwrap().code, error_codes::PARSE_ERROR);
}

#[tokio::test]
async fn test_caller_required_without_default() {
    let mut server = server_for(None);

    let missing = call(&mut server, 1, "habit_list", json!({})).await;
    assert_eq!(missing.error.unwrap().code, error_codes::VALIDATION_ERROR);

    let caller = new_caller();
    let explicit = call(
        &mut server,
        2,
        "habit_list",
        json!({
            "owner_id": caller.owner_id.to_string(),
            "workspace_id": caller.workspace_id.to_string()
        }),
    )
    .await;
    assert_eq!(payload(&explicit)["total"], 0);
}

#[tokio::test]
async fn test_responses_use_camel_case_keys() {
    let mut server = server_for(Some(new_caller()));

    let created = call(
        &mut server,
        1,
        "habit_create",
        json!({ "title": "Read", "recurring_days": [0, 1, 2, 3, 4, 5, 6] }),
    )
    .await;
    let habit_id = payload(&created)["habit"]["id"].as_str().unwrap().to_string();

    let updated = call(&mut server, 2, "habit_update", json!({ "habit_id": habit_id, "title": "Read more" })).await;
    let updated = payload(&updated);
    assert_eq!(updated["newVersion"], true);
    assert!(updated.get("new_version").is_none());

    let listed = call(
        &mut server,
        3,
        "habit_completions",
        json!({ "habit_id": habit_id, "start_date": "2024-01-01", "end_date": "2024-01-31" }),
    )
    .await;
    let listed = payload(&listed);
    assert_eq!(listed["startDate"], "2024-01-01");
    assert_eq!(listed["endDate"], "2024-01-31");

    let deleted = call(&mut server, 4, "habit_delete", json!({ "habit_id": habit_id })).await;
    let deleted = payload(&deleted);
    assert_eq!(deleted["habitId"], habit_id.as_str());
    assert_eq!(deleted["archivedCompletions"], 0);
}

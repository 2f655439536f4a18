/// Integration tests for the habit engine
///
/// These drive the public tool functions against real SQLite databases,
/// covering the end-to-end scenarios, concurrent writers and the MCP surface.

mod common;
mod concurrency;
mod scenarios;
mod server;

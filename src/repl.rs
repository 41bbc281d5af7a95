//! Interactive command loop for `--chat`.
//!
//! Reads one command per line and issues capability calls on a connected
//! client. Client errors are printed and the loop carries on; EOF or `quit`
//! ends it.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::mcp::schema::{ToolCallResult, ToolContent};
use crate::mcp::{CapabilityCategory, McpClient};
use crate::report::{category_section, members_report};

const HELP: &str = "\
Commands:
  list                   List tools, prompts and resources
  tools                  List tools only
  call <tool> [json]     Call a tool with a JSON object of arguments
  ping                   Check that the server responds
  help                   Show this help
  quit                   Exit
";

/// A parsed interactive command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the capability listing.
    List,
    /// Print the tools only.
    Tools,
    /// Call a tool.
    Call {
        /// Tool name.
        tool: String,
        /// Tool arguments (a JSON object).
        arguments: Value,
    },
    /// Ping the server.
    Ping,
    /// Print the command help.
    Help,
    /// Leave the loop.
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns a user-facing message for unknown commands or bad arguments.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    let command = match word.to_lowercase().as_str() {
        "list" | "members" => Command::List,
        "tools" => Command::Tools,
        "ping" => Command::Ping,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "call" => parse_call(rest)?,
        other => return Err(format!("Unknown command '{other}'. Type 'help' for commands.")),
    };

    Ok(Some(command))
}

fn parse_call(rest: &str) -> Result<Command, String> {
    let (tool, arguments) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(tool, args)| (tool, args.trim()));

    if tool.is_empty() {
        return Err("Usage: call <tool> [json-arguments]".to_string());
    }

    let arguments = if arguments.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        let value: Value = serde_json::from_str(arguments)
            .map_err(|e| format!("Invalid JSON arguments: {e}"))?;
        if !value.is_object() {
            return Err("Tool arguments must be a JSON object".to_string());
        }
        value
    };

    Ok(Command::Call {
        tool: tool.to_string(),
        arguments,
    })
}

/// Renders a tool result for the terminal.
#[must_use]
pub fn render_tool_result(result: &ToolCallResult) -> String {
    let mut out = String::new();
    if result.is_error {
        out.push_str("Tool reported an error:\n");
    }
    for content in &result.content {
        match content {
            ToolContent::Text { text } => out.push_str(text),
            ToolContent::Image { mime_type } => {
                out.push_str(&format!("[image: {mime_type}]"));
            }
            ToolContent::Resource { resource } => {
                let uri = resource.get("uri").and_then(Value::as_str).unwrap_or("?");
                out.push_str(&format!("[resource: {uri}]"));
            }
            ToolContent::Unsupported => out.push_str("[unsupported content]"),
        }
        out.push('\n');
    }
    out
}

/// Runs the loop until `quit` or end of input.
///
/// # Errors
///
/// Returns an error only if reading input or writing output fails.
pub async fn run<R, W>(client: &mut McpClient, input: R, output: &mut W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output
        .write_all(b"MCP client started. Type 'help' for commands, 'quit' to exit.\n")
        .await?;

    loop {
        output.write_all(b"\n> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                output.write_all(format!("{message}\n").as_bytes()).await?;
                continue;
            }
        };

        tracing::debug!(?command, "Interactive command");

        let text = match command {
            Command::Quit => break,
            Command::Help => HELP.to_string(),
            Command::List => match client.list_capabilities().await {
                Ok(listing) => members_report(&listing),
                Err(e) => format!("Error: {e}\n"),
            },
            Command::Tools => match client.list_capabilities().await {
                Ok(listing) => {
                    let tools = CapabilityCategory::Tools;
                    category_section(tools, listing.get(tools))
                }
                Err(e) => format!("Error: {e}\n"),
            },
            Command::Call { tool, arguments } => match client.call_tool(&tool, arguments).await {
                Ok(result) => render_tool_result(&result),
                Err(e) => format!("Error: {e}\n"),
            },
            Command::Ping => match client.ping().await {
                Ok(()) => "pong\n".to_string(),
                Err(e) => format!("Error: {e}\n"),
            },
        };

        output.write_all(text.as_bytes()).await?;
    }

    output.flush().await
}

//! Stateful stdio transport for the Model Context Protocol
//!
//! Newline-delimited JSON framing: one request per line in, one response per
//! line out, in order. A single [`Session`] spans the whole connection, so the
//! initialize-before-use rule is genuinely enforced here. Unlike HTTP, a parse
//! failure only poisons that one line; the loop keeps serving.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use crate::mcp::rpc::json_rpc_error;
use crate::mcp::server::{handle_json_rpc_value, Session};
use crate::AppState;

pub async fn run_stdio(state: AppState) -> std::io::Result<()> {
    info!("serving MCP over stdio");
    serve_lines(state, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Generic over reader/writer so tests can drive the loop with in-memory I/O.
pub async fn serve_lines<R, W>(state: AppState, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut session = Session::new();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(payload) => handle_json_rpc_value(&state, &mut session, payload).await,
            Err(_) => Some(json_rpc_error(None, -32700, "Parse error")),
        };

        if let Some(response) = response {
            let frame =
                serde_json::to_string(&response).expect("jsonrpc response serialization");
            writer.write_all(frame.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    info!("stdio transport closed");
    Ok(())
}

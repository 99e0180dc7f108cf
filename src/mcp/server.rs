//! The central Model Context Protocol engine
//!
//! Provides the primary MCP JSON-RPC decoding, the initialize handshake state
//! machine, capabilities negotiation, and tool/resource routing. Both transports
//! (HTTP and stdio) call into this single dispatcher.

use rust_mcp_sdk::schema::{
    CallToolRequest, Implementation, InitializeRequest, InitializeResult, JsonrpcMessage,
    JsonrpcRequest, ListResourcesRequest, ListResourcesResult, ListToolsRequest, ListToolsResult,
    PingRequest, ProtocolVersion, ReadResourceRequest, ServerCapabilities,
    ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::{
    resources::{build_resources_list, handle_resources_read},
    tools::{build_tools_list, handle_tools_call},
};
use crate::mcp::rpc::{
    is_json_rpc_error, json_rpc_error, json_rpc_result, request_id_to_value,
};
use crate::AppState;

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

/// Handshake state of one logical connection.
///
/// A stdio connection starts uninitialized and must complete `initialize`
/// before any other method is accepted. HTTP carries no session across
/// requests, so each request runs against a stateless, already-ready session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    initialized: bool,
}

impl Session {
    pub fn new() -> Self {
        Self { initialized: false }
    }

    pub fn stateless() -> Self {
        Self { initialized: true }
    }

    pub fn is_ready(&self) -> bool {
        self.initialized
    }

    fn mark_ready(&mut self) {
        self.initialized = true;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn handle_json_rpc_value(
    state: &AppState,
    session: &mut Session,
    payload: Value,
) -> Option<Value> {
    if !payload.is_object() {
        return Some(json_rpc_error(None, -32600, "Invalid Request"));
    }

    let request_id = payload.get("id").cloned();
    // An envelope without a method is still a well-formed request object;
    // only inbound response envelopes stay Invalid Request.
    if payload.get("method").is_none()
        && payload.get("result").is_none()
        && payload.get("error").is_none()
    {
        return Some(json_rpc_error(request_id, -32601, "Method not found"));
    }

    let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
        Ok(message) => message,
        Err(_) => return Some(json_rpc_error(request_id, -32600, "Invalid Request")),
    };

    match parsed {
        JsonrpcMessage::Request(request) => {
            // The not-initialized answer wins over shape errors, so malformed
            // params are only inspected once the session gate would pass.
            if session.is_ready() || request.method == "initialize" {
                if let Err(error_response) = validate_request_shape(&request) {
                    return Some(error_response);
                }
            }

            let request_id = request_id_to_value(request.id);
            if request.method.trim().is_empty() {
                return Some(json_rpc_error(Some(request_id), -32600, "Invalid Request"));
            }

            Some(
                handle_json_rpc_request(
                    state,
                    session,
                    Some(request_id),
                    request.method,
                    request.params.map(Value::Object),
                )
                .await,
            )
        }
        JsonrpcMessage::Notification(notification) => {
            if notification.method.trim().is_empty() {
                return None;
            }

            let _ = handle_json_rpc_request(
                state,
                session,
                None,
                notification.method,
                notification.params.map(Value::Object),
            )
            .await;
            None
        }
        JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => {
            Some(json_rpc_error(request_id, -32600, "Invalid Request"))
        }
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let payload = serde_json::to_value(request).expect("jsonrpc request serialization");
    let request_id = Some(request_id_to_value(request.id.clone()));

    let valid = match request.method.as_str() {
        "tools/call" => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
        "resources/read" => serde_json::from_value::<ReadResourceRequest>(payload).is_ok(),
        "tools/list" => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
        "resources/list" => serde_json::from_value::<ListResourcesRequest>(payload).is_ok(),
        "ping" => serde_json::from_value::<PingRequest>(payload).is_ok(),
        "initialize" => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(json_rpc_error(request_id, -32602, "Invalid params"))
    }
}

pub async fn handle_json_rpc_request(
    state: &AppState,
    session: &mut Session,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
) -> Value {
    let audit_params = redact_audit_params(params.as_ref());

    let response = if !session.is_ready() && method != "initialize" {
        json_rpc_error(id, -32002, "Server not initialized")
    } else {
        match method.as_str() {
            "initialize" => {
                let response = json_rpc_result(
                    id,
                    serde_json::to_value(build_initialize_result(params.as_ref()))
                        .expect("initialize result serialization"),
                );
                session.mark_ready();
                response
            }
            "ping" => json_rpc_result(id, json!({})),
            "tools/list" => json_rpc_result(
                id,
                serde_json::to_value(ListToolsResult {
                    meta: None,
                    next_cursor: None,
                    tools: build_tools_list(),
                })
                .expect("tools list result serialization"),
            ),
            "tools/call" => handle_tools_call(state, id, params).await,
            "resources/list" => json_rpc_result(
                id,
                serde_json::to_value(ListResourcesResult {
                    meta: None,
                    next_cursor: None,
                    resources: build_resources_list(),
                })
                .expect("resources list result serialization"),
            ),
            "resources/read" => handle_resources_read(state, id, params).await,
            _ => json_rpc_error(id, -32601, &format!("Method not found: {method}")),
        }
    };

    info!(
        method = %method,
        params = %audit_params,
        outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
        "mcp action audited"
    );

    response
}

fn build_initialize_result(params: Option<&Value>) -> InitializeResult {
    match params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
    {
        Some(version) if version == SUPPORTED_PROTOCOL_VERSION => {}
        Some(version) => warn!(
            offered = %version,
            supported = SUPPORTED_PROTOCOL_VERSION,
            "client offered a different protocol version, answering with ours"
        ),
        None => debug!("initialize without protocolVersion, answering with ours"),
    }

    InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: Some(env!("CARGO_PKG_DESCRIPTION").to_string()),
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools {
                list_changed: Some(false),
            }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: None,
            ..Default::default()
        },
        protocol_version: ProtocolVersion::V2024_11_05.into(),
        instructions: None,
        meta: None,
    }
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else if is_bulk_content_key(key) {
                        let summary = match item.as_str() {
                            Some(text) => format!("[{} chars]", text.chars().count()),
                            None => "[non-string content]".to_string(),
                        };
                        (key.clone(), Value::String(summary))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "token"
            | "api_token"
            | "access_token"
            | "refresh_token"
            | "authorization"
            | "bearer"
            | "password"
            | "secret"
            | "credentials"
            | "credential"
            | "api_key"
            | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}

// Whole documents and stored insights do not belong in the audit log.
fn is_bulk_content_key(key: &str) -> bool {
    matches!(
        key.trim().to_ascii_lowercase().as_str(),
        "document_content" | "insight"
    )
}

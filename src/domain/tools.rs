//! Interactive tools exposed via Model Context Protocol
//!
//! Provides `analyze_document`, `update_memory`, `get_compliance_status`, and
//! `automate_compliance_workflow` by delegating to the configured
//! [`ComplianceProvider`](crate::compliance::ComplianceProvider).

use std::future::Future;

use chrono::{SecondsFormat, Utc};
use rust_mcp_sdk::{
    macros,
    schema::{CallToolRequestParams, CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::compliance::{AnalysisRequest, WorkflowRequest};
use crate::domain::utils::{
    normalize_category, normalize_document_content, normalize_document_type,
    normalize_framework_filter, normalize_frameworks, normalize_insight, normalize_team_id,
    normalize_workflow_type,
};
use crate::errors::AppError;
use crate::mcp::rpc::{
    app_error_to_json_rpc, json_rpc_error, json_rpc_error_with_data, json_rpc_result,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeDocumentParams {
    pub document_content: Option<String>,
    pub document_type: Option<String>,
    pub frameworks: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemoryParams {
    pub team_id: Option<String>,
    pub insight: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ComplianceStatusParams {
    pub team_id: Option<String>,
    pub framework: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AutomateWorkflowParams {
    pub document_content: Option<String>,
    pub workflow_type: Option<String>,
    pub team_id: Option<String>,
}

#[macros::mcp_tool(
    name = "analyze_document",
    description = "Analyze a document for compliance issues against supported frameworks"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AnalyzeDocumentTool {
    pub document_content: String,
    pub document_type: Option<String>,
    pub frameworks: Option<Vec<String>>,
}

#[macros::mcp_tool(
    name = "update_memory",
    description = "Store a compliance insight in team memory"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct UpdateMemoryTool {
    pub team_id: String,
    pub insight: String,
    pub category: Option<String>,
}

#[macros::mcp_tool(
    name = "get_compliance_status",
    description = "Get the current compliance status for a team"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct GetComplianceStatusTool {
    pub team_id: String,
    pub framework: Option<String>,
}

#[macros::mcp_tool(
    name = "automate_compliance_workflow",
    description = "Run a compliance workflow (review, approval, revision, audit) for a document"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AutomateComplianceWorkflowTool {
    pub document_content: String,
    pub workflow_type: String,
    pub team_id: String,
}

pub fn build_tools_list() -> Vec<Tool> {
    vec![
        AnalyzeDocumentTool::tool(),
        UpdateMemoryTool::tool(),
        GetComplianceStatusTool::tool(),
        AutomateComplianceWorkflowTool::tool(),
    ]
}

/// Collaborator calls are the only suspension point in the dispatcher; they
/// get a bounded wait so a stuck provider cannot leave a request unanswered.
pub(crate) async fn with_call_timeout<T, F>(state: &AppState, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(state.call_timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::internal("compliance provider call timed out")),
    }
}

fn tool_result(text: String, structured: Value) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(text, None, None))],
        is_error: None,
        meta: None,
        structured_content: structured.as_object().cloned(),
    }
}

pub async fn handle_tools_call(state: &AppState, id: Option<Value>, params: Option<Value>) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };
    let arguments = json!(tool_call.arguments.unwrap_or_default());

    match tool_call.name.as_str() {
        "analyze_document" => {
            let params: AnalyzeDocumentParams = match serde_json::from_value(arguments) {
                Ok(value) => value,
                Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
            };

            let request = match build_analysis_request(params) {
                Ok(request) => request,
                Err(err) => return app_error_to_json_rpc(id, err),
            };

            match with_call_timeout(state, state.provider.analyze_document(&request)).await {
                Ok(report) => {
                    let text = format!(
                        "Compliance report {}: {} issue(s) across {} framework(s), risk score {:.2}",
                        report.report_id,
                        report.issues.len(),
                        report.frameworks_checked.len(),
                        report.risk_score
                    );
                    let structured =
                        serde_json::to_value(&report).expect("compliance report serialization");
                    json_rpc_result(
                        id,
                        serde_json::to_value(tool_result(text, structured))
                            .expect("analyze_document tool result serialization"),
                    )
                }
                Err(err) => app_error_to_json_rpc(id, err),
            }
        }
        "update_memory" => {
            let params: UpdateMemoryParams = match serde_json::from_value(arguments) {
                Ok(value) => value,
                Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
            };

            let team_id = match normalize_team_id(params.team_id) {
                Ok(value) => value,
                Err(err) => return app_error_to_json_rpc(id, err),
            };
            let insight = match normalize_insight(params.insight) {
                Ok(value) => value,
                Err(err) => return app_error_to_json_rpc(id, err),
            };
            let category = match normalize_category(params.category) {
                Ok(value) => value,
                Err(err) => return app_error_to_json_rpc(id, err),
            };

            match with_call_timeout(
                state,
                state.provider.store_insight(&team_id, &insight, &category),
            )
            .await
            {
                Ok(stored) => {
                    let text = format!(
                        "Stored insight {} for team {}",
                        stored.memory_id, stored.team_id
                    );
                    let structured = json!({
                        "success": true,
                        "memory_id": stored.memory_id,
                        "team_id": stored.team_id,
                        "category": stored.category,
                        "recorded_at_utc": stored.recorded_at_utc,
                    });
                    json_rpc_result(
                        id,
                        serde_json::to_value(tool_result(text, structured))
                            .expect("update_memory tool result serialization"),
                    )
                }
                Err(err) => app_error_to_json_rpc(id, err),
            }
        }
        "get_compliance_status" => {
            let params: ComplianceStatusParams = match serde_json::from_value(arguments) {
                Ok(value) => value,
                Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
            };

            let team_id = match normalize_team_id(params.team_id) {
                Ok(value) => value,
                Err(err) => return app_error_to_json_rpc(id, err),
            };
            let framework = match normalize_framework_filter(params.framework) {
                Ok(value) => value,
                Err(err) => return app_error_to_json_rpc(id, err),
            };

            match with_call_timeout(
                state,
                state.provider.team_status(&team_id, framework.as_deref()),
            )
            .await
            {
                Ok(status) => {
                    let text = format!(
                        "Team {} has {} stored insight(s), compliance score {:.2}",
                        status.team_id, status.total_insights, status.compliance_score
                    );
                    let mut structured =
                        serde_json::to_value(&status).expect("team status serialization");
                    if let Some(object) = structured.as_object_mut() {
                        object.insert("generated_at_utc".to_string(), json!(now_utc()));
                    }
                    json_rpc_result(
                        id,
                        serde_json::to_value(tool_result(text, structured))
                            .expect("get_compliance_status tool result serialization"),
                    )
                }
                Err(err) => app_error_to_json_rpc(id, err),
            }
        }
        "automate_compliance_workflow" => {
            let params: AutomateWorkflowParams = match serde_json::from_value(arguments) {
                Ok(value) => value,
                Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
            };

            let request = match build_workflow_request(params) {
                Ok(request) => request,
                Err(err) => return app_error_to_json_rpc(id, err),
            };

            match with_call_timeout(state, state.provider.run_workflow(&request)).await {
                Ok(outcome) => {
                    let text = format!(
                        "Workflow {} ({}) {} for team {}",
                        outcome.automation_id,
                        outcome.workflow_type.as_str(),
                        if outcome.completed {
                            "completed"
                        } else {
                            "blocked"
                        },
                        outcome.team_id
                    );
                    let structured =
                        serde_json::to_value(&outcome).expect("workflow outcome serialization");
                    json_rpc_result(
                        id,
                        serde_json::to_value(tool_result(text, structured))
                            .expect("automate_compliance_workflow tool result serialization"),
                    )
                }
                Err(err) => app_error_to_json_rpc(id, err),
            }
        }
        _ => json_rpc_error_with_data(
            id,
            -32602,
            &format!("Invalid params: unknown tool {}", tool_call.name),
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": {
                    "name": tool_call.name,
                },
            })),
        ),
    }
}

pub fn build_analysis_request(params: AnalyzeDocumentParams) -> Result<AnalysisRequest, AppError> {
    Ok(AnalysisRequest {
        document_content: normalize_document_content(params.document_content)?,
        document_type: normalize_document_type(params.document_type)?,
        frameworks: normalize_frameworks(params.frameworks)?,
    })
}

pub fn build_workflow_request(params: AutomateWorkflowParams) -> Result<WorkflowRequest, AppError> {
    Ok(WorkflowRequest {
        document_content: normalize_document_content(params.document_content)?,
        workflow_type: normalize_workflow_type(params.workflow_type)?,
        team_id: normalize_team_id(params.team_id)?,
    })
}

fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::compliance::{
        AnalysisRequest, ComplianceProvider, ComplianceReport, MemorySnapshot,
        StaticComplianceEngine, StoredInsight, TeamStatus, WorkflowOutcome, WorkflowRequest,
    };
    use crate::errors::AppError;

    use super::*;

    fn state() -> AppState {
        AppState::new(
            None,
            Duration::from_secs(5),
            Arc::new(StaticComplianceEngine::new()),
        )
    }

    #[test]
    fn tool_catalog_order_is_fixed() {
        let tools = build_tools_list();
        let names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "analyze_document",
                "update_memory",
                "get_compliance_status",
                "automate_compliance_workflow",
            ]
        );
    }

    #[test]
    fn analysis_request_applies_defaults() {
        let request = build_analysis_request(AnalyzeDocumentParams {
            document_content: Some("Some contract text".to_string()),
            document_type: None,
            frameworks: None,
        })
        .expect("request should build");

        assert_eq!(request.document_type, "contract");
        assert_eq!(request.frameworks, vec!["gdpr".to_string(), "sox".to_string()]);
    }

    #[test]
    fn workflow_request_rejects_unknown_type() {
        let error = build_workflow_request(AutomateWorkflowParams {
            document_content: Some("text".to_string()),
            workflow_type: Some("escalation".to_string()),
            team_id: Some("team-legal".to_string()),
        })
        .expect_err("expected invalid workflow type");
        assert!(error.to_string().contains("bad request"));
    }

    #[tokio::test]
    async fn unknown_tool_returns_invalid_params() {
        let response = handle_tools_call(
            &state(),
            Some(json!(7)),
            Some(json!({"name": "does_not_exist", "arguments": {}})),
        )
        .await;

        assert_eq!(response["id"], json!(7));
        assert_eq!(response["error"]["code"], json!(-32602));
        assert_eq!(response["error"]["data"]["code"], json!("tool_not_found"));
        assert_eq!(
            response["error"]["data"]["details"]["name"],
            json!("does_not_exist")
        );
    }

    #[tokio::test]
    async fn missing_arguments_default_to_empty_object() {
        // analyze_document with no arguments fails on the missing document,
        // not on envelope shape.
        let response = handle_tools_call(
            &state(),
            Some(json!(8)),
            Some(json!({"name": "analyze_document"})),
        )
        .await;

        assert_eq!(response["error"]["code"], json!(-32602));
        assert_eq!(
            response["error"]["data"]["code"],
            json!("missing_document_content")
        );
    }

    #[tokio::test]
    async fn non_object_arguments_are_invalid_params() {
        let response = handle_tools_call(
            &state(),
            Some(json!(9)),
            Some(json!({"name": "analyze_document", "arguments": "not-an-object"})),
        )
        .await;

        assert_eq!(response["error"]["code"], json!(-32602));
    }

    #[tokio::test]
    async fn analyze_document_returns_report_content() {
        let response = handle_tools_call(
            &state(),
            Some(json!(10)),
            Some(json!({
                "name": "analyze_document",
                "arguments": {
                    "document_content": "This agreement covers widget delivery.",
                    "frameworks": ["gdpr"]
                }
            })),
        )
        .await;

        assert_eq!(response["id"], json!(10));
        assert!(response["result"]["content"][0]["text"].is_string());
        assert_eq!(
            response["result"]["structuredContent"]["frameworks_checked"],
            json!(["gdpr"])
        );
        assert!(response["result"]["structuredContent"]["issues"].is_array());
    }

    #[tokio::test]
    async fn update_memory_then_status_round_trip() {
        let state = state();

        let response = handle_tools_call(
            &state,
            Some(json!(11)),
            Some(json!({
                "name": "update_memory",
                "arguments": {
                    "team_id": "team-legal",
                    "insight": "Retention clause fixed in template"
                }
            })),
        )
        .await;
        assert_eq!(response["result"]["structuredContent"]["success"], json!(true));
        assert_eq!(
            response["result"]["structuredContent"]["category"],
            json!("general")
        );

        let response = handle_tools_call(
            &state,
            Some(json!(12)),
            Some(json!({
                "name": "get_compliance_status",
                "arguments": {"team_id": "team-legal"}
            })),
        )
        .await;
        assert_eq!(
            response["result"]["structuredContent"]["total_insights"],
            json!(1)
        );
    }

    struct StalledProvider;

    #[async_trait]
    impl ComplianceProvider for StalledProvider {
        async fn analyze_document(
            &self,
            _request: &AnalysisRequest,
        ) -> Result<ComplianceReport, AppError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(AppError::internal("unreachable"))
        }

        async fn store_insight(
            &self,
            _team_id: &str,
            _insight: &str,
            _category: &str,
        ) -> Result<StoredInsight, AppError> {
            Err(AppError::internal("unused"))
        }

        async fn team_status(
            &self,
            _team_id: &str,
            _framework: Option<&str>,
        ) -> Result<TeamStatus, AppError> {
            Err(AppError::internal("unused"))
        }

        async fn run_workflow(
            &self,
            _request: &WorkflowRequest,
        ) -> Result<WorkflowOutcome, AppError> {
            Err(AppError::internal("unused"))
        }

        async fn memory_snapshot(&self) -> Result<MemorySnapshot, AppError> {
            Err(AppError::internal("unused"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out_as_internal_error() {
        let state = AppState::new(None, Duration::from_millis(50), Arc::new(StalledProvider));

        let response = handle_tools_call(
            &state,
            Some(json!(13)),
            Some(json!({
                "name": "analyze_document",
                "arguments": {"document_content": "text"}
            })),
        )
        .await;

        assert_eq!(response["error"]["code"], json!(-32603));
        assert_eq!(response["error"]["message"], json!("Internal error"));
    }
}

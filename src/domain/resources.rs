//! Model Context Protocol static resource providers
//!
//! Exposes the compliance framework catalog, legal document templates, and the
//! team-memory snapshot as file-like resources.

use chrono::{SecondsFormat, Utc};
use rust_mcp_sdk::schema::{
    ReadResourceContent, ReadResourceRequestParams, ReadResourceResult, Resource,
    TextResourceContents,
};
use serde_json::{json, Map, Value};

use crate::compliance::FRAMEWORKS;
use crate::domain::tools::with_call_timeout;
use crate::mcp::rpc::{
    app_error_to_json_rpc, json_rpc_error, json_rpc_error_with_data, json_rpc_result,
};
use crate::AppState;

pub const FRAMEWORKS_RESOURCE_URI: &str = "compliance://frameworks";
pub const TEMPLATES_RESOURCE_URI: &str = "compliance://templates";
pub const TEAM_MEMORY_RESOURCE_URI: &str = "memory://team";

pub fn build_resources_list() -> Vec<Resource> {
    vec![
        Resource {
            annotations: None,
            description: Some(
                "Supported compliance frameworks (GDPR, SOX, CCPA, HIPAA)".to_string(),
            ),
            icons: vec![],
            meta: None,
            mime_type: Some("application/json".to_string()),
            name: "Compliance Frameworks".to_string(),
            size: None,
            title: None,
            uri: FRAMEWORKS_RESOURCE_URI.to_string(),
        },
        Resource {
            annotations: None,
            description: Some(
                "Legal document templates and their required sections".to_string(),
            ),
            icons: vec![],
            meta: None,
            mime_type: Some("application/json".to_string()),
            name: "Legal Document Templates".to_string(),
            size: None,
            title: None,
            uri: TEMPLATES_RESOURCE_URI.to_string(),
        },
        Resource {
            annotations: None,
            description: Some(
                "Team-specific compliance insights and historical data".to_string(),
            ),
            icons: vec![],
            meta: None,
            mime_type: Some("application/json".to_string()),
            name: "Team Memory".to_string(),
            size: None,
            title: None,
            uri: TEAM_MEMORY_RESOURCE_URI.to_string(),
        },
    ]
}

pub async fn handle_resources_read(
    state: &AppState,
    id: Option<Value>,
    params: Option<Value>,
) -> Value {
    let Some(raw_params) = params else {
        return json_rpc_error(id, -32602, "Invalid params");
    };

    let resource_read: ReadResourceRequestParams = match serde_json::from_value(raw_params) {
        Ok(value) => value,
        Err(_) => return json_rpc_error(id, -32602, "Invalid params"),
    };

    match resource_read.uri.as_str() {
        FRAMEWORKS_RESOURCE_URI => {
            json_rpc_result(id, read_result(FRAMEWORKS_RESOURCE_URI, frameworks_content()))
        }
        TEMPLATES_RESOURCE_URI => {
            json_rpc_result(id, read_result(TEMPLATES_RESOURCE_URI, templates_content()))
        }
        TEAM_MEMORY_RESOURCE_URI => {
            match with_call_timeout(state, state.provider.memory_snapshot()).await {
                Ok(snapshot) => {
                    let content = json!({
                        "teams": snapshot.teams,
                        "total_insights": snapshot.total_insights,
                        "generated_at_utc": now_utc(),
                    });
                    json_rpc_result(id, read_result(TEAM_MEMORY_RESOURCE_URI, content))
                }
                Err(err) => app_error_to_json_rpc(id, err),
            }
        }
        _ => json_rpc_error_with_data(
            id,
            -32602,
            &format!("Invalid params: unknown resource {}", resource_read.uri),
            Some(json!({
                "code": "resource_not_found",
                "message": "unknown resource uri",
                "details": {
                    "uri": resource_read.uri,
                },
            })),
        ),
    }
}

fn read_result(uri: &str, content: Value) -> Value {
    serde_json::to_value(ReadResourceResult {
        contents: vec![ReadResourceContent::from(TextResourceContents {
            meta: None,
            mime_type: Some("application/json".to_string()),
            text: content.to_string(),
            uri: uri.to_string(),
        })],
        meta: None,
    })
    .expect("read resource result serialization")
}

fn frameworks_content() -> Value {
    let mut frameworks = Map::new();
    for spec in &FRAMEWORKS {
        frameworks.insert(
            spec.key.to_string(),
            json!({
                "name": spec.name,
                "description": spec.description,
                "required_clauses": spec.required_clauses,
                "risk_indicators": spec.risk_indicators,
                "key_requirements": spec.key_requirements,
            }),
        );
    }

    json!({
        "frameworks": frameworks,
        "generated_at_utc": now_utc(),
    })
}

fn templates_content() -> Value {
    json!({
        "templates": {
            "privacy_policy": {
                "name": "Privacy Policy Template",
                "description": "Template for website privacy policies",
                "required_sections": [
                    "Information collection",
                    "Information use",
                    "Information sharing",
                    "Data security",
                    "User rights",
                    "Contact information"
                ]
            },
            "terms_of_service": {
                "name": "Terms of Service Template",
                "description": "Template for website terms of service",
                "required_sections": [
                    "Acceptance of terms",
                    "Use restrictions",
                    "Intellectual property",
                    "Limitation of liability",
                    "Termination",
                    "Governing law"
                ]
            },
            "data_processing_agreement": {
                "name": "Data Processing Agreement Template",
                "description": "Template for GDPR-compliant data processing agreements",
                "required_sections": [
                    "Data processing details",
                    "Data controller obligations",
                    "Data processor obligations",
                    "Data subject rights",
                    "Security measures",
                    "Breach notification"
                ]
            }
        },
        "generated_at_utc": now_utc(),
    })
}

fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use crate::compliance::{ComplianceProvider, StaticComplianceEngine};
    use crate::AppState;

    use super::*;

    fn state() -> AppState {
        AppState::new(
            None,
            Duration::from_secs(5),
            Arc::new(StaticComplianceEngine::new()),
        )
    }

    #[test]
    fn resource_catalog_order_is_fixed() {
        let resources = build_resources_list();
        let uris: Vec<&str> = resources
            .iter()
            .map(|resource| resource.uri.as_str())
            .collect();
        assert_eq!(
            uris,
            vec![
                "compliance://frameworks",
                "compliance://templates",
                "memory://team",
            ]
        );
    }

    #[tokio::test]
    async fn frameworks_resource_echoes_uri_and_lists_catalog() {
        let response = handle_resources_read(
            &state(),
            Some(json!(1)),
            Some(json!({"uri": "compliance://frameworks"})),
        )
        .await;

        assert_eq!(
            response["result"]["contents"][0]["uri"],
            json!("compliance://frameworks")
        );
        assert_eq!(
            response["result"]["contents"][0]["mimeType"],
            json!("application/json")
        );

        let text = response["result"]["contents"][0]["text"]
            .as_str()
            .expect("text content");
        let content: Value = serde_json::from_str(text).expect("valid resource json");
        assert!(content["frameworks"]["gdpr"]["required_clauses"].is_array());
        assert!(content["frameworks"]["hipaa"].is_object());
    }

    #[tokio::test]
    async fn templates_resource_lists_required_sections() {
        let response = handle_resources_read(
            &state(),
            Some(json!(2)),
            Some(json!({"uri": "compliance://templates"})),
        )
        .await;

        let text = response["result"]["contents"][0]["text"]
            .as_str()
            .expect("text content");
        let content: Value = serde_json::from_str(text).expect("valid resource json");
        assert!(content["templates"]["privacy_policy"]["required_sections"].is_array());
    }

    #[tokio::test]
    async fn team_memory_resource_reflects_stored_insights() {
        let engine = Arc::new(StaticComplianceEngine::new());
        engine
            .store_insight("team-legal", "NDA template updated", "general")
            .await
            .expect("store should succeed");
        let state = AppState::new(None, Duration::from_secs(5), engine);

        let response = handle_resources_read(
            &state,
            Some(json!(3)),
            Some(json!({"uri": "memory://team"})),
        )
        .await;

        let text = response["result"]["contents"][0]["text"]
            .as_str()
            .expect("text content");
        let content: Value = serde_json::from_str(text).expect("valid resource json");
        assert_eq!(content["total_insights"], json!(1));
        assert!(content["teams"]["team-legal"].is_array());
    }

    #[tokio::test]
    async fn unknown_uri_returns_invalid_params() {
        let response = handle_resources_read(
            &state(),
            Some(json!(4)),
            Some(json!({"uri": "compliance://unknown"})),
        )
        .await;

        assert_eq!(response["error"]["code"], json!(-32602));
        assert_eq!(
            response["error"]["data"]["code"],
            json!("resource_not_found")
        );
        assert_eq!(
            response["error"]["data"]["details"]["uri"],
            json!("compliance://unknown")
        );
    }

    #[tokio::test]
    async fn missing_uri_is_invalid_params() {
        let response = handle_resources_read(&state(), Some(json!(5)), Some(json!({}))).await;
        assert_eq!(response["error"]["code"], json!(-32602));
    }
}

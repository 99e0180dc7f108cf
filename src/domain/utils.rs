//! Domain-specific shared validations and formatting utilities

use crate::compliance::{framework_spec, WorkflowType, FRAMEWORKS};
use crate::errors::AppError;

pub const DEFAULT_FRAMEWORKS: [&str; 2] = ["gdpr", "sox"];
pub const DEFAULT_DOCUMENT_TYPE: &str = "contract";
pub const DEFAULT_INSIGHT_CATEGORY: &str = "general";

fn framework_list_message() -> String {
    let keys: Vec<&str> = FRAMEWORKS.iter().map(|spec| spec.key).collect();
    format!("framework must be one of: {}", keys.join(", "))
}

pub fn normalize_frameworks(frameworks: Option<Vec<String>>) -> Result<Vec<String>, AppError> {
    let values = frameworks.unwrap_or_default();
    if values.is_empty() {
        return Ok(DEFAULT_FRAMEWORKS.iter().map(ToString::to_string).collect());
    }

    let mut normalized = Vec::new();
    for value in values {
        let framework = value.trim().to_ascii_lowercase();
        if framework.is_empty() || framework_spec(&framework).is_none() {
            return Err(AppError::bad_request(
                "invalid_framework",
                framework_list_message(),
            ));
        }
        if !normalized.contains(&framework) {
            normalized.push(framework);
        }
    }

    Ok(normalized)
}

pub fn normalize_framework_filter(framework: Option<String>) -> Result<Option<String>, AppError> {
    let Some(value) = framework else {
        return Ok(None);
    };

    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized == "all" {
        return Ok(None);
    }

    if framework_spec(&normalized).is_none() {
        return Err(AppError::bad_request(
            "invalid_framework",
            framework_list_message(),
        ));
    }

    Ok(Some(normalized))
}

pub fn normalize_document_content(content: Option<String>) -> Result<String, AppError> {
    content
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "missing_document_content",
                "document_content is required and must not be empty",
            )
        })
}

pub fn normalize_document_type(document_type: Option<String>) -> Result<String, AppError> {
    let Some(value) = document_type else {
        return Ok(DEFAULT_DOCUMENT_TYPE.to_string());
    };

    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Ok(DEFAULT_DOCUMENT_TYPE.to_string());
    }

    if !normalized
        .chars()
        .all(|character| character.is_ascii_alphanumeric() || character == '-' || character == '_')
    {
        return Err(AppError::bad_request(
            "invalid_document_type",
            "document_type must contain only alphanumeric characters, dashes, and underscores",
        ));
    }

    Ok(normalized)
}

pub fn normalize_team_id(team_id: Option<String>) -> Result<String, AppError> {
    let normalized = team_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request("missing_team_id", "team_id is required"))?;

    if !normalized.chars().all(|character| {
        character.is_ascii_alphanumeric()
            || character == '-'
            || character == '_'
            || character == '@'
            || character == ':'
            || character == '.'
    }) {
        return Err(AppError::bad_request(
            "invalid_team_id",
            "team_id must contain only alphanumeric characters, dashes, underscores, dots, @, and :",
        ));
    }

    Ok(normalized)
}

pub fn normalize_insight(insight: Option<String>) -> Result<String, AppError> {
    insight
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::bad_request("missing_insight", "insight is required and must not be empty")
        })
}

pub fn normalize_category(category: Option<String>) -> Result<String, AppError> {
    let Some(value) = category else {
        return Ok(DEFAULT_INSIGHT_CATEGORY.to_string());
    };

    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Ok(DEFAULT_INSIGHT_CATEGORY.to_string());
    }

    if !normalized
        .chars()
        .all(|character| character.is_ascii_alphanumeric() || character == '-' || character == '_')
    {
        return Err(AppError::bad_request(
            "invalid_category",
            "category must contain only alphanumeric characters, dashes, and underscores",
        ));
    }

    Ok(normalized)
}

pub fn normalize_workflow_type(workflow_type: Option<String>) -> Result<WorkflowType, AppError> {
    let normalized = workflow_type
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::bad_request(
                "missing_workflow_type",
                "workflow_type must be one of: review, approval, revision, audit",
            )
        })?;

    match normalized.as_str() {
        "review" => Ok(WorkflowType::Review),
        "approval" => Ok(WorkflowType::Approval),
        "revision" => Ok(WorkflowType::Revision),
        "audit" => Ok(WorkflowType::Audit),
        _ => Err(AppError::bad_request(
            "invalid_workflow_type",
            "workflow_type must be one of: review, approval, revision, audit",
        )),
    }
}

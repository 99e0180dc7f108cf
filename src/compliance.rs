//! Compliance analysis collaborator behind the MCP tool surface.
//!
//! The dispatcher only depends on the [`ComplianceProvider`] trait; the bundled
//! [`StaticComplianceEngine`] performs deterministic clause screening against the
//! built-in framework catalog and keeps team memory in process. A DocumentAI or
//! model-backed engine would implement the same trait.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameworkSpec {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub required_clauses: &'static [&'static str],
    pub risk_indicators: &'static [&'static str],
    pub key_requirements: &'static [&'static str],
}

pub const FRAMEWORKS: [FrameworkSpec; 4] = [
    FrameworkSpec {
        key: "gdpr",
        name: "General Data Protection Regulation",
        description: "EU regulation for data protection and privacy",
        required_clauses: &[
            "data processing purpose",
            "legal basis for processing",
            "data retention period",
            "data subject rights",
            "data protection officer contact",
            "cross-border data transfer safeguards",
            "data breach notification",
            "consent withdrawal mechanism",
        ],
        risk_indicators: &[
            "unclear data processing purposes",
            "missing legal basis",
            "excessive data retention",
            "insufficient data subject rights",
            "unclear consent mechanisms",
        ],
        key_requirements: &[
            "Data minimization",
            "Purpose limitation",
            "Storage limitation",
            "Consent management",
            "Data subject rights",
            "Privacy by design",
        ],
    },
    FrameworkSpec {
        key: "sox",
        name: "Sarbanes-Oxley Act",
        description: "US law for financial reporting and corporate governance",
        required_clauses: &[
            "financial reporting controls",
            "internal control framework",
            "management responsibility",
            "auditor independence",
            "whistleblower protection",
            "document retention policy",
            "conflict of interest disclosure",
        ],
        risk_indicators: &[
            "weak internal controls",
            "insufficient documentation",
            "conflict of interest issues",
            "inadequate audit trails",
        ],
        key_requirements: &[
            "Internal controls",
            "Financial reporting accuracy",
            "Audit trails",
            "Management certification",
            "Whistleblower protection",
        ],
    },
    FrameworkSpec {
        key: "ccpa",
        name: "California Consumer Privacy Act",
        description: "California state law for consumer privacy rights",
        required_clauses: &[
            "personal information collection notice",
            "consumer rights disclosure",
            "opt-out mechanisms",
            "data sale restrictions",
            "non-discrimination policy",
            "authorized agent procedures",
        ],
        risk_indicators: &[
            "unclear data collection practices",
            "missing opt-out mechanisms",
            "insufficient consumer rights information",
        ],
        key_requirements: &[
            "Consumer rights disclosure",
            "Opt-out mechanisms",
            "Data collection transparency",
            "Non-discrimination",
            "Data deletion rights",
        ],
    },
    FrameworkSpec {
        key: "hipaa",
        name: "Health Insurance Portability and Accountability Act",
        description: "US law for healthcare data protection",
        required_clauses: &[
            "privacy notice",
            "minimum necessary standard",
            "patient consent procedures",
            "breach notification",
            "business associate agreements",
            "administrative safeguards",
        ],
        risk_indicators: &[
            "insufficient privacy protections",
            "unclear consent procedures",
            "inadequate breach response",
        ],
        key_requirements: &[
            "Administrative safeguards",
            "Physical safeguards",
            "Technical safeguards",
            "Breach notification",
            "Business associate agreements",
        ],
    },
];

pub fn framework_spec(key: &str) -> Option<&'static FrameworkSpec> {
    FRAMEWORKS.iter().find(|spec| spec.key == key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NeedsReview,
    NonCompliant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Review,
    Approval,
    Revision,
    Audit,
}

impl WorkflowType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Approval => "approval",
            Self::Revision => "revision",
            Self::Audit => "audit",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceIssue {
    pub framework: String,
    pub severity: RiskLevel,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub report_id: String,
    pub status: ComplianceStatus,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub summary: String,
    pub frameworks_checked: Vec<String>,
    pub issues: Vec<ComplianceIssue>,
    pub analyzed_at_utc: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub document_content: String,
    pub document_type: String,
    pub frameworks: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredInsight {
    pub memory_id: String,
    pub team_id: String,
    pub insight: String,
    pub category: String,
    pub recorded_at_utc: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamStatus {
    pub team_id: String,
    pub overall_status: ComplianceStatus,
    pub compliance_score: f64,
    pub total_insights: usize,
    pub last_updated_utc: Option<String>,
    pub recent_insights: Vec<StoredInsight>,
}

#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub document_content: String,
    pub workflow_type: WorkflowType,
    pub team_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub automation_id: String,
    pub workflow_type: WorkflowType,
    pub team_id: String,
    pub completed: bool,
    pub actions_taken: Vec<String>,
    pub next_steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    pub teams: BTreeMap<String, Vec<StoredInsight>>,
    pub total_insights: usize,
}

#[async_trait]
pub trait ComplianceProvider: Send + Sync {
    async fn analyze_document(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ComplianceReport, AppError>;

    async fn store_insight(
        &self,
        team_id: &str,
        insight: &str,
        category: &str,
    ) -> Result<StoredInsight, AppError>;

    async fn team_status(
        &self,
        team_id: &str,
        framework: Option<&str>,
    ) -> Result<TeamStatus, AppError>;

    async fn run_workflow(&self, request: &WorkflowRequest) -> Result<WorkflowOutcome, AppError>;

    async fn memory_snapshot(&self) -> Result<MemorySnapshot, AppError>;
}

const RECENT_INSIGHTS_LIMIT: usize = 5;

#[derive(Debug, Default)]
pub struct StaticComplianceEngine {
    memory: RwLock<BTreeMap<String, Vec<StoredInsight>>>,
    sequence: AtomicU64,
}

impl StaticComplianceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{sequence:06}")
    }

    fn screen_document(
        document_lower: &str,
        frameworks: &[String],
    ) -> Result<(Vec<ComplianceIssue>, usize), AppError> {
        let mut issues = Vec::new();
        let mut clauses_checked = 0;

        for framework in frameworks {
            let Some(spec) = framework_spec(framework) else {
                return Err(AppError::bad_request(
                    "unknown_framework",
                    format!("unknown compliance framework: {framework}"),
                ));
            };

            for (position, clause) in spec.required_clauses.iter().enumerate() {
                clauses_checked += 1;
                if clause_mentioned(document_lower, clause) {
                    continue;
                }

                // The leading clauses of each framework cover its core
                // obligations and weigh heavier when absent.
                let severity = if position < 3 {
                    RiskLevel::High
                } else {
                    RiskLevel::Medium
                };

                issues.push(ComplianceIssue {
                    framework: spec.key.to_string(),
                    severity,
                    description: format!("Missing required clause: {clause}"),
                    recommendation: format!(
                        "Add a clause covering \"{clause}\" to satisfy {}",
                        spec.name
                    ),
                });
            }
        }

        Ok((issues, clauses_checked))
    }

    fn build_report(&self, request: &AnalysisRequest) -> Result<ComplianceReport, AppError> {
        if request.document_content.trim().is_empty() {
            return Err(AppError::bad_request(
                "missing_document_content",
                "document_content must not be empty",
            ));
        }

        let document_lower = request.document_content.to_lowercase();
        let (issues, clauses_checked) = Self::screen_document(&document_lower, &request.frameworks)?;

        let risk_score = if clauses_checked == 0 {
            0.0
        } else {
            issues.len() as f64 / clauses_checked as f64
        };
        let risk_level = risk_level_for_score(risk_score);
        let status = if risk_score > 0.7 {
            ComplianceStatus::NonCompliant
        } else if risk_score > 0.3 || !issues.is_empty() {
            ComplianceStatus::NeedsReview
        } else {
            ComplianceStatus::Compliant
        };

        let summary = executive_summary(request, status, risk_level, risk_score, &issues);

        Ok(ComplianceReport {
            report_id: self.next_id("report"),
            status,
            risk_level,
            risk_score,
            summary,
            frameworks_checked: request.frameworks.clone(),
            issues,
            analyzed_at_utc: now_utc(),
        })
    }
}

#[async_trait]
impl ComplianceProvider for StaticComplianceEngine {
    async fn analyze_document(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ComplianceReport, AppError> {
        self.build_report(request)
    }

    async fn store_insight(
        &self,
        team_id: &str,
        insight: &str,
        category: &str,
    ) -> Result<StoredInsight, AppError> {
        let stored = StoredInsight {
            memory_id: self.next_id("memory"),
            team_id: team_id.to_string(),
            insight: insight.to_string(),
            category: category.to_string(),
            recorded_at_utc: now_utc(),
        };

        let mut memory = self.memory.write().await;
        memory
            .entry(team_id.to_string())
            .or_default()
            .push(stored.clone());

        Ok(stored)
    }

    async fn team_status(
        &self,
        team_id: &str,
        framework: Option<&str>,
    ) -> Result<TeamStatus, AppError> {
        let memory = self.memory.read().await;
        let insights = memory.get(team_id).cloned().unwrap_or_default();

        let filtered: Vec<StoredInsight> = match framework {
            Some(framework) => insights
                .iter()
                .filter(|entry| {
                    entry.category.eq_ignore_ascii_case(framework)
                        || entry.insight.to_lowercase().contains(framework)
                })
                .cloned()
                .collect(),
            None => insights.clone(),
        };

        let issue_count = filtered
            .iter()
            .filter(|entry| matches!(entry.category.as_str(), "issue" | "violation"))
            .count();
        let compliance_score = (1.0 - 0.1 * issue_count as f64).max(0.0);
        let overall_status = if issue_count > 0 {
            ComplianceStatus::NeedsReview
        } else {
            ComplianceStatus::Compliant
        };

        let last_updated_utc = filtered.last().map(|entry| entry.recorded_at_utc.clone());
        let recent_insights = filtered
            .iter()
            .rev()
            .take(RECENT_INSIGHTS_LIMIT)
            .cloned()
            .collect();

        Ok(TeamStatus {
            team_id: team_id.to_string(),
            overall_status,
            compliance_score,
            total_insights: filtered.len(),
            last_updated_utc,
            recent_insights,
        })
    }

    async fn run_workflow(&self, request: &WorkflowRequest) -> Result<WorkflowOutcome, AppError> {
        let report = self.build_report(&AnalysisRequest {
            document_content: request.document_content.clone(),
            document_type: "contract".to_string(),
            frameworks: FRAMEWORKS.iter().map(|spec| spec.key.to_string()).collect(),
        })?;

        let mut actions_taken = vec![
            format!("Screened document against {} frameworks", FRAMEWORKS.len()),
            format!(
                "Generated compliance report {} (risk score {:.2})",
                report.report_id, report.risk_score
            ),
        ];

        let recommendations: Vec<String> = report
            .issues
            .iter()
            .map(|issue| issue.recommendation.clone())
            .collect();

        let (completed, next_steps) = match request.workflow_type {
            WorkflowType::Review => {
                let next_steps = if recommendations.is_empty() {
                    vec!["Schedule the next periodic review".to_string()]
                } else {
                    recommendations.into_iter().take(3).collect()
                };
                (true, next_steps)
            }
            WorkflowType::Approval => {
                let approvable = report.status != ComplianceStatus::NonCompliant
                    && report.risk_level <= RiskLevel::Medium;
                let next_steps = if approvable {
                    vec!["Record approval in the compliance register".to_string()]
                } else {
                    vec![
                        "Approval blocked by outstanding compliance issues".to_string(),
                        "Route the document through a revision workflow".to_string(),
                    ]
                };
                (approvable, next_steps)
            }
            WorkflowType::Revision => {
                let next_steps = if recommendations.is_empty() {
                    vec!["No revisions required".to_string()]
                } else {
                    recommendations
                };
                (true, next_steps)
            }
            WorkflowType::Audit => {
                let insight = format!(
                    "Audit of report {}: {} issue(s), risk score {:.2}",
                    report.report_id,
                    report.issues.len(),
                    report.risk_score
                );
                self.store_insight(&request.team_id, &insight, "audit")
                    .await?;
                actions_taken.push("Recorded audit summary in team memory".to_string());
                (
                    true,
                    vec!["Review the audit trail entry in team memory".to_string()],
                )
            }
        };

        Ok(WorkflowOutcome {
            automation_id: self.next_id("automation"),
            workflow_type: request.workflow_type,
            team_id: request.team_id.clone(),
            completed,
            actions_taken,
            next_steps,
        })
    }

    async fn memory_snapshot(&self) -> Result<MemorySnapshot, AppError> {
        let memory = self.memory.read().await;
        let total_insights = memory.values().map(Vec::len).sum();
        Ok(MemorySnapshot {
            teams: memory.clone(),
            total_insights,
        })
    }
}

fn risk_level_for_score(risk_score: f64) -> RiskLevel {
    if risk_score >= 0.8 {
        RiskLevel::Critical
    } else if risk_score >= 0.6 {
        RiskLevel::High
    } else if risk_score >= 0.3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// A clause counts as mentioned when every significant word of it appears
/// somewhere in the document. Connective words shorter than four characters
/// are ignored.
fn clause_mentioned(document_lower: &str, clause: &str) -> bool {
    clause
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .filter(|word| word.len() > 3)
        .all(|word| document_lower.contains(&word))
}

fn executive_summary(
    request: &AnalysisRequest,
    status: ComplianceStatus,
    risk_level: RiskLevel,
    risk_score: f64,
    issues: &[ComplianceIssue],
) -> String {
    let mut summary = format!(
        "Compliance analysis of {} against {}: {:?}. Risk score {:.2}/1.0 ({:?}). {} issue(s) found.",
        request.document_type,
        request.frameworks.join(", "),
        status,
        risk_score,
        risk_level,
        issues.len()
    );

    let high_or_worse = issues
        .iter()
        .filter(|issue| issue.severity >= RiskLevel::High)
        .count();
    if high_or_worse > 0 {
        summary.push_str(&format!(
            " Immediate attention: {high_or_worse} high-severity clause gap(s)."
        ));
    } else if issues.is_empty() {
        summary.push_str(" Document appears compliant; consider periodic review.");
    }

    summary
}

fn now_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

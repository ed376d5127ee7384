use crate::address::LoadAddress;
use crate::target::BuildTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Per-target status within one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Built,
    Failed,
    /// Left untouched because an earlier target failed, or filtered out by `only`.
    NotAttempted,
}

/// The outcome of one target: its identity, assigned address, and what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub name: String,
    pub ordinal: u64,
    pub address: LoadAddress,
    pub status: BuildStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BuildOutcome {
    pub fn new(target: &BuildTarget, address: LoadAddress, status: BuildStatus) -> Self {
        Self {
            name: target.name.clone(),
            ordinal: target.ordinal,
            address,
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The address plan a batch ran under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInfo {
    pub base: LoadAddress,
    pub step: LoadAddress,
    pub linker: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub targets: u64,
    pub built: u64,
    pub failed: u64,
    pub not_attempted: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

/// Machine-readable record of one batch run (`linkstep.report.v1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    pub plan: PlanInfo,

    #[serde(default)]
    pub results: Vec<BuildOutcome>,

    pub summary: BatchSummary,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// An error that stopped the batch outside of a build (config access, policy block).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub verdict: Verdict,
}

impl BatchReport {
    pub fn new(tool: ToolInfo, plan: PlanInfo) -> Self {
        Self {
            schema: crate::schema::LINKSTEP_REPORT_V1.to_string(),
            tool,
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            plan,
            results: vec![],
            summary: BatchSummary::default(),
            warnings: vec![],
            error: None,
            verdict: Verdict {
                status: VerdictStatus::Pass,
                reasons: vec![],
            },
        }
    }

    /// Recompute the summary and verdict from `results` and `error`.
    pub fn finish(&mut self) {
        let mut summary = BatchSummary {
            targets: self.results.len() as u64,
            ..BatchSummary::default()
        };
        for r in &self.results {
            match r.status {
                BuildStatus::Built => summary.built += 1,
                BuildStatus::Failed => summary.failed += 1,
                BuildStatus::NotAttempted => summary.not_attempted += 1,
            }
        }

        let mut reasons = Vec::new();
        for r in self.results.iter().filter(|r| r.status == BuildStatus::Failed) {
            reasons.push(format!("{} failed to build", r.name));
        }
        if let Some(err) = &self.error {
            reasons.push(err.clone());
        }
        let status = if reasons.is_empty() {
            VerdictStatus::Pass
        } else {
            VerdictStatus::Fail
        };

        self.summary = summary;
        self.verdict = Verdict { status, reasons };
        self.ended_at = Some(Utc::now());
    }

    pub fn failed_target(&self) -> Option<&BuildOutcome> {
        self.results.iter().find(|r| r.status == BuildStatus::Failed)
    }
}

//! Approval threshold configuration and the auto-approval decision.
//!
//! Thresholds resolve in three tiers for a `(template, scene)` pair:
//! custom per-scene threshold, then the template's scene threshold, then the
//! global threshold. The decision itself follows a fixed precedence:
//!
//! | Step | Condition                                   | Outcome              |
//! |------|---------------------------------------------|----------------------|
//! | 1    | scene is in the forced manual review set    | manual               |
//! | 2    | auto-approval disabled for the template     | manual               |
//! | 3    | auto-approval cap already reached           | manual               |
//! | 4    | `score >= effective_threshold`              | approve, else manual |

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_GLOBAL_THRESHOLD: f64 = 0.85;
pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.80;
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.70;
pub const DEFAULT_MAX_AUTO_APPROVALS: u32 = 100;

/// Informational quality checks attached to a fresh configuration.
pub const DEFAULT_QUALITY_CHECKS: &[&str] = &[
    "Lighting Quality",
    "Audio Clarity",
    "Person Position",
    "Background Compliance",
    "Script Accuracy",
];

/// Reviewer id recorded on automatic approvals.
pub const SYSTEM_REVIEWER: &str = "system";

// ---------------------------------------------------------------------------
// ApprovalThreshold
// ---------------------------------------------------------------------------

/// Per-template approval policy, optionally scoped to a manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApprovalThreshold {
    pub id: Option<Uuid>,
    pub template_id: String,
    pub manager_id: Option<String>,
    pub global_threshold: f64,
    /// Template-level default; `None` falls through to `global_threshold`.
    pub scene_threshold: Option<f64>,
    pub quality_threshold: f64,
    pub custom_scene_thresholds: BTreeMap<String, f64>,
    pub require_manual_review: BTreeSet<String>,
    pub auto_approval_enabled: bool,
    pub allow_manual_override: bool,
    pub max_auto_approvals: u32,
    pub required_quality_checks: Vec<String>,
}

impl Default for ApprovalThreshold {
    fn default() -> Self {
        Self {
            id: None,
            template_id: String::new(),
            manager_id: None,
            global_threshold: DEFAULT_GLOBAL_THRESHOLD,
            scene_threshold: Some(DEFAULT_SCENE_THRESHOLD),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            custom_scene_thresholds: BTreeMap::new(),
            require_manual_review: BTreeSet::new(),
            auto_approval_enabled: true,
            allow_manual_override: true,
            max_auto_approvals: DEFAULT_MAX_AUTO_APPROVALS,
            required_quality_checks: DEFAULT_QUALITY_CHECKS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ApprovalThreshold {
    /// Materialise the documented defaults for a template with no stored policy.
    pub fn defaults_for(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            ..Self::default()
        }
    }

    /// The cutoff that applies to `scene_id`.
    pub fn effective_threshold(&self, scene_id: &str) -> f64 {
        self.custom_scene_thresholds
            .get(scene_id)
            .copied()
            .or(self.scene_threshold)
            .unwrap_or(self.global_threshold)
    }

    /// Whether `scene_id` always goes to a human, regardless of score.
    pub fn requires_manual_review(&self, scene_id: &str) -> bool {
        self.require_manual_review.contains(scene_id)
    }

    /// Check ranges and required fields before persisting.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.template_id.trim().is_empty() {
            return Err(CoreError::Validation("Template ID is required".to_string()));
        }
        validate_unit_range(self.global_threshold, "Global threshold")?;
        if let Some(scene) = self.scene_threshold {
            validate_unit_range(scene, "Scene threshold")?;
        }
        validate_unit_range(self.quality_threshold, "Quality threshold")?;
        for (scene_id, value) in &self.custom_scene_thresholds {
            validate_unit_range(*value, &format!("Scene threshold for {scene_id}"))?;
        }
        Ok(())
    }
}

/// Validate that a value falls within `[0.0, 1.0]`.
pub fn validate_unit_range(value: f64, name: &str) -> Result<(), CoreError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between 0.0 and 1.0, got {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why a submission was left for a human.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ManualReason {
    ForcedReview,
    AutoApprovalDisabled,
    AutoApprovalCapReached { max_auto_approvals: u32 },
    BelowThreshold { score: f64, threshold: f64 },
    /// A store needed for the decision could not be read, so the score was
    /// never checked against a trusted policy.
    StoreUnavailable,
}

/// Outcome of the approval precedence chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalDecision {
    AutoApprove { score: f64, threshold: f64 },
    Manual(ManualReason),
}

impl ApprovalDecision {
    pub fn is_auto_approve(&self) -> bool {
        matches!(self, Self::AutoApprove { .. })
    }
}

/// Run the precedence chain for one scene.
///
/// `auto_approvals_used` is the template's current counter value. An
/// `AutoApprove` here is provisional: the caller must still claim a slot
/// atomically and downgrade to [`ManualReason::AutoApprovalCapReached`] if
/// the claim fails.
pub fn decide(
    config: &ApprovalThreshold,
    scene_id: &str,
    score: f64,
    auto_approvals_used: u32,
) -> ApprovalDecision {
    if config.requires_manual_review(scene_id) {
        return ApprovalDecision::Manual(ManualReason::ForcedReview);
    }
    if !config.auto_approval_enabled {
        return ApprovalDecision::Manual(ManualReason::AutoApprovalDisabled);
    }
    if auto_approvals_used >= config.max_auto_approvals {
        return ApprovalDecision::Manual(ManualReason::AutoApprovalCapReached {
            max_auto_approvals: config.max_auto_approvals,
        });
    }

    let threshold = config.effective_threshold(scene_id);
    if score >= threshold {
        ApprovalDecision::AutoApprove { score, threshold }
    } else {
        ApprovalDecision::Manual(ManualReason::BelowThreshold { score, threshold })
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Summary of a manager's threshold configurations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdAnalytics {
    pub total_templates: usize,
    pub auto_approval_enabled: usize,
    pub average_global_threshold: f64,
    pub average_scene_threshold: f64,
    pub threshold_distribution: BTreeMap<&'static str, usize>,
    pub templates_with_manual_review: usize,
}

/// Bucket label for a global threshold.
pub fn threshold_range(threshold: f64) -> &'static str {
    if threshold < 0.6 {
        "low"
    } else if threshold < 0.75 {
        "medium"
    } else if threshold < 0.9 {
        "high"
    } else {
        "very_high"
    }
}

pub fn compute_analytics(thresholds: &[ApprovalThreshold]) -> ThresholdAnalytics {
    let average = |values: Vec<f64>, default: f64| {
        if values.is_empty() {
            default
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };

    let mut threshold_distribution = BTreeMap::new();
    for t in thresholds {
        *threshold_distribution
            .entry(threshold_range(t.global_threshold))
            .or_insert(0) += 1;
    }

    ThresholdAnalytics {
        total_templates: thresholds.len(),
        auto_approval_enabled: thresholds.iter().filter(|t| t.auto_approval_enabled).count(),
        average_global_threshold: average(
            thresholds.iter().map(|t| t.global_threshold).collect(),
            DEFAULT_GLOBAL_THRESHOLD,
        ),
        average_scene_threshold: average(
            thresholds.iter().filter_map(|t| t.scene_threshold).collect(),
            DEFAULT_SCENE_THRESHOLD,
        ),
        threshold_distribution,
        templates_with_manual_review: thresholds
            .iter()
            .filter(|t| !t.require_manual_review.is_empty())
            .count(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

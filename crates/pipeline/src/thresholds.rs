//! Threshold configuration management and resolution.

use std::sync::Arc;

use scenegate_core::approval::{compute_analytics, ApprovalThreshold, ThresholdAnalytics};
use scenegate_db::{AutoApprovalCounter, ThresholdStore};
use serde::Serialize;
use uuid::Uuid;

use crate::error::PipelineError;

/// Resolved policy for a template, optionally narrowed to one scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveThreshold {
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    /// Only present when a scene was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub requires_manual_review: bool,
    pub auto_approval_enabled: bool,
    pub auto_approvals_used: u32,
    pub max_auto_approvals: u32,
    /// `true` when no stored configuration exists and defaults apply.
    pub is_default: bool,
}

#[derive(Clone)]
pub struct ThresholdService {
    store: Arc<dyn ThresholdStore>,
    counter: Arc<dyn AutoApprovalCounter>,
}

impl ThresholdService {
    pub fn new(store: Arc<dyn ThresholdStore>, counter: Arc<dyn AutoApprovalCounter>) -> Self {
        Self { store, counter }
    }

    /// Manager-scoped row, then the template-wide row, then defaults.
    pub async fn resolve(
        &self,
        template_id: &str,
        manager_id: Option<&str>,
    ) -> Result<ApprovalThreshold, PipelineError> {
        if let Some(manager_id) = manager_id {
            if let Some(found) = self.store.find(template_id, Some(manager_id)).await? {
                return Ok(found);
            }
        }
        if let Some(found) = self.store.find(template_id, None).await? {
            return Ok(found);
        }
        tracing::debug!(template_id, "No stored threshold, using defaults");
        Ok(ApprovalThreshold::defaults_for(template_id))
    }

    pub async fn upsert(&self, threshold: ApprovalThreshold) -> Result<ApprovalThreshold, PipelineError> {
        threshold.validate()?;
        let saved = self.store.upsert(&threshold).await?;
        tracing::info!(
            threshold_id = ?saved.id,
            template_id = %saved.template_id,
            manager_id = ?saved.manager_id,
            global_threshold = saved.global_threshold,
            "Approval threshold saved"
        );
        Ok(saved)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), PipelineError> {
        if !self.store.delete(id).await? {
            return Err(PipelineError::not_found("ApprovalThreshold", id));
        }
        tracing::info!(threshold_id = %id, "Approval threshold deleted");
        Ok(())
    }

    pub async fn list_for_manager(&self, manager_id: &str) -> Result<Vec<ApprovalThreshold>, PipelineError> {
        Ok(self.store.list_for_manager(manager_id).await?)
    }

    pub async fn analytics(&self, manager_id: &str) -> Result<ThresholdAnalytics, PipelineError> {
        let thresholds = self.store.list_for_manager(manager_id).await?;
        Ok(compute_analytics(&thresholds))
    }

    pub async fn effective(
        &self,
        template_id: &str,
        scene_id: Option<&str>,
        manager_id: Option<&str>,
    ) -> Result<EffectiveThreshold, PipelineError> {
        let config = self.resolve(template_id, manager_id).await?;
        let used = self.counter.used(template_id).await?;

        Ok(EffectiveThreshold {
            template_id: template_id.to_string(),
            scene_id: scene_id.map(str::to_string),
            threshold: scene_id.map(|s| config.effective_threshold(s)),
            requires_manual_review: scene_id.is_some_and(|s| config.requires_manual_review(s)),
            auto_approval_enabled: config.auto_approval_enabled,
            auto_approvals_used: used,
            max_auto_approvals: config.max_auto_approvals,
            is_default: config.id.is_none(),
        })
    }
}

//! Approval threshold rows.

use std::collections::BTreeMap;

use scenegate_core::approval::ApprovalThreshold;
use scenegate_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::StoreError;

/// A row from the `approval_thresholds` table.
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalThresholdRow {
    pub id: Uuid,
    pub template_id: String,
    pub manager_id: Option<String>,
    pub global_threshold: f64,
    pub scene_threshold: Option<f64>,
    pub quality_threshold: f64,
    pub custom_scene_thresholds: Json<BTreeMap<String, f64>>,
    pub require_manual_review: Vec<String>,
    pub auto_approval_enabled: bool,
    pub allow_manual_override: bool,
    pub max_auto_approvals: i32,
    pub required_quality_checks: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<ApprovalThresholdRow> for ApprovalThreshold {
    type Error = StoreError;

    fn try_from(row: ApprovalThresholdRow) -> Result<Self, Self::Error> {
        let max_auto_approvals = u32::try_from(row.max_auto_approvals).map_err(|_| {
            StoreError::InvalidData(format!(
                "threshold {} has negative max_auto_approvals",
                row.id
            ))
        })?;

        Ok(Self {
            id: Some(row.id),
            template_id: row.template_id,
            manager_id: row.manager_id,
            global_threshold: row.global_threshold,
            scene_threshold: row.scene_threshold,
            quality_threshold: row.quality_threshold,
            custom_scene_thresholds: row.custom_scene_thresholds.0,
            require_manual_review: row.require_manual_review.into_iter().collect(),
            auto_approval_enabled: row.auto_approval_enabled,
            allow_manual_override: row.allow_manual_override,
            max_auto_approvals,
            required_quality_checks: row.required_quality_checks,
        })
    }
}

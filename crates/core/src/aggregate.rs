//! Whole-video aggregation of per-scene comparisons.
//!
//! Scenes are aligned strictly by list position. When the two sides have a
//! different number of scenes only the first `min(len)` pairs are scored and
//! the mismatch is recorded on the result; the overall score is not
//! penalised for it.

use serde::{Deserialize, Serialize};

use crate::grid::{compare_scene, SceneComparison, SceneDescriptor};

/// Score used for every scene and block of a low-confidence result.
pub const DEFAULT_FALLBACK_SCORE: f64 = 0.1;

/// Scene counts on each side when they differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneCountMismatch {
    pub template_scenes: usize,
    pub user_scenes: usize,
}

/// Overall comparison of a submission against a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    /// Arithmetic mean of the scene similarities, `0.0` with no scenes.
    pub overall_score: f64,
    pub scene_comparisons: Vec<SceneComparison>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_count_mismatch: Option<SceneCountMismatch>,
    /// Set when the scores are a fallback rather than a real comparison.
    #[serde(default)]
    pub degraded: bool,
}

impl ComparisonResult {
    /// Build a result from already-aligned scene comparisons.
    ///
    /// Rewrites each `scene_index` to its position in `scenes`.
    pub fn from_scenes(
        mut scenes: Vec<SceneComparison>,
        template_count: usize,
        user_count: usize,
    ) -> Self {
        for (i, scene) in scenes.iter_mut().enumerate() {
            scene.scene_index = i;
        }

        let overall_score = if scenes.is_empty() {
            0.0
        } else {
            scenes.iter().map(|s| s.similarity).sum::<f64>() / scenes.len() as f64
        };

        let scene_count_mismatch = (template_count != user_count).then_some(SceneCountMismatch {
            template_scenes: template_count,
            user_scenes: user_count,
        });

        Self {
            overall_score,
            scene_comparisons: scenes,
            scene_count_mismatch,
            degraded: false,
        }
    }

    /// A documented low-confidence result used when the pipeline fails.
    ///
    /// Carries `min(template_count, user_count)` scenes with every block and
    /// scene set to `score`.
    pub fn low_confidence(template_count: usize, user_count: usize, score: f64) -> Self {
        let scenes = (0..template_count.min(user_count))
            .map(|_| SceneComparison::uniform(score))
            .collect();

        let mut result = Self::from_scenes(scenes, template_count, user_count);
        result.overall_score = score;
        result.degraded = true;
        result
    }

    pub fn scene_count(&self) -> usize {
        self.scene_comparisons.len()
    }
}

/// Compare two embedded videos scene by scene.
pub fn compare_embeddings(
    template_scenes: &[SceneDescriptor],
    user_scenes: &[SceneDescriptor],
) -> ComparisonResult {
    let scenes = template_scenes
        .iter()
        .zip(user_scenes)
        .map(|(t, u)| compare_scene(t, u))
        .collect();
    ComparisonResult::from_scenes(scenes, template_scenes.len(), user_scenes.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

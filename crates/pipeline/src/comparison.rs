//! Layout-to-score comparison service.
//!
//! Embeds both sides scene by scene and hands the descriptors to the pure
//! aggregator. Each scene is embedded completely before it is compared, so
//! a scene result is never built from a partial set of cells. Cancellation
//! is checked between scenes and discards everything computed so far.

use std::sync::Arc;

use scenegate_core::aggregate::{compare_embeddings, ComparisonResult, SceneCountMismatch};
use scenegate_core::grid::{SceneDescriptor, SceneLayout};
use scenegate_core::report::ComparisonReport;
use scenegate_db::{LayoutOwner, LayoutStore, StoreError};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::resilient::ResilientEmbedder;

/// A comparison together with its human-readable report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonOutcome {
    pub result: ComparisonResult,
    pub report: ComparisonReport,
    /// Cells embedded with the fallback vector instead of the provider.
    pub fallback_blocks: usize,
}

impl ComparisonOutcome {
    fn new(result: ComparisonResult, fallback_blocks: usize) -> Self {
        let report = ComparisonReport::from_result(&result);
        Self {
            result,
            report,
            fallback_blocks,
        }
    }
}

#[derive(Clone)]
pub struct ComparisonService {
    embedder: ResilientEmbedder,
    layouts: Arc<dyn LayoutStore>,
    fallback_score: f64,
}

impl ComparisonService {
    pub fn new(embedder: ResilientEmbedder, layouts: Arc<dyn LayoutStore>, fallback_score: f64) -> Self {
        Self {
            embedder,
            layouts,
            fallback_score,
        }
    }

    pub fn fallback_score(&self) -> f64 {
        self.fallback_score
    }

    /// Compare two explicit layout lists.
    pub async fn compare_layouts(
        &self,
        template: &[SceneLayout],
        submitted: &[SceneLayout],
        cancel: &CancellationToken,
    ) -> Result<ComparisonOutcome, PipelineError> {
        if template.len() != submitted.len() {
            tracing::warn!(
                template_scenes = template.len(),
                user_scenes = submitted.len(),
                "Scene count mismatch, scoring only the aligned prefix"
            );
        }

        // Scenes past the shorter side are never scored, so skip embedding them.
        let aligned = template.len().min(submitted.len());
        let mut template_scenes: Vec<SceneDescriptor> = Vec::with_capacity(aligned);
        let mut user_scenes: Vec<SceneDescriptor> = Vec::with_capacity(aligned);
        let mut fallback_blocks = 0;

        for (index, (t, s)) in template.iter().zip(submitted).enumerate() {
            let (t_scene, s_scene) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
                pair = async {
                    tokio::join!(self.embedder.embed_layout(t), self.embedder.embed_layout(s))
                } => pair,
            };

            fallback_blocks += t_scene.fallback_blocks + s_scene.fallback_blocks;
            tracing::debug!(scene_index = index, "Scene embedded");
            template_scenes.push(t_scene.descriptor);
            user_scenes.push(s_scene.descriptor);
        }

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut result = compare_embeddings(&template_scenes, &user_scenes);
        // Report the original counts, not the embedded prefix.
        if template.len() != submitted.len() {
            result.scene_count_mismatch = Some(SceneCountMismatch {
                template_scenes: template.len(),
                user_scenes: submitted.len(),
            });
        }
        if fallback_blocks > 0 {
            tracing::warn!(fallback_blocks, "Comparison used fallback vectors");
            result.degraded = true;
        }

        for scene in &result.scene_comparisons {
            for diag in &scene.diagnostics {
                tracing::debug!(
                    scene_index = scene.scene_index,
                    block = %diag.block,
                    issue = ?diag.issue,
                    "Block not scored"
                );
            }
        }

        Ok(ComparisonOutcome::new(result, fallback_blocks))
    }

    /// Compare the stored layouts of a template and a submitted video.
    ///
    /// Missing layouts are a `NotFound`. Any other store failure degrades to
    /// a low-confidence result instead of an error.
    pub async fn compare_stored(
        &self,
        template_id: &str,
        video_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ComparisonOutcome, PipelineError> {
        let template = self.load(LayoutOwner::Template, template_id).await;
        let video = self.load(LayoutOwner::Video, video_id).await;

        match (template, video) {
            (Ok(Some(t)), Ok(Some(v))) => self.compare_layouts(&t, &v, cancel).await,
            (Ok(None), _) => Err(PipelineError::not_found("TemplateLayout", template_id)),
            (_, Ok(None)) => Err(PipelineError::not_found("VideoLayout", video_id)),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(
                    error = %err,
                    template_id,
                    video_id,
                    "Layout store unavailable, returning low-confidence result"
                );
                Ok(self.low_confidence(0, 0))
            }
        }
    }

    /// The documented fallback result for a failed comparison.
    pub fn low_confidence(&self, template_count: usize, user_count: usize) -> ComparisonOutcome {
        ComparisonOutcome::new(
            ComparisonResult::low_confidence(template_count, user_count, self.fallback_score),
            0,
        )
    }

    async fn load(&self, owner: LayoutOwner, id: &str) -> Result<Option<Vec<SceneLayout>>, StoreError> {
        self.layouts.get_layouts(owner, id).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use scenegate_db::MemoryStore;

    use super::*;
    use crate::test_support::{embedder, uniform};

    fn service(store: Arc<MemoryStore>) -> ComparisonService {
        ComparisonService::new(embedder(), store, 0.1)
    }

    // -- compare_layouts -----------------------------------------------------

    #[tokio::test]
    async fn identical_layouts_score_one() {
        let svc = service(Arc::new(MemoryStore::new()));
        let scenes = vec![uniform("red"), uniform("green")];
        let outcome = svc
            .compare_layouts(&scenes, &scenes, &CancellationToken::new())
            .await
            .unwrap();
        assert!((outcome.result.overall_score - 1.0).abs() < 1e-9);
        assert!(!outcome.result.degraded);
        assert_eq!(outcome.fallback_blocks, 0);
    }

    #[tokio::test]
    async fn opposite_layouts_score_zero_and_orthogonal_half() {
        let svc = service(Arc::new(MemoryStore::new()));
        let cancel = CancellationToken::new();

        let opposite = svc
            .compare_layouts(&[uniform("red")], &[uniform("-red")], &cancel)
            .await
            .unwrap();
        assert!(opposite.result.overall_score.abs() < 1e-9);

        let orthogonal = svc
            .compare_layouts(&[uniform("red")], &[uniform("blue")], &cancel)
            .await
            .unwrap();
        assert!((orthogonal.result.overall_score - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn mismatched_scene_counts_keep_original_totals() {
        let svc = service(Arc::new(MemoryStore::new()));
        let template = vec![uniform("red"); 3];
        let user = vec![uniform("red"); 5];
        let outcome = svc
            .compare_layouts(&template, &user, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.result.scene_count(), 3);
        let mismatch = outcome.result.scene_count_mismatch.unwrap();
        assert_eq!((mismatch.template_scenes, mismatch.user_scenes), (3, 5));
    }

    #[tokio::test]
    async fn provider_failure_marks_result_degraded() {
        let svc = service(Arc::new(MemoryStore::new()));
        let outcome = svc
            .compare_layouts(&[uniform("mystery")], &[uniform("mystery")], &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.result.degraded);
        assert_eq!(outcome.fallback_blocks, 18);
        // Same text yields the same fallback vector on both sides.
        assert!((outcome.result.overall_score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn cancelled_comparison_returns_nothing() {
        let svc = service(Arc::new(MemoryStore::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = svc
            .compare_layouts(&[uniform("red")], &[uniform("red")], &cancel)
            .await;
        assert_matches!(result, Err(PipelineError::Cancelled));
    }

    // -- compare_stored ------------------------------------------------------

    #[tokio::test]
    async fn stored_layouts_are_compared() {
        let store = Arc::new(MemoryStore::new());
        store
            .put_layouts(LayoutOwner::Template, "t1", &[uniform("red")])
            .await
            .unwrap();
        store
            .put_layouts(LayoutOwner::Video, "v1", &[uniform("red")])
            .await
            .unwrap();

        let outcome = service(store)
            .compare_stored("t1", "v1", &CancellationToken::new())
            .await
            .unwrap();
        assert!((outcome.result.overall_score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_stored_layout_is_not_found() {
        let svc = service(Arc::new(MemoryStore::new()));
        let result = svc
            .compare_stored("t1", "v1", &CancellationToken::new())
            .await;
        assert_matches!(
            result,
            Err(PipelineError::Core(scenegate_core::error::CoreError::NotFound { .. }))
        );
    }

    #[test]
    fn low_confidence_uses_configured_score() {
        let svc = service(Arc::new(MemoryStore::new()));
        let outcome = svc.low_confidence(2, 2);
        assert!(outcome.result.degraded);
        assert_eq!(outcome.result.overall_score, 0.1);
        assert_eq!(outcome.result.scene_count(), 2);
    }
}

//! Reviewer suggestions for submissions that were not auto-approved.
//!
//! An optional [`SuggestionProvider`] (typically a language model) returns a
//! JSON reply that is parsed into the tagged [`ReviewReply`] shape. Without a
//! provider, or when it fails, suggestions are derived from the weakest grid
//! cells of the scene comparison.

use async_trait::async_trait;
use scenegate_core::grid::{BlockIssue, GridBlockKey, SceneComparison, SceneLayout};
use serde::{Deserialize, Serialize};

use crate::embedding::ProviderError;

/// Suggestions kept per submission.
pub const MAX_SUGGESTIONS: usize = 5;

/// What the provider is asked to review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest<'a> {
    pub scene_number: i32,
    pub similarity: f64,
    pub threshold: f64,
    pub template: &'a SceneLayout,
    pub submitted: &'a SceneLayout,
}

#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Return the raw reply text for `request`.
    async fn review(&self, request: &ReviewRequest<'_>) -> Result<String, ProviderError>;
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// A provider's structured verdict on a scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewReply {
    Scored {
        /// Match score on a 0-100 scale, clamped on parse.
        score: f64,
        #[serde(default)]
        suggestions: Vec<String>,
    },
    Declined {
        reason: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ReplyParseError {
    #[error("reply contains no JSON object")]
    NoJson,

    #[error("reply JSON does not match a known shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Parse a provider reply, tolerating prose and Markdown fences around the
/// JSON object.
pub fn parse_review_reply(raw: &str) -> Result<ReviewReply, ReplyParseError> {
    let start = raw.find('{').ok_or(ReplyParseError::NoJson)?;
    let end = raw.rfind('}').ok_or(ReplyParseError::NoJson)?;
    if end < start {
        return Err(ReplyParseError::NoJson);
    }

    let mut reply: ReviewReply = serde_json::from_str(&raw[start..=end])?;
    if let ReviewReply::Scored { score, suggestions } = &mut reply {
        *score = if score.is_finite() { score.clamp(0.0, 100.0) } else { 0.0 };
        suggestions.retain(|s| !s.trim().is_empty());
        suggestions.truncate(MAX_SUGGESTIONS);
    }
    Ok(reply)
}

// ---------------------------------------------------------------------------
// Derived suggestions
// ---------------------------------------------------------------------------

fn position_name(key: GridBlockKey) -> &'static str {
    match (key.row(), key.col()) {
        (0, 0) => "top-left",
        (0, 1) => "top-centre",
        (0, 2) => "top-right",
        (1, 0) => "middle-left",
        (1, 1) => "centre",
        (1, 2) => "middle-right",
        (2, 0) => "bottom-left",
        (2, 1) => "bottom-centre",
        _ => "bottom-right",
    }
}

/// Suggestions from the cells that fall short of `threshold`, worst first.
pub fn derive_suggestions(
    scene: &SceneComparison,
    threshold: f64,
    template: Option<&SceneLayout>,
) -> Vec<String> {
    let expected = |key: GridBlockKey| {
        template
            .and_then(|t| t.blocks().get(&key))
            .map(|text| format!(" Expected: {text}"))
            .unwrap_or_default()
    };

    let mut out: Vec<String> = scene
        .diagnostics
        .iter()
        .filter_map(|d| match d.issue {
            BlockIssue::MissingInSubmission => Some(format!(
                "Add content to the {} area of the frame.{}",
                position_name(d.block),
                expected(d.block)
            )),
            BlockIssue::DimensionMismatch => Some(format!(
                "The {} area could not be compared; please re-record the scene.",
                position_name(d.block)
            )),
            BlockIssue::MissingInTemplate | BlockIssue::MissingInBoth => None,
        })
        .collect();

    let mut weak = scene.scored_blocks();
    weak.reverse();
    out.extend(
        weak.into_iter()
            .filter(|(_, score)| *score < threshold)
            .map(|(key, score)| {
                format!(
                    "The {} area differs from the template (similarity {:.2}).{}",
                    position_name(key),
                    score,
                    expected(key)
                )
            }),
    );

    out.truncate(MAX_SUGGESTIONS);
    out
}

/// Ask the provider if there is one, falling back to derived suggestions.
pub async fn suggest(
    provider: Option<&dyn SuggestionProvider>,
    request: &ReviewRequest<'_>,
    scene: &SceneComparison,
) -> Vec<String> {
    let derived = || derive_suggestions(scene, request.threshold, Some(request.template));

    let Some(provider) = provider else {
        return derived();
    };

    match provider.review(request).await {
        Ok(raw) => match parse_review_reply(&raw) {
            Ok(ReviewReply::Scored { score, suggestions }) => {
                tracing::debug!(scene_number = request.scene_number, score, "Provider review received");
                if suggestions.is_empty() {
                    derived()
                } else {
                    suggestions
                }
            }
            Ok(ReviewReply::Declined { reason }) => {
                tracing::info!(scene_number = request.scene_number, %reason, "Provider declined review");
                derived()
            }
            Err(err) => {
                tracing::warn!(scene_number = request.scene_number, error = %err, "Unparseable review reply");
                Vec::new()
            }
        },
        Err(err) => {
            tracing::warn!(scene_number = request.scene_number, error = %err, "Suggestion provider failed");
            derived()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

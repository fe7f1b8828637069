//! Human-readable summary of a [`ComparisonResult`].

use serde::{Deserialize, Serialize};

use crate::aggregate::ComparisonResult;
use crate::grid::GridBlockKey;

/// Qualitative band for a unit-scale score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Excellent,
    Good,
    Moderate,
    Poor,
    VeryPoor,
}

impl MatchQuality {
    pub fn classify(score: f64) -> Self {
        if score >= 0.8 {
            Self::Excellent
        } else if score >= 0.6 {
            Self::Good
        } else if score >= 0.4 {
            Self::Moderate
        } else if score >= 0.2 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }
}

/// Overall guidance for the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    FollowsTemplate,
    PartiallyFollows,
    MajorRevision,
}

impl Recommendation {
    pub fn for_score(score: f64) -> Self {
        if score >= 0.7 {
            Self::FollowsTemplate
        } else if score >= 0.5 {
            Self::PartiallyFollows
        } else {
            Self::MajorRevision
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::FollowsTemplate => "Video follows the template structure well.",
            Self::PartiallyFollows => {
                "Video partially follows the template. Consider reviewing the weaker scenes."
            }
            Self::MajorRevision => "Video deviates significantly from the template. Major revision recommended.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockScore {
    pub block: GridBlockKey,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneReport {
    /// 1-based scene number.
    pub scene_number: usize,
    pub similarity: f64,
    pub quality: MatchQuality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_block: Option<BlockScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_block: Option<BlockScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub overall_score: f64,
    pub quality: MatchQuality,
    pub recommendation: Recommendation,
    pub message: String,
    pub degraded: bool,
    pub scenes: Vec<SceneReport>,
}

impl ComparisonReport {
    pub fn from_result(result: &ComparisonResult) -> Self {
        let scenes = result
            .scene_comparisons
            .iter()
            .map(|scene| {
                let scored = scene.scored_blocks();
                let to_block = |(block, score): &(GridBlockKey, f64)| BlockScore {
                    block: *block,
                    score: *score,
                };
                SceneReport {
                    scene_number: scene.scene_index + 1,
                    similarity: scene.similarity,
                    quality: MatchQuality::classify(scene.similarity),
                    best_block: scored.first().map(to_block),
                    worst_block: scored.last().map(to_block),
                }
            })
            .collect();

        let recommendation = Recommendation::for_score(result.overall_score);
        Self {
            overall_score: result.overall_score,
            quality: MatchQuality::classify(result.overall_score),
            recommendation,
            message: recommendation.message().to_string(),
            degraded: result.degraded,
            scenes,
        }
    }
}

//! 3x3 grid block addressing and per-scene block comparison.
//!
//! Every scene is described by up to nine cells. [`compare_scene`] always
//! reports all nine cells, but only cells present on both sides feed the
//! scene average, so sparse coverage is not mistaken for a mismatch.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::similarity::{similarity, ContentVector};

// ---------------------------------------------------------------------------
// GridBlockKey
// ---------------------------------------------------------------------------

/// Number of rows (and columns) in the scene grid.
pub const GRID_SIZE: u8 = 3;

/// A grid cell address. Canonical string form is `"row_col"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridBlockKey {
    row: u8,
    col: u8,
}

impl GridBlockKey {
    /// The nine canonical keys in row-major order.
    pub const ALL: [GridBlockKey; 9] = [
        GridBlockKey { row: 0, col: 0 },
        GridBlockKey { row: 0, col: 1 },
        GridBlockKey { row: 0, col: 2 },
        GridBlockKey { row: 1, col: 0 },
        GridBlockKey { row: 1, col: 1 },
        GridBlockKey { row: 1, col: 2 },
        GridBlockKey { row: 2, col: 0 },
        GridBlockKey { row: 2, col: 1 },
        GridBlockKey { row: 2, col: 2 },
    ];

    pub fn new(row: u8, col: u8) -> Result<Self, CoreError> {
        if row >= GRID_SIZE || col >= GRID_SIZE {
            return Err(CoreError::Validation(format!(
                "Grid block ({row}, {col}) is outside the {GRID_SIZE}x{GRID_SIZE} grid"
            )));
        }
        Ok(Self { row, col })
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }
}

impl fmt::Display for GridBlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.row, self.col)
    }
}

impl FromStr for GridBlockKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::Validation(format!("Invalid grid block key '{s}'"));
        let (row, col) = s.split_once('_').ok_or_else(invalid)?;
        let row: u8 = row.parse().map_err(|_| invalid())?;
        let col: u8 = col.parse().map_err(|_| invalid())?;
        Self::new(row, col)
    }
}

impl TryFrom<String> for GridBlockKey {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<GridBlockKey> for String {
    fn from(key: GridBlockKey) -> Self {
        key.to_string()
    }
}

// ---------------------------------------------------------------------------
// Scene descriptors
// ---------------------------------------------------------------------------

/// Embedded scene: grid cell to content vector. Not every cell is present.
pub type SceneDescriptor = BTreeMap<GridBlockKey, ContentVector>;

/// Pre-embedding scene: grid cell to description text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneLayout(BTreeMap<GridBlockKey, String>);

impl SceneLayout {
    pub fn new(blocks: BTreeMap<GridBlockKey, String>) -> Self {
        Self(blocks)
    }

    /// Fill all nine cells with the same description.
    ///
    /// Used for template scenes that only carry a script line.
    pub fn uniform(text: impl Into<String>) -> Self {
        let text = text.into();
        Self(
            GridBlockKey::ALL
                .iter()
                .map(|key| (*key, text.clone()))
                .collect(),
        )
    }

    pub fn blocks(&self) -> &BTreeMap<GridBlockKey, String> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Block outcomes
// ---------------------------------------------------------------------------

/// Why a cell did not contribute a real score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockIssue {
    MissingInTemplate,
    MissingInSubmission,
    MissingInBoth,
    DimensionMismatch,
}

/// A non-scored cell, reported for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDiagnostic {
    pub block: GridBlockKey,
    pub issue: BlockIssue,
}

/// Result of scoring a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockOutcome {
    /// Both sides present and comparable.
    Scored(f64),
    /// Both sides present but dimensions differ. Scores `0.0` and still
    /// counts toward the average.
    Mismatched,
    /// At least one side absent. Scores `0.0`, excluded from the average.
    Missing(BlockIssue),
}

impl BlockOutcome {
    pub fn score(&self) -> f64 {
        match self {
            Self::Scored(s) => *s,
            Self::Mismatched | Self::Missing(_) => 0.0,
        }
    }

    pub fn counts_toward_average(&self) -> bool {
        !matches!(self, Self::Missing(_))
    }

    pub fn issue(&self) -> Option<BlockIssue> {
        match self {
            Self::Scored(_) => None,
            Self::Mismatched => Some(BlockIssue::DimensionMismatch),
            Self::Missing(issue) => Some(*issue),
        }
    }
}

/// Score one cell from its (optional) template and submitted vectors.
pub fn score_block(template: Option<&ContentVector>, submitted: Option<&ContentVector>) -> BlockOutcome {
    match (template, submitted) {
        (Some(t), Some(s)) => match similarity(t, s) {
            Ok(score) => BlockOutcome::Scored(score),
            Err(_) => BlockOutcome::Mismatched,
        },
        (None, Some(_)) => BlockOutcome::Missing(BlockIssue::MissingInTemplate),
        (Some(_), None) => BlockOutcome::Missing(BlockIssue::MissingInSubmission),
        (None, None) => BlockOutcome::Missing(BlockIssue::MissingInBoth),
    }
}

// ---------------------------------------------------------------------------
// SceneComparison
// ---------------------------------------------------------------------------

/// Comparison of one aligned scene pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneComparison {
    /// Aligned position; set by the aggregator.
    pub scene_index: usize,
    /// Mean over cells present on both sides, `0.0` if there are none.
    pub similarity: f64,
    /// Always exactly nine entries.
    pub block_scores: BTreeMap<GridBlockKey, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<BlockDiagnostic>,
}

impl SceneComparison {
    /// Fold nine cell outcomes into a scene result.
    ///
    /// Cells absent from `outcomes` are treated as missing on both sides.
    pub fn from_outcomes(outcomes: &BTreeMap<GridBlockKey, BlockOutcome>) -> Self {
        let mut block_scores = BTreeMap::new();
        let mut diagnostics = Vec::new();
        let mut total = 0.0;
        let mut counted = 0usize;

        for key in GridBlockKey::ALL {
            let outcome = outcomes
                .get(&key)
                .copied()
                .unwrap_or(BlockOutcome::Missing(BlockIssue::MissingInBoth));

            block_scores.insert(key, outcome.score());
            if outcome.counts_toward_average() {
                total += outcome.score();
                counted += 1;
            }
            if let Some(issue) = outcome.issue() {
                diagnostics.push(BlockDiagnostic { block: key, issue });
            }
        }

        let similarity = if counted > 0 {
            total / counted as f64
        } else {
            0.0
        };

        Self {
            scene_index: 0,
            similarity,
            block_scores,
            diagnostics,
        }
    }

    /// A scene with every cell and the average set to `score`.
    pub fn uniform(score: f64) -> Self {
        Self {
            scene_index: 0,
            similarity: score,
            block_scores: GridBlockKey::ALL.iter().map(|k| (*k, score)).collect(),
            diagnostics: Vec::new(),
        }
    }

    /// Cells that were actually scored, best first.
    pub fn scored_blocks(&self) -> Vec<(GridBlockKey, f64)> {
        let unscored: Vec<GridBlockKey> = self.diagnostics.iter().map(|d| d.block).collect();
        let mut scored: Vec<(GridBlockKey, f64)> = self
            .block_scores
            .iter()
            .filter(|(key, _)| !unscored.contains(key))
            .map(|(key, score)| (*key, *score))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }
}

/// Compare a template scene against a submitted scene, cell by cell.
///
/// `scene_index` on the result is `0`; the aggregator overwrites it.
pub fn compare_scene(template: &SceneDescriptor, submitted: &SceneDescriptor) -> SceneComparison {
    let outcomes: BTreeMap<GridBlockKey, BlockOutcome> = GridBlockKey::ALL
        .iter()
        .map(|key| (*key, score_block(template.get(key), submitted.get(key))))
        .collect();
    SceneComparison::from_outcomes(&outcomes)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

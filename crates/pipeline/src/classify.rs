use crate::error::PipelineError;
use crate::tensor::{ElementType, floats_from_ne_bytes};
use std::sync::LazyLock;

/// Maximum number of entries kept in a ranking.
pub const TOP_K: usize = 5;

/// Step between adjacent dequantization table entries.
pub const DEQUANT_STEP: f32 = 1.0 / 256.0;

/// Precomputed 256-entry dequantization table: `table[i] = i * DEQUANT_STEP`.
static DEQUANT_TABLE: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut table = [0.0f32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = i as f32 * DEQUANT_STEP;
    }
    table
});

/// Quantization parameters for a model output buffer.
#[derive(Debug, Clone, Copy)]
pub struct OutputQuant {
    pub scale: f32,
    pub offset: f32,
}

impl Default for OutputQuant {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

/// A label paired with its confidence score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f32,
}

/// An ordered label-to-score mapping, insertion order = descending
/// confidence.
#[derive(Debug, Clone, Default)]
pub struct Ranking(Vec<ScoredLabel>);

impl Ranking {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[ScoredLabel] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredLabel> {
        self.0.iter()
    }

    /// Keep only the first `k` (highest-scoring) entries.
    pub fn top_k(mut self, k: usize) -> Ranking {
        self.0.truncate(k);
        self
    }

    /// Normalize scores into a probability-like distribution.
    ///
    /// The maximum score is subtracted before exponentiating so large
    /// magnitudes cannot overflow. An empty ranking stays empty; a non-empty
    /// result sums to 1 within floating-point tolerance.
    pub fn softmax(self) -> Ranking {
        if self.0.is_empty() {
            return self;
        }

        let max = self
            .0
            .iter()
            .map(|entry| entry.score)
            .fold(f32::NEG_INFINITY, f32::max);

        let mut exps: Vec<f32> = self
            .0
            .iter()
            .map(|entry| (entry.score - max).exp())
            .collect();
        let sum: f32 = exps.iter().sum();

        let entries = self
            .0
            .into_iter()
            .zip(exps.drain(..))
            .map(|(entry, exp)| ScoredLabel {
                label: entry.label,
                score: exp / sum,
            })
            .collect();

        Ranking(entries)
    }
}

impl IntoIterator for Ranking {
    type Item = ScoredLabel;
    type IntoIter = std::vec::IntoIter<ScoredLabel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Decode a raw model output buffer into per-class scores, index-aligned
/// with the label list.
///
/// `Uint8` values map through the dequantization table: the index is
/// `round((v - offset) / scale)` clamped to the table range. `Float32`
/// buffers are reinterpreted as native-endian floats and calibrated with
/// `(v * 2 - offset) / scale`.
pub fn decode_output(
    bytes: &[u8],
    element_type: ElementType,
    quant: OutputQuant,
    class_count: usize,
) -> Result<Vec<f32>, PipelineError> {
    match element_type {
        ElementType::Uint8 => {
            if bytes.len() != class_count {
                return Err(PipelineError::SizeMismatch {
                    expected: class_count,
                    actual: bytes.len(),
                });
            }
            Ok(bytes
                .iter()
                .map(|&v| {
                    let index = ((v as f32 - quant.offset) / quant.scale)
                        .round()
                        .clamp(0.0, 255.0) as usize;
                    DEQUANT_TABLE[index]
                })
                .collect())
        }
        ElementType::Float32 => {
            if bytes.len() != class_count * 4 {
                return Err(PipelineError::SizeMismatch {
                    expected: class_count * 4,
                    actual: bytes.len(),
                });
            }
            Ok(floats_from_ne_bytes(bytes)?
                .into_iter()
                .map(|v| (v * 2.0 - quant.offset) / quant.scale)
                .collect())
        }
    }
}

/// Pair scores with their index-aligned labels, drop entries below
/// `threshold`, and sort descending by score.
///
/// The sort is stable: equal scores keep their original index order.
pub fn rank(scores: &[f32], labels: &[String], threshold: f32) -> Ranking {
    let mut entries: Vec<ScoredLabel> = scores
        .iter()
        .zip(labels)
        .filter(|(score, _)| **score >= threshold)
        .map(|(score, label)| ScoredLabel {
            label: label.clone(),
            score: *score,
        })
        .collect();

    entries.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ranking(entries)
}

//! Exact nearest-neighbour search over squared Euclidean distance.
//!
//! Rows are addressed by their insertion position `0..len`. The index is
//! built once from a full set of vectors and never mutated afterwards.

use crate::error::IndexError;

/// Position reported for a result slot that has no backing row.
pub const ABSENT_POSITION: i64 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dimension: usize,
    rows: Vec<f32>,
}

/// Parallel, ascending-distance result columns of a [`FlatL2Index::search`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub distances: Vec<f32>,
    pub positions: Vec<i64>,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f32, i64)> + '_ {
        self.distances
            .iter()
            .copied()
            .zip(self.positions.iter().copied())
    }
}

impl FlatL2Index {
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        let first = vectors.first().ok_or(IndexError::Empty)?;
        let dimension = first.len();
        if dimension == 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }

        let mut rows = Vec::with_capacity(dimension * vectors.len());
        for vector in vectors {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    found: vector.len(),
                });
            }
            rows.extend_from_slice(vector);
        }

        Ok(Self { dimension, rows })
    }

    pub(crate) fn from_raw(dimension: usize, rows: Vec<f32>) -> Result<Self, IndexError> {
        if dimension == 0 || rows.len() % dimension != 0 {
            return Err(IndexError::Corrupt(format!(
                "{} floats cannot be split into rows of dimension {dimension}",
                rows.len()
            )));
        }
        Ok(Self { dimension, rows })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.rows.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn raw_rows(&self) -> &[f32] {
        &self.rows
    }

    /// Returns up to `k` rows closest to `query`, nearest first. Equal
    /// distances keep ascending position order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchHits, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }

        let mut scored = self
            .rows
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| (squared_l2(row, query), position))
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| left.0.total_cmp(&right.0).then(left.1.cmp(&right.1)));
        scored.truncate(k);

        Ok(SearchHits {
            distances: scored.iter().map(|(distance, _)| *distance).collect(),
            positions: scored
                .iter()
                .map(|(_, position)| i64::try_from(*position).unwrap_or(ABSENT_POSITION))
                .collect(),
        })
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| {
            let delta = a - b;
            delta * delta
        })
        .sum()
}

/**
 * SparseReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use tracing::debug;

use crate::error::{RecoError, Result};
use crate::matrix::InteractionMatrix;
use crate::types::{by_score_descending, RawId, ScoredIndex, SimilarItem};

/// Cosine similarity of the given item to every item of the matrix, indexed by item index.
///
/// Dot products are accumulated sparsely: for every user of the query item, we walk over the
/// items of that user. Only the result vector is dense, its size is bounded by the number of
/// items. Items with an all-zero vector have similarity zero to everything.
pub fn cosine_similarities(matrix: &InteractionMatrix, item_index: usize) -> Vec<f64> {

    let mut similarities = vec![0.0; matrix.num_items()];

    let norm = matrix.item_norm(item_index);
    if norm == 0.0 {
        return similarities;
    }

    for (user_index, weight) in matrix.item_vector(item_index) {
        for (other_item_index, other_weight) in matrix.user_vector(user_index) {
            similarities[other_item_index] += weight * other_weight;
        }
    }

    for (other_item_index, similarity) in similarities.iter_mut().enumerate() {
        let other_norm = matrix.item_norm(other_item_index);
        *similarity = if other_norm == 0.0 { 0.0 } else { *similarity / (norm * other_norm) };
    }

    similarities
}

/// Cosine similarity of two sparse vectors given as (index, value) entries sorted by index.
pub fn cosine(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {

    let norm_a = a.iter().map(|(_, value)| value * value).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|(_, value)| value * value).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let mut dot = 0.0;
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].0 == b[j].0 {
            dot += a[i].1 * b[j].1;
            i += 1;
            j += 1;
        } else if a[i].0 < b[j].0 {
            i += 1;
        } else {
            j += 1;
        }
    }

    dot / (norm_a * norm_b)
}

/// Keeps the `n` best scored candidates, best first. We select them via
/// `select_nth_unstable_by` (linear on average) and only sort the selection.
pub(crate) fn select_top(mut candidates: Vec<ScoredIndex>, n: usize) -> Vec<ScoredIndex> {

    let num_to_select = n.min(candidates.len());
    if num_to_select == 0 {
        return Vec::new();
    }

    if num_to_select < candidates.len() {
        candidates.select_nth_unstable_by(num_to_select - 1, by_score_descending);
        candidates.truncate(num_to_select);
    }

    candidates.sort_by(by_score_descending);

    candidates
}

/// Picks the `k` highest scored indices other than `excluded`, best first. The excluded index
/// is removed after selecting `k + 1` candidates, ties are resolved by the selection order.
pub(crate) fn top_k_excluding(scores: &[f64], k: usize, excluded: usize) -> Vec<ScoredIndex> {

    let candidates: Vec<ScoredIndex> = scores.iter()
        .enumerate()
        .map(|(index, score)| ScoredIndex { index, score: *score })
        .collect();

    let mut selected = select_top(candidates, k.saturating_add(1));

    selected.retain(|candidate| candidate.index != excluded);
    selected.truncate(k);

    selected
}

/// Top-k neighbours of an item given by its index.
pub(crate) fn similar_to_index(
    matrix: &InteractionMatrix,
    item_index: usize,
    k: usize,
) -> Vec<SimilarItem> {

    let similarities = cosine_similarities(matrix, item_index);

    top_k_excluding(&similarities, k, item_index)
        .into_iter()
        .map(|scored| SimilarItem {
            item: matrix.items().id_of(scored.index).clone(),
            similarity: scored.score,
        })
        .collect()
}

/// The `k` items most similar to `item` under cosine similarity, most similar first. The item
/// itself is never part of the result.
pub fn top_similar_items(
    matrix: &InteractionMatrix,
    item: &RawId,
    k: usize,
) -> Result<Vec<SimilarItem>> {

    let item_index = matrix.items().index_of(item)
        .ok_or_else(|| RecoError::item_not_found(item))?;

    let similar_items = similar_to_index(matrix, item_index, k);

    debug!("Found {} items similar to {}", similar_items.len(), item);

    Ok(similar_items)
}

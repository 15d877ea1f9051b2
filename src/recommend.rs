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

use std::time::Instant;

use fnv::{FnvHashMap, FnvHashSet};
use scoped_pool::Pool;
use serde_derive::Deserialize;
use tracing::{debug, info};

use crate::error::{RecoError, Result};
use crate::matrix::InteractionMatrix;
use crate::similarity;
use crate::types::{RawId, ScoredIndex, SimilarItem};
use crate::utils;

/// A pretrained personalized ranking model, addressed by matrix indices. Must return one score
/// per requested item, in the order of `item_indices`.
pub trait RankingModel {
    fn predict(&self, user_index: usize, item_indices: &[usize]) -> Vec<f64>;
}

/// Externally computed recommendations, ordered best first.
pub trait RecommendationStore {
    fn lookup(&self, user: &RawId) -> Option<Vec<RawId>>;
}

/// Read-only query surface over an interaction matrix. The matrix is owned and never mutated,
/// so a single instance can answer queries from many threads at once.
pub struct Recommender {
    matrix: InteractionMatrix,
}

impl Recommender {

    pub fn new(matrix: InteractionMatrix) -> Self {
        Recommender { matrix }
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    fn item_index(&self, item: &RawId) -> Result<usize> {
        self.matrix.items().index_of(item).ok_or_else(|| RecoError::item_not_found(item))
    }

    fn user_index(&self, user: &RawId) -> Result<usize> {
        self.matrix.users().index_of(user).ok_or_else(|| RecoError::user_not_found(user))
    }

    /// The `k` nearest neighbours of an item under cosine similarity, most similar first.
    pub fn similar_items<I: Into<RawId>>(&self, item: I, k: usize) -> Result<Vec<SimilarItem>> {
        similarity::top_similar_items(&self.matrix, &item.into(), k)
    }

    pub fn items_interacted_by_user<U: Into<RawId>>(&self, user: U) -> Result<FnvHashSet<RawId>> {
        let user_index = self.user_index(&user.into())?;

        Ok(self.matrix.item_indices_of_user(user_index).into_iter()
            .map(|item_index| self.matrix.items().id_of(item_index).clone())
            .collect())
    }

    pub fn users_who_interacted_with_item<I: Into<RawId>>(
        &self,
        item: I,
    ) -> Result<FnvHashSet<RawId>> {
        let item_index = self.item_index(&item.into())?;

        Ok(self.matrix.user_indices_of_item(item_index).into_iter()
            .map(|user_index| self.matrix.users().id_of(user_index).clone())
            .collect())
    }

    /// Indices of the items a user already interacted with, in ascending order.
    pub fn seen_item_indices<U: Into<RawId>>(&self, user: U) -> Result<Vec<usize>> {
        let user_index = self.user_index(&user.into())?;
        Ok(self.matrix.item_indices_of_user(user_index))
    }

    /// Ranks items for a user with a pretrained model and returns the `n` best ones. With
    /// `exclude_seen`, items the user already interacted with are not scored.
    pub fn ranked_recommendations<M, U>(
        &self,
        model: &M,
        user: U,
        n: usize,
        exclude_seen: bool,
    ) -> Result<Vec<RawId>>
        where M: RankingModel + ?Sized, U: Into<RawId> {

        let user = user.into();
        let user_index = self.user_index(&user)?;

        let candidates: Vec<usize> = if exclude_seen {
            let seen: FnvHashSet<usize> =
                self.matrix.item_indices_of_user(user_index).into_iter().collect();
            (0..self.matrix.num_items()).filter(|index| !seen.contains(index)).collect()
        } else {
            (0..self.matrix.num_items()).collect()
        };

        let scores = model.predict(user_index, &candidates);

        if scores.len() != candidates.len() {
            return Err(RecoError::InvalidInput(format!(
                "ranking model returned {} scores for {} items", scores.len(), candidates.len())));
        }

        if let Some(position) = scores.iter().position(|score| !score.is_finite()) {
            return Err(RecoError::InvalidInput(format!(
                "ranking model returned non-finite score {} for item {}",
                scores[position], self.matrix.items().id_of(candidates[position]))));
        }

        let scored: Vec<ScoredIndex> = candidates.into_iter()
            .zip(scores.into_iter())
            .map(|(index, score)| ScoredIndex { index, score })
            .collect();

        let recommendations: Vec<RawId> = similarity::select_top(scored, n).into_iter()
            .map(|scored| self.matrix.items().id_of(scored.index).clone())
            .collect();

        debug!("Ranked {} recommendations for user {}", recommendations.len(), user);

        Ok(recommendations)
    }

    /// Looks up precomputed recommendations for a user, truncated to `n` entries.
    pub fn stored_recommendations<S, U>(&self, store: &S, user: U, n: usize) -> Result<Vec<RawId>>
        where S: RecommendationStore + ?Sized, U: Into<RawId> {

        let user = user.into();

        let mut recommendations = store.lookup(&user)
            .ok_or_else(|| RecoError::user_not_found(&user))?;
        recommendations.truncate(n);

        Ok(recommendations)
    }

    /// Computes the `k` nearest neighbours of every item, indexed by item index. Items are
    /// processed in parallel chunks, all workers share the read-only matrix.
    pub fn similar_items_for_all(&self, k: usize, pool_size: usize) -> Vec<Vec<SimilarItem>> {

        let num_items = self.matrix.num_items();
        let export_start = Instant::now();

        let mut neighbours: Vec<Vec<SimilarItem>> = vec![Vec::new(); num_items];

        let pool_size = pool_size.max(1);
        let chunk_size = (num_items / (pool_size * 4)).max(1);
        let pool = Pool::new(pool_size);

        let matrix = &self.matrix;

        pool.scoped(|scope| {
            for (chunk_index, chunk) in neighbours.chunks_mut(chunk_size).enumerate() {
                scope.execute(move || {
                    let offset = chunk_index * chunk_size;
                    for (position, slot) in chunk.iter_mut().enumerate() {
                        *slot = similarity::similar_to_index(matrix, offset + position, k);
                    }
                });
            }
        });

        info!(
            "Computed {} neighbours for each of {} items with {} threads in {}ms",
            k,
            num_items,
            pool_size,
            utils::to_millis(export_start.elapsed()),
        );

        neighbours
    }
}

/// Stored recommendations held in memory.
#[derive(Debug, Default)]
pub struct MemoryRecommendationStore {
    rows: FnvHashMap<RawId, Vec<RawId>>,
}

/// One entry of a JSON encoded recommendation row.
#[derive(Deserialize)]
struct StoredRecommendation {
    #[serde(rename = "Question")]
    question: serde_json::Value,
}

impl MemoryRecommendationStore {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<U: Into<RawId>>(&mut self, user: U, items: Vec<RawId>) {
        self.rows.insert(user.into(), items);
    }

    /// Adds a row in its JSON encoding, `[{"Question": 24002369}, {"Question": 8812}, ...]`.
    pub fn insert_json<U: Into<RawId>>(&mut self, user: U, json: &str) -> Result<()> {

        let entries: Vec<StoredRecommendation> = serde_json::from_str(json)
            .map_err(|error| RecoError::InvalidInput(error.to_string()))?;

        let items = entries.into_iter()
            .map(|entry| match entry.question {
                serde_json::Value::Number(ref number) if number.is_i64() =>
                    Ok(RawId::Int(number.as_i64().unwrap_or_default())),
                serde_json::Value::String(ref text) => Ok(RawId::parse(text)),
                other => Err(RecoError::InvalidInput(
                    format!("unsupported item identifier {}", other))),
            })
            .collect::<Result<Vec<RawId>>>()?;

        self.insert(user, items);

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RecommendationStore for MemoryRecommendationStore {
    fn lookup(&self, user: &RawId) -> Option<Vec<RawId>> {
        self.rows.get(user).cloned()
    }
}

#[cfg(test)]
mod tests {

    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::table::{FilterThresholds, Interaction, InteractionTable};
    use crate::types::Orientation;

    fn recommender(orientation: Orientation) -> Recommender {
        let interactions = vec![
            Interaction::new(10, 1),
            Interaction::new(10, 2),
            Interaction::new(20, 1),
            Interaction::new(30, 2),
            Interaction::new(40, 3),
        ];

        let table = InteractionTable::new(interactions)
            .filter(FilterThresholds::default())
            .unwrap();

        Recommender::new(InteractionMatrix::build(&table, orientation))
    }

    fn set(ids: &[i64]) -> FnvHashSet<RawId> {
        ids.iter().map(|id| RawId::from(*id)).collect()
    }

    /// Scores items by their index, higher indices are better.
    struct IndexModel;

    impl RankingModel for IndexModel {
        fn predict(&self, _user_index: usize, item_indices: &[usize]) -> Vec<f64> {
            item_indices.iter().map(|index| *index as f64).collect()
        }
    }

    struct BrokenModel;

    /// Scores every item as NaN.
    struct UndefinedModel;

    impl RankingModel for UndefinedModel {
        fn predict(&self, _user_index: usize, item_indices: &[usize]) -> Vec<f64> {
            item_indices.iter().map(|_| f64::NAN).collect()
        }
    }

    impl RankingModel for BrokenModel {
        fn predict(&self, _user_index: usize, _item_indices: &[usize]) -> Vec<f64> {
            vec![1.0]
        }
    }

    #[test]
    fn history_queries_in_both_orientations() {
        for orientation in [Orientation::ItemsAsRows, Orientation::UsersAsRows].iter() {
            let recommender = recommender(*orientation);

            assert_eq!(recommender.items_interacted_by_user(1).unwrap(), set(&[10, 20]));
            assert_eq!(recommender.items_interacted_by_user(3).unwrap(), set(&[40]));
            assert_eq!(recommender.users_who_interacted_with_item(10).unwrap(), set(&[1, 2]));
            assert_eq!(recommender.users_who_interacted_with_item("30").unwrap(), set(&[2]));
        }
    }

    #[test]
    fn unknown_identifiers_are_not_found() {
        let recommender = recommender(Orientation::ItemsAsRows);

        assert!(recommender.items_interacted_by_user(99).unwrap_err().is_not_found());
        assert!(recommender.users_who_interacted_with_item(99).unwrap_err().is_not_found());
        assert!(recommender.similar_items(99, 3).unwrap_err().is_not_found());
        assert!(recommender.seen_item_indices(99).unwrap_err().is_not_found());
    }

    #[test]
    fn similar_items_through_the_facade() {
        let recommender = recommender(Orientation::UsersAsRows);

        let similar = recommender.similar_items(10, 1).unwrap();

        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].item, RawId::from(20));
        assert!(similar[0].similarity > 0.0);
    }

    #[test]
    fn ranked_recommendations() {
        let recommender = recommender(Orientation::ItemsAsRows);

        // Items 10, 20, 30, 40 have the indices 0, 1, 2, 3.
        let all = recommender.ranked_recommendations(&IndexModel, 1, 3, false).unwrap();
        assert_eq!(all, vec![RawId::from(40), RawId::from(30), RawId::from(20)]);

        let unseen = recommender.ranked_recommendations(&IndexModel, 2, 10, true).unwrap();
        assert_eq!(unseen, vec![RawId::from(40), RawId::from(20)]);

        assert_eq!(recommender.seen_item_indices(2).unwrap(), vec![0, 2]);
    }

    #[test]
    fn ranking_errors() {
        let recommender = recommender(Orientation::ItemsAsRows);

        let unknown = recommender.ranked_recommendations(&IndexModel, 99, 3, false);
        assert!(unknown.unwrap_err().is_not_found());

        let broken = recommender.ranked_recommendations(&BrokenModel, 1, 3, false);
        assert!(matches!(broken, Err(RecoError::InvalidInput(_))));

        let undefined = recommender.ranked_recommendations(&UndefinedModel, 1, 3, false);
        assert!(matches!(undefined, Err(RecoError::InvalidInput(_))));
    }

    #[test]
    fn stored_recommendations() {
        let recommender = recommender(Orientation::ItemsAsRows);

        let mut store = MemoryRecommendationStore::new();
        store.insert_json(7, r#"[{"Question": 30}, {"Question": "10"}, {"Question": 20}]"#)
            .unwrap();
        store.insert("bob", vec![RawId::from("pony")]);

        assert_eq!(store.len(), 2);
        assert_eq!(
            recommender.stored_recommendations(&store, 7, 2).unwrap(),
            vec![RawId::from(30), RawId::from(10)]);
        assert_eq!(
            recommender.stored_recommendations(&store, "bob", 10).unwrap(),
            vec![RawId::from("pony")]);
        assert!(recommender.stored_recommendations(&store, 8, 2).unwrap_err().is_not_found());

        assert!(store.insert_json(9, "not json").is_err());
        assert!(store.insert_json(9, r#"[{"Question": 1.5}]"#).is_err());
    }

    #[test]
    fn parallel_export_matches_single_queries() {
        let recommender = recommender(Orientation::ItemsAsRows);

        let neighbours = recommender.similar_items_for_all(2, 3);

        assert_eq!(neighbours.len(), recommender.matrix().num_items());

        for (item_index, similar) in neighbours.iter().enumerate() {
            let item = recommender.matrix().items().id_of(item_index).clone();
            let expected = recommender.similar_items(&item, 2).unwrap();

            assert_eq!(similar.len(), expected.len());
            assert_eq!(similar[0].similarity, expected[0].similarity);
            assert!(similar.iter().all(|s| s.item != item));
        }
    }

    #[test]
    fn concurrent_readers() {
        let recommender = Arc::new(recommender(Orientation::ItemsAsRows));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let recommender = Arc::clone(&recommender);
                thread::spawn(move || recommender.similar_items(10, 1).unwrap())
            })
            .collect();

        for handle in handles {
            let similar = handle.join().unwrap();
            assert_eq!(similar[0].item, RawId::from(20));
        }
    }
}

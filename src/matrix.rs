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

use sprs::{CsMat, TriMat};
use tracing::info;

use crate::error::{RecoError, Result};
use crate::stats::IdentifierIndex;
use crate::table::{FilteredTable, IMPLICIT_VOTE};
use crate::types::Orientation;
use crate::utils;

/// The bipartite user-item interaction matrix in compressed sparse row format, together with
/// the item and user universes that give meaning to its rows and columns.
///
/// Besides the CSR matrix we keep a compressed sparse column copy, so that both the items of a
/// user and the users of an item are available as contiguous slices regardless of orientation.
/// The instance is never mutated after construction and can be shared between threads.
#[derive(Debug)]
pub struct InteractionMatrix {
    items: IdentifierIndex,
    users: IdentifierIndex,
    orientation: Orientation,
    matrix: CsMat<f64>,
    matrix_by_columns: CsMat<f64>,
    item_norms: Vec<f64>,
}

impl InteractionMatrix {

    /// Builds the matrix from a filtered table without materializing any dense representation.
    pub fn build(table: &FilteredTable, orientation: Orientation) -> Self {

        let build_start = Instant::now();

        let items = table.items();
        let users = table.users();
        let shape = shape_for(orientation, items.len(), users.len());

        let mut triplets = TriMat::with_capacity(shape, table.interactions().len());

        for interaction in table.interactions() {
            // Both universes were derived from this very table, lookups cannot fail.
            if let (Some(item_index), Some(user_index)) =
                (items.index_of(&interaction.item), users.index_of(&interaction.user)) {

                match orientation {
                    Orientation::ItemsAsRows =>
                        triplets.add_triplet(item_index, user_index, IMPLICIT_VOTE),
                    Orientation::UsersAsRows =>
                        triplets.add_triplet(user_index, item_index, IMPLICIT_VOTE),
                }
            }
        }

        let matrix: CsMat<f64> = triplets.to_csr();

        let interaction_matrix =
            Self::assemble(items.clone(), users.clone(), orientation, matrix);

        info!(
            "Built {}x{} interaction matrix with {} non-zeros in {}ms",
            interaction_matrix.matrix.rows(),
            interaction_matrix.matrix.cols(),
            interaction_matrix.matrix.nnz(),
            utils::to_millis(build_start.elapsed()),
        );

        interaction_matrix
    }

    /// Reassembles a matrix from previously persisted parts, checking that the dimensions agree
    /// with the universes in the given orientation.
    pub fn from_parts(
        items: IdentifierIndex,
        users: IdentifierIndex,
        orientation: Orientation,
        matrix: CsMat<f64>,
    ) -> Result<Self> {

        let expected_shape = shape_for(orientation, items.len(), users.len());

        if matrix.shape() != expected_shape {
            return Err(RecoError::CorruptArtifact(format!(
                "matrix shape {:?} does not match {} items and {} users with {:?}",
                matrix.shape(), items.len(), users.len(), orientation)));
        }

        if !matrix.is_csr() {
            return Err(RecoError::CorruptArtifact(
                "matrix is not in compressed sparse row format".to_string()));
        }

        Ok(Self::assemble(items, users, orientation, matrix))
    }

    fn assemble(
        items: IdentifierIndex,
        users: IdentifierIndex,
        orientation: Orientation,
        matrix: CsMat<f64>,
    ) -> Self {

        let matrix_by_columns = matrix.to_csc();

        let mut interaction_matrix = InteractionMatrix {
            items,
            users,
            orientation,
            matrix,
            matrix_by_columns,
            item_norms: Vec::new(),
        };

        interaction_matrix.item_norms = (0..interaction_matrix.num_items())
            .map(|item_index| {
                let sum_of_squares: f64 = interaction_matrix.item_vector(item_index)
                    .map(|(_, weight)| weight * weight)
                    .sum();
                sum_of_squares.sqrt()
            })
            .collect();

        interaction_matrix
    }

    pub fn items(&self) -> &IdentifierIndex {
        &self.items
    }

    pub fn users(&self) -> &IdentifierIndex {
        &self.users
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// The underlying compressed sparse row matrix.
    pub fn csr(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// Accumulated vote weight of a user for an item, zero if they never interacted.
    pub fn weight(&self, item_index: usize, user_index: usize) -> f64 {
        let cell = match self.orientation {
            Orientation::ItemsAsRows => self.matrix.get(item_index, user_index),
            Orientation::UsersAsRows => self.matrix.get(user_index, item_index),
        };

        cell.copied().unwrap_or(0.0)
    }

    /// Storage where the outer dimension enumerates items.
    fn by_item(&self) -> &CsMat<f64> {
        match self.orientation {
            Orientation::ItemsAsRows => &self.matrix,
            Orientation::UsersAsRows => &self.matrix_by_columns,
        }
    }

    /// Storage where the outer dimension enumerates users.
    fn by_user(&self) -> &CsMat<f64> {
        match self.orientation {
            Orientation::ItemsAsRows => &self.matrix_by_columns,
            Orientation::UsersAsRows => &self.matrix,
        }
    }

    /// Non-zero (user index, weight) entries of an item.
    pub fn item_vector(&self, item_index: usize) -> impl Iterator<Item=(usize, f64)> + '_ {
        outer_entries(self.by_item(), item_index)
    }

    /// Non-zero (item index, weight) entries of a user.
    pub fn user_vector(&self, user_index: usize) -> impl Iterator<Item=(usize, f64)> + '_ {
        outer_entries(self.by_user(), user_index)
    }

    pub fn item_indices_of_user(&self, user_index: usize) -> Vec<usize> {
        self.user_vector(user_index).map(|(item_index, _)| item_index).collect()
    }

    pub fn user_indices_of_item(&self, item_index: usize) -> Vec<usize> {
        self.item_vector(item_index).map(|(user_index, _)| user_index).collect()
    }

    /// L2 norm of an item vector.
    pub fn item_norm(&self, item_index: usize) -> f64 {
        self.item_norms[item_index]
    }
}

impl PartialEq for InteractionMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.orientation == other.orientation &&
            self.items == other.items &&
            self.users == other.users &&
            self.matrix == other.matrix
    }
}

fn shape_for(orientation: Orientation, num_items: usize, num_users: usize) -> (usize, usize) {
    match orientation {
        Orientation::ItemsAsRows => (num_items, num_users),
        Orientation::UsersAsRows => (num_users, num_items),
    }
}

fn outer_entries(
    matrix: &CsMat<f64>,
    outer: usize,
) -> impl Iterator<Item=(usize, f64)> + '_ {

    let range = matrix.indptr().outer_inds_sz(outer);

    matrix.indices()[range.clone()].iter().copied()
        .zip(matrix.data()[range].iter().copied())
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::table::{FilterThresholds, Interaction, InteractionTable};
    use crate::types::RawId;

    fn filtered(pairs: &[(i64, i64)]) -> FilteredTable {
        let interactions: Vec<Interaction> = pairs.iter()
            .map(|&(item, user)| Interaction::new(item, user))
            .collect();

        InteractionTable::new(interactions).filter(FilterThresholds::default()).unwrap()
    }

    fn example() -> FilteredTable {
        filtered(&[(10, 1), (10, 2), (20, 1), (30, 2)])
    }

    #[test]
    fn shape_follows_orientation() {
        let by_items = InteractionMatrix::build(&example(), Orientation::ItemsAsRows);
        let by_users = InteractionMatrix::build(&example(), Orientation::UsersAsRows);

        assert_eq!(by_items.shape(), (3, 2));
        assert_eq!(by_users.shape(), (2, 3));
        assert_eq!(by_items.nnz(), 4);
        assert_eq!(by_users.nnz(), 4);
    }

    #[test]
    fn every_interaction_becomes_a_cell() {
        for orientation in [Orientation::ItemsAsRows, Orientation::UsersAsRows].iter() {
            let table = example();
            let matrix = InteractionMatrix::build(&table, *orientation);

            for interaction in table.interactions() {
                let item_index = matrix.items().index_of(&interaction.item).unwrap();
                let user_index = matrix.users().index_of(&interaction.user).unwrap();
                assert_eq!(matrix.weight(item_index, user_index), 1.0);
            }

            let item_30 = matrix.items().index_of(&RawId::from(30)).unwrap();
            let user_1 = matrix.users().index_of(&RawId::from(1)).unwrap();
            assert_eq!(matrix.weight(item_30, user_1), 0.0);
        }
    }

    #[test]
    fn repeated_interactions_accumulate() {
        let table = filtered(&[(1, 1), (1, 1), (2, 1)]);
        let matrix = InteractionMatrix::build(&table, Orientation::ItemsAsRows);

        assert_eq!(matrix.nnz(), 2);
        assert_eq!(matrix.weight(0, 0), 2.0);
        assert!((matrix.item_norm(0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn row_and_column_slices_in_both_orientations() {
        for orientation in [Orientation::ItemsAsRows, Orientation::UsersAsRows].iter() {
            let matrix = InteractionMatrix::build(&example(), *orientation);

            let user_1 = matrix.users().index_of(&RawId::from(1)).unwrap();
            let items: Vec<&RawId> = matrix.item_indices_of_user(user_1).into_iter()
                .map(|item_index| matrix.items().id_of(item_index))
                .collect();
            assert_eq!(items, vec![&RawId::from(10), &RawId::from(20)]);

            let item_10 = matrix.items().index_of(&RawId::from(10)).unwrap();
            let users: Vec<&RawId> = matrix.user_indices_of_item(item_10).into_iter()
                .map(|user_index| matrix.users().id_of(user_index))
                .collect();
            assert_eq!(users, vec![&RawId::from(1), &RawId::from(2)]);
        }
    }

    #[test]
    fn nonzero_cells_resolve_to_identifiers() {
        let matrix = InteractionMatrix::build(&example(), Orientation::UsersAsRows);
        let (rows, cols) = matrix.shape();

        for (_, (row, col)) in matrix.csr().iter() {
            assert!(row < rows && row < matrix.num_users());
            assert!(col < cols && col < matrix.num_items());
        }
    }

    #[test]
    fn parts_with_wrong_shape_are_rejected() {
        let built = InteractionMatrix::build(&example(), Orientation::ItemsAsRows);

        let result = InteractionMatrix::from_parts(
            built.items().clone(),
            built.users().clone(),
            Orientation::UsersAsRows,
            built.csr().clone(),
        );

        assert!(matches!(result, Err(RecoError::CorruptArtifact(_))));

        let reassembled = InteractionMatrix::from_parts(
            built.items().clone(),
            built.users().clone(),
            Orientation::ItemsAsRows,
            built.csr().clone(),
        ).unwrap();

        assert_eq!(reassembled, built);
    }
}

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

use std::io::Read;

use tracing::{debug, info};

use crate::error::{RecoError, Result};
use crate::stats::{IdentifierIndex, VoteCounts};
use crate::types::RawId;

/// Every observed interaction contributes this weight to its matrix cell.
pub const IMPLICIT_VOTE: f64 = 1.0;

/// A user voted on (or otherwise engaged with) an item.
#[derive(Clone, Debug, PartialEq)]
pub struct Interaction {
    pub item: RawId,
    pub user: RawId,
}

impl Interaction {

    pub fn new<I: Into<RawId>, U: Into<RawId>>(item: I, user: U) -> Self {
        Interaction { item: item.into(), user: user.into() }
    }
}

/// Items and users must have strictly more votes than their threshold to survive filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterThresholds {
    pub min_item_votes: u32,
    pub min_user_votes: u32,
}

impl FilterThresholds {

    pub fn uniform(greater_than: u32) -> Self {
        FilterThresholds { min_item_votes: greater_than, min_user_votes: greater_than }
    }
}

/// The raw, unfiltered interaction data.
#[derive(Clone, Debug, Default)]
pub struct InteractionTable {
    interactions: Vec<Interaction>,
}

impl InteractionTable {

    pub fn new(interactions: Vec<Interaction>) -> Self {
        InteractionTable { interactions }
    }

    /// Reads (item, user) records, the item identifier is expected in the first column and the
    /// user identifier in the second one. Additional columns are ignored.
    pub fn from_csv<R: Read>(reader: &mut csv::Reader<R>) -> Result<Self> {

        let mut interactions = Vec::new();

        for (line, record) in reader.records().enumerate() {
            let record = record?;

            if record.len() < 2 {
                return Err(RecoError::InvalidInput(format!(
                    "record {} has {} column(s), expected an item and a user column",
                    line + 1, record.len())));
            }

            let (item, user) = (&record[0], &record[1]);

            if item.trim().is_empty() || user.trim().is_empty() {
                return Err(RecoError::InvalidInput(
                    format!("record {} has an empty item or user field", line + 1)));
            }

            interactions.push(Interaction { item: RawId::parse(item), user: RawId::parse(user) });
        }

        debug!("Read {} interactions from csv", interactions.len());

        Ok(InteractionTable { interactions })
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn vote_counts(&self) -> VoteCounts {
        VoteCounts::from(self.interactions.iter()
            .map(|interaction| (&interaction.item, &interaction.user)))
    }

    /// Removes low signal users and items. Both filters are evaluated against the counts of the
    /// unfiltered table, counts are not recomputed after removing users.
    pub fn filter(self, thresholds: FilterThresholds) -> Result<FilteredTable> {

        if self.interactions.is_empty() {
            return Err(RecoError::InvalidInput("the interaction table is empty".to_string()));
        }

        let counts = self.vote_counts();

        info!(
            "Found {} interactions between {} users and {} items.",
            counts.num_interactions(),
            counts.num_users(),
            counts.num_items(),
        );

        let mut interactions = self.interactions;

        interactions.retain(|interaction|
            counts.user_votes(&interaction.user) > thresholds.min_user_votes);
        interactions.retain(|interaction|
            counts.item_votes(&interaction.item) > thresholds.min_item_votes);

        if interactions.is_empty() {
            return Err(RecoError::InvalidInput(format!(
                "no interactions left after filtering items with at most {} and users with at \
                most {} votes", thresholds.min_item_votes, thresholds.min_user_votes)));
        }

        let items = IdentifierIndex::from_occurrences(
            interactions.iter().map(|interaction| &interaction.item));
        let users = IdentifierIndex::from_occurrences(
            interactions.iter().map(|interaction| &interaction.user));

        info!(
            "Kept {} interactions between {} users and {} items after filtering.",
            interactions.len(),
            users.len(),
            items.len(),
        );

        Ok(FilteredTable { interactions, items, users })
    }
}

impl From<Vec<Interaction>> for InteractionTable {
    fn from(interactions: Vec<Interaction>) -> Self {
        InteractionTable::new(interactions)
    }
}

/// The interactions which survived filtering, together with the item and user universes derived
/// from them.
#[derive(Clone, Debug)]
pub struct FilteredTable {
    interactions: Vec<Interaction>,
    items: IdentifierIndex,
    users: IdentifierIndex,
}

impl FilteredTable {

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn items(&self) -> &IdentifierIndex {
        &self.items
    }

    pub fn users(&self) -> &IdentifierIndex {
        &self.users
    }

    pub fn into_universes(self) -> (IdentifierIndex, IdentifierIndex) {
        (self.items, self.users)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn table(pairs: &[(i64, i64)]) -> InteractionTable {
        pairs.iter()
            .map(|&(item, user)| Interaction::new(item, user))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn low_voted_items_are_removed() {
        // Item 1 has five votes, item 2 a single one.
        let interactions = table(&[(1, 10), (1, 11), (1, 12), (1, 13), (1, 14), (2, 10)]);

        let filtered = interactions.filter(FilterThresholds {
            min_item_votes: 2,
            min_user_votes: 0,
        }).unwrap();

        assert_eq!(filtered.items().len(), 1);
        assert!(filtered.items().contains(&RawId::from(1)));
        assert!(!filtered.items().contains(&RawId::from(2)));
        assert!(filtered.interactions().iter().all(|interaction| interaction.item == RawId::from(1)));
        assert_eq!(filtered.users().len(), 5);

        let matrix = crate::matrix::InteractionMatrix::build(
            &filtered, crate::types::Orientation::ItemsAsRows);

        assert_eq!(matrix.shape(), (1, 5));
        assert_eq!(matrix.nnz(), 5);
        assert_eq!(matrix.items().index_of(&RawId::from(1)), Some(0));
        assert_eq!(matrix.items().index_of(&RawId::from(2)), None);
    }

    #[test]
    fn differently_spelled_numbers_are_distinct_items() {
        let interactions = InteractionTable::new(vec![
            Interaction::new("007", "u"),
            Interaction::new("7", "v"),
        ]);

        let filtered = interactions.filter(FilterThresholds::default()).unwrap();

        let items: Vec<RawId> = vec![RawId::Text("007".to_string()), RawId::Int(7)];
        assert_eq!(filtered.items().ids(), &items[..]);
    }

    #[test]
    fn filtering_uses_counts_of_the_unfiltered_table() {
        // User 100 has two votes, one of them for item 2 which is removed. The user survives
        // because its count is not recomputed, although only a single vote remains.
        let interactions = table(&[
            (1, 100), (1, 101), (1, 102),
            (2, 100),
            (3, 101), (3, 102), (3, 103),
        ]);

        let filtered = interactions.filter(FilterThresholds {
            min_item_votes: 1,
            min_user_votes: 1,
        }).unwrap();

        assert!(filtered.users().contains(&RawId::from(100)));
        assert!(!filtered.users().contains(&RawId::from(103)));
        assert!(!filtered.items().contains(&RawId::from(2)));

        let votes_of_user_100 = filtered.interactions().iter()
            .filter(|interaction| interaction.user == RawId::from(100))
            .count();
        assert_eq!(votes_of_user_100, 1);
    }

    #[test]
    fn universes_in_first_occurrence_order() {
        let interactions = table(&[(30, 2), (10, 1), (30, 1), (20, 3)]);
        let filtered = interactions.filter(FilterThresholds::default()).unwrap();

        let items: Vec<RawId> = vec![30.into(), 10.into(), 20.into()];
        let users: Vec<RawId> = vec![2.into(), 1.into(), 3.into()];

        assert_eq!(filtered.items().ids(), &items[..]);
        assert_eq!(filtered.users().ids(), &users[..]);
    }

    #[test]
    fn empty_tables_are_invalid() {
        let empty = InteractionTable::default().filter(FilterThresholds::default());
        assert!(matches!(empty, Err(RecoError::InvalidInput(_))));

        let everything_removed = table(&[(1, 1), (2, 2)]).filter(FilterThresholds::uniform(1));
        assert!(matches!(everything_removed, Err(RecoError::InvalidInput(_))));
    }

    #[test]
    fn reads_csv_with_headers() {
        let data = "PostId,UserId,CreationDate\n24002369,7,2017-01-01\n24002369,8,2017-01-02\n\
            stray-item,alice,2017-01-03\n";

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(data.as_bytes());

        let table = InteractionTable::from_csv(&mut reader).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.interactions()[0], Interaction::new(24002369, 7));
        assert_eq!(table.interactions()[2], Interaction::new("stray-item", "alice"));
        assert_eq!(table.vote_counts().item_votes(&RawId::from(24002369)), 2);
    }

    #[test]
    fn csv_without_user_column_is_invalid() {
        let data = "1\n2\n";

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());

        let result = InteractionTable::from_csv(&mut reader);
        assert!(matches!(result, Err(RecoError::InvalidInput(_))));
    }
}

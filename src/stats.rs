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

use fnv::FnvHashMap;

use crate::types::RawId;

/// Bidirectional mapping between the raw identifiers of one entity kind and the consecutive
/// integer indices used inside the interaction matrix. The position of an identifier in `ids` is
/// its index, `positions` is the reverse lookup.
#[derive(Clone, Debug)]
pub struct IdentifierIndex {
    ids: Vec<RawId>,
    positions: FnvHashMap<RawId, usize>,
}

impl IdentifierIndex {

    /// Assigns indices in order of first occurrence, later repetitions are skipped.
    pub fn from_occurrences<'a, T>(occurrences: T) -> Self
        where T: Iterator<Item=&'a RawId> {

        let mut ids: Vec<RawId> = Vec::new();
        let mut positions: FnvHashMap<RawId, usize> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        for id in occurrences {
            if !positions.contains_key(id) {
                positions.insert(id.clone(), ids.len());
                ids.push(id.clone());
            }
        }

        IdentifierIndex { ids, positions }
    }

    /// Rebuilds an index from an already deduplicated universe. Returns the first repeated
    /// identifier if the sequence contains duplicates.
    pub fn from_universe(ids: Vec<RawId>) -> Result<Self, RawId> {

        let mut positions: FnvHashMap<RawId, usize> =
            FnvHashMap::with_capacity_and_hasher(ids.len(), Default::default());

        for (index, id) in ids.iter().enumerate() {
            if positions.insert(id.clone(), index).is_some() {
                return Err(id.clone());
            }
        }

        Ok(IdentifierIndex { ids, positions })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &RawId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Panics if `index` is not a valid index of this universe.
    pub fn id_of(&self, index: usize) -> &RawId {
        &self.ids[index]
    }

    pub fn contains(&self, id: &RawId) -> bool {
        self.positions.contains_key(id)
    }

    /// The identifiers in index order.
    pub fn ids(&self) -> &[RawId] {
        &self.ids
    }
}

impl PartialEq for IdentifierIndex {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

/// Raw per-item and per-user interaction counts of an unfiltered table.
#[derive(Debug)]
pub struct VoteCounts {
    item_votes: FnvHashMap<RawId, u32>,
    user_votes: FnvHashMap<RawId, u32>,
    num_interactions: u64,
}

impl VoteCounts {

    pub fn from<'a, T>(interactions: T) -> Self
        where T: Iterator<Item=(&'a RawId, &'a RawId)> {

        let mut item_votes: FnvHashMap<RawId, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());
        let mut user_votes: FnvHashMap<RawId, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut num_interactions: u64 = 0;

        for (item, user) in interactions {
            *item_votes.entry(item.clone()).or_insert(0) += 1;
            *user_votes.entry(user.clone()).or_insert(0) += 1;
            num_interactions += 1;
        }

        VoteCounts { item_votes, user_votes, num_interactions }
    }

    pub fn item_votes(&self, item: &RawId) -> u32 {
        self.item_votes.get(item).copied().unwrap_or(0)
    }

    pub fn user_votes(&self, user: &RawId) -> u32 {
        self.user_votes.get(user).copied().unwrap_or(0)
    }

    pub fn num_items(&self) -> usize {
        self.item_votes.len()
    }

    pub fn num_users(&self) -> usize {
        self.user_votes.len()
    }

    pub fn num_interactions(&self) -> u64 {
        self.num_interactions
    }
}

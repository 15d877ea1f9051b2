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

use std::cmp::Ordering;
use std::fmt;

use serde_derive::{Deserialize, Serialize};

/// A raw user or item identifier as it appears in the interaction data. Identifiers written in
/// canonical integer form are kept as integers, so that `42` from a CSV file and `42` from a
/// query match. Any other spelling, like `007` or `+7`, stays text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {

    pub fn parse(field: &str) -> Self {
        match field.parse::<i64>() {
            Ok(number) if number.to_string() == field => RawId::Int(number),
            _ => RawId::Text(field.to_string()),
        }
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RawId::Int(number) => write!(f, "{}", number),
            RawId::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<i64> for RawId {
    fn from(number: i64) -> Self {
        RawId::Int(number)
    }
}

impl From<&str> for RawId {
    fn from(text: &str) -> Self {
        RawId::parse(text)
    }
}

impl From<String> for RawId {
    fn from(text: String) -> Self {
        RawId::parse(&text)
    }
}

impl From<&RawId> for RawId {
    fn from(id: &RawId) -> Self {
        id.clone()
    }
}

/// JSON view of an identifier: numbers are encoded as numbers, everything else as strings.
pub(crate) struct JsonId<'a>(pub(crate) &'a RawId);

impl serde::Serialize for JsonId<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            RawId::Int(number) => serializer.serialize_i64(*number),
            RawId::Text(text) => serializer.serialize_str(text),
        }
    }
}

/// Which universe an identifier belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Item,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityKind::Item => write!(f, "item"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

/// Fixes which entity kind occupies the rows of the interaction matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    ItemsAsRows,
    UsersAsRows,
}

impl Orientation {

    pub fn from_items_as_rows(items_as_rows: bool) -> Self {
        if items_as_rows {
            Orientation::ItemsAsRows
        } else {
            Orientation::UsersAsRows
        }
    }

    pub fn has_items_as_rows(self) -> bool {
        self == Orientation::ItemsAsRows
    }
}

/// An item together with its cosine similarity to the queried item.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarItem {
    pub item: RawId,
    pub similarity: f64,
}

/// Dense item index with a score, used during top-k selection.
#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) struct ScoredIndex {
    pub index: usize,
    pub score: f64,
}

/// Orders by descending score, so that sorting puts the best scored index first. Uses
/// `total_cmp`, under which a positive NaN would rank above every number. Similarities are
/// always finite and model scores are checked for finiteness before ranking.
pub(crate) fn by_score_descending(a: &ScoredIndex, b: &ScoredIndex) -> Ordering {
    b.score.total_cmp(&a.score)
}

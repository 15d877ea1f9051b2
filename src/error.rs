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

use thiserror::Error;

use crate::types::{EntityKind, RawId};

#[derive(Error, Debug)]
pub enum RecoError {
    #[error("Unknown {kind}: {id}")]
    NotFound { kind: EntityKind, id: RawId },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(bincode::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl RecoError {

    pub fn item_not_found(id: &RawId) -> Self {
        RecoError::NotFound { kind: EntityKind::Item, id: id.clone() }
    }

    pub fn user_not_found(id: &RawId) -> Self {
        RecoError::NotFound { kind: EntityKind::User, id: id.clone() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RecoError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, RecoError>;

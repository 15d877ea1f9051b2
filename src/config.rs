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

use std::fs;
use std::path::Path;

use serde_derive::Deserialize;

use crate::error::{RecoError, Result};
use crate::table::FilterThresholds;
use crate::types::Orientation;
use crate::utils;

/// Settings for building and querying the interaction matrix. Every field is optional in the
/// TOML file and falls back to its default.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Items need strictly more votes than this to be kept.
    pub min_item_votes: u32,
    /// Users need strictly more votes than this to be kept.
    pub min_user_votes: u32,
    pub items_as_rows: bool,
    pub delimiter: char,
    pub has_headers: bool,
    pub top_similar: usize,
    pub top_recommendations: usize,
    pub exclude_seen: bool,
    pub threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_item_votes: 0,
            min_user_votes: 0,
            items_as_rows: true,
            delimiter: ',',
            has_headers: true,
            top_similar: 5,
            top_recommendations: 10,
            exclude_seen: false,
            threads: utils::default_threads(),
        }
    }
}

impl EngineConfig {

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn thresholds(&self) -> FilterThresholds {
        FilterThresholds {
            min_item_votes: self.min_item_votes,
            min_user_votes: self.min_user_votes,
        }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_items_as_rows(self.items_as_rows)
    }

    /// The CSV delimiter as a single byte.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(RecoError::InvalidInput(
                format!("delimiter {:?} is not an ascii character", self.delimiter)))
        }
    }

    fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;

        if self.threads == 0 {
            return Err(RecoError::InvalidInput("threads must be at least 1".to_string()));
        }

        Ok(())
    }
}

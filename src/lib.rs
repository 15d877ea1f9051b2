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

// Recommendations from a sparse user-item interaction matrix: nearest neighbour items under
// cosine similarity, user histories, and personalized rankings from a pretrained model.

mod types;
mod error;
pub mod utils;
pub mod stats;
pub mod table;
pub mod matrix;
pub mod similarity;
pub mod codec;
pub mod config;
pub mod io;
pub mod recommend;


pub use crate::config::EngineConfig;
pub use crate::error::{RecoError, Result};
pub use crate::matrix::InteractionMatrix;
pub use crate::recommend::{
    MemoryRecommendationStore, RankingModel, RecommendationStore, Recommender,
};
pub use crate::stats::{IdentifierIndex, VoteCounts};
pub use crate::table::{FilterThresholds, FilteredTable, Interaction, InteractionTable};
pub use crate::types::{EntityKind, Orientation, RawId, SimilarItem};

/// Builds the interaction matrix from a raw table: filters low signal users and items, derives
/// both universes and lays out the matrix in the requested orientation.
pub fn build_matrix(
    table: InteractionTable,
    thresholds: FilterThresholds,
    orientation: Orientation,
) -> Result<InteractionMatrix> {

    let filtered = table.filter(thresholds)?;
    Ok(InteractionMatrix::build(&filtered, orientation))
}

/// Installs a global log subscriber, honoring `RUST_LOG` and defaulting to `info`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

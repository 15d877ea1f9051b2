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

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use serde_derive::{Deserialize, Serialize};
use sprs::CsMat;
use tracing::info;

use crate::error::{RecoError, Result};
use crate::matrix::InteractionMatrix;
use crate::stats::IdentifierIndex;
use crate::types::{Orientation, RawId};
use crate::utils;

/// On-disk layout of an interaction matrix: both universes in index order and the three arrays
/// of the compressed sparse row representation.
#[derive(Serialize, Deserialize)]
struct MatrixArtifact {
    items: Vec<RawId>,
    users: Vec<RawId>,
    data: Vec<f64>,
    indices: Vec<usize>,
    indptr: Vec<usize>,
    shape: (usize, usize),
}

pub fn encode<W: Write>(matrix: &InteractionMatrix, writer: W) -> Result<()> {

    let csr = matrix.csr();

    let artifact = MatrixArtifact {
        items: matrix.items().ids().to_vec(),
        users: matrix.users().ids().to_vec(),
        data: csr.data().to_vec(),
        indices: csr.indices().to_vec(),
        indptr: csr.proper_indptr().into_owned(),
        shape: csr.shape(),
    };

    bincode::serialize_into(writer, &artifact).map_err(RecoError::Serialization)
}

/// Reconstructs a matrix from an artifact. The orientation is not part of the artifact and must
/// be the one the matrix was built with.
pub fn decode<R: Read>(reader: R, orientation: Orientation) -> Result<InteractionMatrix> {

    let artifact: MatrixArtifact = bincode::deserialize_from(reader)
        .map_err(|error| RecoError::CorruptArtifact(error.to_string()))?;

    let MatrixArtifact { items, users, data, indices, indptr, shape } = artifact;

    let items = IdentifierIndex::from_universe(items)
        .map_err(|id| RecoError::CorruptArtifact(format!("duplicate item {}", id)))?;
    let users = IdentifierIndex::from_universe(users)
        .map_err(|id| RecoError::CorruptArtifact(format!("duplicate user {}", id)))?;

    if indptr.len().checked_sub(1) != Some(shape.0) || indices.len() != data.len() {
        return Err(RecoError::CorruptArtifact(format!(
            "shape {:?} is inconsistent with {} row pointers, {} indices and {} values",
            shape, indptr.len(), indices.len(), data.len())));
    }

    let csr = CsMat::try_new(shape, indptr, indices, data)
        .map_err(|(_, _, _, error)| RecoError::CorruptArtifact(error.to_string()))?;

    InteractionMatrix::from_parts(items, users, orientation, csr)
}

pub fn save<P: AsRef<Path>>(matrix: &InteractionMatrix, path: P) -> Result<()> {

    let save_start = Instant::now();

    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    encode(matrix, &mut writer)?;
    writer.flush()?;

    info!(
        "Saved matrix with {} items, {} users and {} non-zeros to {} in {}ms",
        matrix.num_items(),
        matrix.num_users(),
        matrix.nnz(),
        path.as_ref().display(),
        utils::to_millis(save_start.elapsed()),
    );

    Ok(())
}

pub fn load<P: AsRef<Path>>(path: P, orientation: Orientation) -> Result<InteractionMatrix> {

    let load_start = Instant::now();

    let reader = BufReader::new(File::open(path.as_ref())?);
    let matrix = decode(reader, orientation)?;

    info!(
        "Loaded matrix with {} items, {} users and {} non-zeros from {} in {}ms",
        matrix.num_items(),
        matrix.num_users(),
        matrix.nnz(),
        path.as_ref().display(),
        utils::to_millis(load_start.elapsed()),
    );

    Ok(matrix)
}

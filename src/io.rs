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
use std::io::{self, stdout, BufWriter, Write};
use std::path::Path;

use fnv::FnvHashSet;
use serde_derive::Serialize;
use serde_json::json;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::matrix::InteractionMatrix;
use crate::table::InteractionTable;
use crate::types::{JsonId, RawId, SimilarItem};

/// Opens a CSV file of interactions with the given delimiter.
pub fn csv_reader<P: AsRef<Path>>(
    file: P,
    delimiter: u8,
    has_headers: bool,
) -> Result<csv::Reader<File>> {

    let reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(file)?;

    Ok(reader)
}

/// Reads the raw interaction table from a CSV file, using the CSV settings of `config`.
pub fn read_interactions<P: AsRef<Path>>(file: P, config: &EngineConfig) -> Result<InteractionTable> {

    info!("Reading interactions from {}", file.as_ref().display());

    let mut reader = csv_reader(file, config.delimiter_byte()?, config.has_headers)?;
    InteractionTable::from_csv(&mut reader)
}

/// Struct used for JSON serialization of similar items. Field names will be used in JSON.
#[derive(Serialize)]
struct SimilarItems<'a> {
    for_item: JsonId<'a>,
    similar_items: Vec<(JsonId<'a>, f64)>,
}

fn similar_items_as_json<'a>(item: &'a RawId, similar: &'a [SimilarItem]) -> SimilarItems<'a> {
    SimilarItems {
        for_item: JsonId(item),
        similar_items: similar.iter()
            .map(|similar_item| (JsonId(&similar_item.item), similar_item.similarity))
            .collect(),
    }
}

/// Writes a single similarity query result as one JSON object.
pub fn write_similar<W: Write>(out: &mut W, item: &RawId, similar: &[SimilarItem]) -> io::Result<()> {
    let as_json = json!(similar_items_as_json(item, similar));
    writeln!(out, "{}", as_json)
}

/// Writes a set of identifiers as a JSON array.
pub fn write_ids<W: Write>(out: &mut W, ids: &FnvHashSet<RawId>) -> io::Result<()> {
    let mut sorted: Vec<&RawId> = ids.iter().collect();
    sorted.sort();

    let as_json: Vec<JsonId> = sorted.into_iter().map(JsonId).collect();
    writeln!(out, "{}", json!(as_json))
}

/// Output the neighbours of every item in JSON lines format, using the raw identifiers. If
/// an `output_path` is supplied, we write to a file at the specified path, otherwise, we output
/// to stdout.
pub fn write_similar_items(
    matrix: &InteractionMatrix,
    neighbours: &[Vec<SimilarItem>],
    output_path: Option<String>,
) -> io::Result<()> {

    let mut out: Box<dyn Write> = match output_path {
        Some(path) => Box::new(BufWriter::new(File::create(&Path::new(&path))?)),
        _ => Box::new(stdout()),
    };

    for (item_index, similar) in neighbours.iter().enumerate() {
        write_similar(&mut out, matrix.items().id_of(item_index), similar)?;
    }

    out.flush()
}

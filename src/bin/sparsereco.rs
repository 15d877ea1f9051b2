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

use std::env;
use std::error::Error;
use std::io::stdout;
use std::process;

use getopts::{Matches, Options};
use tracing::error;

use sparsereco::{codec, io, build_matrix, EngineConfig, RawId, Recommender};

const COMMANDS: &str = "Commands:
    build      Build an interaction matrix from a CSV file and persist it
    similar    Print the items most similar to an item
    history    Print the items a user interacted with
    export     Compute the most similar items for every item";

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input CSV file with an item and a user column per line \
        (required for build).", "PATH");
    opts.optopt("o", "outputfile", "Output file name. The matrix artifact for build, \
        optional for export (defaults to stdout).", "PATH");
    opts.optopt("m", "matrix", "Persisted matrix artifact (required for similar, history \
        and export).", "PATH");
    opts.optopt("c", "config", "TOML configuration file (optional).", "PATH");
    opts.optopt("", "item", "Item identifier to query.", "ID");
    opts.optopt("", "user", "User identifier to query.", "ID");
    opts.optopt("n", "top", "Number of similar items to return per item.", "NUMBER");
    opts.optopt("", "min-item-votes", "Keep only items with more votes than this.", "NUMBER");
    opts.optopt("", "min-user-votes", "Keep only users with more votes than this.", "NUMBER");
    opts.optflag("", "users-as-rows", "Lay out the matrix with users as rows.");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    let command = match matches.free.first() {
        Some(command) => command.clone(),
        None => return print_usage_and_exit(&program, opts, Some("Please specify a command.")),
    };

    sparsereco::init_tracing();

    let config = match engine_config(&matches) {
        Ok(config) => config,
        Err(failure) => {
            let hint = format!("Invalid configuration: {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let outcome = match command.as_str() {
        "build" => required(&matches, "i").and_then(|input| {
            required(&matches, "o").and_then(|output| build(&input, &output, &config))
        }),
        "similar" => required(&matches, "m").and_then(|matrix| {
            required(&matches, "item").and_then(|item| similar(&matrix, &item, &config))
        }),
        "history" => required(&matches, "m").and_then(|matrix| {
            required(&matches, "user").and_then(|user| history(&matrix, &user, &config))
        }),
        "export" => required(&matches, "m")
            .and_then(|matrix| export(&matrix, matches.opt_str("o"), &config)),
        other => {
            let hint = format!("Unknown command '{}'.", other);
            return print_usage_and_exit(&program, opts, Some(&hint));
        },
    };

    if let Err(failure) = outcome {
        error!("{}", failure);
        process::exit(1);
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} <command> [options]\n\n{}", program, COMMANDS);
    eprint!("{}", opts.usage(&brief));

    process::exit(if hint.is_some() { 2 } else { 0 });
}

fn required(matches: &Matches, name: &str) -> Result<String, Box<dyn Error>> {
    matches.opt_str(name)
        .ok_or_else(|| format!("Missing required option '{}'.", name).into())
}

/// Starts from the config file (if any) and applies command line overrides.
fn engine_config(matches: &Matches) -> Result<EngineConfig, Box<dyn Error>> {

    let mut config = match matches.opt_str("c") {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(min_item_votes) = matches.opt_get("min-item-votes")? {
        config.min_item_votes = min_item_votes;
    }

    if let Some(min_user_votes) = matches.opt_get("min-user-votes")? {
        config.min_user_votes = min_user_votes;
    }

    if let Some(top) = matches.opt_get("n")? {
        config.top_similar = top;
    }

    if matches.opt_present("users-as-rows") {
        config.items_as_rows = false;
    }

    Ok(config)
}

fn build(input: &str, output: &str, config: &EngineConfig) -> Result<(), Box<dyn Error>> {

    let table = io::read_interactions(input, config)?;
    let matrix = build_matrix(table, config.thresholds(), config.orientation())?;
    codec::save(&matrix, output)?;

    Ok(())
}

fn similar(matrix_path: &str, item: &str, config: &EngineConfig) -> Result<(), Box<dyn Error>> {

    let recommender = Recommender::new(codec::load(matrix_path, config.orientation())?);

    let item = RawId::parse(item);
    let similar_items = recommender.similar_items(&item, config.top_similar)?;

    io::write_similar(&mut stdout(), &item, &similar_items)?;

    Ok(())
}

fn history(matrix_path: &str, user: &str, config: &EngineConfig) -> Result<(), Box<dyn Error>> {

    let recommender = Recommender::new(codec::load(matrix_path, config.orientation())?);

    let items = recommender.items_interacted_by_user(user)?;
    io::write_ids(&mut stdout(), &items)?;

    Ok(())
}

fn export(
    matrix_path: &str,
    output_path: Option<String>,
    config: &EngineConfig,
) -> Result<(), Box<dyn Error>> {

    let recommender = Recommender::new(codec::load(matrix_path, config.orientation())?);

    let neighbours = recommender.similar_items_for_all(config.top_similar, config.threads);
    io::write_similar_items(recommender.matrix(), &neighbours, output_path)?;

    Ok(())
}

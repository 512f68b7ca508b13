use std::fs;
use std::io::{self, prelude::*};
use std::path;

use env_logger;
use log;
use rand::Rng;

use ext_int_sort::{Algorithm, ExternalSorterBuilder};

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let input = path::Path::new("input.txt");
    let mut input_writer = io::BufWriter::new(fs::File::create(input).unwrap());
    let mut rng = rand::thread_rng();
    for _ in 0..100_000 {
        writeln!(input_writer, "{}", rng.gen_range(-1_000_000..1_000_000i64)).unwrap();
    }
    input_writer.flush().unwrap();

    let sorter = ExternalSorterBuilder::new()
        .with_input(input)
        .with_memory_budget(64 * 1024)
        .with_algorithm(Algorithm::Quick)
        .build()
        .unwrap();

    let summary = sorter.sort_by(|a, b| a > b).unwrap();
    println!(
        "{} records from {} partitions sorted in descending order into {}",
        summary.records,
        summary.partitions,
        summary.output.display()
    );
}

use std::path;
use std::process;

use env_logger;
use log;

use ext_int_sort::{Algorithm, ExternalSorterBuilder, MalformedLinePolicy};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let order: Order = arg_parser.value_of_t_or_exit("sort");
    let algorithm: AlgorithmArg = arg_parser.value_of_t_or_exit("algorithm");
    let malformed: MalformedLinePolicy = arg_parser.value_of_t_or_exit("malformed");
    let memory: f64 = arg_parser.value_of_t_or_exit("memory");
    let input = arg_parser.value_of("input").expect("value is required");

    let mut sorter_builder = ExternalSorterBuilder::new()
        .with_input(path::Path::new(input))
        .with_memory_budget_gib(memory)
        .with_algorithm(algorithm.into())
        .with_malformed_lines(malformed)
        .with_keep_partitions(arg_parser.is_present("keep_parts"));

    if arg_parser.is_present("sub_chunks") {
        sorter_builder = sorter_builder.with_sub_chunks(arg_parser.value_of_t_or_exit("sub_chunks"));
    }

    if let Some(parts_dir) = arg_parser.value_of("parts_dir") {
        sorter_builder = sorter_builder.with_partitions_dir(path::Path::new(parts_dir));
    }

    if let Some(output) = arg_parser.value_of("output") {
        sorter_builder = sorter_builder.with_output(path::Path::new(output));
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let result = sorter.sort_by(order.less());

    match result {
        Ok(summary) => println!(
            "{} records from {} partitions sorted into {}",
            summary.records,
            summary.partitions,
            summary.output.display()
        ),
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    }
}

/// Logging verbosity, `RUST_LOG` directives take precedence.
#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Quiet,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Quiet => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, true)
    }
}

/// Output record order.
#[derive(Copy, Clone, clap::ArgEnum)]
enum Order {
    Asc,
    Desc,
}

impl Order {
    fn less(self) -> fn(&i64, &i64) -> bool {
        match self {
            Order::Asc => |a, b| a < b,
            Order::Desc => |a, b| a > b,
        }
    }
}

impl std::str::FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Order as clap::ArgEnum>::from_str(s, true)
    }
}

fn possible_values<E: clap::ArgEnum + 'static>() -> impl Iterator<Item = clap::PossibleValue<'static>> {
    E::value_variants().iter().filter_map(|v| v.to_possible_value())
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum AlgorithmArg {
    Quick,
    Bubble,
    Std,
}

impl std::str::FromStr for AlgorithmArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <AlgorithmArg as clap::ArgEnum>::from_str(s, true)
    }
}

impl From<AlgorithmArg> for Algorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Quick => Algorithm::Quick,
            AlgorithmArg::Bubble => Algorithm::Bubble,
            AlgorithmArg::Std => Algorithm::Std,
        }
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("ext-int-sort")
        .about("external sorter for newline-delimited integer files")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("memory")
                .short('m')
                .long("memory")
                .help("memory budget in GiB")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<f64>() {
                    Ok(gib) if gib > 0.0 => Ok(()),
                    Ok(_) => Err("memory budget must be positive".to_string()),
                    Err(err) => Err(format!("memory budget format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file, <input>_sorted by default")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("algorithm")
                .short('a')
                .long("algorithm")
                .help("in-memory sorting algorithm")
                .takes_value(true)
                .default_value("quick")
                .possible_values(possible_values::<AlgorithmArg>()),
        )
        .arg(
            clap::Arg::new("sort")
                .short('s')
                .long("sort")
                .help("sorting order")
                .takes_value(true)
                .default_value("asc")
                .possible_values(possible_values::<Order>()),
        )
        .arg(
            clap::Arg::new("sub_chunks")
                .short('k')
                .long("sub-chunks")
                .help("number of raw reads each partition is assembled from")
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(n) if n > 0 => Ok(()),
                    _ => Err("sub-chunks number must be a positive integer".to_string()),
                }),
        )
        .arg(
            clap::Arg::new("parts_dir")
                .short('d')
                .long("parts-dir")
                .help("directory to store partition files, input directory by default")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("keep_parts")
                .long("keep-parts")
                .help("keep partition files after merging"),
        )
        .arg(
            clap::Arg::new("malformed")
                .long("malformed")
                .help("malformed line handling")
                .takes_value(true)
                .default_value("skip")
                .possible_values(["skip", "zero", "fail"]),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level, overridden by RUST_LOG")
                .takes_value(true)
                .default_value("warn")
                .possible_values(possible_values::<LogLevel>()),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(log_level.into())
        .parse_default_env()
        .format_target(false)
        .format_timestamp_secs()
        .init();
}

use std::path::PathBuf;

use structopt::StructOpt;

use random_trips::{generate, load_slot_definition, GeneratorSettings, RunSummary, TripGenResult};


#[derive(StructOpt, Debug)]
#[structopt(name = "random_trips",
            about = "Generates a random trip matrix for a traffic simulator from a road network")]
struct Opt {
    /// A yaml file giving values for any of the options below. Options given on the command line
    /// take precedence.
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
    /// The road network xml file
    #[structopt(short = "n", long = "network-file", parse(from_os_str))]
    network_file: Option<PathBuf>,
    /// Number of trips to generate, before any aggregation
    #[structopt(short = "t", long = "num-trips", allow_hyphen_values = true)]
    num_trips: Option<i64>,
    /// Where to write the trip matrix
    #[structopt(short = "o", long = "output-file", parse(from_os_str))]
    output_file: Option<PathBuf>,
    /// The latest start time allowed for a trip, in seconds (inclusive)
    #[structopt(short = "m", long = "max-time", allow_hyphen_values = true)]
    max_time: Option<i64>,
    /// Time slots with their share of trips, as a JSON/YAML list or a path to a file holding one.
    /// For example: '[{"name": "night", "start_hour": 0, "end_hour": 7, "percentage": 0.1}, ...]'.
    /// end_hour is exclusive. Without slots, start times are uniform up to the max time.
    #[structopt(long = "time-slots")]
    time_slots: Option<String>,
    /// Fraction of trips (0 to 1) whose destination is their origin
    #[structopt(long = "percentage-od-equal", allow_hyphen_values = true)]
    percentage_od_equal: Option<f64>,
    /// Merge trips with the same origin, destination and start time, and sort by start time
    #[structopt(long = "aggregate")]
    aggregate: bool,
    /// Seed for the random generator, to reproduce a previous run
    #[structopt(long = "seed")]
    seed: Option<u64>,
}

impl Opt {
    fn into_settings(self) -> TripGenResult<GeneratorSettings> {
        let time_slots = match &self.time_slots {
            Some(raw) => Some(load_slot_definition(raw, None)?),
            None => None,
        };
        Ok(GeneratorSettings {
            network_path: self.network_file,
            num_trips: self.num_trips,
            output_path: self.output_file,
            max_time_s: self.max_time,
            time_slots,
            od_equal_fraction: self.percentage_od_equal,
            aggregate: if self.aggregate { Some(true) } else { None },
            seed: self.seed,
        })
    }
}

fn run(opt: Opt) -> TripGenResult<RunSummary> {
    let file_settings = match &opt.config {
        Some(config_path) => GeneratorSettings::from_yaml_file(config_path)?,
        None => GeneratorSettings::default(),
    };
    let config = file_settings.overridden_by(opt.into_settings()?).resolve()?;
    generate(&config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();
    match run(opt) {
        Ok(summary) => {
            log::info!("Finished: {} records for {} trips (seed {})", summary.records_written,
                       summary.trips_generated, summary.seed);
        }
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    }
}

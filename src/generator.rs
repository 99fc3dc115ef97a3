// Ties a run together: load the network, plan start times and origin = destination trips, sample
// every trip, and write the matrix. Output is either streamed trip by trip, or, when aggregating,
// sampled in full, grouped, sorted, and then written.
use std::cmp::min;
use std::fs;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::path::Path;

use rand::Rng;
use rand::SeedableRng;
use rand_isaac::Isaac64Rng;
use rayon::prelude::*;

use super::aggregation;
use super::config::GeneratorConfig;
use super::error::TripGenError;
use super::error::TripGenResult;
use super::network_index::NetworkIndex;
use super::time_slots::StartTimes;
use super::trip_sampler;
use super::trip_sampler::SampledTrip;
use super::trip_sampler::Trip;
use super::trip_sampler::TripSampler;
use super::trip_writer::TripWriter;


// trips sampled per parallel work unit when aggregating.
const SAMPLING_CHUNK_SIZE: usize = 8192;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct RunSummary {
    pub seed: u64,
    pub trips_generated: usize,
    pub od_equal_trips: usize,
    pub records_written: usize,
}

/// Per-trip decisions made before sampling begins.
pub struct TripPlan {
    pub start_times: StartTimes,
    pub od_equal: Vec<bool>,
}

impl TripPlan {
    pub fn new<R>(config: &GeneratorConfig, network: &NetworkIndex, rng: &mut R) -> TripPlan
        where R: Rng + ?Sized
    {
        let start_times = StartTimes::plan(config.time_slots.as_deref(), config.num_trips,
                                           config.max_time_s, rng);
        let od_equal = trip_sampler::plan_od_equal_flags(config.num_trips,
                                                         config.od_equal_fraction,
                                                         network.is_single_node(), rng);
        TripPlan { start_times, od_equal }
    }

    pub fn num_trips(&self) -> usize {
        self.od_equal.len()
    }

    pub fn sample<'a, R>(&self, sampler: &TripSampler<'a>, trip_idx: usize, rng: &mut R)
                         -> SampledTrip<'a>
        where R: Rng + ?Sized
    {
        let start_s = self.start_times.start_for(trip_idx, rng);
        sampler.sample_trip(start_s, self.od_equal[trip_idx], rng)
    }
}

/// Samples every planned trip and writes each one as soon as it is drawn. Returns how many of
/// them start and end at the same node.
pub fn write_streaming<W, R>(sampler: &TripSampler, plan: &TripPlan,
                             writer: &mut TripWriter<W>, rng: &mut R) -> io::Result<usize>
    where W: io::Write, R: Rng + ?Sized
{
    let mut od_equal_trips = 0;
    for trip_idx in 0..plan.num_trips() {
        let sampled = plan.sample(sampler, trip_idx, rng);
        if sampled.is_od_equal() {
            od_equal_trips += 1;
        }
        writer.write_trip(&Trip::from_sampled(trip_idx, &sampled, 1))?;
    }
    Ok(od_equal_trips)
}

/// Samples every planned trip, in parallel chunks. Each chunk draws from its own generator,
/// seeded from `rng` in chunk order, so the result depends only on `rng`'s state.
pub fn sample_in_parallel<'a, R>(sampler: &TripSampler<'a>, plan: &TripPlan, rng: &mut R)
                                 -> Vec<SampledTrip<'a>>
    where R: Rng + ?Sized
{
    let num_trips = plan.num_trips();
    let chunks_and_seeds: Vec<(usize, u64)> = (0..num_trips).step_by(SAMPLING_CHUNK_SIZE)
        .map(|chunk_start| (chunk_start, rng.gen::<u64>()))
        .collect();
    log::debug!("Sampling {} trips in {} chunks", num_trips, chunks_and_seeds.len());

    let chunks: Vec<Vec<SampledTrip<'a>>> = chunks_and_seeds.par_iter().map(
        |(chunk_start, seed)| {
            let mut rng = Isaac64Rng::seed_from_u64(*seed);
            let chunk_end = min(chunk_start + SAMPLING_CHUNK_SIZE, num_trips);
            (*chunk_start..chunk_end).map(|trip_idx| plan.sample(sampler, trip_idx, &mut rng))
                                     .collect()
        }).collect();

    let mut sampled = Vec::with_capacity(num_trips);
    for chunk in chunks {
        sampled.extend(chunk);
    }
    sampled
}

/// Runs a whole generation as configured, writing the trip matrix to `config.output_path`.
/// If writing fails, whatever was written is removed.
pub fn generate(config: &GeneratorConfig) -> TripGenResult<RunSummary> {
    let seed = match config.seed {
        Some(seed) => seed,
        None => rand::thread_rng().gen(),
    };
    log::info!("Using random seed {}", seed);
    let mut rng = Isaac64Rng::seed_from_u64(seed);

    let network = NetworkIndex::load(&config.network_path)?;
    let sampler = TripSampler::new(&network)?;
    let plan = TripPlan::new(config, &network, &mut rng);

    log::info!("Generating {} trips into {}", config.num_trips, config.output_path.display());
    let (records_written, od_equal_trips) = if config.aggregate {
        let sampled = sample_in_parallel(&sampler, &plan, &mut rng);
        let od_equal_trips = sampled.iter().filter(|trip| trip.is_od_equal()).count();
        let records = aggregation::aggregate_and_sort(sampled);
        write_output(&config.output_path, |writer| writer.write_all(&records))?;
        (records.len(), od_equal_trips)
    } else {
        let (od_equal_trips, records_written) = write_output(&config.output_path, |writer| {
            let od_equal_trips = write_streaming(&sampler, &plan, writer, &mut rng)?;
            Ok((od_equal_trips, writer.num_written()))
        })?;
        (records_written, od_equal_trips)
    };

    log::info!("Wrote {} trip records ({} trips, {} with origin = destination) to {}",
               records_written, config.num_trips, od_equal_trips, config.output_path.display());
    Ok(RunSummary {
        seed,
        trips_generated: config.num_trips,
        od_equal_trips,
        records_written,
    })
}

/// Creates the output file and lets `fill` write records into it. Any failure removes the file.
fn write_output<T, F>(path: &Path, fill: F) -> TripGenResult<T>
    where F: FnOnce(&mut TripWriter<BufWriter<File>>) -> io::Result<T>
{
    let result = File::create(path).and_then(|file| {
        let mut writer = TripWriter::new(BufWriter::new(file))?;
        let value = fill(&mut writer)?;
        writer.finish()?;
        Ok(value)
    });
    result.map_err(|source| {
        remove_partial_output(path);
        TripGenError::WriteFailure { path: path.to_path_buf(), source }
    })
}

fn remove_partial_output(path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::remove_file(path) {
        Ok(()) => log::warn!("Removed partial output file {}", path.display()),
        Err(err) => log::error!("Could not remove partial output file {}: {}",
                                path.display(), err),
    }
}

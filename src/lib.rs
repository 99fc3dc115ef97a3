//! Generates random trip matrices for a traffic microsimulator from a road network description.
//!
//! A run reads the network's nodes and their outgoing links, decides each trip's start time
//! (uniformly, or spread over weighted time slots) and whether it must end where it starts,
//! samples origins, entry links and destinations, and writes the resulting trips as xml,
//! optionally merging identical trips into counted records.

// imports of other modules from this crate
mod config_utils;

mod error;
pub use error::{NetworkError, SlotError, TripGenError, TripGenResult};

mod network_index;
pub use network_index::NetworkIndex;

mod time_slots;
pub use time_slots::{allocate_start_times, load_slot_definition, parse_slots, StartTimes,
                     TimeSlot};

mod trip_sampler;
pub use trip_sampler::{plan_od_equal_flags, SampledTrip, Trip, TripSampler, TRIP_MODE};

mod aggregation;
pub use aggregation::{aggregate_and_sort, TripAggregator};

mod trip_writer;
pub use trip_writer::{TripWriter, MATRIX_ROOT_ELEMENT};

mod config;
pub use config::{GeneratorConfig, GeneratorSettings};

mod generator;
pub use generator::{generate, sample_in_parallel, write_streaming, RunSummary, TripPlan};

#[cfg(test)]
mod test_utils;

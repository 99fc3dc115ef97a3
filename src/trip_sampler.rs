use rand::Rng;
use rand::seq::SliceRandom;

use super::error::TripGenError;
use super::network_index::NetworkIndex;


pub const TRIP_MODE: &str = "car";
// extra destination redraws allowed beyond the network's node count.
const DESTINATION_RETRY_SLACK: usize = 5;

/// One draw from the sampler, before naming or aggregation. Ids borrow from the network.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct SampledTrip<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub link_origin: &'a str,
    pub start_s: u32,
}

impl<'a> SampledTrip<'a> {
    pub fn is_od_equal(&self) -> bool {
        self.origin == self.destination
    }
}

/// A record of the trip matrix, as written out.
#[derive(PartialEq, Debug, Clone)]
pub struct Trip<'a> {
    pub name: String,
    pub origin: &'a str,
    pub destination: &'a str,
    pub link_origin: &'a str,
    pub start_s: u32,
    // how many sampled trips this record stands for.
    pub count: u32,
    pub mode: &'static str,
    pub digital_rails_capable: bool,
}

impl<'a> Trip<'a> {
    /// Builds the record at (zero-based) position `idx` of the output.
    pub fn from_sampled(idx: usize, sampled: &SampledTrip<'a>, count: u32) -> Trip<'a> {
        Trip {
            name: trip_name(idx),
            origin: sampled.origin,
            destination: sampled.destination,
            link_origin: sampled.link_origin,
            start_s: sampled.start_s,
            count,
            mode: TRIP_MODE,
            digital_rails_capable: false,
        }
    }
}

pub fn trip_name(idx: usize) -> String {
    format!("trip_{}", idx + 1)
}

pub struct TripSampler<'a> {
    network: &'a NetworkIndex,
}

impl<'a> TripSampler<'a> {
    pub fn new(network: &'a NetworkIndex) -> Result<TripSampler<'a>, TripGenError> {
        if network.valid_origins().is_empty() {
            return Err(TripGenError::InputEmpty(
                String::from("no node has an outgoing link, so no trip can start anywhere")));
        }
        if network.is_single_node() {
            log::warn!("The network has only one node ('{}'); every trip will start and end there",
                       network.get_node_id(0));
        }
        Ok(TripSampler { network })
    }

    pub fn network(&self) -> &'a NetworkIndex {
        self.network
    }

    /// Draws one trip starting at `start_s`. The origin is uniform over valid origins and the
    /// link uniform over the origin's outgoing links. Unless `force_od_equal` is set (or there is
    /// only one node) the destination is uniform over all other nodes.
    pub fn sample_trip<R>(&self, start_s: u32, force_od_equal: bool, rng: &mut R)
                          -> SampledTrip<'a>
        where R: Rng + ?Sized
    {
        let network = self.network;
        let valid_origins = network.valid_origins();
        let origin_idx = valid_origins[rng.gen_range(0..valid_origins.len())];
        let origin = network.get_node_id(origin_idx);
        // valid origins always have at least one link
        let links = network.outgoing_links(origin);
        let link_origin = links[rng.gen_range(0..links.len())].as_str();

        let num_nodes = network.num_nodes();
        let destination_idx = if force_od_equal || num_nodes == 1 {
            origin_idx
        } else {
            let mut dest_idx = rng.gen_range(0..num_nodes);
            let mut attempts = 0;
            while dest_idx == origin_idx && attempts < num_nodes + DESTINATION_RETRY_SLACK {
                dest_idx = rng.gen_range(0..num_nodes);
                attempts += 1;
            }
            if dest_idx == origin_idx {
                // draw from every node except the origin
                let other = rng.gen_range(0..num_nodes - 1);
                dest_idx = if other >= origin_idx { other + 1 } else { other };
            }
            dest_idx
        };

        SampledTrip {
            origin,
            destination: network.get_node_id(destination_idx),
            link_origin,
            start_s,
        }
    }
}

/// Marks exactly `floor(total_trips * od_equal_fraction)` of the trips, chosen at random, as
/// trips that must end where they start. A single-node network marks all of them.
pub fn plan_od_equal_flags<R>(total_trips: usize, od_equal_fraction: f64, single_node: bool,
                              rng: &mut R) -> Vec<bool>
    where R: Rng + ?Sized
{
    let fraction = if single_node {
        if od_equal_fraction < 1. {
            log::warn!("Forcing all {} trips to have the same origin and destination on a \
                        single-node network", total_trips);
        }
        1.
    } else {
        od_equal_fraction
    };

    let num_equal = ((total_trips as f64 * fraction).floor() as usize).min(total_trips);
    log::info!("Target trips with origin = destination: {} ({:.2}%)", num_equal,
               fraction * 100.);
    let mut flags = vec![false; total_trips];
    for flag in flags.iter_mut().take(num_equal) {
        *flag = true;
    }
    flags.shuffle(rng);
    flags
}

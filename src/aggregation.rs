// Collapses sampled trips that share an origin, destination, and start time into one record
// with a count, then orders the records by start time.
use std::collections::HashMap;

use super::trip_sampler::SampledTrip;
use super::trip_sampler::Trip;


type AggregationKey<'a> = (&'a str, &'a str, u32);

struct TripGroup<'a> {
    // the first trip seen with this key. Its link is the one the record keeps.
    first: SampledTrip<'a>,
    count: u32,
}

#[derive(Default)]
pub struct TripAggregator<'a> {
    groups: Vec<TripGroup<'a>>,
    group_idxs_by_key: HashMap<AggregationKey<'a>, usize>,
    num_sampled: usize,
}

impl<'a> TripAggregator<'a> {
    pub fn new() -> TripAggregator<'a> {
        Self::default()
    }

    /// Adds one sampled trip. A trip whose key was already seen only bumps that group's count;
    /// its own link origin is dropped.
    pub fn add(&mut self, trip: SampledTrip<'a>) {
        self.num_sampled += 1;
        let key = (trip.origin, trip.destination, trip.start_s);
        match self.group_idxs_by_key.get(&key) {
            Some(&idx) => self.groups[idx].count += 1,
            None => {
                self.group_idxs_by_key.insert(key, self.groups.len());
                self.groups.push(TripGroup { first: trip, count: 1 });
            }
        }
    }

    pub fn num_sampled(&self) -> usize {
        self.num_sampled
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Produces one record per key, ordered by start time and named by that order. Groups with
    /// equal start times stay in the order their keys were first seen.
    pub fn into_sorted_trips(self) -> Vec<Trip<'a>> {
        log::info!("Grouped {} sampled trips into {} distinct (origin, destination, start) \
                    records", self.num_sampled, self.groups.len());
        let mut groups = self.groups;
        groups.sort_by_key(|group| group.first.start_s);
        groups.iter().enumerate()
              .map(|(ii, group)| Trip::from_sampled(ii, &group.first, group.count))
              .collect()
    }
}

/// Groups and sorts a whole stream of sampled trips in one go.
pub fn aggregate_and_sort<'a, I>(sampled_trips: I) -> Vec<Trip<'a>>
    where I: IntoIterator<Item = SampledTrip<'a>>
{
    let mut aggregator = TripAggregator::new();
    for trip in sampled_trips {
        aggregator.add(trip);
    }
    aggregator.into_sorted_trips()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn sampled(origin: &'static str, destination: &'static str, link_origin: &'static str,
               start_s: u32) -> SampledTrip<'static> {
        SampledTrip { origin, destination, link_origin, start_s }
    }

    #[test]
    fn test_collisions_collapse() {
        let trips = vec![
            sampled("a", "b", "a-b", 100),
            sampled("a", "c", "a-c", 50),
            sampled("a", "b", "a-x", 100),
            sampled("b", "a", "b-a", 100),
            sampled("a", "b", "a-y", 100),
        ];
        let records = aggregate_and_sort(trips);
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].origin, "a");
        assert_eq!(records[0].destination, "c");
        assert_eq!(records[0].count, 1);

        // the first link seen for a key wins
        assert_eq!((records[1].origin, records[1].destination), ("a", "b"));
        assert_eq!(records[1].count, 3);
        assert_eq!(records[1].link_origin, "a-b");

        assert_eq!((records[2].origin, records[2].destination), ("b", "a"));
        assert_eq!(records[2].count, 1);

        let total: u32 = records.iter().map(|rr| rr.count).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_records_are_sorted_and_renamed() {
        let trips = vec![
            sampled("a", "b", "a-b", 300),
            sampled("b", "c", "b-c", 10),
            sampled("c", "a", "c-a", 200),
            sampled("a", "c", "a-c", 10),
        ];
        let records = aggregate_and_sort(trips);
        let starts: Vec<u32> = records.iter().map(|rr| rr.start_s).collect();
        assert_eq!(starts, vec![10, 10, 200, 300]);
        let names: Vec<&str> = records.iter().map(|rr| rr.name.as_str()).collect();
        assert_eq!(names, vec!["trip_1", "trip_2", "trip_3", "trip_4"]);
        // ties keep first-seen order
        assert_eq!(records[0].origin, "b");
        assert_eq!(records[1].origin, "a");
    }

    #[test]
    fn test_different_start_times_are_different_keys() {
        let mut aggregator = TripAggregator::new();
        aggregator.add(sampled("a", "b", "a-b", 1));
        aggregator.add(sampled("a", "b", "a-b", 2));
        aggregator.add(sampled("a", "b", "a-b", 1));
        assert_eq!(aggregator.num_sampled(), 3);
        assert_eq!(aggregator.num_groups(), 2);
        let records = aggregator.into_sorted_trips();
        assert_eq!(records[0].count, 2);
        assert_eq!(records[1].count, 1);
        assert!(records.iter().all(|rr| rr.mode == "car" && !rr.digital_rails_capable));
    }

    #[test]
    fn test_empty_stream() {
        assert!(aggregate_and_sort(Vec::new()).is_empty());
    }
}

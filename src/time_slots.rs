//! Named windows of the day that each receive a share of the generated trips.
//!
//! Slot definitions are a list of `{name, start_hour, end_hour, percentage}` objects, written as
//! JSON or YAML. `end_hour` is exclusive, so a slot from 7 to 9 covers seconds 25200..=32399.
use std::cmp::min;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use rand::Rng;
use yaml_rust::Yaml;
use yaml_rust::YamlLoader;

use super::config_utils;
use super::error::SlotError;


const SECONDS_PER_HOUR: f64 = 3600.;
// shares summing to within this of 1.0 are used as given.
const SHARE_SUM_TOLERANCE: f64 = 0.001;

#[derive(PartialEq, Debug, Clone)]
pub struct TimeSlot {
    pub name: String,
    pub start_s: u32,
    // inclusive
    pub end_s: u32,
    pub share: f64,
}

impl TimeSlot {
    pub fn new(name: &str, start_s: u32, end_s: u32, share: f64) -> TimeSlot {
        TimeSlot {
            name: String::from(name),
            start_s,
            end_s,
            share,
        }
    }

    /// The slot's bounds once clipped to `max_time_s`, or None if nothing of it remains.
    pub fn usable_bounds(&self, max_time_s: u32) -> Option<(u32, u32)> {
        let end_s = min(self.end_s, max_time_s);
        if self.start_s <= end_s {
            Some((self.start_s, end_s))
        } else {
            None
        }
    }
}

/// Reads a slot definition given either as a path to a JSON/YAML file or as the document itself.
/// Relative paths are looked up under `base_dir` when one is given.
pub fn load_slot_definition(raw: &str, base_dir: Option<&Path>) -> Result<Yaml, SlotError> {
    let path = match base_dir {
        Some(dir) => config_utils::str_to_absolute_path(raw, dir),
        None => Path::new(raw).to_path_buf(),
    };
    if path.is_file() {
        log::debug!("Reading time slots from {}", path.display());
        let text = fs::read_to_string(&path).map_err(|source| SlotError::Unreadable {
            path: path.clone(),
            source,
        })?;
        parse_slot_document(&text)
    } else {
        parse_slot_document(raw)
    }
}

fn parse_slot_document(text: &str) -> Result<Yaml, SlotError> {
    let docs = YamlLoader::load_from_str(text)
        .map_err(|err| SlotError::Syntax(err.to_string()))?;
    docs.into_iter().next()
        .ok_or_else(|| SlotError::Syntax(String::from("the definition is empty")))
}

/// Validates a slot definition and prepares it for allocation: slots are sorted by start time,
/// checked for overlaps, dropped if they start after `max_time_s`, clipped to `max_time_s`, and
/// their shares normalized to sum to 1.
pub fn parse_slots(definition: &Yaml, max_time_s: u32) -> Result<Vec<TimeSlot>, SlotError> {
    let items = match definition {
        Yaml::Array(items) => items,
        Yaml::String(ss) => {
            return Err(SlotError::Syntax(
                format!("'{}' is neither a readable file nor a list of slots", ss)));
        }
        _ => return Err(SlotError::Syntax(String::from("time slots must be a list of objects"))),
    };

    let mut slots = items.iter().enumerate()
                         .map(|(ii, item)| parse_one_slot(ii, item))
                         .collect::<Result<Vec<TimeSlot>, SlotError>>()?;
    slots.sort_by_key(|slot| slot.start_s);

    for (prev, next) in slots.iter().tuple_windows() {
        if next.start_s <= prev.end_s {
            return Err(SlotError::Overlap {
                name: next.name.clone(),
                start_s: next.start_s,
                previous: prev.name.clone(),
                previous_end_s: prev.end_s,
            });
        }
    }

    slots.retain(|slot| {
        if slot.start_s > max_time_s {
            log::warn!("Time slot '{}' starts at {}s, after the max simulation time ({}s), and \
                        will be ignored", slot.name, slot.start_s, max_time_s);
            false
        } else {
            true
        }
    });
    if slots.is_empty() {
        return Err(SlotError::SumInvalid(
            format!("no time slot starts within the max simulation time ({}s)", max_time_s)));
    }
    for slot in slots.iter_mut() {
        slot.end_s = min(slot.end_s, max_time_s);
    }

    let total_share: f64 = slots.iter().map(|slot| slot.share).sum();
    if (total_share - 1.).abs() > SHARE_SUM_TOLERANCE {
        if total_share <= 0. {
            return Err(SlotError::SumInvalid(format!("shares sum to {}", total_share)));
        }
        log::warn!("Time slot shares sum to {:.4}, not 1.0; trips will be distributed \
                    proportionally", total_share);
        for slot in slots.iter_mut() {
            slot.share /= total_share;
        }
    }

    Ok(slots)
}

fn parse_one_slot(idx: usize, item: &Yaml) -> Result<TimeSlot, SlotError> {
    if item.as_hash().is_none() {
        return Err(SlotError::Syntax(format!("slot {} is not an object", idx + 1)));
    }
    let get_number = |key: &str| -> Result<f64, SlotError> {
        let value = &item[key];
        if value.is_badvalue() {
            return Err(SlotError::Syntax(format!("slot {} is missing '{}'", idx + 1, key)));
        }
        match config_utils::yaml_as_f64(value) {
            Some(number) if number.is_finite() => Ok(number),
            _ => Err(SlotError::Syntax(format!("slot {} has a non-numeric '{}'", idx + 1, key))),
        }
    };
    let start_hour = get_number("start_hour")?;
    let end_hour = get_number("end_hour")?;
    let percentage = get_number("percentage")?;
    let name = match item["name"].as_str() {
        Some(name) => String::from(name),
        None => format!("slot {}: {}h-{}h", idx + 1, start_hour, end_hour),
    };

    if start_hour < 0. {
        return Err(SlotError::Syntax(format!("'{}' has a negative start_hour", name)));
    }
    if percentage <= 0. || percentage > 1. {
        return Err(SlotError::Syntax(
            format!("'{}' has percentage {}, outside (0, 1]", name, percentage)));
    }
    if end_hour <= start_hour {
        return Err(SlotError::OutOfOrder { name, start_hour, end_hour });
    }

    let start_s = (start_hour * SECONDS_PER_HOUR) as i64;
    let end_s = (end_hour * SECONDS_PER_HOUR) as i64 - 1;
    if end_s < start_s {
        return Err(SlotError::OutOfOrder { name, start_hour, end_hour });
    }
    if end_s > u32::MAX as i64 {
        return Err(SlotError::Syntax(format!("'{}' ends too late to represent", name)));
    }

    Ok(TimeSlot::new(&name, start_s as u32, end_s as u32, percentage))
}

/// Draws exactly `total_trips` start times spread over `slots` according to their shares.
///
/// Each slot but the last gets `round(total_trips * share)` draws, and the last takes whatever
/// remains, so rounding never changes the total. Draws a slot can't hold (because nothing of it
/// lies within `max_time_s`) go to the last usable slot, or uniformly over the whole horizon if
/// there is none. The order of the result carries no meaning.
pub fn allocate_start_times<R>(slots: &[TimeSlot], total_trips: usize, max_time_s: u32,
                               rng: &mut R) -> Vec<u32>
    where R: Rng + ?Sized
{
    let mut start_times = Vec::with_capacity(total_trips);
    let mut allocated = 0;
    for (ii, slot) in slots.iter().enumerate() {
        let remaining = total_trips - allocated;
        let quota = if ii == slots.len() - 1 {
            remaining
        } else {
            min((total_trips as f64 * slot.share).round() as usize, remaining)
        };
        allocated += quota;

        match slot.usable_bounds(max_time_s) {
            Some((lo, hi)) => {
                log::info!("Time slot '{}': {}-{}s, {} trips ({:.1}%)", slot.name, lo, hi, quota,
                           slot.share * 100.);
                start_times.extend((0..quota).map(|_| rng.gen_range(lo..=hi)));
            }
            None => {
                log::warn!("Time slot '{}' lies outside the max simulation time ({}s); its {} \
                            trips will be reassigned", slot.name, max_time_s, quota);
            }
        }
    }

    if start_times.len() < total_trips {
        let shortfall = total_trips - start_times.len();
        let fallback = slots.iter().rev().filter_map(|slot| slot.usable_bounds(max_time_s)).next();
        let (lo, hi) = match fallback {
            Some(bounds) => bounds,
            None => {
                log::warn!("No usable time slot for the remaining {} trips; drawing them from \
                            [0, {}]", shortfall, max_time_s);
                (0, max_time_s)
            }
        };
        start_times.extend((0..shortfall).map(|_| rng.gen_range(lo..=hi)));
    }

    start_times.truncate(total_trips);
    start_times
}

/// Where each trip's start time comes from.
#[derive(Debug, Clone)]
pub enum StartTimes {
    /// Uniform over `[0, max_time_s]`, drawn as each trip is sampled.
    Uniform { max_time_s: u32 },
    /// One pre-drawn start time per trip.
    Pool(Vec<u32>),
}

impl StartTimes {
    pub fn plan<R>(slots: Option<&[TimeSlot]>, total_trips: usize, max_time_s: u32,
                   rng: &mut R) -> StartTimes
        where R: Rng + ?Sized
    {
        match slots {
            Some(slots) => {
                StartTimes::Pool(allocate_start_times(slots, total_trips, max_time_s, rng))
            }
            None => StartTimes::Uniform { max_time_s },
        }
    }

    pub fn start_for<R>(&self, trip_idx: usize, rng: &mut R) -> u32
        where R: Rng + ?Sized
    {
        match self {
            StartTimes::Uniform { max_time_s } => rng.gen_range(0..=*max_time_s),
            StartTimes::Pool(start_times) => start_times[trip_idx],
        }
    }
}

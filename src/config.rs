use std::path::Path;
use std::path::PathBuf;

use yaml_rust::Yaml;
use yaml_rust::YamlLoader;

use super::config_utils;
use super::error::TripGenError;
use super::error::TripGenResult;
use super::time_slots;
use super::time_slots::TimeSlot;


/// Run settings as given, from a config file and/or the command line. Nothing is validated until
/// `resolve` is called.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorSettings {
    pub network_path: Option<PathBuf>,
    pub num_trips: Option<i64>,
    pub output_path: Option<PathBuf>,
    pub max_time_s: Option<i64>,
    // a list of slot objects, already read from a file if one was named
    pub time_slots: Option<Yaml>,
    pub od_equal_fraction: Option<f64>,
    pub aggregate: Option<bool>,
    pub seed: Option<u64>,
}

/// A validated, immutable run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    // path to an xml file describing the road network
    pub network_path: PathBuf,
    // path the trip matrix will be written to
    pub output_path: PathBuf,
    // number of trips to sample (before any aggregation)
    pub num_trips: usize,
    // latest allowed start time, inclusive
    pub max_time_s: u32,
    // if given, start times are spread over these slots; otherwise uniform over the horizon
    pub time_slots: Option<Vec<TimeSlot>>,
    // fraction of trips whose destination is forced to equal their origin
    pub od_equal_fraction: f64,
    // whether trips sharing (origin, destination, start) are merged into counted records
    pub aggregate: bool,
    // seed for the run's random generator. A fresh one is drawn if absent.
    pub seed: Option<u64>,
}

impl GeneratorSettings {
    pub fn from_yaml_file(path: &Path) -> TripGenResult<GeneratorSettings> {
        let file_contents = std::fs::read_to_string(path).map_err(|err| {
            TripGenError::InputNotFound(format!("config file {}: {}", path.display(), err))
        })?;
        let yaml_cfgs = YamlLoader::load_from_str(&file_contents).map_err(|err| {
            TripGenError::InputMalformed(format!("config file {}: {}", path.display(), err))
        })?;
        let yaml_cfg = match yaml_cfgs.first() {
            Some(yaml_cfg) => yaml_cfg,
            None => return Ok(GeneratorSettings::default()),
        };
        let config_dir = match path.parent() {
            Some(dir) => dir,
            None => Path::new("."),
        };
        GeneratorSettings::from_yaml(yaml_cfg, config_dir)
    }

    /// Reads settings from a yaml mapping. Relative paths are taken relative to `config_dir`.
    pub fn from_yaml(yaml_cfg: &Yaml, config_dir: &Path) -> TripGenResult<GeneratorSettings> {
        if yaml_cfg.as_hash().is_none() {
            return Err(TripGenError::ConfigInvalid(String::from("config must be a mapping")));
        }
        let path_setting = |key: &str| -> TripGenResult<Option<PathBuf>> {
            Ok(optional_str(yaml_cfg, key)?
               .map(|path| config_utils::str_to_absolute_path(path, config_dir)))
        };

        let time_slots = match &yaml_cfg["time_slots"] {
            Yaml::BadValue | Yaml::Null => None,
            Yaml::String(raw) => Some(time_slots::load_slot_definition(raw, Some(config_dir))?),
            slots @ Yaml::Array(_) => Some(slots.clone()),
            _ => return Err(invalid_type("time_slots", "a list or a path")),
        };
        let seed = match optional_i64(yaml_cfg, "seed")? {
            Some(seed) if seed < 0 => {
                return Err(TripGenError::ConfigInvalid(
                    format!("seed must not be negative, got {}", seed)));
            }
            seed => seed.map(|ss| ss as u64),
        };

        Ok(GeneratorSettings {
            network_path: path_setting("network_path")?,
            num_trips: optional_i64(yaml_cfg, "num_trips")?,
            output_path: path_setting("output_path")?,
            max_time_s: optional_i64(yaml_cfg, "max_time_s")?,
            time_slots,
            od_equal_fraction: optional_f64(yaml_cfg, "od_equal_fraction")?,
            aggregate: optional_bool(yaml_cfg, "aggregate")?,
            seed,
        })
    }

    /// Combines two sets of settings; wherever `other` has a value, it wins.
    pub fn overridden_by(self, other: GeneratorSettings) -> GeneratorSettings {
        GeneratorSettings {
            network_path: other.network_path.or(self.network_path),
            num_trips: other.num_trips.or(self.num_trips),
            output_path: other.output_path.or(self.output_path),
            max_time_s: other.max_time_s.or(self.max_time_s),
            time_slots: other.time_slots.or(self.time_slots),
            od_equal_fraction: other.od_equal_fraction.or(self.od_equal_fraction),
            aggregate: other.aggregate.or(self.aggregate),
            seed: other.seed.or(self.seed),
        }
    }

    /// Checks every setting and builds the run configuration. Time slots are parsed here, so a
    /// bad slot definition is reported before any input is read.
    pub fn resolve(self) -> TripGenResult<GeneratorConfig> {
        let network_path = self.network_path.ok_or_else(|| missing("network file"))?;
        let output_path = self.output_path.ok_or_else(|| missing("output file"))?;

        let num_trips = self.num_trips.ok_or_else(|| missing("number of trips"))?;
        if num_trips <= 0 {
            return Err(TripGenError::ConfigInvalid(
                format!("the number of trips must be positive, got {}", num_trips)));
        }

        let max_time_s = self.max_time_s.ok_or_else(|| missing("max simulation time"))?;
        if max_time_s < 0 {
            return Err(TripGenError::ConfigInvalid(
                format!("the max simulation time must not be negative, got {}", max_time_s)));
        }
        if max_time_s > u32::MAX as i64 {
            return Err(TripGenError::ConfigInvalid(
                format!("the max simulation time {}s is too large", max_time_s)));
        }
        let max_time_s = max_time_s as u32;

        let od_equal_fraction = self.od_equal_fraction.unwrap_or(0.);
        if !(0. ..=1.).contains(&od_equal_fraction) {
            return Err(TripGenError::ConfigInvalid(format!(
                "the origin = destination fraction must be between 0 and 1, got {}",
                od_equal_fraction)));
        }

        let time_slots = match &self.time_slots {
            Some(definition) => Some(time_slots::parse_slots(definition, max_time_s)?),
            None => None,
        };

        Ok(GeneratorConfig {
            network_path,
            output_path,
            num_trips: num_trips as usize,
            max_time_s,
            time_slots,
            od_equal_fraction,
            aggregate: self.aggregate.unwrap_or(false),
            seed: self.seed,
        })
    }
}

fn missing(what: &str) -> TripGenError {
    TripGenError::ConfigInvalid(format!("no {} was given", what))
}

fn invalid_type(key: &str, expected: &str) -> TripGenError {
    TripGenError::ConfigInvalid(format!("'{}' must be {}", key, expected))
}

fn optional_str<'y>(yaml_cfg: &'y Yaml, key: &str) -> TripGenResult<Option<&'y str>> {
    match &yaml_cfg[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::String(value) => Ok(Some(value.as_str())),
        _ => Err(invalid_type(key, "a string")),
    }
}

fn optional_i64(yaml_cfg: &Yaml, key: &str) -> TripGenResult<Option<i64>> {
    match &yaml_cfg[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        value => match config_utils::yaml_as_i64(value) {
            Some(number) => Ok(Some(number)),
            None => Err(invalid_type(key, "an integer")),
        },
    }
}

fn optional_f64(yaml_cfg: &Yaml, key: &str) -> TripGenResult<Option<f64>> {
    match &yaml_cfg[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        value => match config_utils::yaml_as_f64(value) {
            Some(number) => Ok(Some(number)),
            None => Err(invalid_type(key, "a number")),
        },
    }
}

fn optional_bool(yaml_cfg: &Yaml, key: &str) -> TripGenResult<Option<bool>> {
    match &yaml_cfg[key] {
        Yaml::BadValue | Yaml::Null => Ok(None),
        Yaml::Boolean(value) => Ok(Some(*value)),
        _ => Err(invalid_type(key, "true or false")),
    }
}

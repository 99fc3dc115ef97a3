use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use glob::glob;
use tempfile::tempdir;
use xml::reader::EventReader;
use xml::reader::XmlEvent;
use yaml_rust::YamlLoader;

use random_trips::generate;
use random_trips::load_slot_definition;
use random_trips::GeneratorSettings;
use random_trips::NetworkIndex;
use random_trips::TripGenError;
use random_trips::MATRIX_ROOT_ELEMENT;


#[derive(Debug, Clone, PartialEq)]
struct OutputTrip {
    name: String,
    origin: String,
    destination: String,
    link_origin: String,
    count: u32,
    start: u32,
    mode: String,
    digital_rails_capable: String,
}

/// Reads back a trip matrix, checking the root element on the way.
fn read_trips(path: &Path) -> Vec<OutputTrip> {
    let parser = EventReader::new(BufReader::new(File::open(path).unwrap()));
    let mut trips = vec![];
    let mut saw_root = false;
    for event in parser {
        match event.unwrap() {
            XmlEvent::StartElement { name, attributes, .. } => {
                if name.local_name == MATRIX_ROOT_ELEMENT {
                    saw_root = true;
                    continue;
                }
                assert_eq!(name.local_name, "trip");
                let attr = |key: &str| attributes.iter()
                    .find(|attr| attr.name.local_name == key)
                    .map(|attr| attr.value.clone())
                    .unwrap_or_else(|| panic!("trip is missing '{}'", key));
                trips.push(OutputTrip {
                    name: attr("name"),
                    origin: attr("origin"),
                    destination: attr("destination"),
                    link_origin: attr("link_origin"),
                    count: attr("count").parse().unwrap(),
                    start: attr("start").parse().unwrap(),
                    mode: attr("mode"),
                    digital_rails_capable: attr("digital_rails_capable"),
                });
            }
            _ => (),
        }
    }
    assert!(saw_root, "no <{}> element in {:?}", MATRIX_ROOT_ELEMENT, path);
    trips
}

fn settings_for(network_path: &Path, output_path: &Path, num_trips: i64, max_time_s: i64)
                -> GeneratorSettings {
    GeneratorSettings {
        network_path: Some(network_path.to_path_buf()),
        num_trips: Some(num_trips),
        output_path: Some(output_path.to_path_buf()),
        max_time_s: Some(max_time_s),
        seed: Some(1234),
        ..Default::default()
    }
}

fn env_networks() -> Vec<PathBuf> {
    let paths: Vec<PathBuf> = glob("tests/envs/*.xml").expect("Failed to read glob pattern")
        .map(|path| path.unwrap())
        .collect();
    assert!(!paths.is_empty());
    paths
}

fn check_trips_follow_network(trips: &[OutputTrip], network: &NetworkIndex) {
    for trip in trips {
        assert!(network.is_valid_origin(&trip.origin), "bad origin {}", trip.origin);
        assert!(network.get_node_idx(&trip.destination).is_some());
        assert!(network.outgoing_links(&trip.origin).contains(&trip.link_origin));
        assert_eq!(trip.mode, "car");
        assert_eq!(trip.digital_rails_capable, "false");
    }
}

#[test]
fn test_streaming_general() {
    let out_dir = tempdir().unwrap();
    for network_path in env_networks() {
        println!("Testing {:?}", network_path);
        let output_path = out_dir.path().join("trips.xml");
        let config = settings_for(&network_path, &output_path, 500, 3600).resolve().unwrap();
        let summary = generate(&config).unwrap();
        assert_eq!(summary.seed, 1234);
        assert_eq!(summary.trips_generated, 500);
        assert_eq!(summary.records_written, 500);

        let network = NetworkIndex::load(&network_path).unwrap();
        let trips = read_trips(&output_path);
        assert_eq!(trips.len(), 500);
        check_trips_follow_network(&trips, &network);
        for (ii, trip) in trips.iter().enumerate() {
            assert_eq!(trip.name, format!("trip_{}", ii + 1));
            assert_eq!(trip.count, 1);
            assert!(trip.start <= 3600);
        }
        // with no forced loops, a destination is only the origin when nothing else was drawn
        assert_eq!(summary.od_equal_trips, 0);
        assert!(trips.iter().all(|trip| trip.origin != trip.destination));
    }
}

#[test]
fn test_time_slot_shares() {
    let out_dir = tempdir().unwrap();
    let output_path = out_dir.path().join("trips.xml");
    let mut settings = settings_for(Path::new("tests/envs/grid.xml"), &output_path, 1000, 86399);
    settings.time_slots = Some(load_slot_definition("tests/slots_day.json", None).unwrap());
    generate(&settings.resolve().unwrap()).unwrap();

    let trips = read_trips(&output_path);
    assert_eq!(trips.len(), 1000);
    let mut counts_by_slot = [0; 3];
    for trip in &trips {
        let slot_idx = match trip.start {
            0..=25199 => 0,
            25200..=61199 => 1,
            61200..=86399 => 2,
            other => panic!("start time {} is outside every slot", other),
        };
        counts_by_slot[slot_idx] += 1;
    }
    assert_eq!(counts_by_slot, [100, 300, 600]);
}

#[test]
fn test_od_equal_quota() {
    let out_dir = tempdir().unwrap();
    for aggregate in &[false, true] {
        let output_path = out_dir.path().join("trips.xml");
        let mut settings = settings_for(Path::new("tests/envs/grid.xml"), &output_path, 400,
                                        600);
        settings.od_equal_fraction = Some(0.25);
        settings.aggregate = Some(*aggregate);
        let summary = generate(&settings.resolve().unwrap()).unwrap();
        assert_eq!(summary.od_equal_trips, 100);

        let trips = read_trips(&output_path);
        let od_equal: u32 = trips.iter()
            .filter(|trip| trip.origin == trip.destination)
            .map(|trip| trip.count)
            .sum();
        assert_eq!(od_equal, 100);
    }
}

#[test]
fn test_aggregated_output() {
    let out_dir = tempdir().unwrap();
    for network_path in env_networks() {
        println!("Testing {:?}", network_path);
        let output_path = out_dir.path().join("trips.xml");
        // a tiny horizon on small networks forces many identical trips
        let mut settings = settings_for(&network_path, &output_path, 2000, 3);
        settings.aggregate = Some(true);
        let summary = generate(&settings.resolve().unwrap()).unwrap();

        let trips = read_trips(&output_path);
        assert_eq!(trips.len(), summary.records_written);
        assert!(trips.len() < 2000);
        let total: u32 = trips.iter().map(|trip| trip.count).sum();
        assert_eq!(total, 2000);

        let mut keys = HashSet::new();
        let mut last_start = 0;
        for (ii, trip) in trips.iter().enumerate() {
            assert_eq!(trip.name, format!("trip_{}", ii + 1));
            assert!(trip.start >= last_start);
            assert!(trip.start <= 3);
            last_start = trip.start;
            let key = (trip.origin.clone(), trip.destination.clone(), trip.start);
            assert!(keys.insert(key), "records were not merged: {:?}", trip);
        }

        let network = NetworkIndex::load(&network_path).unwrap();
        check_trips_follow_network(&trips, &network);
    }
}

#[test]
fn test_single_node_network() {
    let out_dir = tempdir().unwrap();
    let output_path = out_dir.path().join("trips.xml");
    let config = settings_for(Path::new("tests/single/single_node.xml"), &output_path, 50, 100)
        .resolve().unwrap();
    let summary = generate(&config).unwrap();
    assert_eq!(summary.od_equal_trips, 50);

    let trips = read_trips(&output_path);
    assert_eq!(trips.len(), 50);
    for trip in &trips {
        assert_eq!(trip.origin, "hub");
        assert_eq!(trip.destination, "hub");
        assert_eq!(trip.link_origin, "hub-loop");
    }
}

#[test]
fn test_bad_networks_write_nothing() {
    let out_dir = tempdir().unwrap();
    let cases = vec![
        ("tests/bad/malformed.xml", "malformed"),
        ("tests/bad/no_nodes.xml", "empty"),
        ("tests/bad/no_origins.xml", "empty"),
        ("tests/bad/does_not_exist.xml", "not found"),
    ];
    for (network_path, expected) in cases {
        let output_path = out_dir.path().join("trips.xml");
        let config = settings_for(Path::new(network_path), &output_path, 10, 100)
            .resolve().unwrap();
        let result = generate(&config);
        match (expected, &result) {
            ("malformed", Err(TripGenError::InputMalformed(_))) => (),
            ("empty", Err(TripGenError::InputEmpty(_))) => (),
            ("not found", Err(TripGenError::InputNotFound(_))) => (),
            _ => panic!("{}: expected {} error, got {:?}", network_path, expected, result),
        }
        assert!(!output_path.exists(), "{} left an output file", network_path);
    }
}

#[test]
fn test_unwritable_output() {
    let out_dir = tempdir().unwrap();
    let output_path = out_dir.path().join("no_such_dir").join("trips.xml");
    let config = settings_for(Path::new("tests/envs/grid.xml"), &output_path, 10, 100)
        .resolve().unwrap();
    match generate(&config) {
        Err(TripGenError::WriteFailure { path, .. }) => assert_eq!(path, output_path),
        other => panic!("expected a write failure, got {:?}", other),
    }
    assert!(!output_path.exists());
}

#[test]
fn test_same_seed_same_output() {
    let out_dir = tempdir().unwrap();
    for aggregate in &[false, true] {
        let mut outputs = vec![];
        for run in 0..2 {
            let output_path = out_dir.path().join(format!("trips_{}.xml", run));
            let mut settings = settings_for(Path::new("tests/envs/dead_ends.xml"), &output_path,
                                            3000, 900);
            settings.od_equal_fraction = Some(0.1);
            settings.aggregate = Some(*aggregate);
            generate(&settings.resolve().unwrap()).unwrap();
            outputs.push(std::fs::read_to_string(&output_path).unwrap());
        }
        assert_eq!(outputs[0], outputs[1]);
    }
}

#[test]
fn test_reserved_characters_survive() {
    let out_dir = tempdir().unwrap();
    let output_path = out_dir.path().join("trips.xml");
    let config = settings_for(Path::new("tests/envs/special_chars.xml"), &output_path, 200, 60)
        .resolve().unwrap();
    generate(&config).unwrap();

    let mut counts_by_origin = HashMap::new();
    for trip in read_trips(&output_path) {
        *counts_by_origin.entry(trip.origin).or_insert(0) += 1;
    }
    let expected: HashSet<&str> = ["A&B", "<north>", "say \"hi\""].iter().copied().collect();
    assert!(counts_by_origin.keys().all(|origin| expected.contains(origin.as_str())));
    // 200 draws over three origins should reach all of them
    assert_eq!(counts_by_origin.len(), 3);
}

#[test]
fn test_run_from_config_file() {
    let out_dir = tempdir().unwrap();
    let network_path = std::fs::canonicalize("tests/envs/grid.xml").unwrap();
    let slots_path = std::fs::canonicalize("tests/slots_day.json").unwrap();
    let config_text = format!("
network_path: {}
output_path: trips.xml
num_trips: 300
max_time_s: 86399
od_equal_fraction: 0.5
aggregate: false
seed: 99
time_slots: {}
", network_path.display(), slots_path.display());
    let config_path = out_dir.path().join("config.yaml");
    std::fs::write(&config_path, config_text).unwrap();

    let file_settings = GeneratorSettings::from_yaml_file(&config_path).unwrap();
    // a command line value replaces the one in the file
    let cli_settings = GeneratorSettings { num_trips: Some(200), ..Default::default() };
    let config = file_settings.overridden_by(cli_settings).resolve().unwrap();
    assert_eq!(config.output_path, out_dir.path().join("trips.xml"));
    assert_eq!(config.time_slots.as_ref().map(|slots| slots.len()), Some(3));

    let summary = generate(&config).unwrap();
    assert_eq!(summary.seed, 99);
    assert_eq!(summary.od_equal_trips, 100);
    assert_eq!(read_trips(&config.output_path).len(), 200);
}

#[test]
fn test_inline_slot_definition() {
    let slots = YamlLoader::load_from_str(
        r#"[{"start_hour": 1, "end_hour": 2, "percentage": 1.0}]"#).unwrap().remove(0);
    let out_dir = tempdir().unwrap();
    let output_path = out_dir.path().join("trips.xml");
    let mut settings = settings_for(Path::new("tests/envs/grid.xml"), &output_path, 100, 86399);
    settings.time_slots = Some(slots);
    generate(&settings.resolve().unwrap()).unwrap();
    assert!(read_trips(&output_path).iter().all(|trip| (3600..=7199).contains(&trip.start)));
}

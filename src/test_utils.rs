use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use tempfile::tempdir;
use tempfile::TempDir;

use super::network_index::NetworkIndex;


// "d" is reachable but has no outgoing links, "e" only has a link with no id.
pub static SMALL_NETWORK_XML: &str = r###"<?xml version="1.0" encoding="utf-8"?>
<network>
    <nodes>
        <node id="a" x="0.0" y="0.0"/>
        <node id="b" x="100.0" y="0.0"/>
        <node id="c" x="100.0" y="100.0"/>
        <node id="d" x="0.0" y="100.0"/>
        <node id="e" x="50.0" y="50.0"/>
    </nodes>
    <links>
        <link id="a-b" from="a" to="b"/>
        <link id="a-c" from="a" to="c"/>
        <link id="b-c" from="b" to="c"/>
        <link id="c-d" from="c" to="d"/>
        <link id="c-a" from="c" to="a"/>
        <link from="e" to="a"/>
    </links>
</network>
"###;

pub static SINGLE_NODE_XML: &str = r###"<?xml version="1.0" encoding="utf-8"?>
<network>
    <nodes><node id="only"/></nodes>
    <links><link id="loop" from="only" to="only"/></links>
</network>
"###;

pub fn network_from_str(xml: &str) -> NetworkIndex {
    NetworkIndex::from_reader(xml.as_bytes(), "test network").unwrap()
}

/// Writes `contents` to a new file in a fresh temporary directory. The directory is deleted when
/// the returned handle is dropped.
pub fn write_temp_file(file_name: &str, contents: &str) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempdir()?;
    let file_path = dir.path().join(file_name);
    let mut file = File::create(&file_path)?;
    file.write_all(contents.as_bytes())?;
    Ok((dir, file_path))
}

/// Checks that the contents of two hashmaps are the same.
pub fn compare_hashmaps<KK, VV>(query_map: &HashMap<KK, VV>, true_map: &HashMap<KK, VV>)
    where KK: Debug + Eq + std::hash::Hash,
    VV: Debug + PartialEq,
{
    assert_eq!(query_map.len(), true_map.len());
    for (true_key, true_val) in true_map {
        match query_map.get(true_key) {
            Some(val) => assert_eq!(val, true_val),
            None => panic!("Key {:?} missing!", true_key),
        }
    }
}

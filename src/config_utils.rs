use std::fs::File;
use std::io;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use xml::reader::EventReader;
use xml::attribute::OwnedAttribute;
use yaml_rust::Yaml;


pub fn xml_parser_from_path(path: &Path) -> io::Result<EventReader<BufReader<File>>> {
    let file = File::open(path)?;
    let file = BufReader::new(file);
    Ok(EventReader::new(file))
}

pub fn get_xml_attribute_value(attributes: &[OwnedAttribute], attr_name: &str)
                               -> Option<String> {
    attributes.iter()
              .find(|attr| attr.name.local_name == attr_name)
              .map(|attr| attr.value.clone())
}

pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

/// Reads a yaml number as a float, whether it was written as an integer, a real, or a quoted
/// string.
pub fn yaml_as_f64(value: &Yaml) -> Option<f64> {
    match value {
        Yaml::Integer(ii) => Some(*ii as f64),
        Yaml::Real(_) => value.as_f64(),
        Yaml::String(ss) => ss.trim().parse().ok(),
        _ => None,
    }
}

pub fn yaml_as_i64(value: &Yaml) -> Option<i64> {
    match value {
        Yaml::Integer(ii) => Some(*ii),
        Yaml::String(ss) => ss.trim().parse().ok(),
        _ => None,
    }
}

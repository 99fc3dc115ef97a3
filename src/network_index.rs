// An index over a road network description: which nodes exist, and which links leave each one.
// Only node ids and link from/id attributes are read; everything else in the file is skipped.
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::Read;
use std::path::Path;

use xml::reader::EventReader;
use xml::reader::XmlEvent;

use super::config_utils;
use super::error::NetworkError;


/// Which region of the network document the parser is currently inside.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
enum ParseContext {
    Neither,
    InNodes,
    InLinks,
}

#[derive(Debug)]
pub struct NetworkIndex {
    node_ids_by_idx: Vec<String>,
    node_idxs_by_id: HashMap<String, usize>,
    outgoing_links: HashMap<String, Vec<String>>,
    // indices of nodes with at least one outgoing link, in node order.
    valid_origins: Vec<usize>,
}

impl NetworkIndex {
    /// Streams the network file at `path` and builds the index.
    pub fn load(path: &Path) -> Result<NetworkIndex, NetworkError> {
        log::info!("Reading network from {}", path.display());
        let parser = config_utils::xml_parser_from_path(path).map_err(|source| {
            NetworkError::Unreadable { path: path.to_path_buf(), source }
        })?;
        Self::from_parser(parser, path)
    }

    /// Builds the index from any xml source. `source_name` only appears in diagnostics.
    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> Result<NetworkIndex, NetworkError> {
        Self::from_parser(EventReader::new(reader), Path::new(source_name))
    }

    fn from_parser<R: Read>(mut parser: EventReader<R>, path: &Path)
                            -> Result<NetworkIndex, NetworkError> {
        let mut node_ids_by_idx = vec![];
        let mut node_idxs_by_id = HashMap::new();
        let mut outgoing_links: HashMap<String, Vec<String>> = HashMap::new();
        let mut context = ParseContext::Neither;
        let mut num_links = 0;
        let mut skipped_links = 0;

        loop {
            let event = parser.next().map_err(|err| NetworkError::Malformed {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

            match event {
                XmlEvent::StartElement{ name, attributes, .. } => {
                    match (context, name.local_name.as_str()) {
                        (_, "nodes") => context = ParseContext::InNodes,
                        (_, "links") => context = ParseContext::InLinks,
                        (ParseContext::InNodes, "node") => {
                            let id = match config_utils::get_xml_attribute_value(&attributes, "id") {
                                Some(id) if !id.is_empty() => id,
                                _ => continue,
                            };
                            match node_idxs_by_id.entry(id) {
                                Entry::Occupied(entry) => {
                                    log::warn!("Node {} appears more than once, keeping the first",
                                               entry.key());
                                }
                                Entry::Vacant(entry) => {
                                    node_ids_by_idx.push(entry.key().clone());
                                    entry.insert(node_ids_by_idx.len() - 1);
                                }
                            }
                        }
                        (ParseContext::InLinks, "link") => {
                            let from_id = config_utils::get_xml_attribute_value(&attributes, "from");
                            let link_id = config_utils::get_xml_attribute_value(&attributes, "id");
                            match (from_id, link_id) {
                                (Some(from_id), Some(link_id))
                                if !from_id.is_empty() && !link_id.is_empty() => {
                                    outgoing_links.entry(from_id).or_insert_with(Vec::new)
                                                  .push(link_id);
                                    num_links += 1;
                                }
                                _ => skipped_links += 1,
                            }
                        }
                        _ => (),
                    }
                }
                XmlEvent::EndElement{ name } => {
                    if name.local_name == "nodes" {
                        log::info!("Processed {} nodes", node_ids_by_idx.len());
                        context = ParseContext::Neither;
                    } else if name.local_name == "links" {
                        log::info!("Processed {} links from {} distinct origins", num_links,
                                   outgoing_links.len());
                        context = ParseContext::Neither;
                    }
                }
                XmlEvent::EndDocument => {
                    log::debug!("Reached end of network xml");
                    break;
                }
                _ => (),
            }
        }

        if skipped_links > 0 {
            log::debug!("Skipped {} links without both 'from' and 'id'", skipped_links);
        }
        if node_ids_by_idx.is_empty() {
            return Err(NetworkError::Empty {
                path: path.to_path_buf(),
                reason: String::from("no <node> with an 'id' attribute inside <nodes>"),
            });
        }
        if outgoing_links.is_empty() {
            log::warn!("No <link> with valid 'from' and 'id' attributes in {}", path.display());
        }

        let valid_origins: Vec<usize> = node_ids_by_idx.iter().enumerate()
            .filter(|(_, id)| outgoing_links.get(*id).map_or(false, |links| !links.is_empty()))
            .map(|(ii, _)| ii)
            .collect();

        if valid_origins.is_empty() && !outgoing_links.is_empty() {
            return Err(NetworkError::Empty {
                path: path.to_path_buf(),
                reason: String::from("links exist, but none leaves a known node"),
            });
        }

        let orphan_origins = outgoing_links.keys()
            .filter(|from_id| !node_idxs_by_id.contains_key(*from_id))
            .count();
        if orphan_origins > 0 {
            log::warn!("{} link origins do not match any node id", orphan_origins);
        }

        Ok(NetworkIndex {
            node_ids_by_idx,
            node_idxs_by_id,
            outgoing_links,
            valid_origins,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.node_ids_by_idx.len()
    }

    pub fn node_ids(&self) -> &[String] {
        &self.node_ids_by_idx
    }

    pub fn get_node_id(&self, idx: usize) -> &str {
        &self.node_ids_by_idx[idx]
    }

    pub fn get_node_idx(&self, node_id: &str) -> Option<usize> {
        self.node_idxs_by_id.get(node_id).copied()
    }

    /// The links leaving `node_id`. Empty for nodes that are not valid origins.
    pub fn outgoing_links(&self, node_id: &str) -> &[String] {
        match self.outgoing_links.get(node_id) {
            Some(links) => links,
            None => &[],
        }
    }

    /// Node indices that have at least one outgoing link.
    pub fn valid_origins(&self) -> &[usize] {
        &self.valid_origins
    }

    pub fn is_valid_origin(&self, node_id: &str) -> bool {
        !self.outgoing_links(node_id).is_empty() && self.node_idxs_by_id.contains_key(node_id)
    }

    pub fn is_single_node(&self) -> bool {
        self.node_ids_by_idx.len() == 1
    }
}

//! Altium schematic decoding: OLE container → record stream → hierarchy →
//! spatial net extraction → universal netlist.

pub mod hierarchy;
pub mod nets;
pub mod records;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use xnet_cfb::CompoundFile;
use xnet_sch::{Netlist, PinEntry, NC_NET};

use crate::DecodeError;
use hierarchy::{build_hierarchy, extract_components, ExtractedComponents};
use nets::{collect_connectables, group_nets, DeviceKind, NetGroup};
use records::parse_records;

/// Name of the compound-document stream holding the schematic records.
const SCHEMATIC_STREAM: &str = "FileHeader";

/// Decode a binary `.SchDoc` compound document.
pub fn parse_schdoc(path: &Path) -> Result<Netlist, DecodeError> {
    let container = CompoundFile::open(path)?;
    let stream = container.read_stream(SCHEMATIC_STREAM)?;
    decode_file_header(&stream)
}

/// Decode the raw bytes of a `FileHeader` stream.
pub fn decode_file_header(data: &[u8]) -> Result<Netlist, DecodeError> {
    let stream = parse_records(data)?;
    debug!(
        "record stream: {} header, {} body records",
        stream.header.len(),
        stream.body.len()
    );
    let arena = build_hierarchy(stream.body);
    let extracted = extract_components(&arena);
    let devices = collect_connectables(&arena);
    let groups = group_nets(&devices, &extracted.pin_owner);
    Ok(project(groups, &devices, extracted))
}

/// Decode a `.PrjPcb` project: an INI-like file whose `DocumentPath=` lines
/// name the schematic documents, merged into a single netlist.
pub fn parse_project(path: &Path) -> Result<Netlist, DecodeError> {
    let text = fs::read_to_string(path)?;
    let dir = path.parent().unwrap_or(Path::new("."));

    let mut documents = Vec::new();
    for line in text.lines() {
        let Some(relative) = line.trim().strip_prefix("DocumentPath=") else {
            continue;
        };
        let relative = relative.trim().replace('\\', "/");
        if !relative.to_lowercase().ends_with(".schdoc") {
            continue;
        }
        let document = dir.join(&relative);
        if !document.exists() {
            warn!("project references missing document {}", document.display());
            continue;
        }
        documents.push(parse_schdoc(&document)?);
    }

    if documents.is_empty() {
        return Err(DecodeError::EmptyProject(path.to_path_buf()));
    }
    Ok(merge_documents(documents))
}

/// Project extracted net groups onto the universal model.
///
/// Nets holding a single pin and nothing else are suppressed; surviving
/// groups get their assigned name or a fresh `UnnamedNet<k>`. Pins the
/// geometry never connected anywhere are normalized to `NC`.
fn project(
    groups: Vec<NetGroup>,
    devices: &[nets::Device],
    extracted: ExtractedComponents,
) -> Netlist {
    let mut netlist = Netlist {
        nets: BTreeMap::new(),
        components: extracted.components,
    };

    let mut unnamed = 0usize;
    for group in groups {
        if group.devices.len() == 1 && devices[group.devices[0]].kind == DeviceKind::Pin {
            continue;
        }
        let members: Vec<&(String, String)> = group
            .devices
            .iter()
            .filter(|&&i| devices[i].kind == DeviceKind::Pin)
            .filter_map(|&i| extracted.pin_owner.get(&devices[i].record_index))
            .collect();
        if members.is_empty() {
            continue;
        }
        let name = group.name.clone().unwrap_or_else(|| {
            unnamed += 1;
            format!("UnnamedNet{unnamed}")
        });
        for (refdes, pin) in members {
            netlist.link(&name, refdes, pin);
        }
    }

    // Pins never linked by any surviving net are unconnected.
    let floating: Vec<(String, String)> = netlist
        .components
        .iter()
        .flat_map(|(refdes, component)| {
            component
                .pins
                .iter()
                .filter(|(_, entry)| entry.net().is_empty())
                .map(|(pin, _)| (refdes.clone(), pin.clone()))
        })
        .collect();
    for (refdes, pin) in floating {
        netlist.link("", &refdes, &pin);
    }

    netlist
}

/// Merge per-sheet netlists. Nets merge by name (power ports and labels
/// connect across sheets); a pin linked to a real net on any sheet wins
/// over an `NC` sighting on another.
fn merge_documents(documents: Vec<Netlist>) -> Netlist {
    let mut merged = Netlist::new();

    for document in &documents {
        for (refdes, component) in &document.components {
            let target = merged.components.entry(refdes.clone()).or_default();
            if target.mpn.is_none() {
                target.mpn = component.mpn.clone();
            }
            if target.description.is_none() {
                target.description = component.description.clone();
            }
            if target.comment.is_none() {
                target.comment = component.comment.clone();
            }
            if target.value.is_none() {
                target.value = component.value.clone();
            }
            for (pin, entry) in &component.pins {
                target
                    .pins
                    .entry(pin.clone())
                    .or_insert_with(|| match entry {
                        PinEntry::Named { name, .. } => PinEntry::Named {
                            name: name.clone(),
                            net: String::new(),
                        },
                        PinEntry::Net(_) => PinEntry::Net(String::new()),
                    });
            }
        }
    }

    // Resolve each pin to its strongest sighting across sheets.
    let mut chosen: BTreeMap<(String, String), String> = BTreeMap::new();
    for document in &documents {
        for (net, members) in &document.nets {
            for (refdes, pins) in members {
                for pin in pins {
                    let key = (refdes.clone(), pin.clone());
                    let replace = match chosen.get(&key) {
                        None => true,
                        Some(current) => current == NC_NET && net != NC_NET,
                    };
                    if replace {
                        chosen.insert(key, net.clone());
                    }
                }
            }
        }
    }
    for ((refdes, pin), net) in chosen {
        let net = if net == NC_NET { String::new() } else { net };
        merged.link(&net, &refdes, &pin);
    }

    let floating: Vec<(String, String)> = merged
        .components
        .iter()
        .flat_map(|(refdes, component)| {
            component
                .pins
                .iter()
                .filter(|(_, entry)| entry.net().is_empty())
                .map(|(pin, _)| (refdes.clone(), pin.clone()))
        })
        .collect();
    for (refdes, pin) in floating {
        merged.link("", &refdes, &pin);
    }

    merged
}

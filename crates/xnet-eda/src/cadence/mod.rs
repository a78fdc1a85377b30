//! Cadence textual netlist decoding: the `pstxnet.dat`/`pstxprt.dat`/
//! `pstchip.dat` triple exported next to a `.dsn`/`.cpm` design file.

pub mod pstchip;
pub mod pstxnet;
pub mod pstxprt;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;
use xnet_sch::classify::is_valid_refdes;
use xnet_sch::{normalize_mpn, Netlist, PinEntry};

use crate::DecodeError;
use pstchip::ChipPart;
use pstxnet::NetSection;
use pstxprt::PartsFile;

pub const NET_FILE: &str = "pstxnet.dat";
pub const PART_FILE: &str = "pstxprt.dat";
pub const CHIP_FILE: &str = "pstchip.dat";

/// The discovered companion triple.
#[derive(Debug)]
pub struct CompanionFiles {
    pub net: PathBuf,
    pub parts: PathBuf,
    pub chips: PathBuf,
}

/// Decode the netlist exported alongside a design file.
pub fn parse_design(path: &Path) -> Result<Netlist, DecodeError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let companions = discover_companions(dir)?;
    debug!("cadence companions: {companions:?}");

    let nets = pstxnet::parse(&fs::read_to_string(&companions.net)?);
    let parts = pstxprt::parse(&fs::read_to_string(&companions.parts)?);
    let chips = pstchip::parse(&fs::read_to_string(&companions.chips)?);
    Ok(join(&nets, &parts, &chips))
}

/// Walk the design file's subtree for the companion triple. The first match
/// per file name wins; file-name comparison is case-insensitive.
pub fn discover_companions(dir: &Path) -> Result<CompanionFiles, DecodeError> {
    let mut net = None;
    let mut parts = None;
    let mut chips = None;

    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        let slot = match name.as_str() {
            NET_FILE => &mut net,
            PART_FILE => &mut parts,
            CHIP_FILE => &mut chips,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(entry.path().to_path_buf());
        }
    }

    let mut missing = Vec::new();
    for (slot, name) in [(&net, NET_FILE), (&parts, PART_FILE), (&chips, CHIP_FILE)] {
        if slot.is_none() {
            missing.push(name.to_string());
        }
    }
    if !missing.is_empty() {
        return Err(DecodeError::MissingCompanions {
            dir: dir.to_path_buf(),
            missing,
        });
    }

    Ok(CompanionFiles {
        net: net.unwrap(),
        parts: parts.unwrap(),
        chips: chips.unwrap(),
    })
}

/// Join the three parses into the universal model.
///
/// Instance-path refdes strings are filtered; pins whose chip-level logical
/// name differs from the pin number become named entries; a chip `VALUE`
/// body property fills the component value when the packaging export left
/// it unset.
pub fn join(nets: &[NetSection], parts: &PartsFile, chips: &[ChipPart]) -> Netlist {
    let chips_by_name: HashMap<&str, &ChipPart> =
        chips.iter().map(|c| (c.part_name.as_str(), c)).collect();
    let part_names: HashMap<String, &str> = parts
        .part_names
        .iter()
        .map(|(refdes, part)| (refdes.to_uppercase(), part.as_str()))
        .collect();

    let mut netlist = Netlist::new();

    for component in &parts.components {
        if !is_valid_refdes(&component.refdes) {
            continue;
        }
        let entry = netlist
            .components
            .entry(component.refdes.to_uppercase())
            .or_default();
        entry.mpn = normalize_mpn(
            component
                .mpn
                .clone()
                .or_else(|| Some(component.part_name.clone())),
        );
        entry.description = component.description.clone().filter(|d| !d.is_empty());
    }

    for section in nets {
        for (refdes, pin) in &section.nodes {
            if !is_valid_refdes(refdes) {
                debug!("skipping instance-path node '{refdes}'");
                continue;
            }
            let refdes = refdes.to_uppercase();
            let pin = pin.to_uppercase();

            {
                let chip = part_names
                    .get(&refdes)
                    .and_then(|part| chips_by_name.get(part));
                let component = netlist.components.entry(refdes.clone()).or_default();
                if let Some(chip) = chip {
                    if let Some(name) = chip.pin_name(&pin) {
                        if !name.is_empty() && !name.eq_ignore_ascii_case(&pin) {
                            component.pins.entry(pin.clone()).or_insert_with(|| {
                                PinEntry::Named {
                                    name: name.to_string(),
                                    net: String::new(),
                                }
                            });
                        }
                    }
                    if component.value.is_none() {
                        if let Some(value) = chip.body.get("VALUE") {
                            component.value = Some(value.clone()).filter(|v| !v.is_empty());
                        }
                    }
                }
            }

            netlist.link(&section.name, &refdes, &pin);
        }
    }

    netlist
}

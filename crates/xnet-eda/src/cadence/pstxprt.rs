//! `pstxprt.dat` parser: physical parts with their packaging properties.

use std::collections::HashMap;

/// One component instance from a `PART_NAME` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentDetails {
    pub refdes: String,
    pub part_name: String,
    /// `MFGR_PN` property, when the export carries one.
    pub mpn: Option<String>,
    /// `DESCR` property.
    pub description: Option<String>,
    /// Every other `KEY=VALUE;` property of the section, verbatim.
    pub properties: HashMap<String, String>,
}

/// Parsed `pstxprt.dat`: components in file order, plus the refdes →
/// part-name join map used to locate chip definitions.
#[derive(Debug, Default)]
pub struct PartsFile {
    pub components: Vec<ComponentDetails>,
    pub part_names: HashMap<String, String>,
}

pub fn parse(text: &str) -> PartsFile {
    let mut parts = PartsFile::default();
    let mut awaiting_header = false;
    let mut in_section = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "PART_NAME" {
            awaiting_header = true;
            in_section = false;
            continue;
        }

        if awaiting_header {
            awaiting_header = false;
            if let Some(component) = parse_header(line) {
                parts
                    .part_names
                    .insert(component.refdes.clone(), component.part_name.clone());
                parts.components.push(component);
                in_section = true;
            }
            continue;
        }

        if in_section {
            if let Some((key, value)) = parse_property(line) {
                let component = parts.components.last_mut().expect("section open");
                match key {
                    "MFGR_PN" => component.mpn = Some(value),
                    "DESCR" => component.description = Some(value),
                    _ => {
                        component.properties.insert(key.to_string(), value);
                    }
                }
            }
        }
    }

    parts
}

/// `<refdes> '<part-name>':` with an optional trailing `;` (HDL exports).
fn parse_header(line: &str) -> Option<ComponentDetails> {
    let (refdes, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim();
    let start = rest.find('\'')?;
    let end = rest[start + 1..].find('\'')?;
    let part_name = &rest[start + 1..start + 1 + end];
    let tail = rest[start + 2 + end..].trim();
    if tail != ":" && tail != ":;" {
        return None;
    }
    Some(ComponentDetails {
        refdes: refdes.to_string(),
        part_name: part_name.to_string(),
        ..Default::default()
    })
}

/// `KEY=VALUE;` property line; values are unquoted and trimmed of trailing
/// `;,`.
fn parse_property(line: &str) -> Option<(&str, String)> {
    let (key, value) = line.split_once('=')?;
    let value = value
        .trim()
        .trim_end_matches([';', ','])
        .trim_matches('\'')
        .to_string();
    Some((key.trim(), value))
}

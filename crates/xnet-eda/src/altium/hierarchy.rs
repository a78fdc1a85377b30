//! Owner-index hierarchy over the flat record list, and extraction of
//! component records from it.
//!
//! Records reference their parent by position in the flat body list
//! (`OwnerIndex`), so the tree is kept as an arena: the records stay in
//! their original `Vec` and parent/child links are plain indices.

use std::collections::{BTreeMap, HashMap};

use log::warn;
use xnet_sch::classify::is_valid_refdes;
use xnet_sch::{normalize_mpn, Component, PinEntry};

use super::records::{Record, TAG_COMPONENT, TAG_DESIGNATOR, TAG_PARAMETER, TAG_PIN};

/// The record forest: all records in original order plus index-based links.
#[derive(Debug, Default)]
pub struct Arena {
    pub records: Vec<Record>,
    pub children: Vec<Vec<usize>>,
    pub roots: Vec<usize>,
}

impl Arena {
    /// Record lookup by original flat-list position.
    pub fn find_by_index(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn children_of(&self, index: usize) -> &[usize] {
        self.children.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Attach each record to its owner; records without a (valid) owner become
/// roots. Child order preserves the original record order.
pub fn build_hierarchy(body: Vec<Record>) -> Arena {
    let len = body.len();
    let mut arena = Arena {
        records: body,
        children: vec![Vec::new(); len],
        roots: Vec::new(),
    };

    for index in 0..len {
        match arena.records[index].owner_index() {
            Some(owner) if owner < len && owner != index => {
                arena.children[owner].push(index);
            }
            _ => arena.roots.push(index),
        }
    }

    arena
}

/// Components extracted from the hierarchy, plus the pin-record → owner
/// mapping the net extractor needs to turn pin devices into
/// `(refdes, pin number)` pairs.
#[derive(Debug, Default)]
pub struct ExtractedComponents {
    pub components: BTreeMap<String, Component>,
    /// Arena index of a PIN record → (refdes, pin number), upper-cased.
    pub pin_owner: HashMap<usize, (String, String)>,
}

/// Pull every COMPONENT record out of the arena (§refdes from the first
/// DESIGNATOR child, metadata from PARAMETER children, pins from PIN
/// children of the currently realized part).
pub fn extract_components(arena: &Arena) -> ExtractedComponents {
    let mut extracted = ExtractedComponents::default();

    for (index, record) in arena.records.iter().enumerate() {
        if record.tag() != Some(TAG_COMPONENT) {
            continue;
        }
        let Some(refdes) = component_refdes(arena, index) else {
            continue;
        };

        let parameters = component_parameters(arena, index);
        let mpn = normalize_mpn(parameter(&parameters, "Manufacturer Part Number"));
        let value = parameter(&parameters, "Value").map(|v| v.trim().to_string());
        let comment = resolve_comment(&parameters, value.as_deref());

        let mut component = Component {
            mpn,
            description: None,
            comment,
            value,
            pins: BTreeMap::new(),
        };

        for &child in arena.children_of(index) {
            let pin = &arena.records[child];
            if pin.tag() != Some(TAG_PIN) || !pin_in_current_part(record, pin) {
                continue;
            }
            let Some(number) = pin.attr("Designator").map(str::trim) else {
                continue;
            };
            let number = number.to_uppercase();
            let name = pin.attr("Name").map(str::trim).unwrap_or("");
            let entry = if !name.is_empty() && !name.eq_ignore_ascii_case(&number) {
                PinEntry::Named {
                    name: name.to_string(),
                    net: String::new(),
                }
            } else {
                PinEntry::Net(String::new())
            };
            extracted
                .pin_owner
                .insert(child, (refdes.clone(), number.clone()));
            component.pins.entry(number).or_insert(entry);
        }

        extracted.components.insert(refdes, component);
    }

    extracted
}

/// Refdes of a component: the `Text` of its first DESIGNATOR child,
/// upper-cased. Components with instance-path-looking designators are
/// dropped.
fn component_refdes(arena: &Arena, component: usize) -> Option<String> {
    let text = arena
        .children_of(component)
        .iter()
        .map(|&c| &arena.records[c])
        .find(|r| r.tag() == Some(TAG_DESIGNATOR))
        .and_then(|r| r.attr("Text"))
        .map(str::trim)?;
    if !is_valid_refdes(text) {
        warn!("dropping component with invalid designator '{text}'");
        return None;
    }
    Some(text.to_uppercase())
}

/// `(name, text)` pairs of the component's PARAMETER children, in order.
fn component_parameters(arena: &Arena, component: usize) -> Vec<(String, String)> {
    arena
        .children_of(component)
        .iter()
        .map(|&c| &arena.records[c])
        .filter(|r| r.tag() == Some(TAG_PARAMETER))
        .filter_map(|r| {
            let name = r.attr("Name")?.trim().to_string();
            let text = r.attr("Text")?.to_string();
            Some((name, text))
        })
        .collect()
}

fn parameter(parameters: &[(String, String)], name: &str) -> Option<String> {
    parameters
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, t)| t.clone())
}

fn parameter_ci(parameters: &[(String, String)], name: &str) -> Option<String> {
    parameters
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, t)| t.clone())
}

/// Resolve the `Comment` parameter. A leading `=` makes it an indirection
/// into another parameter by case-insensitive name; a comment equal to the
/// component value carries no information and is dropped.
fn resolve_comment(parameters: &[(String, String)], value: Option<&str>) -> Option<String> {
    let raw = parameter(parameters, "Comment")?;
    let resolved = match raw.strip_prefix('=') {
        Some(target) => parameter_ci(parameters, target.trim())?,
        None => raw,
    };
    let resolved = resolved.trim().to_string();
    if resolved.is_empty() || Some(resolved.as_str()) == value {
        return None;
    }
    Some(resolved)
}

/// A PIN belongs to the realized part when its `OwnerPartId` matches the
/// component's `CurrentPartId`; absence of either side matches.
pub fn pin_in_current_part(component: &Record, pin: &Record) -> bool {
    match (pin.attr_i64("OwnerPartId"), component.attr_i64("CurrentPartId")) {
        (Some(owner_part), Some(current_part)) => owner_part == current_part,
        _ => true,
    }
}

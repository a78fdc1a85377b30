//! Net extraction from schematic geometry.
//!
//! Wires, pins, power ports and net labels are reduced to vertex lists in a
//! common integer coordinate space (base coordinate × 10 000 plus an
//! optional fractional part). Devices touching each other, or sharing a
//! global net name, are grouped with a union-find over a grid-backed
//! spatial index, and each resulting group becomes one net.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use super::hierarchy::{pin_in_current_part, Arena};
use super::records::{
    Record, TAG_COMPONENT, TAG_NET_LABEL, TAG_PIN, TAG_POWER_PORT, TAG_WIRE,
};

/// Spatial grid cell side. Matches the coordinate scaling factor, so one
/// cell is one schematic base unit.
const CELL: i64 = 10_000;
const SCALE: f64 = 10_000.0;

static WIRE_VERTEX_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^X(\d+)$").expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Wire,
    Pin,
    NetLabel,
    PowerPort,
}

/// A connectable schematic object, reduced to its vertices.
#[derive(Debug)]
pub struct Device {
    /// Position of the backing record in the flat body list.
    pub record_index: usize,
    pub kind: DeviceKind,
    pub vertices: Vec<(i64, i64)>,
    /// `Text` attribute of net labels and power ports (the off-page
    /// connection name).
    pub text: Option<String>,
}

impl Device {
    fn is_global(&self) -> bool {
        matches!(self.kind, DeviceKind::NetLabel | DeviceKind::PowerPort)
    }

    fn global_name(&self) -> Option<&str> {
        if !self.is_global() {
            return None;
        }
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Line segments covered by the device. Single-vertex devices
    /// degenerate to a zero-length segment at that point.
    fn segments(&self) -> Vec<((i64, i64), (i64, i64))> {
        match self.vertices.as_slice() {
            [] => Vec::new(),
            [v] => vec![(*v, *v)],
            vertices => vertices.windows(2).map(|w| (w[0], w[1])).collect(),
        }
    }
}

/// One electrically connected group of devices.
#[derive(Debug)]
pub struct NetGroup {
    pub name: Option<String>,
    /// Member device indices, ordered by original record index.
    pub devices: Vec<usize>,
}

/// Walk the hierarchy and emit every connectable device. Pins are emitted
/// only when they belong to the realized part of a multi-section component.
pub fn collect_connectables(arena: &Arena) -> Vec<Device> {
    let mut devices = Vec::new();

    for (index, record) in arena.records.iter().enumerate() {
        let device = match record.tag() {
            Some(TAG_WIRE) => wire_device(index, record),
            Some(TAG_PIN) => pin_device(arena, index, record),
            Some(TAG_NET_LABEL) => single_point_device(index, record, DeviceKind::NetLabel),
            Some(TAG_POWER_PORT) => single_point_device(index, record, DeviceKind::PowerPort),
            _ => None,
        };
        if let Some(device) = device {
            devices.push(device);
        }
    }

    devices
}

/// Group devices into nets and name them.
pub fn group_nets(
    devices: &[Device],
    pin_owner: &HashMap<usize, (String, String)>,
) -> Vec<NetGroup> {
    let mut uf = UnionFind::new(devices.len());

    // Exact vertex coincidence is the common case; union it cheaply
    // through a point → devices multimap before any geometry tests run.
    let mut by_point: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, device) in devices.iter().enumerate() {
        for vertex in &device.vertices {
            by_point.entry(*vertex).or_default().push(i);
        }
    }
    for members in by_point.values() {
        for &member in &members[1..] {
            uf.union(members[0], member);
        }
    }

    // Grid index: each device registers in every cell its segments touch.
    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, device) in devices.iter().enumerate() {
        for cell in device_cells(device) {
            grid.entry(cell).or_default().push(i);
        }
    }
    for (i, device) in devices.iter().enumerate() {
        let mut candidates: HashSet<usize> = HashSet::new();
        for cell in device_cells(device) {
            if let Some(members) = grid.get(&cell) {
                candidates.extend(members.iter().copied());
            }
        }
        for candidate in candidates {
            if candidate <= i || uf.find(candidate) == uf.find(i) {
                continue;
            }
            if connected(device, &devices[candidate]) {
                uf.union(i, candidate);
            }
        }
    }

    // Off-page connections: same-named ports and labels join regardless of
    // geometry.
    let mut buckets: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, device) in devices.iter().enumerate() {
        if let Some(name) = device.global_name() {
            buckets.entry(name).or_default().push(i);
        }
    }
    for members in buckets.values() {
        for &member in &members[1..] {
            uf.union(members[0], member);
        }
    }

    // Each disjoint set becomes one net; device order within a set follows
    // the original record order because we scan indices ascending.
    let mut sets: Vec<Vec<usize>> = Vec::new();
    let mut set_of_root: HashMap<usize, usize> = HashMap::new();
    for i in 0..devices.len() {
        let root = uf.find(i);
        let slot = *set_of_root.entry(root).or_insert_with(|| {
            sets.push(Vec::new());
            sets.len() - 1
        });
        sets[slot].push(i);
    }

    sets.into_iter()
        .map(|members| NetGroup {
            name: net_name(&members, devices, pin_owner),
            devices: members,
        })
        .collect()
}

/// Two devices connect when a vertex of one lies on a segment of the other,
/// or when both carry the same global net name.
pub fn connected(a: &Device, b: &Device) -> bool {
    if let (Some(name_a), Some(name_b)) = (a.global_name(), b.global_name()) {
        if name_a == name_b {
            return true;
        }
    }
    let b_segments = b.segments();
    if a.vertices
        .iter()
        .any(|v| b_segments.iter().any(|s| point_on_segment(*v, *s)))
    {
        return true;
    }
    let a_segments = a.segments();
    b.vertices
        .iter()
        .any(|v| a_segments.iter().any(|s| point_on_segment(*v, *s)))
}

/// Priority order: a global device's text, then `Net<refdes>_<pin>` from
/// the smallest attached pin, otherwise unnamed.
fn net_name(
    members: &[usize],
    devices: &[Device],
    pin_owner: &HashMap<usize, (String, String)>,
) -> Option<String> {
    if let Some(name) = members
        .iter()
        .find_map(|&i| devices[i].global_name())
    {
        return Some(name.to_string());
    }

    let mut best: Option<&(String, String)> = None;
    for &member in members {
        if devices[member].kind != DeviceKind::Pin {
            continue;
        }
        let Some(candidate) = pin_owner.get(&devices[member].record_index) else {
            continue;
        };
        let better = match best {
            None => true,
            Some(current) => {
                candidate.0.cmp(&current.0).then_with(|| compare_pin_numbers(&candidate.1, &current.1))
                    == std::cmp::Ordering::Less
            }
        };
        if better {
            best = Some(candidate);
        }
    }
    best.map(|(refdes, pin)| format!("Net{refdes}_{pin}"))
}

/// Numeric compare when both sides parse as integers, lexicographic
/// otherwise.
fn compare_pin_numbers(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(na), Ok(nb)) => na.cmp(&nb),
        _ => a.cmp(b),
    }
}

/// A point is on a segment when it falls inside the segment's bounding box
/// on both axes (schematic wires are axis-aligned).
fn point_on_segment((px, py): (i64, i64), ((x1, y1), (x2, y2)): ((i64, i64), (i64, i64))) -> bool {
    x1.min(x2) <= px && px <= x1.max(x2) && y1.min(y2) <= py && py <= y1.max(y2)
}

/// All grid cells a device's segments pass through.
fn device_cells(device: &Device) -> HashSet<(i64, i64)> {
    let mut cells = HashSet::new();
    for ((x1, y1), (x2, y2)) in device.segments() {
        let (min_cx, max_cx) = ordered(x1.div_euclid(CELL), x2.div_euclid(CELL));
        let (min_cy, max_cy) = ordered(y1.div_euclid(CELL), y2.div_euclid(CELL));
        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                cells.insert((cx, cy));
            }
        }
    }
    cells
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    (a.min(b), a.max(b))
}

/// Scaled coordinate: `round(base * 10000 + frac)`, with the fractional
/// part carried in a sibling `<key>_Frac` attribute.
fn scaled(record: &Record, key: &str) -> Option<i64> {
    let base = record.attr_f64(key)?;
    let frac = record
        .attr_f64(&format!("{key}_Frac"))
        .unwrap_or(0.0);
    Some((base * SCALE + frac).round() as i64)
}

fn location(record: &Record) -> Option<(i64, i64)> {
    Some((scaled(record, "Location.X")?, scaled(record, "Location.Y")?))
}

fn wire_device(index: usize, record: &Record) -> Option<Device> {
    let mut numbers: Vec<u32> = record
        .attrs
        .keys()
        .filter_map(|k| WIRE_VERTEX_KEY.captures(k))
        .filter_map(|c| c[1].parse().ok())
        .collect();
    numbers.sort_unstable();

    let mut vertices = Vec::with_capacity(numbers.len());
    for n in numbers {
        if let (Some(x), Some(y)) = (scaled(record, &format!("X{n}")), scaled(record, &format!("Y{n}"))) {
            vertices.push((x, y));
        }
    }
    if vertices.len() < 2 {
        debug!("dropping degenerate wire at record {index}");
        return None;
    }
    Some(Device {
        record_index: index,
        kind: DeviceKind::Wire,
        vertices,
        text: None,
    })
}

/// A pin spans from its origin to the endpoint its rotation and length
/// dictate. Rotation lives in the two lowest bits of `PinConglomerate`,
/// in 90° steps.
fn pin_device(arena: &Arena, index: usize, record: &Record) -> Option<Device> {
    if let Some(parent) = record.owner_index().and_then(|o| arena.find_by_index(o)) {
        if parent.tag() == Some(TAG_COMPONENT) && !pin_in_current_part(parent, record) {
            return None;
        }
    }

    let (x, y) = location(record)?;
    let length = scaled(record, "PinLength").unwrap_or(0);
    let rotation = record.attr_i64("PinConglomerate").unwrap_or(0) & 0x03;
    let (dx, dy) = match rotation {
        0 => (1, 0),
        1 => (0, 1),
        2 => (-1, 0),
        _ => (0, -1),
    };
    Some(Device {
        record_index: index,
        kind: DeviceKind::Pin,
        vertices: vec![(x, y), (x + dx * length, y + dy * length)],
        text: None,
    })
}

fn single_point_device(index: usize, record: &Record, kind: DeviceKind) -> Option<Device> {
    let vertex = location(record)?;
    Some(Device {
        record_index: index,
        kind,
        vertices: vec![vertex],
        text: record.attr("Text").map(str::to_string),
    })
}

/// Disjoint-set forest with path halving and union by size.
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        UnionFind {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

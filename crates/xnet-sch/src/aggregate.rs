//! Aggregation of traversal results by part number, with orientation
//! tracking, and the caller-facing result shape.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::fingerprint::circuit_hash;
use crate::group::{group_by_component, Connection, TracedComponent};
use crate::trace::Traversal;
use crate::NC_NET;

/// One way a part is hooked up within an aggregate group: the exact
/// pins-per-net shape shared by `count` components.
#[derive(Debug, Clone, Serialize)]
pub struct Orientation {
    pub count: usize,
    pub refdes: Vec<String>,
    pub connections: Vec<Connection>,
}

/// Components sharing a part identity and net neighborhood.
#[derive(Debug, Clone, Serialize)]
pub struct MpnGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub count: usize,
    /// Present when the group has a single orientation.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refdes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<Connection>,
    /// Present instead of `refdes`/`connections` when hook-ups differ.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orientations: Vec<Orientation>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dns: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Aggregated answer to an XNET query.
#[derive(Debug, Clone, Serialize)]
pub struct TraceResult {
    pub starting_point: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net: Option<String>,
    pub total_components: usize,
    pub unique_configurations: usize,
    pub components_by_mpn: Vec<MpnGroup>,
    pub visited_nets: Vec<String>,
    pub circuit_hash: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub skipped: BTreeMap<String, usize>,
}

impl TraceResult {
    pub(crate) fn build(starting_point: String, net: Option<String>, traversal: Traversal) -> Self {
        let components = group_by_component(&traversal.pins);
        let circuit_hash = circuit_hash(&components);
        let components_by_mpn = aggregate(&components);
        TraceResult {
            starting_point,
            net,
            total_components: components.len(),
            unique_configurations: components_by_mpn.len(),
            components_by_mpn,
            visited_nets: traversal.visited_nets,
            circuit_hash,
            skipped: traversal.skipped,
        }
    }

    /// Result for a query on an unconnected pin: nothing to traverse, with a
    /// sentinel fingerprint naming the pin.
    pub(crate) fn empty_nc(starting_point: String) -> Self {
        TraceResult {
            circuit_hash: format!("nc-{starting_point}"),
            starting_point,
            net: Some(NC_NET.to_string()),
            total_components: 0,
            unique_configurations: 0,
            components_by_mpn: Vec::new(),
            visited_nets: Vec::new(),
            skipped: BTreeMap::new(),
        }
    }
}

/// Fold traversed components into aggregate groups keyed by part identity
/// (MPN, falling back to description), the sorted set of touched nets, and
/// the DNS flag.
pub fn aggregate(components: &[TracedComponent]) -> Vec<MpnGroup> {
    let mut keys: Vec<(String, String, bool)> = Vec::new();
    let mut buckets: HashMap<(String, String, bool), Vec<&TracedComponent>> = HashMap::new();
    let mut groups: Vec<MpnGroup> = Vec::new();

    for component in components {
        let Some(identity) = component
            .mpn
            .clone()
            .or_else(|| component.description.clone())
        else {
            // Nothing to aggregate on; pass through as a singleton.
            groups.push(MpnGroup {
                mpn: None,
                description: None,
                value: component.value.clone(),
                count: 1,
                refdes: vec![component.refdes.clone()],
                connections: component.connections.clone(),
                orientations: Vec::new(),
                dns: component.dns,
                notes: vec![format!(
                    "{} has no MPN or description; add part data to aggregate it",
                    component.refdes
                )],
            });
            continue;
        };

        let key = (identity, net_signature(component), component.dns);
        if !buckets.contains_key(&key) {
            keys.push(key.clone());
        }
        buckets.entry(key).or_default().push(component);
    }

    for key in keys {
        let members = &buckets[&key];
        groups.push(build_group(members, key.2));
    }

    groups.sort_by(|a, b| natord::compare(first_refdes(a), first_refdes(b)));
    groups
}

fn build_group(members: &[&TracedComponent], dns: bool) -> MpnGroup {
    // Sub-group by exact hook-up shape.
    let mut orientation_keys: Vec<String> = Vec::new();
    let mut orientations: HashMap<String, Vec<&TracedComponent>> = HashMap::new();
    for &member in members {
        let key = orientation_key(member);
        if !orientations.contains_key(&key) {
            orientation_keys.push(key.clone());
        }
        orientations.entry(key).or_default().push(member);
    }

    let representative = members[0];
    let mut group = MpnGroup {
        mpn: representative.mpn.clone(),
        description: representative.description.clone(),
        value: representative.value.clone(),
        count: members.len(),
        refdes: Vec::new(),
        connections: Vec::new(),
        orientations: Vec::new(),
        dns,
        notes: Vec::new(),
    };

    if orientation_keys.len() == 1 {
        group.refdes = sorted_refdes(members);
        group.connections = representative.connections.clone();
        return group;
    }

    let mut built: Vec<(String, Orientation)> = orientation_keys
        .into_iter()
        .map(|key| {
            let members = &orientations[&key];
            let orientation = Orientation {
                count: members.len(),
                refdes: sorted_refdes(members),
                connections: members[0].connections.clone(),
            };
            (key, orientation)
        })
        .collect();
    built.sort_by(|(ka, a), (kb, b)| b.count.cmp(&a.count).then_with(|| ka.cmp(kb)));
    group.orientations = built.into_iter().map(|(_, o)| o).collect();
    group
}

/// Sorted set of nets a component touches, as a grouping key.
fn net_signature(component: &TracedComponent) -> String {
    let mut nets: Vec<&str> = component
        .connections
        .iter()
        .map(|c| c.net.as_str())
        .collect();
    nets.sort_unstable();
    nets.dedup();
    nets.join("|")
}

/// Exact hook-up shape, e.g. `1,2:NET_A|3:NET_B`.
fn orientation_key(component: &TracedComponent) -> String {
    component
        .connections
        .iter()
        .map(|c| format!("{}:{}", c.pins.join(","), c.net))
        .collect::<Vec<_>>()
        .join("|")
}

fn sorted_refdes(members: &[&TracedComponent]) -> Vec<String> {
    let mut refdes: Vec<String> = members.iter().map(|m| m.refdes.clone()).collect();
    refdes.sort_by(|a, b| natord::compare(a, b));
    refdes
}

fn first_refdes(group: &MpnGroup) -> &str {
    group
        .refdes
        .first()
        .or_else(|| group.orientations.first().and_then(|o| o.refdes.first()))
        .map(String::as_str)
        .unwrap_or("")
}
